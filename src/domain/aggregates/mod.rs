//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;
pub mod user;

pub use product::{Product, ProductDraft, ProductError, ProductPatch, ProductSnapshot};
pub use order::{Order, OrderError, OrderLine, OrderPatch, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress};
pub use cart::{Cart, CartError, CartItem, CartLine};
pub use user::{Principal, ProfilePatch, Role, User, UserError, UserPatch, UserSummary};
