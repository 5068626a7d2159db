//! Value objects shared by the inventory aggregates

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("amount must not be negative")]
    NegativeAmount,
    #[error("amount is too large")]
    AmountOverflow,
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Time-ordered identifier for a new record.
            pub fn generate() -> Self { Self(Uuid::now_v7()) }
            pub const fn from_uuid(id: Uuid) -> Self { Self(id) }
            pub const fn as_uuid(&self) -> Uuid { self.0 }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
        }

        impl FromStr for $name {
            type Err = ValueError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self).map_err(|_| ValueError::InvalidId(s.to_string()))
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self { Self(id) }
        }
    };
}

define_id!(
    /// Identity of a registered user
    UserId
);
define_id!(
    /// Identity of a catalog entry
    ProductId
);
define_id!(
    /// Identity of a placed order
    OrderId
);

/// Non-negative monetary amount in the store currency.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub fn new(amount: Decimal) -> Result<Self, ValueError> {
        if amount.is_sign_negative() && !amount.is_zero() { return Err(ValueError::NegativeAmount); }
        Ok(Self(amount))
    }
    pub const fn zero() -> Self { Self(Decimal::ZERO) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn checked_add(&self, other: &Money) -> Result<Money, ValueError> {
        self.0.checked_add(other.0).map(Money).ok_or(ValueError::AmountOverflow)
    }
    pub fn checked_multiply(&self, qty: u32) -> Result<Money, ValueError> {
        self.0.checked_mul(Decimal::from(qty)).map(Money).ok_or(ValueError::AmountOverflow)
    }

    /// Sum of `amounts`, failing instead of overflowing.
    pub fn total<I: IntoIterator<Item = Money>>(amounts: I) -> Result<Money, ValueError> {
        amounts.into_iter().try_fold(Money::zero(), |acc, m| acc.checked_add(&m))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:.2}", self.0) }
}

/// Normalised (trimmed, lower-cased) email address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn parse(value: impl AsRef<str>) -> Result<Self, ValueError> {
        let value = value.as_ref().trim().to_lowercase();
        if !validator::validate_email(&value) { return Err(ValueError::InvalidEmail(value)); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for Email {
    type Error = ValueError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::parse(value) }
}

impl From<Email> for String {
    fn from(email: Email) -> Self { email.0 }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_rejects_negative() {
        assert_eq!(Money::new(Decimal::new(-1, 0)), Err(ValueError::NegativeAmount));
        assert!(Money::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_money_arithmetic() {
        let price = Money::new(Decimal::new(1050, 2)).unwrap();
        assert_eq!(price.checked_multiply(3).unwrap().amount(), Decimal::new(3150, 2));
        assert_eq!(Money::total(vec![price, price]).unwrap().amount(), Decimal::new(21, 0));
    }

    #[test]
    fn test_money_overflow_is_an_error() {
        let huge = Money::new(Decimal::MAX).unwrap();
        assert_eq!(huge.checked_multiply(2), Err(ValueError::AmountOverflow));
        assert_eq!(Money::total(vec![huge, huge]), Err(ValueError::AmountOverflow));
        assert_eq!(huge.checked_multiply(1), Ok(huge));
    }

    #[test]
    fn test_email_normalised() {
        let email = Email::parse("  Shopper@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "shopper@example.com");
        assert!(Email::parse("not-an-email").is_err());
    }

    #[test]
    fn test_id_parse() {
        let id = OrderId::generate();
        assert_eq!(id.to_string().parse::<OrderId>().unwrap(), id);
        assert!("nope".parse::<ProductId>().is_err());
    }
}
