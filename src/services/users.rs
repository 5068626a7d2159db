//! Account administration

use std::sync::Arc;

use crate::domain::{Email, Principal, UserId, UserPatch, UserSummary};
use crate::error::{AppError, Result};
use crate::services::require_admin;
use crate::store::{Stores, UserRepository};

pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(stores: &Stores) -> Self {
        Self { users: stores.users.clone() }
    }

    pub async fn list(&self, principal: &Principal) -> Result<Vec<UserSummary>> {
        require_admin(principal)?;
        Ok(self.users.list().await?.iter().map(|u| u.summary()).collect())
    }

    pub async fn update(&self, principal: &Principal, id: UserId, patch: UserPatch) -> Result<UserSummary> {
        require_admin(principal)?;
        let mut user = self.users.find_by_id(id).await?.ok_or(AppError::NotFound("User"))?;
        if let Some(email) = patch.email.as_deref() {
            let email = Email::parse(email)?;
            if let Some(owner) = self.users.find_by_email(&email).await? {
                if owner.id != id { return Err(AppError::Conflict(format!("{email} is already in use"))); }
            }
        }
        user.apply(patch)?;
        self.users.update(&user).await?;
        tracing::info!(user_id = %id, role = user.role.as_str(), blocked = user.is_blocked, "user updated");
        Ok(user.summary())
    }

    /// Delete an account. Its sessions and cart go with it; orders stay.
    pub async fn delete(&self, principal: &Principal, id: UserId) -> Result<()> {
        require_admin(principal)?;
        if !self.users.delete(id).await? { return Err(AppError::NotFound("User")); }
        tracing::info!(user_id = %id, "user deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Role, User};
    use crate::store::MockUserRepository;

    fn admin() -> Principal { Principal::new(UserId::generate(), Role::Admin) }

    async fn seed(stores: &Stores, email: &str) -> User {
        let user = User::register("Sam", "", Email::parse(email).unwrap(), "hash".into(), Role::Customer).unwrap();
        stores.users.insert(&user).await.unwrap();
        user
    }

    #[tokio::test]
    async fn test_list_is_admin_only() {
        let stores = Stores::in_memory();
        seed(&stores, "sam@example.com").await;
        let users = UserService::new(&stores);
        assert_eq!(users.list(&admin()).await.unwrap().len(), 1);
        let customer = Principal::new(UserId::generate(), Role::Customer);
        assert!(matches!(users.list(&customer).await, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_update_rejects_taken_email() {
        let stores = Stores::in_memory();
        let sam = seed(&stores, "sam@example.com").await;
        seed(&stores, "kim@example.com").await;
        let users = UserService::new(&stores);

        let patch = UserPatch { email: Some("kim@example.com".into()), ..Default::default() };
        assert!(matches!(users.update(&admin(), sam.id, patch).await, Err(AppError::Conflict(_))));

        let patch = UserPatch { email: Some("sam@example.com".into()), is_blocked: Some(true), ..Default::default() };
        assert!(users.update(&admin(), sam.id, patch).await.unwrap().is_blocked);
    }

    #[tokio::test]
    async fn test_delete_missing_user_is_not_found() {
        let mut repo = MockUserRepository::new();
        repo.expect_delete().returning(|_| Ok(false));
        let stores = Stores { users: Arc::new(repo), ..Stores::in_memory() };
        let users = UserService::new(&stores);
        assert!(matches!(users.delete(&admin(), UserId::generate()).await, Err(AppError::NotFound("User"))));
    }
}
