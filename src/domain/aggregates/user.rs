//! User Aggregate and the authenticated principal

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use crate::domain::aggregates::order::Order;
use crate::domain::value_objects::{Email, UserId, ValueError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role { Admin, #[default] Customer }

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Admin => "admin", Self::Customer => "customer" }
    }
}

impl FromStr for Role {
    type Err = UserError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s { "admin" => Ok(Self::Admin), "customer" => Ok(Self::Customer), other => Err(UserError::UnknownRole(other.to_string())) }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub password_hash: String,
    pub role: Role,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The fields of a user that leave the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub role: Role,
    pub is_blocked: bool,
}

/// Admin edit of another account. Passwords are never patched here.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_blocked: Option<bool>,
}

/// Self-service profile edit.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProfilePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

impl User {
    pub fn register(first_name: &str, last_name: &str, email: Email, password_hash: String, role: Role) -> Result<Self, UserError> {
        let now = Utc::now();
        Ok(Self {
            id: UserId::generate(),
            first_name: required_name(first_name, "first_name")?,
            last_name: last_name.trim().to_string(),
            email,
            password_hash,
            role,
            is_blocked: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_admin(&self) -> bool { self.role == Role::Admin }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            role: self.role,
            is_blocked: self.is_blocked,
        }
    }

    pub fn apply(&mut self, patch: UserPatch) -> Result<(), UserError> {
        self.apply_profile(ProfilePatch { first_name: patch.first_name, last_name: patch.last_name, email: patch.email })?;
        if let Some(role) = patch.role { self.role = role; }
        if let Some(blocked) = patch.is_blocked { self.is_blocked = blocked; }
        Ok(())
    }

    pub fn apply_profile(&mut self, patch: ProfilePatch) -> Result<(), UserError> {
        let first_name = patch.first_name.as_deref().map(|n| required_name(n, "first_name")).transpose()?;
        let email = patch.email.map(Email::parse).transpose()?;
        if let Some(first_name) = first_name { self.first_name = first_name; }
        if let Some(last_name) = patch.last_name { self.last_name = last_name.trim().to_string(); }
        if let Some(email) = email { self.email = email; }
        self.updated_at = Utc::now();
        Ok(())
    }
}

fn required_name(value: &str, field: &'static str) -> Result<String, UserError> {
    let value = value.trim();
    if value.is_empty() { return Err(UserError::MissingField(field)); }
    Ok(value.to_string())
}

/// Who is making a request. Passed explicitly into every cart and order
/// operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
    /// Set when an admin is acting through an impersonation token.
    pub impersonator: Option<UserId>,
}

impl Principal {
    pub fn new(user_id: UserId, role: Role) -> Self { Self { user_id, role, impersonator: None } }
    pub fn is_admin(&self) -> bool { self.role == Role::Admin }
    pub fn can_view(&self, order: &Order) -> bool { self.is_admin() || order.user_id() == self.user_id }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error(transparent)]
    Value(#[from] ValueError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User::register("Ada", "Lovelace", Email::parse("ada@example.com").unwrap(), "hash".into(), Role::Customer).unwrap()
    }

    #[test]
    fn test_register_requires_first_name() {
        let err = User::register(" ", "x", Email::parse("a@b.io").unwrap(), "h".into(), Role::Customer).unwrap_err();
        assert_eq!(err, UserError::MissingField("first_name"));
    }

    #[test]
    fn test_admin_patch() {
        let mut u = user();
        u.apply(UserPatch { role: Some(Role::Admin), is_blocked: Some(true), email: Some("ADA@Example.com".into()), ..Default::default() }).unwrap();
        assert!(u.is_admin());
        assert!(u.is_blocked);
        assert_eq!(u.email.as_str(), "ada@example.com");
    }

    #[test]
    fn test_bad_email_patch_leaves_user_alone() {
        let mut u = user();
        let before = u.clone();
        assert!(u.apply_profile(ProfilePatch { first_name: Some("Grace".into()), email: Some("nope".into()), ..Default::default() }).is_err());
        assert_eq!(u, before);
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("root".parse::<Role>().is_err());
    }
}
