//! Identity and session service.
//!
//! Passwords are argon2 hashes. Bearer tokens are 32 random bytes, hex
//! encoded; only a SHA-256 of the server secret and the token is stored, so a
//! leaked sessions table cannot be replayed.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use validator::Validate;

use crate::domain::{Email, Principal, ProfilePatch, Role, User, UserId, UserSummary};
use crate::error::{AppError, Result};
use crate::store::{Session, SessionRepository, Stores, UserRepository};

const TOKEN_BYTES: usize = 32;
const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Clone)]
pub struct AuthSettings {
    pub secret: SecretString,
    pub session_ttl: Duration,
    pub hash_params: Params,
}

impl AuthSettings {
    pub fn new(secret: SecretString, session_ttl_hours: i64) -> Self {
        Self { secret, session_ttl: Duration::hours(session_ttl_hours), hash_params: Params::default() }
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.hash_params.clone())
    }

    fn token_hash(&self, token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.expose_secret().as_bytes());
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "first_name is required"))]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[validate(email(message = "a valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserSummary,
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    settings: AuthSettings,
}

impl AuthService {
    pub fn new(stores: &Stores, settings: AuthSettings) -> Self {
        Self { users: stores.users.clone(), sessions: stores.sessions.clone(), settings }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<AuthSession> {
        request.validate()?;
        let email = Email::parse(&request.email)?;
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("an account with this email already exists".into()));
        }
        let user = User::register(&request.first_name, &request.last_name, email, self.hash_password(&request.password)?, Role::Customer)?;
        self.users.insert(&user).await?;
        tracing::info!(user_id = %user.id, "user registered");

        let issued = self.issue_token(user.id, None, self.settings.session_ttl).await?;
        Ok(AuthSession { token: issued.token, expires_at: issued.expires_at, user: user.summary() })
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthSession> {
        request.validate()?;
        let invalid = || AppError::unauthorized("invalid email or password");
        let email = Email::parse(&request.email).map_err(|_| invalid())?;
        let user = self.users.find_by_email(&email).await?.ok_or_else(invalid)?;
        if !verify_password(&request.password, &user.password_hash) { return Err(invalid()); }
        if user.is_blocked { return Err(AppError::forbidden("account is blocked")); }

        let issued = self.issue_token(user.id, None, self.settings.session_ttl).await?;
        tracing::info!(user_id = %user.id, "user logged in");
        Ok(AuthSession { token: issued.token, expires_at: issued.expires_at, user: user.summary() })
    }

    /// Resolve a bearer token into the principal it speaks for.
    pub async fn authenticate(&self, token: &str) -> Result<Principal> {
        let hash = self.settings.token_hash(token);
        let session = self.sessions.find(&hash).await?.ok_or_else(|| AppError::unauthorized("invalid or expired token"))?;
        if session.expires_at <= Utc::now() {
            self.sessions.delete(&hash).await?;
            return Err(AppError::unauthorized("invalid or expired token"));
        }
        let user = self.users.find_by_id(session.user_id).await?.ok_or_else(|| AppError::unauthorized("account no longer exists"))?;
        if user.is_blocked { return Err(AppError::forbidden("account is blocked")); }
        Ok(Principal { user_id: user.id, role: user.role, impersonator: session.impersonator })
    }

    pub async fn logout(&self, token: &str) -> Result<()> {
        self.sessions.delete(&self.settings.token_hash(token)).await?;
        Ok(())
    }

    pub async fn me(&self, principal: &Principal) -> Result<UserSummary> {
        Ok(self.current_user(principal).await?.summary())
    }

    pub async fn update_profile(&self, principal: &Principal, patch: ProfilePatch) -> Result<UserSummary> {
        let mut user = self.current_user(principal).await?;
        user.apply_profile(patch)?;
        self.users.update(&user).await?;
        Ok(user.summary())
    }

    /// Mint a session for `user_id`. `impersonator` records the admin acting
    /// through it.
    pub async fn issue_token(&self, user_id: UserId, impersonator: Option<UserId>, ttl: Duration) -> Result<IssuedToken> {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);
        let now = Utc::now();
        let session = Session {
            token_hash: self.settings.token_hash(&token),
            user_id,
            impersonator,
            expires_at: now + ttl,
            created_at: now,
        };
        self.sessions.insert(&session).await?;
        Ok(IssuedToken { token, expires_at: session.expires_at })
    }

    /// Create an admin account unless the email is already registered.
    /// Returns whether an account was created.
    pub async fn ensure_admin(&self, first_name: &str, last_name: &str, email: &str, password: &str) -> Result<bool> {
        let email = Email::parse(email)?;
        if self.users.find_by_email(&email).await?.is_some() { return Ok(false); }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AppError::validation(format!("password must be at least {MIN_PASSWORD_LENGTH} characters")));
        }
        let user = User::register(first_name, last_name, email, self.hash_password(password)?, Role::Admin)?;
        self.users.insert(&user).await?;
        tracing::info!(user_id = %user.id, "admin account created");
        Ok(true)
    }

    async fn current_user(&self, principal: &Principal) -> Result<User> {
        self.users.find_by_id(principal.user_id).await?.ok_or(AppError::NotFound("User"))
    }

    fn hash_password(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.settings
            .hasher()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(AppError::from)
    }
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
        .is_ok()
}

#[cfg(test)]
pub(crate) fn test_settings() -> AuthSettings {
    AuthSettings {
        secret: SecretString::from("test-secret-test-secret-test-secret".to_string()),
        session_ttl: Duration::hours(1),
        hash_params: Params::new(Params::MIN_M_COST, 1, 1, None).expect("valid argon2 params"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserPatch;

    fn service() -> (AuthService, Stores) {
        let stores = Stores::in_memory();
        (AuthService::new(&stores, test_settings()), stores)
    }

    fn register(email: &str) -> RegisterRequest {
        RegisterRequest { first_name: "Ada".into(), last_name: "L".into(), email: email.into(), password: "hunter22".into() }
    }

    #[tokio::test]
    async fn test_register_login_authenticate() {
        let (auth, _) = service();
        let session = auth.register(register("ada@example.com")).await.unwrap();
        assert_eq!(session.user.role, Role::Customer);

        let principal = auth.authenticate(&session.token).await.unwrap();
        assert_eq!(principal.user_id, session.user.id);
        assert!(!principal.is_admin());

        let login = auth.login(LoginRequest { email: "ADA@example.com".into(), password: "hunter22".into() }).await.unwrap();
        assert_ne!(login.token, session.token);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let (auth, _) = service();
        auth.register(register("ada@example.com")).await.unwrap();
        assert!(matches!(auth.register(register("ada@example.com")).await, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_bad_credentials_and_tokens() {
        let (auth, _) = service();
        auth.register(register("ada@example.com")).await.unwrap();
        let wrong = auth.login(LoginRequest { email: "ada@example.com".into(), password: "nope-nope".into() }).await;
        assert!(matches!(wrong, Err(AppError::Unauthorized(_))));
        assert!(matches!(auth.authenticate("deadbeef").await, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_blocked_user_is_shut_out() {
        let (auth, stores) = service();
        let session = auth.register(register("ada@example.com")).await.unwrap();
        let mut user = stores.users.find_by_id(session.user.id).await.unwrap().unwrap();
        user.apply(UserPatch { is_blocked: Some(true), ..Default::default() }).unwrap();
        stores.users.update(&user).await.unwrap();

        assert!(matches!(auth.authenticate(&session.token).await, Err(AppError::Forbidden(_))));
        let login = auth.login(LoginRequest { email: "ada@example.com".into(), password: "hunter22".into() }).await;
        assert!(matches!(login, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let (auth, stores) = service();
        let session = auth.register(register("ada@example.com")).await.unwrap();
        let expired = auth.issue_token(session.user.id, None, Duration::seconds(-1)).await.unwrap();
        assert!(matches!(auth.authenticate(&expired.token).await, Err(AppError::Unauthorized(_))));
        // the stale session is dropped on first use
        let hash = auth.settings.token_hash(&expired.token);
        assert!(stores.sessions.find(&hash).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let (auth, _) = service();
        assert!(auth.ensure_admin("Root", "", "root@example.com", "changeme1").await.unwrap());
        assert!(!auth.ensure_admin("Root", "", "root@example.com", "changeme1").await.unwrap());
        let session = auth.login(LoginRequest { email: "root@example.com".into(), password: "changeme1".into() }).await.unwrap();
        assert_eq!(session.user.role, Role::Admin);
    }
}
