//! Authentication service.
//!
//! Password registration and login, account edits and password resets.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use delicious_core::Email;

use crate::db::{RepositoryError, UserRepository};
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Random bytes in a reset token (hex-encoded to 40 characters).
const RESET_TOKEN_BYTES: usize = 20;

/// How long a reset link stays valid.
pub const RESET_TOKEN_TTL: Duration = Duration::hours(1);

/// Authentication service.
///
/// Handles user registration, login, account edits and password resets.
pub struct AuthService<'a> {
    users: &'a dyn UserRepository,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a dyn UserRepository) -> Self {
        Self { users }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new user with name, email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingName` if the name is blank.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::PasswordMismatch` if the confirmation differs.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        confirm: &str,
    ) -> Result<User, AuthError> {
        let name = validate_name(name)?;
        let email = Email::parse(email)?;
        validate_new_password(password, confirm)?;

        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(name, &email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        // a malformed email cannot belong to anyone
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: delicious_core::UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    // =========================================================================
    // Account
    // =========================================================================

    /// Change a user's name and email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingName`, `AuthError::InvalidEmail`,
    /// `AuthError::UserAlreadyExists` if another account has the email, or
    /// `AuthError::UserNotFound`.
    pub async fn update_account(
        &self,
        user: &User,
        name: &str,
        email: &str,
    ) -> Result<User, AuthError> {
        let name = validate_name(name)?;
        let email = Email::parse(email)?;

        self.users
            .update_profile(user.id, name, &email)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }

    // =========================================================================
    // Password Reset
    // =========================================================================

    /// Issue a reset token for the account with `email`.
    ///
    /// Returns `None` for unknown emails so callers can report success either
    /// way.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` or `AuthError::Repository`.
    pub async fn request_password_reset(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, AuthError> {
        let email = Email::parse(email)?;
        let token = generate_reset_token();

        let stored = self
            .users
            .set_reset_token(&email, &token, now + RESET_TOKEN_TTL)
            .await?;

        if stored {
            Ok(Some(token))
        } else {
            tracing::info!("Password reset requested for unknown email");
            Ok(None)
        }
    }

    /// The user owning a live reset token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidResetToken` if the token is unknown or expired.
    pub async fn check_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<User, AuthError> {
        self.users
            .get_by_reset_token(token, now)
            .await?
            .ok_or(AuthError::InvalidResetToken)
    }

    /// Set a new password through a reset token, consuming the token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordMismatch` or `AuthError::WeakPassword`
    /// before the token is looked up, then `AuthError::InvalidResetToken`.
    pub async fn reset_password(
        &self,
        token: &str,
        password: &str,
        confirm: &str,
        now: DateTime<Utc>,
    ) -> Result<User, AuthError> {
        validate_new_password(password, confirm)?;
        let user = self.check_reset_token(token, now).await?;

        let password_hash = hash_password(password)?;
        let user = self
            .users
            .set_password(user.id, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "Password reset");
        Ok(user)
    }
}

fn validate_name(name: &str) -> Result<&str, AuthError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::MissingName);
    }
    Ok(name)
}

/// Validate password meets requirements and matches its confirmation.
fn validate_new_password(password: &str, confirm: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password != confirm {
        return Err(AuthError::PasswordMismatch);
    }
    Ok(())
}

/// 40 lower-case hex characters from the thread RNG.
fn generate_reset_token() -> String {
    let bytes: [u8; RESET_TOKEN_BYTES] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::Repositories;

    const PASSWORD: &str = "correct horse";

    #[test]
    fn test_hash_and_verify_round_trip() {
        let hash = hash_password(PASSWORD).unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(PASSWORD, &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_reset_token_is_forty_hex_chars() {
        let token = generate_reset_token();
        assert_eq!(token.len(), 40);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_reset_token());
    }

    #[test]
    fn test_new_password_rules() {
        assert!(matches!(
            validate_new_password("short", "short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            validate_new_password(PASSWORD, "different one"),
            Err(AuthError::PasswordMismatch)
        ));
        assert!(validate_new_password(PASSWORD, PASSWORD).is_ok());
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let repos = Repositories::memory();
        let auth = AuthService::new(repos.users.as_ref());

        let user = auth
            .register(" Wes ", "Wes@Example.com", PASSWORD, PASSWORD)
            .await
            .unwrap();
        assert_eq!(user.name, "Wes");
        assert_eq!(user.email.as_str(), "wes@example.com");

        let logged_in = auth.login("wes@example.com", PASSWORD).await.unwrap();
        assert_eq!(logged_in.id, user.id);

        assert!(matches!(
            auth.login("wes@example.com", "not the password").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody@example.com", PASSWORD).await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("not-an-email", PASSWORD).await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_bad_input() {
        let repos = Repositories::memory();
        let auth = AuthService::new(repos.users.as_ref());
        auth.register("Wes", "wes@example.com", PASSWORD, PASSWORD)
            .await
            .unwrap();

        assert!(matches!(
            auth.register("Other", "WES@example.com", PASSWORD, PASSWORD).await,
            Err(AuthError::UserAlreadyExists)
        ));
        assert!(matches!(
            auth.register("  ", "new@example.com", PASSWORD, PASSWORD).await,
            Err(AuthError::MissingName)
        ));
        assert!(matches!(
            auth.register("New", "nope", PASSWORD, PASSWORD).await,
            Err(AuthError::InvalidEmail(_))
        ));
    }

    #[tokio::test]
    async fn test_update_account_conflicts_on_taken_email() {
        let repos = Repositories::memory();
        let auth = AuthService::new(repos.users.as_ref());
        let wes = auth
            .register("Wes", "wes@example.com", PASSWORD, PASSWORD)
            .await
            .unwrap();
        auth.register("Ann", "ann@example.com", PASSWORD, PASSWORD)
            .await
            .unwrap();

        let renamed = auth
            .update_account(&wes, "Wesley", "wesley@example.com")
            .await
            .unwrap();
        assert_eq!(renamed.name, "Wesley");
        assert_eq!(renamed.email.as_str(), "wesley@example.com");

        assert!(matches!(
            auth.update_account(&renamed, "Wesley", "ann@example.com").await,
            Err(AuthError::UserAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let repos = Repositories::memory();
        let auth = AuthService::new(repos.users.as_ref());
        auth.register("Wes", "wes@example.com", PASSWORD, PASSWORD)
            .await
            .unwrap();
        let now = Utc::now();

        assert!(auth
            .request_password_reset("ghost@example.com", now)
            .await
            .unwrap()
            .is_none());

        let token = auth
            .request_password_reset("wes@example.com", now)
            .await
            .unwrap()
            .unwrap();

        let late = now + RESET_TOKEN_TTL + Duration::seconds(1);
        assert!(matches!(
            auth.check_reset_token(&token, late).await,
            Err(AuthError::InvalidResetToken)
        ));

        assert!(matches!(
            auth.reset_password(&token, "new password", "other password", now)
                .await,
            Err(AuthError::PasswordMismatch)
        ));

        auth.reset_password(&token, "new password", "new password", now)
            .await
            .unwrap();
        assert!(auth.login("wes@example.com", "new password").await.is_ok());

        assert!(matches!(
            auth.check_reset_token(&token, now).await,
            Err(AuthError::InvalidResetToken)
        ));
    }
}
