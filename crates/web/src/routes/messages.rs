//! Flash-style notices carried in redirect query strings.
//!
//! Handlers redirect with `?error=<code>` or `?success=<code>`; pages turn
//! the code back into text. Unknown codes are ignored.

use serde::Deserialize;

use crate::services::auth::AuthError;
use crate::services::photos::PhotoError;
use crate::services::stores::StoreError;

/// Query parameters for error/success display.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

impl MessageQuery {
    /// The notice to show, errors first.
    #[must_use]
    pub fn notice(&self) -> Option<Notice> {
        self.error
            .as_deref()
            .and_then(error_text)
            .map(Notice::error)
            .or_else(|| self.success.as_deref().and_then(success_text).map(Notice::success))
    }
}

/// A message banner at the top of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Error,
    Info,
    Success,
}

impl Notice {
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    /// CSS modifier for the banner.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self.kind {
            NoticeKind::Error => "flash--error",
            NoticeKind::Info => "flash--info",
            NoticeKind::Success => "flash--success",
        }
    }
}

fn error_text(code: &str) -> Option<&'static str> {
    Some(match code {
        "login_required" => "Oops! You must be logged in to do that!",
        "credentials" => "Failed login!",
        "session" => "Something went wrong with your session. Please try again.",
        "name" => "You must supply a name!",
        "email" => "That email is not valid!",
        "email_taken" => "An account with that email already exists.",
        "password_weak" => "Passwords must be at least 8 characters.",
        "password_mismatch" => "Oops! Your passwords do not match!",
        "reset_invalid" => "Password reset is invalid or has expired.",
        "store_name" => "Please enter a store name with at least one letter or digit.",
        "store_address" => "You must supply an address!",
        "store_location" => "You must supply a valid longitude and latitude!",
        "store_slug" => "Could not reserve a unique address for that name. Please try again.",
        "photo_type" => "That filetype isn't allowed!",
        "review_text" => "Your review needs some text!",
        "review_rating" => "Please pick a rating between 1 and 5!",
        _ => return None,
    })
}

fn success_text(code: &str) -> Option<&'static str> {
    Some(match code {
        "logged_in" => "You are now logged in!",
        "logged_out" => "You are now logged out!",
        "registered" => "Welcome! Your account is ready and you are logged in.",
        "account_updated" => "Updated the profile!",
        "reset_sent" => "If that account exists, a password reset link is on its way.",
        "password_reset" => "Nice! Your password has been reset! You are now logged in!",
        "store_created" => "Store created. Care to leave a review?",
        "store_updated" => "Store updated!",
        "review_added" => "Review saved!",
        _ => return None,
    })
}

/// Redirect code for a rejected store or review form.
///
/// `None` means the error is not the user's input and should propagate.
#[must_use]
pub const fn store_error_code(err: &StoreError) -> Option<&'static str> {
    match err {
        StoreError::MissingName | StoreError::InvalidName(_) => Some("store_name"),
        StoreError::MissingAddress => Some("store_address"),
        StoreError::InvalidLocation(_) => Some("store_location"),
        StoreError::MissingReviewText => Some("review_text"),
        StoreError::MissingRating | StoreError::InvalidRating(_) => Some("review_rating"),
        StoreError::SlugConflict => Some("store_slug"),
        StoreError::NotFound | StoreError::OwnershipViolation | StoreError::Repository(_) => None,
    }
}

/// Redirect code for a rejected photo upload.
#[must_use]
pub const fn photo_error_code(err: &PhotoError) -> Option<&'static str> {
    match err {
        PhotoError::NotAnImage(_) => Some("photo_type"),
        PhotoError::Io(_) => None,
    }
}

/// Redirect code for a rejected auth form.
#[must_use]
pub const fn auth_error_code(err: &AuthError) -> Option<&'static str> {
    match err {
        AuthError::InvalidEmail(_) => Some("email"),
        AuthError::MissingName => Some("name"),
        AuthError::InvalidCredentials | AuthError::UserNotFound => Some("credentials"),
        AuthError::UserAlreadyExists => Some("email_taken"),
        AuthError::WeakPassword(_) => Some("password_weak"),
        AuthError::PasswordMismatch => Some("password_mismatch"),
        AuthError::InvalidResetToken => Some("reset_invalid"),
        AuthError::Repository(_) | AuthError::PasswordHash => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(error: Option<&str>, success: Option<&str>) -> MessageQuery {
        MessageQuery {
            error: error.map(ToOwned::to_owned),
            success: success.map(ToOwned::to_owned),
        }
    }

    #[test]
    fn test_notice_prefers_error() {
        let notice = query(Some("credentials"), Some("logged_in")).notice();
        assert_eq!(notice, Some(Notice::error("Failed login!")));
    }

    #[test]
    fn test_unknown_codes_are_ignored() {
        assert!(query(Some("<script>"), None).notice().is_none());
        assert_eq!(
            query(Some("nope"), Some("review_added")).notice(),
            Some(Notice::success("Review saved!"))
        );
    }

    #[test]
    fn test_store_error_codes() {
        assert_eq!(store_error_code(&StoreError::MissingAddress), Some("store_address"));
        assert_eq!(store_error_code(&StoreError::MissingRating), Some("review_rating"));
        assert_eq!(store_error_code(&StoreError::NotFound), None);
        assert_eq!(store_error_code(&StoreError::OwnershipViolation), None);
    }
}
