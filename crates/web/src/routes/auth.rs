//! Authentication route handlers.
//!
//! Handles login, registration, logout and password reset against the local
//! user store.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::User;
use crate::routes::messages::{MessageQuery, Notice, auth_error_code};
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

/// Reset password form data.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template, with the forgot password form.
#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub user: Option<User>,
    pub notice: Option<Notice>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub user: Option<User>,
    pub notice: Option<Notice>,
}

/// Reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "reset.html")]
pub struct ResetPasswordTemplate {
    pub user: Option<User>,
    pub notice: Option<Notice>,
    pub token: String,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        user,
        notice: query.notice(),
    }
}

/// Handle login form submission.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let auth = AuthService::new(state.repos().users.as_ref());

    match auth.login(&form.email, &form.password).await {
        Ok(user) => Ok(start_session(&session, &user, "/?success=logged_in").await),
        Err(e) => {
            tracing::info!(error = %e, "Login failed");
            auth_failure(e, "/login")
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    RegisterTemplate {
        user,
        notice: query.notice(),
    }
}

/// Handle registration form submission.
///
/// A new account is logged in straight away.
#[instrument(skip(state, session, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let auth = AuthService::new(state.repos().users.as_ref());

    match auth
        .register(&form.name, &form.email, &form.password, &form.password_confirm)
        .await
    {
        Ok(user) => Ok(start_session(&session, &user, "/?success=registered").await),
        Err(e) => auth_failure(e, "/register"),
    }
}

// =============================================================================
// Logout Route
// =============================================================================

/// Handle logout.
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!("Failed to clear session: {}", e);
    }
    clear_sentry_user();

    Redirect::to("/?success=logged_out").into_response()
}

// =============================================================================
// Password Reset Routes
// =============================================================================

/// Handle forgot password form submission.
///
/// Always reports success so the form cannot be used to enumerate accounts.
/// The reset link is logged; delivering it is left to whoever reads the logs.
#[instrument(skip(state, form))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Form(form): Form<ForgotPasswordForm>,
) -> Result<Response> {
    let auth = AuthService::new(state.repos().users.as_ref());

    match auth.request_password_reset(&form.email, Utc::now()).await {
        Ok(Some(token)) => {
            let reset_url = format!("{}/account/reset/{token}", state.config().base_url);
            tracing::info!(%reset_url, "Password reset link issued");
        }
        Ok(None) | Err(AuthError::InvalidEmail(_)) => {}
        Err(e) => return Err(e.into()),
    }

    Ok(Redirect::to("/login?success=reset_sent").into_response())
}

/// Display the reset password page for a live token.
#[instrument(skip_all)]
pub async fn reset_password_page(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(token): Path<String>,
    Query(query): Query<MessageQuery>,
) -> Result<Response> {
    let auth = AuthService::new(state.repos().users.as_ref());

    match auth.check_reset_token(&token, Utc::now()).await {
        Ok(_) => Ok(ResetPasswordTemplate {
            user,
            notice: query.notice(),
            token,
        }
        .into_response()),
        Err(e) => auth_failure(e, "/login"),
    }
}

/// Handle reset password form submission, then log the user in.
#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    session: Session,
    Path(token): Path<String>,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Response> {
    let auth = AuthService::new(state.repos().users.as_ref());

    match auth
        .reset_password(&token, &form.password, &form.password_confirm, Utc::now())
        .await
    {
        Ok(user) => Ok(start_session(&session, &user, "/?success=password_reset").await),
        // a dead token cannot be retried from its own page
        Err(e @ AuthError::InvalidResetToken) => auth_failure(e, "/login"),
        Err(e) => auth_failure(e, &format!("/account/reset/{token}")),
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Put `user` on the session and redirect to `to`.
async fn start_session(session: &Session, user: &User, to: &str) -> Response {
    if let Err(e) = set_current_user(session, user).await {
        tracing::error!("Failed to set session: {}", e);
        return Redirect::to("/login?error=session").into_response();
    }

    set_sentry_user(&user.id, Some(user.email.as_str()));
    add_breadcrumb("auth", "User logged in", None);
    Redirect::to(to).into_response()
}

/// Redirect back to a form for user errors; propagate the rest.
pub(crate) fn auth_failure(err: AuthError, back: &str) -> Result<Response> {
    match auth_error_code(&err) {
        Some(code) => Ok(Redirect::to(&format!("{back}?error={code}")).into_response()),
        None => Err(err.into()),
    }
}
