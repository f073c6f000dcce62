//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::User;
use crate::routes::auth::auth_failure;
use crate::routes::messages::{MessageQuery, Notice};
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Account form data.
#[derive(Debug, Deserialize)]
pub struct AccountForm {
    pub name: String,
    pub email: String,
}

/// Account page template.
#[derive(Template, WebTemplate)]
#[template(path = "account.html")]
pub struct AccountTemplate {
    pub user: Option<User>,
    pub notice: Option<Notice>,
}

/// Display the account form.
pub async fn index(
    RequireAuth(user): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    AccountTemplate {
        user: Some(user),
        notice: query.notice(),
    }
}

/// Change the logged-in user's name and email.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<AccountForm>,
) -> Result<Response> {
    let auth = AuthService::new(state.repos().users.as_ref());

    match auth.update_account(&user, &form.name, &form.email).await {
        Ok(_) => Ok(Redirect::to("/account?success=account_updated").into_response()),
        Err(e) => auth_failure(e, "/account"),
    }
}
