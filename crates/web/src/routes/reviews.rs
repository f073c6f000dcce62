//! Review route handlers.

use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use delicious_core::StoreId;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::routes::messages::store_error_code;
use crate::services::stores::StoreService;
use crate::state::AppState;

/// Review form data.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    #[serde(default)]
    pub text: String,
    /// Radio buttons send nothing when none is picked.
    pub rating: Option<String>,
}

/// Add a review and return to the store page.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<StoreId>,
    Form(form): Form<ReviewForm>,
) -> Result<Response> {
    let store = state
        .repos()
        .stores
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("store {id}")))?;
    let back = format!("/store/{}", store.slug);

    let rating = form
        .rating
        .as_deref()
        .and_then(|r| r.trim().parse::<i64>().ok());

    match StoreService::new(state.repos())
        .add_review(user.id, id, &form.text, rating)
        .await
    {
        Ok(_) => Ok(Redirect::to(&format!("{back}?success=review_added")).into_response()),
        Err(e) => match store_error_code(&e) {
            Some(code) => Ok(Redirect::to(&format!("{back}?error={code}")).into_response()),
            None => Err(e.into()),
        },
    }
}
