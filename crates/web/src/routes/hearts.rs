//! Hearted stores route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{Populate, User};
use crate::routes::messages::Notice;
use crate::routes::stores::StoreCard;
use crate::services::stores::StoreService;
use crate::state::AppState;

/// Hearted stores page template.
#[derive(Template, WebTemplate)]
#[template(path = "hearts.html")]
pub struct HeartsTemplate {
    pub user: Option<User>,
    pub notice: Option<Notice>,
    pub cards: Vec<StoreCard>,
}

/// The logged-in user's hearted stores.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let stores = StoreService::new(state.repos())
        .hearted_stores(&user, Populate::Reviews)
        .await?;

    Ok(HeartsTemplate {
        cards: StoreCard::for_viewer(stores, Some(&user)),
        user: Some(user),
        notice: None,
    })
}
