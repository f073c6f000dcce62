//! Top rated stores route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};

use crate::error::Result;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::{TopStore, User};
use crate::routes::messages::Notice;
use crate::services::stores::StoreService;
use crate::state::AppState;

/// Top stores page template.
#[derive(Template, WebTemplate)]
#[template(path = "top.html")]
pub struct TopTemplate {
    pub user: Option<User>,
    pub notice: Option<Notice>,
    pub stores: Vec<TopStore>,
}

/// Best average ratings among stores with at least two reviews.
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<impl IntoResponse> {
    let stores = StoreService::new(state.repos()).top_rated().await?;

    Ok(TopTemplate {
        user,
        notice: None,
        stores,
    })
}
