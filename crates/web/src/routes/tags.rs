//! Tag browsing route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::{Populate, User};
use crate::routes::messages::{MessageQuery, Notice};
use crate::routes::stores::StoreCard;
use crate::services::stores::StoreService;
use crate::state::AppState;

/// A tag in the tag bar.
pub struct TagLink {
    pub tag: String,
    pub count: u64,
    pub href: String,
    pub active: bool,
}

/// Tags page template.
#[derive(Template, WebTemplate)]
#[template(path = "tags.html")]
pub struct TagsTemplate {
    pub user: Option<User>,
    pub notice: Option<Notice>,
    pub title: String,
    pub tags: Vec<TagLink>,
    pub cards: Vec<StoreCard>,
}

/// Every tag, and every store with at least one tag.
pub async fn index(
    state: State<AppState>,
    auth: OptionalAuth,
    query: Query<MessageQuery>,
) -> Result<impl IntoResponse> {
    render(state, auth, None, query).await
}

/// Every tag, and the stores carrying one of them.
pub async fn show(
    state: State<AppState>,
    auth: OptionalAuth,
    Path(tag): Path<String>,
    query: Query<MessageQuery>,
) -> Result<impl IntoResponse> {
    render(state, auth, Some(tag), query).await
}

#[instrument(skip(state, user, query))]
async fn render(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    tag: Option<String>,
    Query(query): Query<MessageQuery>,
) -> Result<TagsTemplate> {
    let page = StoreService::new(state.repos())
        .tags_page(tag.as_deref(), Populate::Reviews)
        .await?;

    let tags = page
        .tags
        .into_iter()
        .map(|t| TagLink {
            href: filters::tag_path(&t.tag),
            active: page.selected.as_deref() == Some(t.tag.as_str()),
            tag: t.tag,
            count: t.count,
        })
        .collect();

    Ok(TagsTemplate {
        title: page.selected.unwrap_or_else(|| "Tags".to_string()),
        cards: StoreCard::for_viewer(page.stores, user.as_ref()),
        tags,
        user,
        notice: query.notice(),
    })
}
