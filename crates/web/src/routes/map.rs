//! Map page route handler.
//!
//! The page is static; its script queries `/api/v1/stores/near`.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;

use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::User;
use crate::routes::messages::Notice;

/// Where the map opens before the browser reports a position.
pub const DEFAULT_CENTER: (f64, f64) = (-79.3832, 43.6532);

/// Map page template.
#[derive(Template, WebTemplate)]
#[template(path = "map.html")]
pub struct MapTemplate {
    pub user: Option<User>,
    pub notice: Option<Notice>,
    pub lng: f64,
    pub lat: f64,
}

pub async fn index(OptionalAuth(user): OptionalAuth) -> impl IntoResponse {
    MapTemplate {
        user,
        notice: None,
        lng: DEFAULT_CENTER.0,
        lat: DEFAULT_CENTER.1,
    }
}
