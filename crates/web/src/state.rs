//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::WebConfig;
use crate::db::Repositories;
use crate::services::photos::PhotoStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the repositories and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WebConfig,
    repos: Repositories,
    photos: PhotoStore,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: WebConfig, repos: Repositories) -> Self {
        let photos = PhotoStore::new(config.uploads_dir.clone());
        Self {
            inner: Arc::new(AppStateInner {
                config,
                repos,
                photos,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &WebConfig {
        &self.inner.config
    }

    /// Get a reference to the storage repositories.
    #[must_use]
    pub fn repos(&self) -> &Repositories {
        &self.inner.repos
    }

    #[must_use]
    pub fn photos(&self) -> &PhotoStore {
        &self.inner.photos
    }
}
