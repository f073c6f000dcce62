//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Registration, login, account edits and password resets
//! - `stores` - Store lifecycle, reviews, hearts and the listing/search reads
//! - `photos` - Writing uploaded store photos to disk

pub mod auth;
pub mod photos;
pub mod stores;
