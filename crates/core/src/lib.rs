//! Delicious Core - shared types and directory algorithms.
//!
//! This crate provides the domain vocabulary used by every Delicious
//! component:
//! - `web` - the store directory site and JSON API
//! - `cli` - migrations and sample data seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure algorithms - no I/O, no
//! database access, no HTTP. The web crate's Postgres repositories push the
//! same work down into SQL; the in-memory repositories call the functions
//! here directly.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, coordinates and ratings
//! - [`slug`] - URL slugs and collision suffixes
//! - [`tags`] - Tag normalization and usage counts
//! - [`geo`] - Great-circle distance and radius queries
//! - [`search`] - Token-based text relevance
//! - [`rating`] - Review averaging and ranking
//! - [`pagination`] - Page arithmetic with clamping
//! - [`hearts`] - Favorite store sets

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod geo;
pub mod hearts;
pub mod pagination;
pub mod rating;
pub mod search;
pub mod slug;
pub mod tags;
pub mod types;

pub use geo::{GeoError, GeoPoint, Location};
pub use hearts::Hearts;
pub use pagination::Page;
pub use rating::{Rating, RatingError, RatingSummary};
pub use search::TextQuery;
pub use slug::{Slug, SlugError};
pub use tags::TagCount;
pub use types::*;
