//! Domain models for the web crate.
//!
//! These are validated domain objects, separate from database row types.

pub mod review;
pub mod session;
pub mod store;
pub mod user;

pub use review::{NewReview, Review, ReviewAuthor};
pub use session::{CurrentUser, keys as session_keys};
pub use store::{NearbyStore, NewStore, Populate, Store, StoreDetails, StoreUpdate, TopStore};
pub use user::User;
