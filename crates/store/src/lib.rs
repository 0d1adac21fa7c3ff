//! Application state store for the ReelPicks client.
//!
//! This crate contains the `MovieStore` controller that owns the session's
//! selection, search results and predictions, and talks to a
//! `movie_client::Recommender` to keep them up to date.

pub mod state;
pub mod store;

pub use state::{AppState, DEFAULT_MAX_SEQUENCE_LENGTH, ResponseOrdering, StoreConfig};
pub use store::{MovieStore, PendingRequest};
