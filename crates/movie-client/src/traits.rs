//! The seam between the application store and whatever answers its queries.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Movie, MovieId};

/// Source of search results and sequence-based predictions.
///
/// ## Design Note
/// - `Send + Sync` lets the store share one client across spawned requests
/// - Implementations hold no per-call state: no caching, no retries
#[async_trait]
pub trait Recommender: Send + Sync {
    /// Returns the name of this recommender (for logging)
    fn name(&self) -> &str;

    /// Free-text search over the movie catalogue.
    async fn search_movies(&self, query: &str) -> Result<Vec<Movie>>;

    /// Predict the next movies for an ordered sequence of watched ids.
    ///
    /// Order and duplicates in `ids` are significant and forwarded as-is.
    async fn fetch_predicted_movies(&self, ids: &[MovieId]) -> Result<Vec<Movie>>;
}
