//! Offline stand-in for the recommendation service.
//!
//! Answers every search and prediction with the same five movies after a
//! fixed delay, so the store can be driven without a backing service.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::traits::Recommender;
use crate::types::{Movie, MovieId};

/// Delay applied to every mock response
pub const DEFAULT_MOCK_DELAY: Duration = Duration::from_millis(1000);

/// The fixed catalogue served by [`MockRecommender`], ids `0..4` in order.
pub fn fixture_movies() -> Vec<Movie> {
    vec![
        Movie::new(
            0,
            "The Matrix",
            1999,
            "https://m.media-amazon.com/images/M/MV5BNzQzOTk3OTAtNDQ0Zi00ZTVkLWI0MTEtMDllZjNkYzNjNTc4L2ltYWdlXkEyXkFqcGdeQXVyNjU0OTQ0OTY@._V1_SX101_CR0,0,101,150_.jpg",
        ),
        Movie::new(
            1,
            "Inception",
            2010,
            "https://m.media-amazon.com/images/M/MV5BMjAxMzY3NjcxNF5BMl5BanBnXkFtZTcwNTI5OTM0Mw@@._V1_UX182_CR0,0,182,268_AL_.jpg",
        ),
        Movie::new(
            2,
            "Fight Club",
            1999,
            "https://m.media-amazon.com/images/M/MV5BMmEzNTkxYjQtZTc0MC00YTVjLTg5ZTEtZWMwOWVlYzY0NWIwXkEyXkFqcGdeQXVyNzkwMjQ5NzM@._V1_UX182_CR0,0,182,268_AL_.jpg",
        ),
        Movie::new(
            3,
            "The Lord of The Rings: The Fellowship of the Ring",
            2001,
            "https://m.media-amazon.com/images/M/MV5BN2EyZjM3NzUtNWUzMi00MTgxLWI0NTctMzY4M2VlOTdjZWRiXkEyXkFqcGdeQXVyNDUzOTQ5MjY@._V1_UX182_CR0,0,182,268_AL_.jpg",
        ),
        Movie::new(
            4,
            "Forrest Gump",
            1994,
            "https://m.media-amazon.com/images/M/MV5BNWIwODRlZTUtY2U3ZS00Yzg1LWJhNzYtMmZiYmEyNmU1NjMzXkEyXkFqcGdeQXVyMTQxNzMzNDI@._V1_UY268_CR1,0,182,268_AL_.jpg",
        ),
    ]
}

/// Deterministic recommender that ignores its input.
///
/// Never fails.
#[derive(Debug, Clone)]
pub struct MockRecommender {
    delay: Duration,
    movies: Vec<Movie>,
}

impl MockRecommender {
    pub fn new() -> Self {
        Self {
            delay: DEFAULT_MOCK_DELAY,
            movies: fixture_movies(),
        }
    }

    /// Override the artificial response delay (builder pattern).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    async fn respond(&self) -> Vec<Movie> {
        tokio::time::sleep(self.delay).await;
        self.movies.clone()
    }
}

impl Default for MockRecommender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Recommender for MockRecommender {
    fn name(&self) -> &str {
        "MockRecommender"
    }

    async fn search_movies(&self, query: &str) -> Result<Vec<Movie>> {
        debug!("Mock search for {:?}", query);
        Ok(self.respond().await)
    }

    async fn fetch_predicted_movies(&self, ids: &[MovieId]) -> Result<Vec<Movie>> {
        debug!("Mock prediction for {} ids", ids.len());
        Ok(self.respond().await)
    }
}
