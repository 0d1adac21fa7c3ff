//! Client for the movie recommendation service.
//!
//! This crate provides:
//! - `Movie` and the other wire types of the service
//! - The `Recommender` trait, the seam the application store talks to
//! - `RecommenderClient`, the HTTP implementation (`/search`, `/predict`)
//! - `MockRecommender`, a fixed five-movie stand-in for offline use
//!
//! ## Example Usage
//! ```ignore
//! use movie_client::{Recommender, RecommenderClient};
//!
//! let client = RecommenderClient::new("http://localhost:5000")?;
//! let hits = client.search_movies("matrix").await?;
//! let ids: Vec<_> = hits.iter().take(3).map(|m| m.id).collect();
//! let predicted = client.fetch_predicted_movies(&ids).await?;
//! ```

pub mod error;
pub mod http;
pub mod mock;
pub mod traits;
pub mod types;

// Re-export main types
pub use error::{ClientError, Result};
pub use http::RecommenderClient;
pub use mock::{fixture_movies, MockRecommender, DEFAULT_MOCK_DELAY};
pub use traits::Recommender;
pub use types::{Movie, MovieId, PredictRequest};
