//! Wire types shared by the recommendation service and its clients.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Unique identifier for a movie in the service's vocabulary
pub type MovieId = u32;

/// A movie as returned by `/search` and `/predict`.
///
/// Movies are immutable once retrieved; whichever result list holds one
/// owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    /// The service stores ids as strings, so both `7` and `"7"` are accepted.
    #[serde(deserialize_with = "deserialize_movie_id")]
    pub id: MovieId,
    pub title: String,
    pub year: u16,
    /// Poster image URL
    pub img: String,
    /// Model probability as a percentage string (e.g. `"12.34"`).
    ///
    /// Only present on prediction results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prob: Option<String>,
}

impl Movie {
    pub fn new(id: MovieId, title: impl Into<String>, year: u16, img: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            year,
            img: img.into(),
            prob: None,
        }
    }

    /// Attach a prediction probability (builder pattern).
    pub fn with_prob(mut self, prob: impl Into<String>) -> Self {
        self.prob = Some(prob.into());
        self
    }
}

/// Body of `POST /predict`
#[derive(Debug, Serialize)]
pub struct PredictRequest<'a> {
    pub ids: &'a [MovieId],
}

fn deserialize_movie_id<'de, D>(deserializer: D) -> std::result::Result<MovieId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(MovieId),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(id) => Ok(id),
        RawId::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("movie id {text:?} is not an integer"))),
    }
}
