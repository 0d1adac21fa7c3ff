//! HTTP client for the remote recommendation service.
//!
//! Two endpoints, both answering with a JSON array of movies:
//! - `GET  {base}/search?q=<query>`
//! - `POST {base}/predict` with body `{"ids": [...]}`
//!
//! Requests are sent once. Timeouts, TLS and connection pooling are whatever
//! reqwest defaults to.

use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, error, info};

use crate::error::{ClientError, Result};
use crate::traits::Recommender;
use crate::types::{Movie, MovieId, PredictRequest};

const SEARCH_ENDPOINT: &str = "search";
const PREDICT_ENDPOINT: &str = "predict";

/// Client for the recommendation service.
#[derive(Debug, Clone)]
pub struct RecommenderClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RecommenderClient {
    /// Create a client for the service rooted at `base_url`
    /// (e.g. "http://localhost:5000").
    ///
    /// No connection is made until the first request.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(ClientError::Build)?;
        Self::with_http_client(base_url, http)
    }

    /// Create a client that reuses an existing reqwest client.
    pub fn with_http_client(base_url: impl AsRef<str>, http: reqwest::Client) -> Result<Self> {
        let raw = base_url.as_ref();
        let mut url = Url::parse(raw).map_err(|e| ClientError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        if url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl {
                url: raw.to_string(),
                reason: "URL cannot carry endpoint paths".to_string(),
            });
        }

        // Without a trailing slash, `join` would replace the last path segment
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        info!("Using recommendation service at {}", url);
        Ok(Self {
            http,
            base_url: url,
        })
    }

    /// The normalized base URL, always ending in `/`.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn endpoint(&self, endpoint: &'static str) -> Result<Url> {
        self.base_url
            .join(endpoint)
            .map_err(|e| ClientError::InvalidUrl {
                url: format!("{}{}", self.base_url, endpoint),
                reason: e.to_string(),
            })
    }

    async fn read_movies(endpoint: &'static str, response: reqwest::Response) -> Result<Vec<Movie>> {
        let status = response.status();
        if !status.is_success() {
            error!("{} returned status {}", endpoint, status);
            return Err(ClientError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        let movies = response
            .json::<Vec<Movie>>()
            .await
            .map_err(|source| {
                error!("Failed to decode {} response: {}", endpoint, source);
                ClientError::Decode { endpoint, source }
            })?;
        debug!("{} returned {} movies", endpoint, movies.len());
        Ok(movies)
    }
}

#[async_trait]
impl Recommender for RecommenderClient {
    fn name(&self) -> &str {
        "RecommenderClient"
    }

    async fn search_movies(&self, query: &str) -> Result<Vec<Movie>> {
        let url = self.endpoint(SEARCH_ENDPOINT)?;
        debug!("Searching movies for {:?}", query);

        let response = self
            .http
            .get(url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|source| {
                error!("Search request failed: {}", source);
                ClientError::Transport {
                    endpoint: SEARCH_ENDPOINT,
                    source,
                }
            })?;

        Self::read_movies(SEARCH_ENDPOINT, response).await
    }

    async fn fetch_predicted_movies(&self, ids: &[MovieId]) -> Result<Vec<Movie>> {
        let url = self.endpoint(PREDICT_ENDPOINT)?;
        debug!("Requesting predictions for sequence {:?}", ids);

        let response = self
            .http
            .post(url)
            .json(&PredictRequest { ids })
            .send()
            .await
            .map_err(|source| {
                error!("Predict request failed: {}", source);
                ClientError::Transport {
                    endpoint: PREDICT_ENDPOINT,
                    source,
                }
            })?;

        Self::read_movies(PREDICT_ENDPOINT, response).await
    }
}
