//! Application state and store configuration.

use movie_client::{Movie, MovieId};

/// Default cap on the selection length, matching the prediction model's
/// input window.
pub const DEFAULT_MAX_SEQUENCE_LENGTH: usize = 15;

/// How responses that resolve out of order are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseOrdering {
    /// Apply every response as it resolves; the last one to arrive wins even
    /// if it answers an older request.
    #[default]
    LastResolvedWins,
    /// Tag each request with a per-field sequence number and drop responses
    /// that are not for the latest request issued.
    LatestIssuedWins,
}

/// Configuration for [`crate::MovieStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Declared selection limit. Not enforced by the store.
    pub max_sequence_length: usize,
    pub ordering: ResponseOrdering,
}

impl StoreConfig {
    pub fn with_max_sequence_length(mut self, max_sequence_length: usize) -> Self {
        self.max_sequence_length = max_sequence_length;
        self
    }

    pub fn with_ordering(mut self, ordering: ResponseOrdering) -> Self {
        self.ordering = ordering;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_sequence_length: DEFAULT_MAX_SEQUENCE_LENGTH,
            ordering: ResponseOrdering::default(),
        }
    }
}

/// Everything the UI layer reads.
///
/// Each field only ever changes by full replacement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    /// Ordered selection; order is the prediction input order, duplicates kept
    pub selected_movies: Vec<Movie>,
    /// Ids sent with the most recently issued prediction request
    pub last_id_sequence: Vec<MovieId>,
    pub search_results: Vec<Movie>,
    pub predicted_movies: Vec<Movie>,
    pub max_sequence_length: usize,
}

impl AppState {
    pub fn new(max_sequence_length: usize) -> Self {
        Self {
            max_sequence_length,
            ..Self::default()
        }
    }

    /// The ordered id sequence of the current selection.
    pub fn selected_ids(&self) -> Vec<MovieId> {
        self.selected_movies.iter().map(|movie| movie.id).collect()
    }

    /// Whether the selection has grown past the declared limit.
    pub fn exceeds_max_sequence_length(&self) -> bool {
        self.selected_movies.len() > self.max_sequence_length
    }
}
