//! # Movie Store
//!
//! Owns the application state and coordinates the two remote operations:
//! 1. Search: query the service, replace `search_results`
//! 2. Selection change: replace `selected_movies`, then refresh predictions
//! 3. Prediction: send the ordered selection ids, replace `predicted_movies`
//!
//! Actions never wait on the network. They spawn the request and return a
//! [`PendingRequest`]; the response is applied whenever it resolves.
//! Failures leave the target field untouched and are handed back through
//! the handle for whoever cares to look.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use movie_client::{Movie, MovieId, Recommender};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::state::{AppState, ResponseOrdering, StoreConfig};

/// Handle to an in-flight request spawned by a store action.
///
/// Dropping it does not cancel the request.
pub type PendingRequest = JoinHandle<movie_client::Result<()>>;

/// Per-field counters of issued requests
#[derive(Debug, Default)]
struct RequestSequences {
    search: AtomicU64,
    predict: AtomicU64,
}

/// Controller that owns [`AppState`] and is the only way to change it.
#[derive(Clone)]
pub struct MovieStore {
    client: Arc<dyn Recommender>,
    state: Arc<RwLock<AppState>>,
    sequences: Arc<RequestSequences>,
    config: StoreConfig,
}

impl MovieStore {
    /// Create a store with the default configuration.
    pub fn new(client: Arc<dyn Recommender>) -> Self {
        Self::with_config(client, StoreConfig::default())
    }

    pub fn with_config(client: Arc<dyn Recommender>, config: StoreConfig) -> Self {
        info!(
            "Creating movie store backed by {} (ordering: {:?}, max sequence length: {})",
            client.name(),
            config.ordering,
            config.max_sequence_length
        );
        Self {
            client,
            state: Arc::new(RwLock::new(AppState::new(config.max_sequence_length))),
            sequences: Arc::new(RequestSequences::default()),
            config,
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Replace the selection. Does not touch predictions.
    pub async fn replace_selected_movies(&self, selected_movies: Vec<Movie>) {
        self.state.write().await.selected_movies = selected_movies;
    }

    pub async fn replace_search_results(&self, search_results: Vec<Movie>) {
        self.state.write().await.search_results = search_results;
    }

    pub async fn replace_predicted_movies(&self, predicted_movies: Vec<Movie>) {
        self.state.write().await.predicted_movies = predicted_movies;
    }

    // ========================================================================
    // Actions
    // ========================================================================

    /// Search the service and replace `search_results` with the answer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn search_movies(&self, query: impl Into<String>) -> PendingRequest {
        let query = query.into();
        let seq = self.sequences.search.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Issuing search #{} for {:?}", seq, query);

        let store = self.clone();
        tokio::spawn(async move { store.resolve_search(seq, query).await })
    }

    /// Refresh `predicted_movies` from the current selection.
    ///
    /// With an empty selection the predictions are cleared before this
    /// returns and no request is made (`None`). Otherwise the ordered ids of
    /// the selection are sent and the handle of that request is returned.
    pub async fn get_predicted_movies(&self) -> Option<PendingRequest> {
        let seq = self.sequences.predict.fetch_add(1, Ordering::SeqCst) + 1;

        let ids: Vec<MovieId> = {
            let mut state = self.state.write().await;
            let ids = state.selected_ids();
            if ids.is_empty() {
                debug!("Selection is empty, clearing predictions");
                state.last_id_sequence.clear();
                state.predicted_movies = Vec::new();
                return None;
            }
            state.last_id_sequence = ids.clone();
            ids
        };
        debug!("Issuing prediction #{} for sequence {:?}", seq, ids);

        let store = self.clone();
        Some(tokio::spawn(async move { store.resolve_prediction(seq, ids).await }))
    }

    /// Replace the selection, then refresh predictions exactly once.
    pub async fn set_selected_movies(&self, selected_movies: Vec<Movie>) -> Option<PendingRequest> {
        self.replace_selected_movies(selected_movies).await;
        self.get_predicted_movies().await
    }

    async fn resolve_search(&self, seq: u64, query: String) -> movie_client::Result<()> {
        let results = self
            .client
            .search_movies(&query)
            .await
            .inspect_err(|e| warn!("Search for {:?} failed, keeping previous results: {}", query, e))?;

        let mut state = self.state.write().await;
        if !self.is_current(&self.sequences.search, seq) {
            debug!("Discarding stale search #{} for {:?}", seq, query);
            return Ok(());
        }
        debug!("Search #{} returned {} movies", seq, results.len());
        state.search_results = results;
        Ok(())
    }

    async fn resolve_prediction(&self, seq: u64, ids: Vec<MovieId>) -> movie_client::Result<()> {
        let predicted = self
            .client
            .fetch_predicted_movies(&ids)
            .await
            .inspect_err(|e| warn!("Prediction for {:?} failed, keeping previous predictions: {}", ids, e))?;

        let mut state = self.state.write().await;
        if !self.is_current(&self.sequences.predict, seq) {
            debug!("Discarding stale prediction #{} for {:?}", seq, ids);
            return Ok(());
        }
        debug!("Prediction #{} returned {} movies", seq, predicted.len());
        state.predicted_movies = predicted;
        Ok(())
    }

    // ========================================================================
    // Readers
    // ========================================================================

    /// A copy of the whole state.
    pub async fn snapshot(&self) -> AppState {
        self.state.read().await.clone()
    }

    pub async fn selected_movies(&self) -> Vec<Movie> {
        self.state.read().await.selected_movies.clone()
    }

    pub async fn search_results(&self) -> Vec<Movie> {
        self.state.read().await.search_results.clone()
    }

    pub async fn predicted_movies(&self) -> Vec<Movie> {
        self.state.read().await.predicted_movies.clone()
    }

    pub async fn last_id_sequence(&self) -> Vec<MovieId> {
        self.state.read().await.last_id_sequence.clone()
    }

    pub fn max_sequence_length(&self) -> usize {
        self.config.max_sequence_length
    }

    pub fn ordering(&self) -> ResponseOrdering {
        self.config.ordering
    }

    /// Whether a response tagged `seq` may still be applied.
    ///
    /// Callers hold the state write lock, so no other response for the same
    /// field can be applied between this check and the assignment.
    fn is_current(&self, counter: &AtomicU64, seq: u64) -> bool {
        match self.config.ordering {
            ResponseOrdering::LastResolvedWins => true,
            ResponseOrdering::LatestIssuedWins => counter.load(Ordering::SeqCst) == seq,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use movie_client::ClientError;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    // ============================================================================
    // Test Fixtures
    // ============================================================================

    fn movie(id: MovieId, title: &str) -> Movie {
        Movie::new(id, title, 2000, format!("https://img/{id}.jpg"))
    }

    fn ids(movies: &[Movie]) -> Vec<MovieId> {
        movies.iter().map(|m| m.id).collect()
    }

    /// Recommender that records every call and can hold responses back
    /// until the test releases them.
    ///
    /// Ungated searches answer with one movie titled after the query; ungated
    /// predictions answer with `id + 100` for each requested id.
    #[derive(Default)]
    struct ScriptedRecommender {
        search_calls: Mutex<Vec<String>>,
        predict_calls: Mutex<Vec<Vec<MovieId>>>,
        gates: Mutex<HashMap<String, oneshot::Receiver<Vec<Movie>>>>,
        failing: bool,
    }

    impl ScriptedRecommender {
        fn failing() -> Self {
            Self {
                failing: true,
                ..Self::default()
            }
        }

        /// Hold back the response for `key` until the returned sender fires.
        fn gate(&self, key: impl Into<String>) -> oneshot::Sender<Vec<Movie>> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().insert(key.into(), rx);
            tx
        }

        async fn respond(&self, key: String, fallback: Vec<Movie>) -> movie_client::Result<Vec<Movie>> {
            let gate = self.gates.lock().unwrap().remove(&key);
            match gate {
                Some(rx) => Ok(rx.await.unwrap_or_default()),
                None => Ok(fallback),
            }
        }

        fn search_calls(&self) -> Vec<String> {
            self.search_calls.lock().unwrap().clone()
        }

        fn predict_calls(&self) -> Vec<Vec<MovieId>> {
            self.predict_calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Recommender for ScriptedRecommender {
        fn name(&self) -> &str {
            "ScriptedRecommender"
        }

        async fn search_movies(&self, query: &str) -> movie_client::Result<Vec<Movie>> {
            self.search_calls.lock().unwrap().push(query.to_string());
            if self.failing {
                return Err(ClientError::Status {
                    endpoint: "search",
                    status: 503,
                });
            }
            self.respond(format!("search:{query}"), vec![movie(100, query)])
                .await
        }

        async fn fetch_predicted_movies(&self, ids: &[MovieId]) -> movie_client::Result<Vec<Movie>> {
            self.predict_calls.lock().unwrap().push(ids.to_vec());
            if self.failing {
                return Err(ClientError::Status {
                    endpoint: "predict",
                    status: 503,
                });
            }
            let fallback = ids.iter().map(|id| movie(id + 100, "predicted")).collect();
            self.respond(format!("predict:{ids:?}"), fallback).await
        }
    }

    fn build_store(client: &Arc<ScriptedRecommender>, ordering: ResponseOrdering) -> MovieStore {
        let client: Arc<dyn Recommender> = client.clone();
        MovieStore::with_config(client, StoreConfig::default().with_ordering(ordering))
    }

    // ============================================================================
    // Unit Tests: mutations
    // ============================================================================

    #[tokio::test]
    async fn test_new_store_starts_empty() {
        let client = Arc::new(ScriptedRecommender::default());
        let store = build_store(&client, ResponseOrdering::LastResolvedWins);

        let state = store.snapshot().await;
        assert!(state.selected_movies.is_empty());
        assert!(state.search_results.is_empty());
        assert!(state.predicted_movies.is_empty());
        assert!(state.last_id_sequence.is_empty());
        assert_eq!(state.max_sequence_length, 15);
        assert_eq!(store.max_sequence_length(), 15);
    }

    #[tokio::test]
    async fn test_mutations_replace_whole_field() {
        let client = Arc::new(ScriptedRecommender::default());
        let store = build_store(&client, ResponseOrdering::LastResolvedWins);

        store
            .replace_search_results(vec![movie(1, "a"), movie(2, "b")])
            .await;
        store.replace_search_results(vec![movie(3, "c")]).await;

        assert_eq!(ids(&store.search_results().await), vec![3]);
    }

    #[tokio::test]
    async fn test_replace_selected_movies_does_not_predict() {
        let client = Arc::new(ScriptedRecommender::default());
        let store = build_store(&client, ResponseOrdering::LastResolvedWins);

        store.replace_selected_movies(vec![movie(1, "a")]).await;

        assert_eq!(ids(&store.selected_movies().await), vec![1]);
        assert!(client.predict_calls().is_empty());
    }

    #[tokio::test]
    async fn test_replacing_with_same_value_is_idempotent() {
        let client = Arc::new(ScriptedRecommender::default());
        let store = build_store(&client, ResponseOrdering::LastResolvedWins);
        let results = vec![movie(1, "a"), movie(2, "b")];

        store.replace_search_results(results.clone()).await;
        store.replace_predicted_movies(results.clone()).await;
        let once = store.snapshot().await;

        store.replace_search_results(results.clone()).await;
        store.replace_predicted_movies(results.clone()).await;
        let twice = store.snapshot().await;

        assert_eq!(once, twice);
    }

    // ============================================================================
    // Unit Tests: search_movies
    // ============================================================================

    #[tokio::test]
    async fn test_search_replaces_results() {
        let client = Arc::new(ScriptedRecommender::default());
        let store = build_store(&client, ResponseOrdering::LastResolvedWins);
        store.replace_search_results(vec![movie(1, "old")]).await;

        store
            .search_movies("heat")
            .await
            .expect("search task panicked")
            .expect("search failed");

        let results = store.search_results().await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "heat");
        assert_eq!(client.search_calls(), vec!["heat".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_search_keeps_previous_results() {
        let client = Arc::new(ScriptedRecommender::failing());
        let store = build_store(&client, ResponseOrdering::LastResolvedWins);
        store.replace_search_results(vec![movie(1, "old")]).await;

        let result = store.search_movies("heat").await.expect("search task panicked");

        assert!(matches!(result, Err(ClientError::Status { status: 503, .. })));
        assert_eq!(ids(&store.search_results().await), vec![1]);
    }

    #[tokio::test]
    async fn test_out_of_order_search_last_resolved_wins() {
        let client = Arc::new(ScriptedRecommender::default());
        let release_a = client.gate("search:a");
        let release_b = client.gate("search:b");
        let store = build_store(&client, ResponseOrdering::LastResolvedWins);

        let a = store.search_movies("a");
        let b = store.search_movies("b");

        release_b.send(vec![movie(2, "B")]).unwrap();
        b.await.unwrap().unwrap();
        assert_eq!(ids(&store.search_results().await), vec![2]);

        release_a.send(vec![movie(1, "A")]).unwrap();
        a.await.unwrap().unwrap();
        assert_eq!(
            ids(&store.search_results().await),
            vec![1],
            "The response that resolves last overwrites, even if it is older"
        );
    }

    #[tokio::test]
    async fn test_out_of_order_search_latest_issued_wins() {
        let client = Arc::new(ScriptedRecommender::default());
        let release_a = client.gate("search:a");
        let release_b = client.gate("search:b");
        let store = build_store(&client, ResponseOrdering::LatestIssuedWins);

        let a = store.search_movies("a");
        let b = store.search_movies("b");

        release_b.send(vec![movie(2, "B")]).unwrap();
        b.await.unwrap().unwrap();
        release_a.send(vec![movie(1, "A")]).unwrap();
        a.await.unwrap().unwrap();

        assert_eq!(ids(&store.search_results().await), vec![2]);
    }

    // ============================================================================
    // Unit Tests: get_predicted_movies / set_selected_movies
    // ============================================================================

    #[tokio::test]
    async fn test_prediction_sends_ordered_ids_with_duplicates() {
        let client = Arc::new(ScriptedRecommender::default());
        let store = build_store(&client, ResponseOrdering::LastResolvedWins);
        store
            .replace_selected_movies(vec![movie(3, "c"), movie(1, "a"), movie(3, "c")])
            .await;

        let pending = store.get_predicted_movies().await.expect("expected a request");
        pending.await.unwrap().unwrap();

        assert_eq!(client.predict_calls(), vec![vec![3, 1, 3]]);
        assert_eq!(store.last_id_sequence().await, vec![3, 1, 3]);
        assert_eq!(ids(&store.predicted_movies().await), vec![103, 101, 103]);
    }

    #[tokio::test]
    async fn test_empty_selection_clears_without_request() {
        let client = Arc::new(ScriptedRecommender::default());
        let store = build_store(&client, ResponseOrdering::LastResolvedWins);
        store.replace_predicted_movies(vec![movie(9, "stale")]).await;

        let pending = store.get_predicted_movies().await;

        assert!(pending.is_none());
        assert!(client.predict_calls().is_empty());
        assert!(store.predicted_movies().await.is_empty());
    }

    #[tokio::test]
    async fn test_set_selected_movies_predicts_exactly_once() {
        let client = Arc::new(ScriptedRecommender::default());
        let store = build_store(&client, ResponseOrdering::LastResolvedWins);
        let selection = vec![movie(4, "d"), movie(2, "b")];

        let pending = store
            .set_selected_movies(selection.clone())
            .await
            .expect("expected a request");

        // Selection is visible before the prediction resolves
        assert_eq!(store.selected_movies().await, selection);

        pending.await.unwrap().unwrap();
        assert_eq!(client.predict_calls(), vec![vec![4, 2]]);
        assert_eq!(ids(&store.predicted_movies().await), vec![104, 102]);
    }

    #[tokio::test]
    async fn test_clearing_selection_clears_predictions() {
        let client = Arc::new(ScriptedRecommender::default());
        let store = build_store(&client, ResponseOrdering::LastResolvedWins);

        store
            .set_selected_movies(vec![movie(1, "a")])
            .await
            .expect("expected a request")
            .await
            .unwrap()
            .unwrap();
        assert!(!store.predicted_movies().await.is_empty());

        let pending = store.set_selected_movies(Vec::new()).await;

        assert!(pending.is_none());
        assert!(store.predicted_movies().await.is_empty());
        assert!(store.last_id_sequence().await.is_empty());
        assert_eq!(client.predict_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_prediction_keeps_previous_predictions() {
        let client = Arc::new(ScriptedRecommender::failing());
        let store = build_store(&client, ResponseOrdering::LastResolvedWins);
        store.replace_predicted_movies(vec![movie(7, "kept")]).await;

        let result = store
            .set_selected_movies(vec![movie(1, "a")])
            .await
            .expect("expected a request")
            .await
            .expect("prediction task panicked");

        assert!(result.is_err());
        assert_eq!(ids(&store.predicted_movies().await), vec![7]);
        assert_eq!(ids(&store.selected_movies().await), vec![1]);
    }

    #[tokio::test]
    async fn test_stale_prediction_overwrites_by_default() {
        let client = Arc::new(ScriptedRecommender::default());
        let release_old = client.gate("predict:[1]");
        let store = build_store(&client, ResponseOrdering::LastResolvedWins);

        let old = store.set_selected_movies(vec![movie(1, "a")]).await.unwrap();
        let new = store.set_selected_movies(vec![movie(2, "b")]).await.unwrap();
        new.await.unwrap().unwrap();
        assert_eq!(ids(&store.predicted_movies().await), vec![102]);

        release_old.send(vec![movie(101, "old")]).unwrap();
        old.await.unwrap().unwrap();

        assert_eq!(ids(&store.predicted_movies().await), vec![101]);
        assert_eq!(ids(&store.selected_movies().await), vec![2]);
    }

    #[tokio::test]
    async fn test_stale_prediction_discarded_when_latest_issued_wins() {
        let client = Arc::new(ScriptedRecommender::default());
        let release_old = client.gate("predict:[1]");
        let store = build_store(&client, ResponseOrdering::LatestIssuedWins);

        let old = store.set_selected_movies(vec![movie(1, "a")]).await.unwrap();
        let new = store.set_selected_movies(vec![movie(2, "b")]).await.unwrap();
        new.await.unwrap().unwrap();

        release_old.send(vec![movie(101, "old")]).unwrap();
        old.await.unwrap().unwrap();

        assert_eq!(ids(&store.predicted_movies().await), vec![102]);
    }

    #[tokio::test]
    async fn test_stale_prediction_cannot_undo_clear_when_latest_issued_wins() {
        let client = Arc::new(ScriptedRecommender::default());
        let release_old = client.gate("predict:[1]");
        let store = build_store(&client, ResponseOrdering::LatestIssuedWins);

        let old = store.set_selected_movies(vec![movie(1, "a")]).await.unwrap();
        assert!(store.set_selected_movies(Vec::new()).await.is_none());

        release_old.send(vec![movie(101, "old")]).unwrap();
        old.await.unwrap().unwrap();

        assert!(store.predicted_movies().await.is_empty());
    }
}
