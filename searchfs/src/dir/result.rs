//! Directory of the files matching one search expression.
//!
//! Cache protocol:
//! - `state` is held across the freshness check *and* the backend call, so at
//!   most one search per directory is in flight. Concurrent callers queue on
//!   the lock and then read the snapshot the first one installed.
//! - A snapshot younger than [`SEARCH_REFRESH_INTERVAL`] is served as is.
//! - A failed search returns the error and leaves the previous snapshot and
//!   its timestamp alone; the next call after expiry tries again.
//! - Nothing is installed until the search succeeded, so a request dropped
//!   mid-search also keeps the old snapshot.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::backend::{SearchBackend, SearchQuery};
use crate::error::{Result, SearchFsError};
use crate::file::ResultFile;
use crate::snapshot::Snapshot;

/// How long a search snapshot is served before the search is re-run.
pub const SEARCH_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// Permission bits of a result directory.
pub const RESULT_DIR_MODE: u16 = 0o555;

#[derive(Default)]
struct CacheState {
    snapshot: Option<Arc<Snapshot>>,
    last_refresh: Option<Instant>,
}

impl CacheState {
    fn fresh(&self, now: Instant) -> Option<&Arc<Snapshot>> {
        let at = self.last_refresh?;
        if now.saturating_duration_since(at) < SEARCH_REFRESH_INTERVAL {
            self.snapshot.as_ref()
        } else {
            None
        }
    }
}

pub struct ResultDir<B> {
    backend: Arc<B>,
    expression: String,
    state: Mutex<CacheState>,
}

impl<B: SearchBackend> ResultDir<B> {
    pub fn new(backend: Arc<B>, expression: impl Into<String>) -> Self {
        Self {
            backend,
            expression: expression.into(),
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Returns the current snapshot, re-running the search first if it is
    /// missing or older than [`SEARCH_REFRESH_INTERVAL`].
    pub async fn refresh(&self) -> Result<Arc<Snapshot>> {
        let mut state = self.state.lock().await;
        if let Some(snapshot) = state.fresh(Instant::now()) {
            debug!("fs.search: {:?} served from cache", self.expression);
            return Ok(Arc::clone(snapshot));
        }

        info!("fs.search: doing search for {:?}", self.expression);
        let query = SearchQuery::describing_content(&self.expression);
        let result = self.backend.query(&query).await.map_err(|e| {
            warn!("fs.search: query {:?} failed: {}", self.expression, e);
            SearchFsError::from(e)
        })?;

        let snapshot = Arc::new(Snapshot::project(&result, SystemTime::now()));
        info!(
            "fs.search: {:?} returning {} entries",
            self.expression,
            snapshot.len()
        );
        state.snapshot = Some(Arc::clone(&snapshot));
        state.last_refresh = Some(Instant::now());
        Ok(snapshot)
    }

    /// Names of the matching items, in search order.
    pub async fn list(&self) -> Result<Vec<String>> {
        Ok(self.refresh().await?.names().to_vec())
    }

    /// The snapshot currently held, without refreshing.
    pub async fn cached(&self) -> Option<Arc<Snapshot>> {
        self.state.lock().await.snapshot.clone()
    }

    /// Resolves `name` against the current snapshot. The search only runs
    /// here when nothing was ever listed; a miss on a populated snapshot is
    /// final.
    pub async fn lookup_name(&self, name: &str) -> Result<ResultFile> {
        let mut state = self.state.lock().await;
        debug!("fs.search: lookup {:?} in {:?}", name, self.expression);
        if state.snapshot.is_none() {
            // refresh() takes the lock itself.
            drop(state);
            self.refresh().await?;
            state = self.state.lock().await;
        }
        let snapshot = state
            .snapshot
            .clone()
            .ok_or_else(|| SearchFsError::NotFound(name.to_string()))?;
        drop(state);

        let Some(file) = snapshot.get(name).cloned() else {
            debug!("fs.search: lookup {:?} = not found", name);
            return Err(SearchFsError::NotFound(name.to_string()));
        };
        debug!("fs.search: lookup {:?} = {}", name, file.blob_ref());

        match self.backend.fetch_schema_meta(file.blob_ref()).await {
            Ok(meta) => debug!(
                "fs.search: {} blob type: {}, size {:?}",
                file.blob_ref(),
                meta.camli_type,
                meta.size
            ),
            Err(e) => debug!("fs.search: couldn't find meta for {}: {}", file.blob_ref(), e),
        }
        Ok(file)
    }
}
