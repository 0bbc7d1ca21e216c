use futures::future::{join_all, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::MovieSummary;
use crate::error::ServiceResult;

pub type FetchFuture = BoxFuture<'static, ServiceResult<Vec<MovieSummary>>>;
type FetchFn = dyn Fn() -> FetchFuture + Send + Sync;

/// One row of the browse page: a stable key, a title and the call that
/// produces its movies.
#[derive(Clone)]
pub struct CategoryRequest {
    pub key: String,
    pub display_name: String,
    fetch: Arc<FetchFn>,
}

impl CategoryRequest {
    pub fn new<F, Fut>(key: impl Into<String>, display_name: impl Into<String>, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServiceResult<Vec<MovieSummary>>> + Send + 'static,
    {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            fetch: Arc::new(move || fetch().boxed()),
        }
    }

    pub fn fetch(&self) -> FetchFuture {
        (self.fetch)()
    }
}

impl fmt::Debug for CategoryRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CategoryRequest")
            .field("key", &self.key)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CategoryOutcome {
    Success {
        key: String,
        #[serde(rename = "displayName")]
        display_name: String,
        movies: Vec<MovieSummary>,
    },
    Failure {
        key: String,
        #[serde(rename = "displayName")]
        display_name: String,
        #[serde(rename = "errorMessage")]
        error_message: String,
    },
}

impl CategoryOutcome {
    pub fn key(&self) -> &str {
        match self {
            CategoryOutcome::Success { key, .. } | CategoryOutcome::Failure { key, .. } => key,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            CategoryOutcome::Success { display_name, .. }
            | CategoryOutcome::Failure { display_name, .. } => display_name,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, CategoryOutcome::Failure { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    /// One outcome per request, in request order.
    pub outcomes: Vec<CategoryOutcome>,
    #[serde(rename = "hadAnyFailure")]
    pub had_any_failure: bool,
}

impl AggregateResult {
    pub fn new(outcomes: Vec<CategoryOutcome>) -> Self {
        let had_any_failure = outcomes.iter().any(CategoryOutcome::is_failure);
        Self {
            outcomes,
            had_any_failure,
        }
    }

    /// First outcome with `key`. Duplicate keys are all kept in `outcomes`.
    pub fn get(&self, key: &str) -> Option<&CategoryOutcome> {
        self.outcomes.iter().find(|o| o.key() == key)
    }
}

/// Runs every category fetch concurrently and collects each outcome
/// independently. A failing category never fails the run.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryAggregator;

impl CategoryAggregator {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(&self, requests: &[CategoryRequest]) -> AggregateResult {
        let started = Instant::now();

        let fetches = requests.iter().map(|request| async move {
            match request.fetch().await {
                Ok(movies) => {
                    debug!(category = %request.key, count = movies.len(), "Category loaded");
                    CategoryOutcome::Success {
                        key: request.key.clone(),
                        display_name: request.display_name.clone(),
                        movies,
                    }
                }
                Err(e) => {
                    warn!(category = %request.key, "Failed to fetch category: {}", e);
                    CategoryOutcome::Failure {
                        key: request.key.clone(),
                        display_name: request.display_name.clone(),
                        error_message: e.to_string(),
                    }
                }
            }
        });

        // join_all yields results in input order, whatever order they settle in.
        let result = AggregateResult::new(join_all(fetches).await);

        info!(
            categories = result.outcomes.len(),
            failed = result.outcomes.iter().filter(|o| o.is_failure()).count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Aggregation run finished"
        );
        result
    }

    /// Like [`run`](Self::run), but gives up and returns `None` once `token`
    /// is cancelled. In-flight fetches are dropped.
    pub async fn run_until_cancelled(
        &self,
        requests: &[CategoryRequest],
        token: CancellationToken,
    ) -> Option<AggregateResult> {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("Aggregation run cancelled");
                None
            }
            result = self.run(requests) => Some(result),
        }
    }
}
