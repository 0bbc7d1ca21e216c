use arc_swap::ArcSwapOption;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::aggregator::{AggregateResult, CategoryAggregator, CategoryRequest};

/// Result of one completed aggregation run, tagged with its run token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrowseSnapshot {
    pub run: u64,
    #[serde(flatten)]
    pub result: AggregateResult,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    Completed(Arc<BrowseSnapshot>),
    /// A newer run started before this one finished; its result was dropped.
    Superseded,
    /// The session was closed while the run was in flight.
    Closed,
}

enum Begin {
    Started(u64, CancellationToken),
    Busy,
    Closed,
}

struct RunGuard<'a> {
    session: &'a BrowseSession,
    run: u64,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        {
            let mut state = self.session.lock_state();
            if state.current_run == self.run {
                state.in_flight = None;
            }
        }
        self.session.settled.notify_waiters();
    }
}

#[derive(Debug, Default)]
struct RunState {
    current_run: u64,
    in_flight: Option<CancellationToken>,
    closed: bool,
}

/// Owns the latest browse snapshot for one consumer.
///
/// Every refresh takes a new, strictly increasing run token and cancels the
/// run it replaces, so a slow earlier run can never overwrite a newer result.
/// Readers go through [`load`](Self::load), which shares the run in flight.
/// After [`close`](Self::close) no snapshot is ever installed again.
pub struct BrowseSession {
    aggregator: CategoryAggregator,
    requests: Vec<CategoryRequest>,
    snapshot: ArcSwapOption<BrowseSnapshot>,
    state: Mutex<RunState>,
    settled: Notify,
}

impl BrowseSession {
    pub fn new(requests: Vec<CategoryRequest>) -> Self {
        Self {
            aggregator: CategoryAggregator::new(),
            requests,
            snapshot: ArcSwapOption::empty(),
            state: Mutex::new(RunState::default()),
            settled: Notify::new(),
        }
    }

    pub fn requests(&self) -> &[CategoryRequest] {
        &self.requests
    }

    pub fn latest(&self) -> Option<Arc<BrowseSnapshot>> {
        self.snapshot.load_full()
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock_state().in_flight.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.lock_state().closed
    }

    /// Start a new run, superseding any run in flight.
    pub async fn refresh(&self) -> RunStatus {
        match self.begin(true) {
            Begin::Started(run, token) => self.execute(run, token).await,
            Begin::Busy => RunStatus::Superseded,
            Begin::Closed => RunStatus::Closed,
        }
    }

    /// The latest snapshot. Without one, waits for the run in flight or
    /// starts a run when none is; never cancels another caller's run.
    pub async fn load(&self) -> RunStatus {
        loop {
            let settled = self.settled.notified();
            tokio::pin!(settled);
            settled.as_mut().enable();

            if let Some(snapshot) = self.latest() {
                return RunStatus::Completed(snapshot);
            }
            match self.begin(false) {
                Begin::Started(run, token) => match self.execute(run, token).await {
                    RunStatus::Superseded => continue,
                    status => return status,
                },
                Begin::Busy => settled.await,
                Begin::Closed => return RunStatus::Closed,
            }
        }
    }

    fn begin(&self, supersede: bool) -> Begin {
        let mut state = self.lock_state();
        if state.closed {
            return Begin::Closed;
        }
        if !supersede && state.in_flight.is_some() {
            return Begin::Busy;
        }
        state.current_run += 1;
        let token = CancellationToken::new();
        if let Some(previous) = state.in_flight.replace(token.clone()) {
            debug!(run = state.current_run - 1, "Cancelling superseded browse run");
            previous.cancel();
        }
        Begin::Started(state.current_run, token)
    }

    async fn execute(&self, run: u64, token: CancellationToken) -> RunStatus {
        // Clears `in_flight` even when this future is dropped mid-run.
        let _guard = RunGuard { session: self, run };

        let result = self
            .aggregator
            .run_until_cancelled(&self.requests, token)
            .await;

        let state = self.lock_state();
        if state.closed {
            return RunStatus::Closed;
        }
        if state.current_run != run {
            debug!(run, current = state.current_run, "Discarding superseded browse run");
            return RunStatus::Superseded;
        }
        let Some(result) = result else {
            return RunStatus::Superseded;
        };

        let snapshot = Arc::new(BrowseSnapshot { run, result });
        self.snapshot.store(Some(snapshot.clone()));
        info!(run, partial = snapshot.result.had_any_failure, "Browse snapshot updated");
        RunStatus::Completed(snapshot)
    }

    /// Tear down: cancel any in-flight run and refuse further updates.
    pub fn close(&self) {
        {
            let mut state = self.lock_state();
            state.closed = true;
            if let Some(token) = state.in_flight.take() {
                token.cancel();
            }
        }
        self.settled.notify_waiters();
    }

    /// Refresh every `interval_secs` until the session is closed or dropped.
    pub fn start_background_refresh(self: Arc<Self>, interval_secs: u64) {
        let weak: Weak<Self> = Arc::downgrade(&self);
        drop(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(interval_secs));
            loop {
                interval.tick().await;
                let Some(session) = weak.upgrade() else {
                    break;
                };
                if session.is_closed() {
                    break;
                }
                info!("Starting background browse refresh");
                if let RunStatus::Closed = session.refresh().await {
                    break;
                }
            }
            debug!("Background browse refresh stopped");
        });
    }

    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for BrowseSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MovieId, MovieSummary};
    use crate::error::ServiceError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    fn movie(id: u64) -> MovieSummary {
        MovieSummary {
            id: MovieId::from(id),
            title: format!("Movie {}", id),
            poster_url: "/placeholder.png".to_string(),
        }
    }

    /// The first call blocks forever after signalling `started`; later calls
    /// return a list holding the call number.
    fn first_call_hangs(started: Arc<Notify>) -> CategoryRequest {
        let calls = Arc::new(AtomicUsize::new(0));
        CategoryRequest::new("trending", "Trending Now", move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            let started = started.clone();
            async move {
                if n == 0 {
                    started.notify_one();
                    futures::future::pending::<()>().await;
                }
                Ok(vec![movie(n as u64)])
            }
        })
    }

    #[tokio::test]
    async fn test_refresh_installs_snapshot() {
        let session = BrowseSession::new(vec![
            CategoryRequest::new("a", "A", || async { Ok(vec![movie(1)]) }),
            CategoryRequest::new("b", "B", || async {
                Err(ServiceError::Upstream { status: 500, message: "oops".to_string() })
            }),
        ]);
        assert!(session.latest().is_none());

        let status = session.refresh().await;
        let RunStatus::Completed(snapshot) = status.clone() else {
            panic!("expected completed run, got {:?}", status);
        };
        assert_eq!(snapshot.run, 1);
        assert!(snapshot.result.had_any_failure);
        assert_eq!(session.latest(), Some(snapshot));
        assert!(!session.is_refreshing());

        let RunStatus::Completed(second) = session.refresh().await else {
            panic!("expected completed run");
        };
        assert_eq!(second.run, 2);
    }

    #[tokio::test]
    async fn test_newer_run_supersedes_older() {
        let started = Arc::new(Notify::new());
        let session = Arc::new(BrowseSession::new(vec![first_call_hangs(started.clone())]));

        let slow = tokio::spawn({
            let session = session.clone();
            async move { session.refresh().await }
        });
        started.notified().await;
        assert!(session.is_refreshing());

        let RunStatus::Completed(snapshot) = session.refresh().await else {
            panic!("expected the newer run to complete");
        };
        assert_eq!(snapshot.run, 2);

        assert_eq!(slow.await.unwrap(), RunStatus::Superseded);
        assert_eq!(session.latest().map(|s| s.run), Some(2));
    }

    #[tokio::test]
    async fn test_close_cancels_in_flight_run() {
        let started = Arc::new(Notify::new());
        let session = Arc::new(BrowseSession::new(vec![first_call_hangs(started.clone())]));

        let pending = tokio::spawn({
            let session = session.clone();
            async move { session.refresh().await }
        });
        started.notified().await;
        session.close();

        assert_eq!(pending.await.unwrap(), RunStatus::Closed);
        assert!(session.latest().is_none());
        assert!(session.is_closed());
        assert_eq!(session.refresh().await, RunStatus::Closed);
    }

    #[tokio::test]
    async fn test_dropped_refresh_clears_in_flight() {
        let started = Arc::new(Notify::new());
        let session = BrowseSession::new(vec![first_call_hangs(started)]);

        let dropped = tokio::time::timeout(Duration::from_millis(20), session.refresh()).await;
        assert!(dropped.is_err());
        assert!(!session.is_refreshing());

        let RunStatus::Completed(snapshot) = session.refresh().await else {
            panic!("expected completed run");
        };
        assert_eq!(snapshot.run, 2);
    }

    #[tokio::test]
    async fn test_load_joins_in_flight_run() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let session = BrowseSession::new(vec![CategoryRequest::new("trending", "Trending Now", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(vec![movie(1)])
            }
        })]);

        let first = session.load();
        let second = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            session.load().await
        };
        let (first, second) = tokio::join!(first, second);

        let (RunStatus::Completed(a), RunStatus::Completed(b)) = (first, second) else {
            panic!("expected both loads to complete");
        };
        assert_eq!(a.run, 1);
        assert_eq!(b.run, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!session.is_refreshing());
    }

    #[tokio::test]
    async fn test_load_takes_over_after_abandoned_run() {
        let started = Arc::new(Notify::new());
        let session = BrowseSession::new(vec![first_call_hangs(started.clone())]);

        let abandoned = async {
            let _ = tokio::time::timeout(Duration::from_millis(50), session.refresh()).await;
        };
        let waiter = async {
            started.notified().await;
            session.load().await
        };
        let ((), status) = tokio::join!(abandoned, waiter);

        let RunStatus::Completed(snapshot) = status else {
            panic!("expected load to start its own run, got {:?}", status);
        };
        assert_eq!(snapshot.run, 2);
    }

    #[tokio::test]
    async fn test_background_refresh_does_not_keep_session_alive() {
        let session = Arc::new(BrowseSession::new(vec![CategoryRequest::new("a", "A", || async {
            Ok(vec![movie(1)])
        })]));
        let weak = Arc::downgrade(&session);

        session.clone().start_background_refresh(3600);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(session.latest().map(|s| s.run), Some(1));

        drop(session);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(weak.upgrade().is_none());
    }
}
