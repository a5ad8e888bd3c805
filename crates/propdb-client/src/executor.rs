//! Last-request-wins query execution.
//!
//! A [`QueryExecutor`] publishes [`QueryResult`] states through a
//! `tokio::sync::watch` channel. Every request takes a generation token under
//! the channel's lock; a completion is published only if its token is still
//! the newest, so an older response can never overwrite a newer one no
//! matter which finishes first.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::ClientError;

/// The observable state of one logical query.
#[derive(Debug, Clone)]
pub enum QueryResult<T> {
    /// No request has been issued yet.
    Idle,
    Loading,
    /// The server answered 404 (detail fetches).
    NotFound,
    Error {
        message: String,
        cause: Arc<ClientError>,
    },
    Success(T),
}

impl<T> QueryResult<T> {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryResult::Loading)
    }

    /// `true` once a request has finished, whatever its outcome.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            QueryResult::NotFound | QueryResult::Error { .. } | QueryResult::Success(_)
        )
    }

    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            QueryResult::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryResult<U> {
        match self {
            QueryResult::Idle => QueryResult::Idle,
            QueryResult::Loading => QueryResult::Loading,
            QueryResult::NotFound => QueryResult::NotFound,
            QueryResult::Error { message, cause } => QueryResult::Error { message, cause },
            QueryResult::Success(value) => QueryResult::Success(f(value)),
        }
    }
}

impl<T> From<Result<T, ClientError>> for QueryResult<T> {
    fn from(outcome: Result<T, ClientError>) -> Self {
        match outcome {
            Ok(value) => QueryResult::Success(value),
            Err(err) if err.is_not_found() => QueryResult::NotFound,
            Err(err) => QueryResult::Error {
                message: err.to_string(),
                cause: Arc::new(err),
            },
        }
    }
}

// Errors compare by message and cause identity; `ClientError` itself has no
// meaningful equality.
impl<T: PartialEq> PartialEq for QueryResult<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (QueryResult::Idle, QueryResult::Idle)
            | (QueryResult::Loading, QueryResult::Loading)
            | (QueryResult::NotFound, QueryResult::NotFound) => true,
            (
                QueryResult::Error { message: a, cause: x },
                QueryResult::Error { message: b, cause: y },
            ) => a == b && Arc::ptr_eq(x, y),
            (QueryResult::Success(a), QueryResult::Success(b)) => a == b,
            _ => false,
        }
    }
}

/// What observers receive: the result plus the generation that produced it.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    pub generation: u64,
    pub result: QueryResult<T>,
}

/// Proof of issuing a request; completions carry it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

struct Inner<T> {
    state: watch::Sender<Snapshot<T>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Cheaply cloneable handle; clones share the same published state.
pub struct QueryExecutor<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for QueryExecutor<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for QueryExecutor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> QueryExecutor<T> {
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(Snapshot {
            generation: 0,
            result: QueryResult::Idle,
        });
        Self {
            inner: Arc::new(Inner {
                state,
                task: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.inner.state.subscribe()
    }

    /// Issue a new generation and publish `Loading`.
    ///
    /// Any completion still carrying an older ticket becomes stale.
    pub fn begin(&self) -> Ticket {
        let mut issued = 0;
        self.inner.state.send_modify(|snapshot| {
            snapshot.generation += 1;
            snapshot.result = QueryResult::Loading;
            issued = snapshot.generation;
        });
        Ticket(issued)
    }

    /// Publish the outcome for `ticket` if it is still the newest request.
    ///
    /// Returns whether the outcome was published.
    pub fn complete(&self, ticket: Ticket, outcome: Result<T, ClientError>) -> bool {
        let published = self.inner.state.send_if_modified(move |snapshot| {
            if snapshot.generation != ticket.0 {
                return false;
            }
            snapshot.result = QueryResult::from(outcome);
            true
        });
        if !published {
            tracing::debug!(
                generation = ticket.0,
                "discarding response from a superseded request"
            );
        }
        published
    }

    /// Run `fetch` to completion in the caller's task.
    ///
    /// Returns whether its outcome was published.
    pub async fn run<F>(&self, fetch: F) -> bool
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        let ticket = self.begin();
        let outcome = fetch.await;
        self.complete(ticket, outcome)
    }
}

impl<T: Clone> QueryExecutor<T> {
    #[must_use]
    pub fn current(&self) -> QueryResult<T> {
        self.inner.state.borrow().result.clone()
    }
}

impl<T: Send + Sync + 'static> QueryExecutor<T> {
    /// Run `fetch` as a background task, superseding any earlier request.
    ///
    /// The superseded task is aborted to save work; its result would be
    /// discarded by the generation check regardless.
    pub fn spawn<F>(&self, fetch: F) -> Ticket
    where
        F: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        let ticket = self.begin();
        let executor = self.clone();
        let handle = tokio::spawn(async move {
            let outcome = fetch.await;
            executor.complete(ticket, outcome);
        });

        let previous = self
            .inner
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
        ticket
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    async fn delayed<T>(ms: u64, outcome: Result<T, ClientError>) -> Result<T, ClientError> {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        outcome
    }

    #[test]
    fn starts_idle() {
        let executor = QueryExecutor::<u32>::new();
        assert_eq!(executor.current(), QueryResult::Idle);
        assert_eq!(executor.subscribe().borrow().generation, 0);
    }

    #[tokio::test]
    async fn run_publishes_loading_then_success() {
        let executor = QueryExecutor::<u32>::new();
        let mut rx = executor.subscribe();

        let ticket = executor.begin();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().result.is_loading());

        assert!(executor.complete(ticket, Ok(7)));
        assert_eq!(rx.borrow_and_update().result, QueryResult::Success(7));
    }

    #[tokio::test]
    async fn not_found_has_its_own_state() {
        let executor = QueryExecutor::<u32>::new();
        executor
            .run(async { Err(ClientError::NotFound("/api/v1/properties/x".to_owned())) })
            .await;
        assert_eq!(executor.current(), QueryResult::NotFound);
    }

    #[tokio::test]
    async fn error_keeps_message_and_cause() {
        let executor = QueryExecutor::<u32>::new();
        executor
            .run(async {
                Err(ClientError::UnexpectedStatus {
                    status: 503,
                    code: "unavailable".to_owned(),
                    message: "down".to_owned(),
                })
            })
            .await;
        match executor.current() {
            QueryResult::Error { message, cause } => {
                assert!(message.contains("503"));
                assert!(matches!(
                    *cause,
                    ClientError::UnexpectedStatus { status: 503, .. }
                ));
            }
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stale_ticket_is_discarded() {
        let executor = QueryExecutor::<&'static str>::new();
        let first = executor.begin();
        let second = executor.begin();

        assert!(executor.complete(second, Ok("second")));
        assert!(!executor.complete(first, Ok("first")));
        assert_eq!(executor.current(), QueryResult::Success("second"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_older_run_cannot_overwrite_newer_run() {
        let executor = QueryExecutor::<&'static str>::new();
        let slow = executor.run(delayed(500, Ok("house")));
        let fast = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            executor.run(delayed(50, Ok("condo"))).await
        };

        let (slow_published, fast_published) = tokio::join!(slow, fast);

        assert!(fast_published);
        assert!(!slow_published);
        assert_eq!(executor.current(), QueryResult::Success("condo"));
    }

    #[tokio::test(start_paused = true)]
    async fn spawn_supersedes_in_flight_task() {
        let executor = QueryExecutor::<&'static str>::new();
        executor.spawn(delayed(500, Ok("house")));
        tokio::time::sleep(Duration::from_millis(100)).await;
        executor.spawn(delayed(50, Ok("condo")));

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(executor.current(), QueryResult::Success("condo"));
        assert_eq!(executor.subscribe().borrow().generation, 2);
    }

    #[test]
    fn map_preserves_non_success_states() {
        let loading: QueryResult<u32> = QueryResult::Loading;
        assert_eq!(loading.map(|v| v * 2), QueryResult::Loading);
        assert_eq!(QueryResult::Success(2).map(|v| v * 2), QueryResult::Success(4));
    }
}
