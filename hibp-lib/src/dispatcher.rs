//! Concurrent query dispatcher.
//!
//! The `Dispatcher` executes batches of [`QueryRequest`]s with at most
//! `concurrency` HTTP calls in flight. Each request runs as its own tokio task
//! gated by a semaphore; all tasks share one transport (and so one connection
//! pool). Every failure is recorded on the request it belongs to.

use crate::classify::classify;
use crate::error::HibpError;
use crate::query::QueryBuilder;
use crate::transport::{HttpTransport, Transport};
use crate::types::{BatchResult, DispatchConfig, Outcome, QueryRequest};
use futures::stream::{self, Stream};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Runs breach queries under a bounded worker pool.
///
/// A dispatcher holds no per-batch state, so one instance can serve any
/// number of batches, sequentially or at the same time.
///
/// # Example
///
/// ```rust,no_run
/// use hibp_lib::{Dispatcher, QueryRequest};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let dispatcher = Dispatcher::new()?;
///     let requests = ["adobe", "myspace", "linkedin"]
///         .iter()
///         .map(|name| QueryRequest::for_breach_name(name))
///         .collect();
///
///     let batch = dispatcher.run_all(requests).await;
///     for request in batch.iter() {
///         println!("{:?}: {:?}", request.parameter(), request.outcome());
///     }
///     Ok(())
/// }
/// ```
pub struct Dispatcher<T = HttpTransport> {
    config: DispatchConfig,
    transport: Arc<T>,
}

impl<T> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl Dispatcher<HttpTransport> {
    /// Create a dispatcher with default configuration over HTTP.
    ///
    /// Defaults: concurrency = batch size (max 100), batch timeout 10s,
    /// per-call timeout 5s.
    pub fn new() -> Result<Self, HibpError> {
        Self::with_config(DispatchConfig::default())
    }

    /// Create a dispatcher over HTTP with custom configuration.
    ///
    /// # Example
    ///
    /// ```rust
    /// use hibp_lib::{DispatchConfig, Dispatcher};
    /// use std::time::Duration;
    ///
    /// let config = DispatchConfig::default()
    ///     .with_concurrency(8)
    ///     .with_timeout(Duration::from_secs(30));
    ///
    /// let dispatcher = Dispatcher::with_config(config).unwrap();
    /// assert_eq!(dispatcher.config().concurrency, Some(8));
    /// ```
    pub fn with_config(config: DispatchConfig) -> Result<Self, HibpError> {
        QueryBuilder::new(&config.base_url)?;
        let transport = HttpTransport::from_config(&config)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T> Dispatcher<T>
where
    T: Transport + 'static,
{
    /// Create a dispatcher over a caller-supplied transport.
    pub fn with_transport(config: DispatchConfig, transport: T) -> Self {
        Self {
            config,
            transport: Arc::new(transport),
        }
    }

    /// Get the configuration for this dispatcher.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// A [`QueryBuilder`] rooted at the configured base URL.
    pub fn query_builder(&self) -> Result<QueryBuilder, HibpError> {
        QueryBuilder::new(&self.config.base_url)
    }

    /// Execute a single request on the current task.
    ///
    /// Performs exactly one GET and records the classified outcome. A request
    /// that already has an outcome is returned untouched.
    pub async fn execute(&self, request: QueryRequest) -> QueryRequest {
        execute_with(self.transport.as_ref(), request).await
    }

    /// Execute a batch and wait for it to finish or hit the batch deadline.
    ///
    /// The returned requests are in submission order. Requests still pending
    /// at the deadline are recorded as `TransportError(Timeout)` and their
    /// in-flight calls are cancelled. A timeout too large to represent as
    /// an instant means no deadline.
    pub async fn run_all(&self, requests: Vec<QueryRequest>) -> BatchResult {
        let start = Instant::now();
        let total = requests.len();
        let concurrency = self.config.effective_concurrency(total);
        let batch_timeout = self.config.timeout;
        let deadline = tokio::time::Instant::now().checked_add(batch_timeout);
        let semaphore = Arc::new(Semaphore::new(concurrency));

        info!(total, concurrency, timeout = ?batch_timeout, "Dispatching batch");

        let mut slots = requests;
        let mut workers = JoinSet::new();

        for (index, request) in slots.iter().enumerate() {
            if request.is_complete() {
                continue;
            }
            let worker = run_worker(
                Arc::clone(&self.transport),
                Arc::clone(&semaphore),
                request.clone(),
            );
            workers.spawn(async move { (index, worker.await) });
        }

        let mut timed_out = false;
        let mut worker_failed = false;

        while !workers.is_empty() {
            let next = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, workers.join_next()).await,
                None => Ok(workers.join_next().await),
            };
            match next {
                Ok(Some(Ok((index, request)))) => slots[index] = request,
                Ok(Some(Err(e))) => {
                    warn!(error = %e, "Query worker failed");
                    worker_failed = true;
                }
                Ok(None) => break,
                Err(_) => {
                    timed_out = true;
                    break;
                }
            }
        }

        if timed_out {
            warn!(
                pending = workers.len(),
                timeout = ?batch_timeout,
                "Batch deadline reached, cancelling in-flight queries"
            );
            workers.abort_all();
        }

        for request in slots.iter_mut().filter(|r| !r.is_complete()) {
            let error = if timed_out {
                HibpError::timeout("query batch", batch_timeout)
            } else {
                HibpError::internal("query worker did not complete")
            };
            request.complete(Outcome::TransportError(error));
        }

        let elapsed = start.elapsed();
        info!(total, elapsed = ?elapsed, timed_out, "Batch finished");

        BatchResult {
            requests: slots,
            all_ok: !timed_out && !worker_failed,
            elapsed,
        }
    }

    /// Execute a batch and yield each request as soon as it finishes.
    ///
    /// Items arrive in completion order, each request exactly once. The stream
    /// ends after the last request. Dropping the stream early does not cancel
    /// submitted work: it runs to completion and its results are discarded.
    ///
    /// No batch deadline applies here; per-call timeouts still do.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub fn run_lazy(
        &self,
        requests: Vec<QueryRequest>,
    ) -> impl Stream<Item = QueryRequest> + Send + 'static {
        let total = requests.len();
        let concurrency = self.config.effective_concurrency(total);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let (tx, rx) = mpsc::channel(total.max(1));

        info!(total, concurrency, "Streaming batch");

        for request in requests {
            let worker = run_worker(
                Arc::clone(&self.transport),
                Arc::clone(&semaphore),
                request,
            );
            let tx = tx.clone();
            tokio::spawn(async move {
                let request = worker.await;
                if tx.send(request).await.is_err() {
                    debug!("Result stream dropped, discarding outcome");
                }
            });
        }

        stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|request| (request, rx))
        })
    }
}

/// Wait for a pool slot, then execute the request while holding it.
async fn run_worker<T: Transport>(
    transport: Arc<T>,
    semaphore: Arc<Semaphore>,
    mut request: QueryRequest,
) -> QueryRequest {
    let _permit = match semaphore.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            request.complete(Outcome::TransportError(HibpError::internal(
                "worker pool closed",
            )));
            return request;
        }
    };

    execute_with(transport.as_ref(), request).await
}

async fn execute_with<T: Transport>(transport: &T, mut request: QueryRequest) -> QueryRequest {
    if request.is_complete() {
        return request;
    }

    debug!(kind = %request.kind(), url = request.url(), "Executing query");

    let result = transport.get(request.url()).await;
    let outcome = classify(request.kind(), request.url(), result);

    debug!(
        kind = %request.kind(),
        url = request.url(),
        outcome = outcome.label(),
        "Query finished"
    );

    request.complete(outcome);
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RawResponse;
    use crate::types::QueryKind;
    use crate::QueryBuilder;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers every URL with the same response and counts calls.
    struct FixedTransport {
        response: RawResponse,
        calls: AtomicUsize,
    }

    impl FixedTransport {
        fn new(status: u16, body: &str) -> Self {
            Self {
                response: RawResponse::new(status, body),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Transport for FixedTransport {
        async fn get(&self, _url: &str) -> Result<RawResponse, HibpError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    #[test]
    fn test_execute_classifies_response() {
        let dispatcher = Dispatcher::with_transport(
            DispatchConfig::default(),
            FixedTransport::new(404, ""),
        );
        let req = QueryRequest::for_account("test@example.com").unwrap();

        let req = tokio_test::block_on(dispatcher.execute(req));
        assert!(req.outcome().unwrap().is_not_found());
    }

    #[tokio::test]
    async fn test_execute_does_not_rerun_completed_request() {
        let dispatcher = Dispatcher::with_transport(
            DispatchConfig::default(),
            FixedTransport::new(200, "[]"),
        );

        let req = dispatcher.execute(QueryRequest::for_all_breaches()).await;
        let req = dispatcher.execute(req).await;

        assert_eq!(dispatcher.transport.calls.load(Ordering::SeqCst), 1);
        assert!(req.outcome().unwrap().is_found());
    }

    #[tokio::test]
    async fn test_run_all_empty_batch() {
        let dispatcher = Dispatcher::with_transport(
            DispatchConfig::default(),
            FixedTransport::new(200, "[]"),
        );

        let batch = dispatcher.run_all(Vec::new()).await;
        assert!(batch.requests.is_empty());
        assert!(batch.all_ok);
    }

    #[tokio::test]
    async fn test_run_all_preserves_submission_order() {
        let dispatcher = Dispatcher::with_transport(
            DispatchConfig::default().with_concurrency(3),
            FixedTransport::new(200, "{}"),
        );
        let builder = QueryBuilder::default();
        let names: Vec<String> = (0..12).map(|i| format!("breach{}", i)).collect();
        let requests = names.iter().map(|n| builder.for_breach_name(n)).collect();

        let batch = dispatcher.run_all(requests).await;

        assert!(batch.all_ok);
        let returned: Vec<&str> = batch.iter().filter_map(|r| r.parameter()).collect();
        assert_eq!(returned, names.iter().map(String::as_str).collect::<Vec<_>>());
        assert!(batch
            .iter()
            .all(|r| r.kind() == QueryKind::BreachByName && r.outcome().unwrap().is_found()));
    }

    #[tokio::test]
    async fn test_run_all_with_unrepresentable_timeout_has_no_deadline() {
        let dispatcher = Dispatcher::with_transport(
            DispatchConfig::default().with_timeout(Duration::from_secs(u64::MAX)),
            FixedTransport::new(200, "[]"),
        );

        let batch = dispatcher
            .run_all(vec![QueryRequest::for_all_breaches()])
            .await;

        assert!(batch.all_ok);
        assert_eq!(batch.timed_out(), 0);
        assert!(batch.requests[0].outcome().unwrap().is_found());
    }

    #[test]
    fn test_query_builder_uses_configured_base_url() {
        let config = DispatchConfig::default().with_base_url("http://mirror.test/v2");
        let dispatcher = Dispatcher::with_config(config).unwrap();

        let request = dispatcher.query_builder().unwrap().for_data_classes();
        assert_eq!(request.url(), "http://mirror.test/v2/dataclasses");
    }

    #[test]
    fn test_with_config_rejects_bad_base_url() {
        let config = DispatchConfig::default().with_base_url("mirror.test/v2");
        assert!(Dispatcher::with_config(config).is_err());
    }

    #[tokio::test]
    async fn test_run_lazy_drains_all() {
        use futures::StreamExt;

        let dispatcher = Dispatcher::with_transport(
            DispatchConfig::default().with_concurrency(2),
            FixedTransport::new(200, "[\"Passwords\"]"),
        );
        let requests = (0..4).map(|_| QueryRequest::for_data_classes()).collect();

        let results: Vec<QueryRequest> = dispatcher.run_lazy(requests).collect().await;
        assert_eq!(results.len(), 4);
        for req in results {
            let classes = req.outcome().unwrap().data_classes().unwrap();
            assert_eq!(classes, vec!["Passwords".to_string()]);
        }
    }
}
