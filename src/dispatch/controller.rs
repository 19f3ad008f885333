//! Fan-out controller
//!
//! Runs every requested lookup concurrently and folds the outcomes into one
//! [`AggregatedResponse`].

use super::response::{AggregatedResponse, ResourceResult, ResponseBuilder};
use crate::resource::{HandlerRegistry, ResourceRequest};
use futures::future::{join_all, BoxFuture, FutureExt};
use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tracing::Instrument;
use uuid::Uuid;

pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_CONCURRENT_LOOKUPS: usize = 8;

/// A lookup that has been planned but not yet started
struct PendingLookup {
    name: String,
    task: BoxFuture<'static, ResourceResult>,
}

/// Spawned lookups of one dispatch; aborted when the dispatch goes away
struct RunningLookups(Vec<JoinHandle<ResourceResult>>);

impl Drop for RunningLookups {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

#[derive(Clone)]
pub struct FanOutController {
    registry: Arc<HandlerRegistry>,
    permits: Arc<Semaphore>,
    lookup_timeout: Duration,
}

impl FanOutController {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self::with_limits(registry, DEFAULT_LOOKUP_TIMEOUT, DEFAULT_MAX_CONCURRENT_LOOKUPS)
    }

    /// `max_concurrent` is clamped to at least one running lookup
    pub fn with_limits(registry: HandlerRegistry, lookup_timeout: Duration, max_concurrent: usize) -> Self {
        Self {
            registry: Arc::new(registry),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            lookup_timeout,
        }
    }

    /// Run the named lookups against `params` and aggregate their outcomes.
    ///
    /// Unknown names are skipped without an error entry. Results keep the
    /// order of `names`; a failure message already reported by an earlier
    /// resource is not repeated. Each lookup gets `lookup_timeout` from the
    /// moment it is started, waiting for a free slot included. Dropping the
    /// returned future aborts the lookups still running.
    pub async fn dispatch<S: AsRef<str>>(&self, names: &[S], params: ResourceRequest) -> AggregatedResponse {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("dispatch", %request_id);

        async move {
            let started_at = Instant::now();
            let pending = self.plan(names, Arc::new(params));
            let planned = pending.len();

            // All tasks exist before any of them is spawned
            let (resolved, handles): (Vec<String>, Vec<_>) = pending
                .into_iter()
                .map(|lookup| (lookup.name, tokio::spawn(lookup.task)))
                .unzip();
            let mut running = RunningLookups(handles);

            let outcomes = join_all(running.0.iter_mut()).await;

            let mut builder = ResponseBuilder::new();
            for (name, outcome) in resolved.iter().zip(outcomes) {
                let result = outcome.unwrap_or_else(|e| ResourceResult::Failure(join_failure(name, e)));
                if let ResourceResult::Failure(message) = &result {
                    tracing::warn!(resource = %name, "Lookup failed: {}", message);
                }
                if !builder.record(name, result) {
                    tracing::debug!(resource = %name, "Duplicate failure message suppressed");
                }
            }

            let response = builder.finish();
            tracing::info!(
                lookups = planned,
                failures = response.errors.len(),
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                "Dispatch complete"
            );
            response
        }
        .instrument(span)
        .await
    }

    /// Resolve names and build one not-yet-running task per distinct resource
    fn plan<S: AsRef<str>>(&self, names: &[S], params: Arc<ResourceRequest>) -> Vec<PendingLookup> {
        let mut seen = HashSet::new();
        let mut pending = Vec::with_capacity(names.len());

        for requested in names {
            let requested = requested.as_ref();
            let Some((name, handler)) = self.registry.resolve(requested) else {
                tracing::debug!(resource = %requested, "Ignoring unknown resource");
                continue;
            };
            if !seen.insert(name.to_ascii_lowercase()) {
                continue;
            }

            let name = name.to_string();
            let params = Arc::clone(&params);
            let permits = Arc::clone(&self.permits);
            let timeout = self.lookup_timeout;
            let task_name = name.clone();

            let task = async move {
                let lookup = async {
                    match permits.acquire_owned().await {
                        Ok(_permit) => handler.handle(&params).await,
                        Err(_) => Err(anyhow::anyhow!("{} lookup was not scheduled", task_name)),
                    }
                };

                match tokio::time::timeout(timeout, lookup).await {
                    Ok(Ok(items)) => ResourceResult::Success(items),
                    Ok(Err(e)) => ResourceResult::Failure(format!("{:#}", e)),
                    Err(_) => ResourceResult::Failure(format!(
                        "{} lookup timed out after {:?}",
                        task_name, timeout
                    )),
                }
            }
            .boxed();

            pending.push(PendingLookup { name, task });
        }

        pending
    }
}

fn join_failure(name: &str, error: JoinError) -> String {
    if error.is_panic() {
        match panic_message(error.into_panic()) {
            Some(message) => format!("{} lookup failed: {}", name, message),
            None => format!("{} lookup failed unexpectedly", name),
        }
    } else {
        format!("{} lookup was cancelled", name)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> Option<String> {
    match payload.downcast::<String>() {
        Ok(message) => Some(*message),
        Err(payload) => payload.downcast_ref::<&str>().map(|s| s.to_string()),
    }
}
