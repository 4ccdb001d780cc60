//! Bounded fan-out shared by the enrichment stages.

use std::future::Future;
use std::time::Duration;

use futures::StreamExt;
use futures::stream;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Knobs for one enrichment batch.
///
/// ```
/// use std::time::Duration;
/// use tidings_entity::EnrichOptions;
///
/// let opts = EnrichOptions::default()
///     .with_concurrency(0)
///     .with_deadline(Duration::from_secs(5));
/// assert_eq!(opts.concurrency, 1);
/// assert_eq!(opts.deadline, Some(Duration::from_secs(5)));
/// ```
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Maximum requests in flight. Never below 1.
    pub concurrency: usize,
    /// Cancelling stops new requests and aborts in-flight ones.
    pub cancel: CancellationToken,
    /// Budget for a whole stage, measured from when it starts.
    pub deadline: Option<Duration>,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }
}

impl EnrichOptions {
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

struct Gate {
    cancel: CancellationToken,
    until: Option<Instant>,
}

impl Gate {
    fn new(opts: &EnrichOptions) -> Self {
        Self {
            cancel: opts.cancel.clone(),
            until: opts.deadline.map(|d| Instant::now() + d),
        }
    }

    fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.until.is_some_and(|at| Instant::now() >= at)
    }

    async fn closed(&self) {
        match self.until {
            Some(at) => {
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = tokio::time::sleep_until(at) => {}
                }
            }
            None => self.cancel.cancelled().await,
        }
    }
}

/// Run `work` for every `(index, url)` with at most `opts.concurrency` in
/// flight. Results come back in completion order; `None` marks a URL that was
/// skipped or aborted because the batch was cancelled or ran out of time.
pub(crate) async fn fan_out<T, F, Fut>(
    targets: Vec<(usize, String)>,
    opts: &EnrichOptions,
    work: F,
) -> Vec<(usize, String, Option<T>)>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = T>,
{
    let gate = Gate::new(opts);
    let gate = &gate;
    let work = &work;

    stream::iter(targets)
        .map(|(idx, url)| async move {
            if gate.is_closed() {
                return (idx, url, None);
            }
            tokio::select! {
                biased;
                _ = gate.closed() => (idx, url, None),
                out = work(url.clone()) => (idx, url, Some(out)),
            }
        })
        .buffer_unordered(opts.concurrency.max(1))
        .collect()
        .await
}
