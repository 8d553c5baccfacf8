use crate::error::Result;
use crate::report::{LinkOutcome, LinkTask, PageReport};
use futures::future::join_all;
use reqwest::Client;
use reqwest::redirect::Policy;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

pub type ProbeCallback = Arc<dyn Fn(&str, &LinkOutcome) + Send + Sync>;

/// Liveness check for a single canonical URL.
pub trait LinkProbe: Send + Sync + 'static {
    fn probe(&self, url: &str) -> impl Future<Output = LinkOutcome> + Send;
}

/// HEAD-request probe used in production.
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration, max_redirects: usize, user_agent: &str) -> Result<Self> {
        // Past the cap the last response is kept as the outcome.
        let policy = Policy::custom(move |attempt| {
            if attempt.previous().len() >= max_redirects {
                attempt.stop()
            } else {
                attempt.follow()
            }
        });

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .pool_max_idle_per_host(50)
            .redirect(policy)
            .build()?;

        Ok(Self { client })
    }
}

impl LinkProbe for HttpProbe {
    async fn probe(&self, url: &str) -> LinkOutcome {
        match self.client.head(url).send().await {
            Ok(response) => {
                let status = response.status();
                if status.as_u16() >= 400 {
                    LinkOutcome::Status(status)
                } else {
                    LinkOutcome::Ok(status)
                }
            }
            Err(e) => {
                debug!("Error checking link {}: {}", url, e);
                LinkOutcome::Error(e.to_string())
            }
        }
    }
}

/// Dedup key for a link: parsed, fragment removed, re-serialized.
pub fn canonicalize(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}

/// Two workers per available core.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        * 2
}

fn is_probeable(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// URLs already claimed by a worker during one pool run.
#[derive(Default)]
struct SeenLinks {
    inner: Mutex<HashSet<String>>,
}

impl SeenLinks {
    /// True for the first caller with a given URL.
    async fn claim(&self, url: &str) -> bool {
        self.inner.lock().await.insert(url.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Tasks taken off the stream.
    pub received: usize,
    /// Distinct http(s) URLs whose outcome was recorded.
    pub probed: usize,
    pub duplicates: usize,
    /// Distinct URLs with a non-http(s) scheme.
    pub skipped: usize,
}

impl PoolStats {
    fn merge(mut self, other: PoolStats) -> Self {
        self.received += other.received;
        self.probed += other.probed;
        self.duplicates += other.duplicates;
        self.skipped += other.skipped;
        self
    }
}

pub struct LinkCheckerPool<P: LinkProbe> {
    probe: Arc<P>,
    workers: usize,
    probe_callback: Option<ProbeCallback>,
}

impl<P: LinkProbe> LinkCheckerPool<P> {
    pub fn new(probe: Arc<P>, workers: usize) -> Self {
        Self {
            probe,
            workers: workers.max(1),
            probe_callback: None,
        }
    }

    pub fn with_probe_callback(mut self, callback: ProbeCallback) -> Self {
        self.probe_callback = Some(callback);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Drain `rx` with the configured number of workers.
    ///
    /// Returns once the stream is closed and empty, or once `cancel` fires;
    /// tasks still queued at cancellation are left unconsumed.
    pub async fn run(
        &self,
        rx: mpsc::Receiver<LinkTask>,
        report: Arc<Mutex<PageReport>>,
        cancel: CancellationToken,
    ) -> PoolStats {
        let rx = Arc::new(Mutex::new(rx));
        let seen = Arc::new(SeenLinks::default());
        let mut worker_handles = Vec::with_capacity(self.workers);

        for worker_id in 0..self.workers {
            let rx = rx.clone();
            let seen = seen.clone();
            let report = report.clone();
            let cancel = cancel.clone();
            let probe = self.probe.clone();
            let callback = self.probe_callback.clone();

            let handle = tokio::spawn(async move {
                debug!("Worker {} started", worker_id);
                let mut stats = PoolStats::default();

                loop {
                    let next = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        next = async { rx.lock().await.recv().await } => next,
                    };
                    let Some(task) = next else {
                        break;
                    };
                    stats.received += 1;

                    let url = canonicalize(&task.url);
                    if !seen.claim(&url).await {
                        stats.duplicates += 1;
                        continue;
                    }

                    if !is_probeable(&url) {
                        debug!("[Worker {}] Skipping non-http link {}", worker_id, url);
                        stats.skipped += 1;
                        continue;
                    }

                    let outcome = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        outcome = probe.probe(&url) => outcome,
                    };

                    debug!("[Worker {}] {} -> {}", worker_id, url, outcome);
                    report.lock().await.record_outcome(&url, &outcome);
                    stats.probed += 1;

                    if let Some(ref callback) = callback {
                        callback(&url, &outcome);
                    }
                }

                debug!("Worker {} finished", worker_id);
                stats
            });

            worker_handles.push(handle);
        }

        let mut total = PoolStats::default();
        for joined in join_all(worker_handles).await {
            match joined {
                Ok(stats) => total = total.merge(stats),
                Err(e) => warn!("Link worker failed: {}", e),
            }
        }
        total
    }
}
