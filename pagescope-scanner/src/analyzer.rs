use crate::checker::{HttpProbe, LinkCheckerPool, LinkProbe, ProbeCallback, default_workers};
use crate::error::{Result, ScanError};
use crate::fetcher::{Fetcher, validate_target};
use crate::report::PageReport;
use crate::traverser::spawn_traversal;
use crate::version::detect_page_version;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Deadline for one whole analysis.
    pub analysis_timeout: Duration,
    pub fetch_timeout: Duration,
    pub probe_timeout: Duration,
    pub max_redirects: usize,
    pub workers: usize,
    /// Capacity of the link stream between traverser and pool.
    pub link_buffer: usize,
    pub user_agent: String,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            analysis_timeout: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(5),
            max_redirects: 10,
            workers: default_workers(),
            link_buffer: 100,
            user_agent: format!("pagescope/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Runs the fetch, traverse and link-check pipeline for one page at a time.
///
/// An `Analyzer` holds no per-analysis state and can serve concurrent calls
/// to [`Analyzer::analyze`].
pub struct Analyzer<P: LinkProbe = HttpProbe> {
    config: AnalyzerConfig,
    fetcher: Fetcher,
    pool: LinkCheckerPool<P>,
}

impl Analyzer<HttpProbe> {
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        let probe = HttpProbe::new(
            config.probe_timeout,
            config.max_redirects,
            &config.user_agent,
        )?;
        Self::with_probe(config, probe)
    }
}

impl<P: LinkProbe> Analyzer<P> {
    pub fn with_probe(config: AnalyzerConfig, probe: P) -> Result<Self> {
        let fetcher = Fetcher::new(config.fetch_timeout, &config.user_agent)?;
        let pool = LinkCheckerPool::new(Arc::new(probe), config.workers);

        Ok(Self {
            config,
            fetcher,
            pool,
        })
    }

    pub fn with_probe_callback(mut self, callback: ProbeCallback) -> Self {
        self.pool = self.pool.with_probe_callback(callback);
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyse `target` and return the finished report.
    ///
    /// Cancelling `cancel`, or hitting the analysis deadline, stops all
    /// outstanding work and discards whatever was gathered so far.
    pub async fn analyze(&self, target: &str, cancel: &CancellationToken) -> Result<PageReport> {
        let start = Instant::now();
        let url = validate_target(target)?;

        info!(
            "Starting analysis of {} with {} workers",
            url,
            self.pool.workers()
        );

        // Every exit path below cancels the pipeline's workers.
        let token = cancel.child_token();
        let _guard = token.clone().drop_guard();

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ScanError::Cancelled),
            _ = tokio::time::sleep(self.config.analysis_timeout) => {
                Err(ScanError::TimedOut(self.config.analysis_timeout))
            }
            result = self.run_pipeline(url.clone(), token.clone()) => result,
        };

        match outcome {
            Ok(mut report) => {
                report.analysis_duration = Some(start.elapsed().as_millis() as u64);
                info!(
                    "Analysis of {} complete: {} links, {} broken, {:?}",
                    url,
                    report.total_links(),
                    report.broken_links,
                    start.elapsed()
                );
                Ok(report)
            }
            Err(e) => {
                warn!("Analysis of {} failed: {}", url, e);
                Err(e)
            }
        }
    }

    async fn run_pipeline(&self, url: Url, token: CancellationToken) -> Result<PageReport> {
        let page = self.fetcher.fetch(&url).await?;

        let decoded = match page.decoded_body() {
            Ok(body) => Some(body),
            Err(e) => {
                debug!("Could not decode body of {}: {}", page.final_url, e);
                None
            }
        };

        let version_task = {
            let decoded = decoded.clone();
            let content_type = page.content_type.clone();
            tokio::task::spawn_blocking(move || {
                detect_page_version(decoded.as_deref(), content_type.as_deref())
            })
        };

        // An undecodable body is still traversed as sent.
        let body = decoded.unwrap_or_else(|| page.body.clone());
        let (tx, rx) = mpsc::channel(self.config.link_buffer.max(1));
        let traversal = spawn_traversal(body, url.clone(), tx);

        let report = Arc::new(Mutex::new(PageReport::new()));
        let stats = self.pool.run(rx, report.clone(), token.clone()).await;
        debug!(
            "Link pool for {} finished: {} received, {} probed, {} duplicates, {} skipped",
            url, stats.received, stats.probed, stats.duplicates, stats.skipped
        );

        let facts = traversal
            .await
            .map_err(|e| ScanError::ParseFailed(e.to_string()))?;
        let version = version_task
            .await
            .map_err(|e| ScanError::ParseFailed(e.to_string()))?;

        if token.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        let mut report = report.lock().await.clone();
        report.apply_facts(facts);
        report.html_version = version.label().to_string();
        report.page_size_bytes = Some(page.page_size());
        report.load_time_ms = Some(page.elapsed.as_millis() as u64);

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::LinkOutcome;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn test_config() -> AnalyzerConfig {
        AnalyzerConfig {
            workers: 4,
            user_agent: "pagescope-test".to_string(),
            ..Default::default()
        }
    }

    /// Probe that never completes on its own.
    struct StalledProbe;

    impl LinkProbe for StalledProbe {
        async fn probe(&self, _url: &str) -> LinkOutcome {
            std::future::pending().await
        }
    }

    async fn mount_page(mock_server: &MockServer, route: &str, html: String) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_string(html),
            )
            .mount(mock_server)
            .await;
    }

    #[tokio::test]
    async fn test_analyze_full_report() {
        let mock_server = MockServer::start().await;
        let html = format!(
            r#"<!DOCTYPE html>
            <html>
            <head>
                <title>Test Page</title>
                <meta name="description" content="A test page">
            </head>
            <body>
                <h1>Main</h1>
                <h2>Sub</h2>
                <h2>Sub again</h2>
                <a href="/ok">ok</a>
                <a href="/ok#frag">ok again</a>
                <a href="{uri}/missing">missing</a>
                <a href="mailto:someone@example.com">mail</a>
                <form action="/login"><input type="password" name="pw"></form>
            </body>
            </html>"#,
            uri = mock_server.uri()
        );
        mount_page(&mock_server, "/", html).await;
        Mock::given(method("HEAD"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let analyzer = Analyzer::new(test_config()).unwrap();
        let report = analyzer
            .analyze(&mock_server.uri(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.html_version, "HTML5");
        assert_eq!(report.title, "Test Page");
        assert_eq!(report.headings.get("h1"), Some(&1));
        assert_eq!(report.headings.get("h2"), Some(&2));
        assert_eq!(report.internal_links, 4);
        assert_eq!(report.external_links, 0);
        assert_eq!(report.broken_links, 1);
        assert!(report.has_login_form);
        assert_eq!(report.meta_tags["description"], "A test page");
        assert_eq!(report.links_status.len(), 2);
        assert_eq!(
            report.links_status[&format!("{}/missing", mock_server.uri())],
            "Status: 404 Not Found"
        );
        assert!(report.page_size_bytes.unwrap() > 0);
        assert!(report.load_time_ms.is_some());
        assert!(report.analysis_duration.is_some());
    }

    #[tokio::test]
    async fn test_analyze_invalid_url_makes_no_requests() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let analyzer = Analyzer::new(test_config()).unwrap();
        let err = analyzer
            .analyze("not-a-valid-url", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::InvalidUrl(_)));
        assert_eq!(err.outcome_label(), "invalid");
    }

    #[tokio::test]
    async fn test_analyze_bad_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let analyzer = Analyzer::new(test_config()).unwrap();
        let err = analyzer
            .analyze(&mock_server.uri(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::BadStatus(500)));
    }

    #[tokio::test]
    async fn test_analyze_cancelled_while_probing() {
        let mock_server = MockServer::start().await;
        mount_page(
            &mock_server,
            "/",
            r#"<html><a href="/a">a</a><a href="/b">b</a></html>"#.to_string(),
        )
        .await;

        let analyzer = Analyzer::with_probe(test_config(), StalledProbe).unwrap();
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            canceller.cancel();
        });

        let err = analyzer
            .analyze(&mock_server.uri(), &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancellation());
        assert_eq!(err.outcome_label(), "cancelled");
    }

    #[tokio::test]
    async fn test_analyze_deadline() {
        let mock_server = MockServer::start().await;
        mount_page(
            &mock_server,
            "/",
            r#"<html><a href="/slow">slow</a></html>"#.to_string(),
        )
        .await;

        let config = AnalyzerConfig {
            analysis_timeout: Duration::from_millis(300),
            ..test_config()
        };
        let analyzer = Analyzer::with_probe(config, StalledProbe).unwrap();
        let err = analyzer
            .analyze(&mock_server.uri(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::TimedOut(_)));
        assert!(!err.is_cancellation());
    }

    #[tokio::test]
    async fn test_probe_callback_and_gzip_page() {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use std::io::Write;

        let mock_server = MockServer::start().await;
        let html = br#"<!DOCTYPE html><html><head><title>Zipped</title></head>
            <body><a href="https://external.invalid/">x</a></body></html>"#;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(html).unwrap();
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .insert_header("content-encoding", "gzip")
                    .set_body_bytes(encoder.finish().unwrap()),
            )
            .mount(&mock_server)
            .await;

        struct ErrorProbe;
        impl LinkProbe for ErrorProbe {
            async fn probe(&self, _url: &str) -> LinkOutcome {
                LinkOutcome::Error("dns error".to_string())
            }
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let analyzer = Analyzer::with_probe(test_config(), ErrorProbe)
            .unwrap()
            .with_probe_callback(Arc::new(move |_url: &str, _outcome: &LinkOutcome| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            }));

        let report = analyzer
            .analyze(&mock_server.uri(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.html_version, "HTML5");
        assert_eq!(report.title, "Zipped");
        assert_eq!(report.external_links, 1);
        assert_eq!(report.broken_links, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_corrupt_gzip_still_traversed() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .insert_header("content-encoding", "gzip")
                    .set_body_string("<html><title>Plain</title></html>"),
            )
            .mount(&mock_server)
            .await;

        let analyzer = Analyzer::with_probe(test_config(), StalledProbe).unwrap();
        let report = analyzer
            .analyze(&mock_server.uri(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.html_version, "Unknown (gzip decoding error)");
        assert_eq!(report.title, "Plain");
        assert_eq!(report.broken_links, 0);
    }

    #[tokio::test]
    async fn test_zero_link_buffer_still_streams() {
        let mock_server = MockServer::start().await;
        let links: String = (0..20)
            .map(|i| format!(r#"<a href="https://site{}.test/">{}</a>"#, i, i))
            .collect();
        mount_page(
            &mock_server,
            "/",
            format!("<html><body>{}</body></html>", links),
        )
        .await;

        struct HealthyProbe;
        impl LinkProbe for HealthyProbe {
            async fn probe(&self, _url: &str) -> LinkOutcome {
                LinkOutcome::Ok(reqwest::StatusCode::OK)
            }
        }

        let config = AnalyzerConfig {
            link_buffer: 0,
            ..test_config()
        };
        let analyzer = Analyzer::with_probe(config, HealthyProbe).unwrap();
        let report = analyzer
            .analyze(&mock_server.uri(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.external_links, 20);
        assert_eq!(report.links_status.len(), 20);
        assert_eq!(report.broken_links, 0);
    }
}
