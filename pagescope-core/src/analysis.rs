use crate::metrics::Metrics;
use pagescope_scanner::{Analyzer, AnalyzerConfig, LinkOutcome, PageReport, ProbeCallback, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Analyzer plus metrics accounting; shared by every request.
pub struct AnalysisService {
    analyzer: Analyzer,
    metrics: Arc<Metrics>,
}

impl AnalysisService {
    pub fn new(config: AnalyzerConfig, metrics: Arc<Metrics>) -> Result<Self> {
        let link_metrics = metrics.clone();
        let callback: ProbeCallback = Arc::new(move |_url: &str, outcome: &LinkOutcome| {
            link_metrics.record_link(outcome.status_code(), outcome.is_broken());
        });

        let analyzer = Analyzer::new(config)?.with_probe_callback(callback);

        Ok(Self { analyzer, metrics })
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub async fn execute_analysis(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<PageReport> {
        let _active = self.metrics.track_active();
        let start = Instant::now();

        let result = self.analyzer.analyze(url, cancel).await;

        self.metrics
            .analysis_duration_seconds
            .observe(start.elapsed().as_secs_f64());

        match &result {
            Ok(report) => {
                self.metrics.record_request("success");
                info!(
                    "Analyzed {}: {} ({} internal, {} external, {} broken)",
                    url,
                    report.html_version,
                    report.internal_links,
                    report.external_links,
                    report.broken_links
                );
            }
            Err(e) => self.metrics.record_request(e.outcome_label()),
        }

        result
    }
}
