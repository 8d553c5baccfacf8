// Prometheus metrics for the analysis service

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

const NAMESPACE: &str = "web_analyzer";

pub struct Metrics {
    registry: Registry,
    pub requests_total: IntCounterVec,
    pub links_processed_total: IntCounter,
    pub broken_links_total: IntCounter,
    pub analysis_duration_seconds: Histogram,
    pub http_response_codes_total: IntCounterVec,
    pub active_requests: IntGauge,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("requests_total", "Total number of analysis requests by outcome")
                .namespace(NAMESPACE),
            &["status"],
        )?;
        let links_processed_total = IntCounter::with_opts(
            Opts::new("links_processed_total", "Total number of links checked").namespace(NAMESPACE),
        )?;
        let broken_links_total = IntCounter::with_opts(
            Opts::new("broken_links_total", "Total number of broken links found")
                .namespace(NAMESPACE),
        )?;
        let analysis_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "analysis_duration_seconds",
                "Time spent analysing a page, in seconds",
            )
            .namespace(NAMESPACE),
        )?;
        let http_response_codes_total = IntCounterVec::new(
            Opts::new(
                "http_response_codes_total",
                "Response codes returned by checked links",
            )
            .namespace(NAMESPACE),
            &["code"],
        )?;
        let active_requests = IntGauge::with_opts(
            Opts::new("active_requests", "Number of analyses in flight").namespace(NAMESPACE),
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(links_processed_total.clone()))?;
        registry.register(Box::new(broken_links_total.clone()))?;
        registry.register(Box::new(analysis_duration_seconds.clone()))?;
        registry.register(Box::new(http_response_codes_total.clone()))?;
        registry.register(Box::new(active_requests.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            links_processed_total,
            broken_links_total,
            analysis_duration_seconds,
            http_response_codes_total,
            active_requests,
        })
    }

    pub fn record_request(&self, status: &str) {
        self.requests_total.with_label_values(&[status]).inc();
    }

    /// Count one checked link; `code` is `None` for transport failures.
    pub fn record_link(&self, code: Option<u16>, broken: bool) {
        self.links_processed_total.inc();
        let label = code.map_or_else(|| "error".to_string(), |c| c.to_string());
        self.http_response_codes_total
            .with_label_values(&[label.as_str()])
            .inc();
        if broken {
            self.broken_links_total.inc();
        }
    }

    pub fn track_active(&self) -> ActiveRequestGuard {
        ActiveRequestGuard::new(self.active_requests.clone())
    }

    /// Render every registered metric in the text exposition format.
    pub fn gather_text(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Holds the active-requests gauge up for as long as it lives.
pub struct ActiveRequestGuard {
    gauge: IntGauge,
}

impl ActiveRequestGuard {
    fn new(gauge: IntGauge) -> Self {
        gauge.inc();
        Self { gauge }
    }
}

impl Drop for ActiveRequestGuard {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}
