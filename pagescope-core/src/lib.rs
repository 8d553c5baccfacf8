pub mod analysis;
pub mod config;
pub mod metrics;
pub mod report;

pub use analysis::AnalysisService;
pub use config::{ConfigError, LogFormat, ServiceConfig};
pub use metrics::Metrics;
