//! Single-page analysis: fetch a page, classify its markup version, walk the
//! document once and check every outbound link with a bounded worker pool.

pub mod analyzer;
pub mod checker;
pub mod error;
pub mod fetcher;
pub mod report;
pub mod traverser;
pub mod version;

pub use analyzer::{Analyzer, AnalyzerConfig};
pub use checker::{HttpProbe, LinkCheckerPool, LinkProbe, PoolStats, ProbeCallback};
pub use error::{Result, ScanError};
pub use report::{LinkOutcome, LinkTask, PageFacts, PageReport};
pub use version::HtmlVersion;
