use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Aggregated result of analysing one page.
///
/// Traverser-owned fields arrive in one piece through [`PageReport::apply_facts`];
/// link outcomes arrive one at a time from pool workers through
/// [`PageReport::record_outcome`] while the report sits behind a lock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageReport {
    pub html_version: String,
    pub title: String,
    pub headings: BTreeMap<String, usize>,
    pub internal_links: usize,
    pub external_links: usize,
    pub broken_links: usize,
    pub has_login_form: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links_status: BTreeMap<String, String>,
    /// Wall-clock milliseconds from request start to finished report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_duration: Option<u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta_tags: BTreeMap<String, String>,
}

impl PageReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_facts(&mut self, facts: PageFacts) {
        self.title = facts.title.unwrap_or_default();
        self.headings = facts.headings;
        self.internal_links = facts.internal_links;
        self.external_links = facts.external_links;
        self.has_login_form = facts.has_login_form;
        self.meta_tags = facts.meta_tags;
    }

    pub fn record_outcome(&mut self, url: &str, outcome: &LinkOutcome) {
        if outcome.is_broken() {
            self.broken_links += 1;
        }
        self.links_status.insert(url.to_string(), outcome.to_string());
    }

    pub fn total_links(&self) -> usize {
        self.internal_links + self.external_links
    }
}

/// Structural facts gathered by a single traversal of the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageFacts {
    pub title: Option<String>,
    pub headings: BTreeMap<String, usize>,
    pub internal_links: usize,
    pub external_links: usize,
    pub has_login_form: bool,
    pub meta_tags: BTreeMap<String, String>,
}

/// One `<a href>` occurrence on the page, resolved against the page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTask {
    pub url: String,
    pub is_external: bool,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Any response below 400; the code is kept for metrics.
    Ok(StatusCode),
    Status(StatusCode),
    Error(String),
}

impl LinkOutcome {
    pub fn is_broken(&self) -> bool {
        match self {
            LinkOutcome::Ok(_) => false,
            LinkOutcome::Status(status) => status.as_u16() >= 400,
            LinkOutcome::Error(_) => true,
        }
    }

    /// Response code for metrics; `None` for transport failures.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            LinkOutcome::Ok(status) | LinkOutcome::Status(status) => Some(status.as_u16()),
            LinkOutcome::Error(_) => None,
        }
    }
}

impl fmt::Display for LinkOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkOutcome::Ok(_) => write!(f, "OK"),
            LinkOutcome::Status(status) => write!(f, "Status: {}", status),
            LinkOutcome::Error(message) => write!(f, "Error: {}", message),
        }
    }
}
