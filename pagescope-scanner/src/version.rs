//! Markup version detection from the document prologue.
//!
//! Only the first [`SNIFF_LEN`] bytes of the decoded body are inspected.
//! Doctype rules are tried in a fixed order and the first match wins; when
//! no doctype matches, the content type and finally raw tag presence are
//! used as fallbacks.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

pub const SNIFF_LEN: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlVersion {
    Html5,
    Html401Strict,
    Html401Transitional,
    Html401Frameset,
    Xhtml10Strict,
    Xhtml10Transitional,
    Xhtml10Frameset,
    Xhtml11,
    XhtmlByContentType,
    NonStandardDoctype,
    NoDoctype,
    Unknown,
    DecodeError,
}

impl HtmlVersion {
    pub fn label(&self) -> &'static str {
        match self {
            HtmlVersion::Html5 => "HTML5",
            HtmlVersion::Html401Strict => "HTML 4.01 Strict",
            HtmlVersion::Html401Transitional => "HTML 4.01 Transitional",
            HtmlVersion::Html401Frameset => "HTML 4.01 Frameset",
            HtmlVersion::Xhtml10Strict => "XHTML 1.0 Strict",
            HtmlVersion::Xhtml10Transitional => "XHTML 1.0 Transitional",
            HtmlVersion::Xhtml10Frameset => "XHTML 1.0 Frameset",
            HtmlVersion::Xhtml11 => "XHTML 1.1",
            HtmlVersion::XhtmlByContentType => "XHTML (Content-Type based detection)",
            HtmlVersion::NonStandardDoctype => "HTML (Non-standard DOCTYPE)",
            HtmlVersion::NoDoctype => "HTML (No DOCTYPE)",
            HtmlVersion::Unknown => "Unknown",
            HtmlVersion::DecodeError => "Unknown (gzip decoding error)",
        }
    }
}

impl fmt::Display for HtmlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn doctype(pattern: &str) -> Regex {
    Regex::new(pattern).expect("doctype pattern is valid")
}

static DOCTYPE_RULES: Lazy<Vec<(Regex, HtmlVersion)>> = Lazy::new(|| {
    vec![
        (doctype(r"(?i)<!DOCTYPE\s+html\s*>"), HtmlVersion::Html5),
        (
            doctype(r#"(?i)<!DOCTYPE\s+HTML\s+PUBLIC\s+"-//W3C//DTD HTML 4\.01//EN""#),
            HtmlVersion::Html401Strict,
        ),
        (
            doctype(r#"(?i)<!DOCTYPE\s+HTML\s+PUBLIC\s+"-//W3C//DTD HTML 4\.01 Transitional//EN""#),
            HtmlVersion::Html401Transitional,
        ),
        (
            doctype(r#"(?i)<!DOCTYPE\s+HTML\s+PUBLIC\s+"-//W3C//DTD HTML 4\.01 Frameset//EN""#),
            HtmlVersion::Html401Frameset,
        ),
        (
            doctype(r#"(?i)<!DOCTYPE\s+html\s+PUBLIC\s+"-//W3C//DTD XHTML 1\.0 Strict//EN""#),
            HtmlVersion::Xhtml10Strict,
        ),
        (
            doctype(r#"(?i)<!DOCTYPE\s+html\s+PUBLIC\s+"-//W3C//DTD XHTML 1\.0 Transitional//EN""#),
            HtmlVersion::Xhtml10Transitional,
        ),
        (
            doctype(r#"(?i)<!DOCTYPE\s+html\s+PUBLIC\s+"-//W3C//DTD XHTML 1\.0 Frameset//EN""#),
            HtmlVersion::Xhtml10Frameset,
        ),
        (
            doctype(r#"(?i)<!DOCTYPE\s+html\s+PUBLIC\s+"-//W3C//DTD XHTML 1\.1//EN""#),
            HtmlVersion::Xhtml11,
        ),
    ]
});

/// Classify an already-decoded body.
pub fn detect_version(body: &[u8], content_type: Option<&str>) -> HtmlVersion {
    let prefix = &body[..body.len().min(SNIFF_LEN)];
    let snippet = String::from_utf8_lossy(prefix);

    if let Some((_, version)) = DOCTYPE_RULES.iter().find(|(re, _)| re.is_match(&snippet)) {
        return *version;
    }

    if content_type.is_some_and(|ct| ct.contains("application/xhtml+xml")) {
        return HtmlVersion::XhtmlByContentType;
    }

    if snippet.contains("<!DOCTYPE html") {
        return HtmlVersion::NonStandardDoctype;
    }

    if snippet.to_lowercase().contains("<html") {
        return HtmlVersion::NoDoctype;
    }

    HtmlVersion::Unknown
}

/// Classify a page given the result of decoding its body.
///
/// `None` means the body could not be decoded.
pub fn detect_page_version(decoded: Option<&[u8]>, content_type: Option<&str>) -> HtmlVersion {
    match decoded {
        Some(body) => detect_version(body, content_type),
        None => HtmlVersion::DecodeError,
    }
}
