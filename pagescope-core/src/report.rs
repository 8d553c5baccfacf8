// Rendering of page reports for the command line

use colored::Colorize;
use pagescope_scanner::PageReport;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

pub fn render_report(report: &PageReport, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(report)),
        ReportFormat::Json => generate_json_report(report),
    }
}

pub fn generate_json_report(report: &PageReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

pub fn generate_text_report(report: &PageReport) -> String {
    let mut out = String::new();

    out.push_str(RULE);
    out.push_str("                            PAGESCOPE PAGE REPORT\n");
    out.push_str(RULE);
    out.push('\n');

    let title = if report.title.is_empty() {
        "(none)"
    } else {
        report.title.as_str()
    };
    out.push_str(&format!("Title:         {}\n", title));
    out.push_str(&format!("HTML Version:  {}\n", report.html_version));
    out.push_str(&format!(
        "Login Form:    {}\n",
        if report.has_login_form { "yes" } else { "no" }
    ));
    if let Some(size) = report.page_size_bytes {
        out.push_str(&format!("Page Size:     {} bytes\n", size));
    }
    if let Some(load) = report.load_time_ms {
        out.push_str(&format!("Load Time:     {} ms\n", load));
    }
    if let Some(duration) = report.analysis_duration {
        out.push_str(&format!("Analysis Time: {} ms\n", duration));
    }
    out.push('\n');

    out.push_str(RULE);
    out.push_str("STRUCTURE\n");
    out.push_str(RULE);
    out.push('\n');

    if report.headings.is_empty() {
        out.push_str("  No headings\n");
    } else {
        for (level, count) in &report.headings {
            out.push_str(&format!("  {:<4} {}\n", level, count));
        }
    }
    out.push('\n');

    out.push_str(&format!("Internal Links: {}\n", report.internal_links));
    out.push_str(&format!("External Links: {}\n", report.external_links));
    let broken = report.broken_links.to_string();
    let broken = if report.broken_links > 0 {
        broken.red().bold().to_string()
    } else {
        broken.green().to_string()
    };
    out.push_str(&format!("Broken Links:   {}\n\n", broken));

    if !report.meta_tags.is_empty() {
        out.push_str(RULE);
        out.push_str("META TAGS\n");
        out.push_str(RULE);
        out.push('\n');
        for (name, content) in &report.meta_tags {
            out.push_str(&format!("  {}: {}\n", name.bold(), content));
        }
        out.push('\n');
    }

    if !report.links_status.is_empty() {
        out.push_str(RULE);
        out.push_str("LINK STATUS\n");
        out.push_str(RULE);
        out.push('\n');
        for (url, status) in &report.links_status {
            out.push_str(&format!("  {} {}\n", colorize_status(status), url));
        }
        out.push('\n');
    }

    out
}

fn colorize_status(status: &str) -> String {
    if status == "OK" {
        return status.green().to_string();
    }

    let code = status
        .strip_prefix("Status: ")
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|code| code.parse::<u16>().ok());

    match code {
        Some(400..=499) => status.yellow().to_string(),
        _ => status.red().to_string(),
    }
}
