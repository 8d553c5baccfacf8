use crate::report::{LinkTask, PageFacts};
use bytes::Bytes;
use scraper::{Html, Node};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use url::{Position, Url};

/// Resolve an `href` against the page URL.
///
/// Anything that already parses as an absolute URL is returned as written.
/// Root-relative links keep the page's scheme and authority; path-relative
/// links are appended to the directory of the page path.
pub fn normalize_url(href: &str, base: &Url) -> String {
    let href = href.trim();

    if Url::parse(href).is_ok() {
        return href.to_string();
    }

    if href.starts_with("//") {
        return format!("{}:{}", base.scheme(), href);
    }

    let authority = &base[Position::BeforeHost..Position::AfterPort];

    if href.starts_with('/') {
        return format!("{}://{}{}", base.scheme(), authority, href);
    }

    let path = base.path();
    let directory = if path.ends_with('/') {
        path
    } else {
        match path.rfind('/') {
            Some(idx) => &path[..=idx],
            None => "/",
        }
    };

    format!("{}://{}{}{}", base.scheme(), authority, directory, href)
}

/// Hostname comparison only; scheme and port do not matter.
pub fn is_external_link(link: &str, base: &Url) -> bool {
    match Url::parse(link) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {
            parsed.host_str() != base.host_str()
        }
        _ => false,
    }
}

fn is_password_input(node: &Node) -> bool {
    node.as_element().is_some_and(|el| {
        el.name() == "input"
            && el
                .attr("type")
                .is_some_and(|t| t.trim().eq_ignore_ascii_case("password"))
    })
}

/// Walk the document once in pre-order, collecting page facts.
///
/// Every link occurrence is handed to `emit`. Once `emit` returns false the
/// stream is considered closed: counting continues, emitting stops.
pub fn traverse<F>(document: &Html, base: &Url, mut emit: F) -> PageFacts
where
    F: FnMut(LinkTask) -> bool,
{
    let mut facts = PageFacts::default();
    let mut stream_open = true;
    let base_url = base.to_string();

    for node in document.tree.root().descendants() {
        let Some(element) = node.value().as_element() else {
            continue;
        };

        match element.name() {
            "title" => {
                // The first <title> wins even when it is empty.
                if facts.title.is_none() {
                    let text = node
                        .children()
                        .find_map(|child| child.value().as_text().map(|text| String::from(&**text)));
                    facts.title = Some(text.unwrap_or_default());
                }
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                *facts.headings.entry(element.name().to_string()).or_insert(0) += 1;
            }
            "a" => {
                let Some(href) = element.attr("href") else {
                    continue;
                };
                let href = href.trim();
                if href.is_empty() || href.starts_with('#') {
                    continue;
                }

                let url = normalize_url(href, base);
                let is_external = is_external_link(&url, base);
                if is_external {
                    facts.external_links += 1;
                } else {
                    facts.internal_links += 1;
                }

                if stream_open {
                    stream_open = emit(LinkTask {
                        url,
                        is_external,
                        base_url: base_url.clone(),
                    });
                    if !stream_open {
                        debug!("Link stream closed, continuing traversal without emitting");
                    }
                }
            }
            "form" => {
                let login_action = element
                    .attr("action")
                    .is_some_and(|action| action.to_ascii_lowercase().contains("login"));

                if login_action || node.descendants().any(|d| is_password_input(d.value())) {
                    facts.has_login_form = true;
                }
            }
            "meta" => {
                let key = element
                    .attr("name")
                    .filter(|v| !v.is_empty())
                    .or_else(|| element.attr("property").filter(|v| !v.is_empty()));
                let content = element.attr("content").filter(|v| !v.is_empty());

                if let (Some(key), Some(content)) = (key, content) {
                    facts.meta_tags.insert(key.to_string(), content.to_string());
                }
            }
            _ => {}
        }
    }

    facts
}

/// Parse and traverse on the blocking pool, streaming links into `tx`.
///
/// A full channel blocks the traversal until a worker takes a task. The
/// sender is dropped when the traversal ends, which closes the stream.
pub fn spawn_traversal(body: Bytes, base: Url, tx: mpsc::Sender<LinkTask>) -> JoinHandle<PageFacts> {
    tokio::task::spawn_blocking(move || {
        let markup = String::from_utf8_lossy(&body);
        let document = Html::parse_document(&markup);
        traverse(&document, &base, |task| tx.blocking_send(task).is_ok())
    })
}
