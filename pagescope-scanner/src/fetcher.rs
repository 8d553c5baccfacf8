use crate::error::{Result, ScanError};
use bytes::Bytes;
use flate2::read::MultiGzDecoder;
use reqwest::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use std::io::Read;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// Check that a target is an absolute http(s) URL with a host. No I/O.
pub fn validate_target(target: &str) -> Result<Url> {
    let parsed =
        Url::parse(target.trim()).map_err(|_| ScanError::InvalidUrl(target.to_string()))?;

    let has_host = parsed.host_str().is_some_and(|host| !host.is_empty());
    if !matches!(parsed.scheme(), "http" | "https") || !has_host {
        return Err(ScanError::InvalidUrl(target.to_string()));
    }

    Ok(parsed)
}

/// The buffered page response.
///
/// `body` is held as [`Bytes`] so the version detector and the traverser
/// can each take their own handle on the same buffer.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub final_url: Url,
    pub status: StatusCode,
    pub body: Bytes,
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub elapsed: Duration,
}

impl FetchedPage {
    /// Body with any gzip content-encoding removed.
    pub fn decoded_body(&self) -> std::io::Result<Bytes> {
        let encoding = self
            .content_encoding
            .as_deref()
            .map(|e| e.trim().to_ascii_lowercase());

        match encoding.as_deref() {
            Some("gzip") | Some("x-gzip") => {
                let mut decoder = MultiGzDecoder::new(&self.body[..]);
                let mut decoded = Vec::with_capacity(self.body.len() * 4);
                decoder.read_to_end(&mut decoded)?;
                Ok(Bytes::from(decoded))
            }
            _ => Ok(self.body.clone()),
        }
    }

    pub fn page_size(&self) -> u64 {
        self.content_length.unwrap_or(self.body.len() as u64)
    }
}

pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        // Decompression is done explicitly so the raw encoding stays observable.
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(timeout / 2)
            .no_gzip()
            .build()?;

        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        debug!("Fetching {}", url);

        let start = Instant::now();
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT_ENCODING, "gzip")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::BadStatus(status.as_u16()));
        }

        let final_url = response.url().clone();
        let content_type = header_value(&response, CONTENT_TYPE);
        let content_encoding = header_value(&response, CONTENT_ENCODING);
        let content_length = response.content_length();

        let body = response.bytes().await?;
        let elapsed = start.elapsed();

        debug!(
            "Fetched {} ({} bytes, {:?}) in {:?}",
            final_url,
            body.len(),
            content_encoding,
            elapsed
        );

        Ok(FetchedPage {
            final_url,
            status,
            body,
            content_length,
            content_type,
            content_encoding,
            elapsed,
        })
    }
}

fn header_value(response: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}
