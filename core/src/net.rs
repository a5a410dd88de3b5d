use std::io::Read;

use reqwest::blocking::Client;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, RANGE, REFERER,
    USER_AGENT,
};

use crate::config::TransferConfig;
use crate::error::{TransferError, TransferResult};

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub referer: Option<String>,
    /// `(start, Some(end))` renders as `bytes=start-end`; `(start, None)`
    /// as the open-ended `bytes=start-`.
    pub range: Option<(u64, Option<u64>)>,
    pub user_agent: String,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            referer: None,
            range: None,
            user_agent: user_agent.into(),
        }
    }

    pub fn range_header(&self) -> Option<String> {
        self.range.map(|(start, end)| match end {
            Some(end) => format!("bytes={}-{}", start, end),
            None => format!("bytes={}-", start),
        })
    }
}

/// Metadata-only view of a resource, as reported by a HEAD request.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status_code: u16,
    pub content_length: Option<u64>,
    pub accept_ranges: bool,
}

/// `Content-Range: bytes <start>-<end>/<total>`; total may be `*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: u64,
    pub end: u64,
    pub total: Option<u64>,
}

impl ContentRange {
    pub fn parse(value: &str) -> Option<Self> {
        let rest = value.trim().strip_prefix("bytes")?.trim_start();
        let (span, total) = rest.split_once('/')?;
        let (start, end) = span.split_once('-')?;
        let total = match total.trim() {
            "*" => None,
            value => Some(value.parse::<u64>().ok()?),
        };
        Some(Self {
            start: start.trim().parse().ok()?,
            end: end.trim().parse().ok()?,
            total,
        })
    }
}

/// A streaming response. The body is consumed incrementally; dropping it
/// cancels whatever remains in flight.
pub struct StreamResponse {
    pub status_code: u16,
    pub content_length: Option<u64>,
    pub content_range: Option<ContentRange>,
    pub body: Box<dyn Read + Send>,
}

impl StreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn is_partial(&self) -> bool {
        self.status_code == 206
    }
}

/// Wire seam. The engine only ever talks through this trait, so tests can
/// script remote behavior without sockets.
pub trait HttpClient: Send + Sync {
    fn head(&self, req: &FetchRequest) -> TransferResult<ProbeResponse>;
    fn get(&self, req: &FetchRequest) -> TransferResult<StreamResponse>;
}

pub struct ReqwestHttpClient {
    probe_client: Client,
    stream_client: Client,
}

impl ReqwestHttpClient {
    pub fn new(config: &TransferConfig) -> TransferResult<Self> {
        let probe_client = Client::builder()
            .timeout(config.probe_timeout)
            .build()
            .map_err(|err| TransferError::Network(err.to_string()))?;
        let stream_client = Client::builder()
            .timeout(config.stream_timeout)
            .build()
            .map_err(|err| TransferError::Network(err.to_string()))?;
        Ok(Self {
            probe_client,
            stream_client,
        })
    }

    fn request_headers(&self, req: &FetchRequest) -> TransferResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&req.user_agent)
                .map_err(|err| TransferError::Network(err.to_string()))?,
        );
        if let Some(referer) = &req.referer {
            headers.insert(
                REFERER,
                HeaderValue::from_str(referer)
                    .map_err(|err| TransferError::Network(err.to_string()))?,
            );
        }
        if let Some(range) = req.range_header() {
            headers.insert(
                RANGE,
                HeaderValue::from_str(&range)
                    .map_err(|err| TransferError::Network(err.to_string()))?,
            );
        }
        Ok(headers)
    }
}

impl HttpClient for ReqwestHttpClient {
    fn head(&self, req: &FetchRequest) -> TransferResult<ProbeResponse> {
        let resp = self
            .probe_client
            .head(&req.url)
            .headers(self.request_headers(req)?)
            .send()
            .map_err(|err| TransferError::Network(err.to_string()))?;
        let status = resp.status();
        let headers = resp.headers();
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());
        let accept_ranges = headers
            .get(ACCEPT_RANGES)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.eq_ignore_ascii_case("bytes"))
            .unwrap_or(false);
        Ok(ProbeResponse {
            status_code: status.as_u16(),
            content_length,
            accept_ranges,
        })
    }

    fn get(&self, req: &FetchRequest) -> TransferResult<StreamResponse> {
        let client = if req.range == Some((0, Some(0))) {
            // One-byte capability probes run under the short deadline.
            &self.probe_client
        } else {
            &self.stream_client
        };
        let resp = client
            .get(&req.url)
            .headers(self.request_headers(req)?)
            .send()
            .map_err(|err| TransferError::Network(err.to_string()))?;
        let status = resp.status();
        let headers = resp.headers();
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());
        let content_range = headers
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(ContentRange::parse);
        Ok(StreamResponse {
            status_code: status.as_u16(),
            content_length,
            content_range,
            body: Box::new(resp),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_header_open_ended() {
        let mut req = FetchRequest::new("http://example.com/a", "ua");
        req.range = Some((1024, None));
        assert_eq!(req.range_header().as_deref(), Some("bytes=1024-"));
    }

    #[test]
    fn range_header_bounded() {
        let mut req = FetchRequest::new("http://example.com/a", "ua");
        req.range = Some((0, Some(65535)));
        assert_eq!(req.range_header().as_deref(), Some("bytes=0-65535"));
    }

    #[test]
    fn range_header_absent() {
        let req = FetchRequest::new("http://example.com/a", "ua");
        assert_eq!(req.range_header(), None);
    }

    #[test]
    fn content_range_with_total() {
        let parsed = ContentRange::parse("bytes 100-199/5000").unwrap();
        assert_eq!(parsed.start, 100);
        assert_eq!(parsed.end, 199);
        assert_eq!(parsed.total, Some(5000));
    }

    #[test]
    fn content_range_unknown_total() {
        let parsed = ContentRange::parse("bytes 0-0/*").unwrap();
        assert_eq!(parsed.total, None);
    }

    #[test]
    fn content_range_garbage() {
        assert!(ContentRange::parse("items 1-2/3").is_none());
        assert!(ContentRange::parse("bytes x-y/z").is_none());
    }
}
