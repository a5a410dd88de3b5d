use crate::net::{FetchRequest, HttpClient};

/// What the remote end is known to support. Unknown until probed; probe
/// failure degrades to the conservative answer rather than erroring, which
/// at worst costs a full re-download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteCapability {
    pub size_bytes: Option<u64>,
    pub supports_ranges: bool,
}

impl RemoteCapability {
    pub fn unknown() -> Self {
        Self {
            size_bytes: None,
            supports_ranges: false,
        }
    }
}

/// Determine remote size and range support. HEAD first; if that is
/// inconclusive, request the first byte and look for a partial-content
/// reply. The probing byte is never persisted.
pub fn probe(client: &dyn HttpClient, url: &str, referer: Option<&str>, user_agent: &str) -> RemoteCapability {
    let mut head_req = FetchRequest::new(url, user_agent);
    head_req.referer = referer.map(|value| value.to_string());

    if let Ok(resp) = client.head(&head_req) {
        if (200..300).contains(&resp.status_code) {
            if let Some(size) = resp.content_length {
                if resp.accept_ranges {
                    return RemoteCapability {
                        size_bytes: Some(size),
                        supports_ranges: true,
                    };
                }
            }
        }
    }

    let mut byte_req = FetchRequest::new(url, user_agent);
    byte_req.referer = referer.map(|value| value.to_string());
    byte_req.range = Some((0, Some(0)));

    match client.get(&byte_req) {
        Ok(resp) if resp.is_partial() => {
            let total = resp.content_range.and_then(|range| range.total);
            // Body dropped here, cancelling the read.
            RemoteCapability {
                size_bytes: total,
                supports_ranges: true,
            }
        }
        Ok(_) | Err(_) => {
            log::debug!("capability probe inconclusive for {}", url);
            RemoteCapability::unknown()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransferError;
    use crate::net::{ContentRange, ProbeResponse, StreamResponse};

    struct Scripted {
        head: Option<ProbeResponse>,
        get: Option<(u16, Option<ContentRange>)>,
    }

    impl HttpClient for Scripted {
        fn head(&self, _req: &FetchRequest) -> crate::error::TransferResult<ProbeResponse> {
            self.head
                .clone()
                .ok_or_else(|| TransferError::Network("head refused".to_string()))
        }

        fn get(&self, _req: &FetchRequest) -> crate::error::TransferResult<StreamResponse> {
            let (status_code, content_range) = self
                .get
                .ok_or_else(|| TransferError::Network("get refused".to_string()))?;
            Ok(StreamResponse {
                status_code,
                content_length: Some(1),
                content_range,
                body: Box::new(std::io::Cursor::new(vec![0u8])),
            })
        }
    }

    #[test]
    fn head_reports_size_and_ranges() {
        let client = Scripted {
            head: Some(ProbeResponse {
                status_code: 200,
                content_length: Some(4096),
                accept_ranges: true,
            }),
            get: None,
        };
        let cap = probe(&client, "http://example.com/v.mp4", None, "ua");
        assert_eq!(cap.size_bytes, Some(4096));
        assert!(cap.supports_ranges);
    }

    #[test]
    fn falls_back_to_one_byte_range() {
        let client = Scripted {
            head: None,
            get: Some((
                206,
                Some(ContentRange {
                    start: 0,
                    end: 0,
                    total: Some(9000),
                }),
            )),
        };
        let cap = probe(&client, "http://example.com/v.mp4", None, "ua");
        assert_eq!(cap.size_bytes, Some(9000));
        assert!(cap.supports_ranges);
    }

    #[test]
    fn full_response_to_range_probe_means_no_ranges() {
        let client = Scripted {
            head: None,
            get: Some((200, None)),
        };
        let cap = probe(&client, "http://example.com/v.mp4", None, "ua");
        assert_eq!(cap, RemoteCapability::unknown());
    }

    #[test]
    fn total_failure_degrades_conservatively() {
        let client = Scripted {
            head: None,
            get: None,
        };
        let cap = probe(&client, "http://example.com/v.mp4", None, "ua");
        assert_eq!(cap, RemoteCapability::unknown());
    }
}
