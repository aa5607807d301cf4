//! Stored upstream responses and their byte cost.

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};

/// Fixed bookkeeping cost charged to every record on top of its payload
/// (status, expiry and size fields).
pub const RECORD_OVERHEAD: usize = 40;

/// A cached upstream response.
#[derive(Debug, Clone)]
pub struct CacheRecord {
    /// Upstream status code. Only 200 is admitted today.
    pub status: StatusCode,
    /// Sanitized upstream headers, multi-valued headers kept in order.
    pub headers: HeaderMap,
    /// Upstream body.
    pub body: Bytes,
}

impl CacheRecord {
    /// Create a record holding its own copy of `body`.
    pub fn new(status: StatusCode, headers: HeaderMap, body: &[u8]) -> Self {
        Self {
            status,
            headers,
            body: Bytes::copy_from_slice(body),
        }
    }

    /// Bytes charged against the cache capacity.
    ///
    /// Each header name is counted once, each of its values separately.
    pub fn size(&self) -> usize {
        let headers: usize = self
            .headers
            .keys()
            .map(|name| {
                let values: usize = self.headers.get_all(name).iter().map(|v| v.len()).sum();
                name.as_str().len() + values
            })
            .sum();

        RECORD_OVERHEAD + headers + self.body.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn empty_record_costs_overhead() {
        let record = CacheRecord::new(StatusCode::OK, HeaderMap::new(), b"");
        assert_eq!(record.size(), RECORD_OVERHEAD);
    }

    #[test]
    fn size_counts_body_and_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("text/plain"));
        let record = CacheRecord::new(StatusCode::OK, headers, b"hello");

        // "content-type" (12) + "text/plain" (10) + body (5)
        assert_eq!(record.size(), RECORD_OVERHEAD + 12 + 10 + 5);
    }

    #[test]
    fn multi_valued_header_name_counted_once() {
        let mut headers = HeaderMap::new();
        headers.append("vary", HeaderValue::from_static("accept"));
        headers.append("vary", HeaderValue::from_static("origin"));
        let record = CacheRecord::new(StatusCode::OK, headers, b"");

        // "vary" (4) + "accept" (6) + "origin" (6)
        assert_eq!(record.size(), RECORD_OVERHEAD + 4 + 6 + 6);
    }

    #[test]
    fn body_is_copied() {
        let mut source = b"abc".to_vec();
        let record = CacheRecord::new(StatusCode::OK, HeaderMap::new(), &source);
        source[0] = b'z';
        assert_eq!(&record.body[..], b"abc");
    }
}
