//! Cacheability policy.
//!
//! # Rules
//! - Only GET and HEAD exchanges are stored
//! - Only `200 OK` responses are stored
//! - `Cache-Control: no-store | no-cache | private` on the response blocks storage
//!
//! Requests carrying `Authorization` are NOT excluded. Responses to
//! authenticated requests are shared between clients of this proxy; keep
//! this in mind before fronting per-user content.

use axum::http::{header::CACHE_CONTROL, HeaderMap, HeaderValue, Method, StatusCode};

const BLOCKING_DIRECTIVES: [&str; 3] = ["no-store", "no-cache", "private"];

/// Decide whether an exchange may be written to the cache.
pub fn can_cache(method: &Method, status: StatusCode, response_headers: &HeaderMap) -> bool {
    if method != Method::GET && method != Method::HEAD {
        return false;
    }

    if status != StatusCode::OK {
        return false;
    }

    !response_headers
        .get_all(CACHE_CONTROL)
        .iter()
        .any(blocks_storage)
}

fn blocks_storage(value: &HeaderValue) -> bool {
    String::from_utf8_lossy(value.as_bytes())
        .split(',')
        .map(|directive| {
            // `no-cache="set-cookie"` still names the no-cache directive.
            directive.split('=').next().unwrap_or_default().trim()
        })
        .any(|name| {
            BLOCKING_DIRECTIVES
                .iter()
                .any(|blocked| name.eq_ignore_ascii_case(blocked))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn get_ok_is_cacheable() {
        assert!(can_cache(&Method::GET, StatusCode::OK, &HeaderMap::new()));
    }

    #[test]
    fn head_ok_is_cacheable() {
        assert!(can_cache(&Method::HEAD, StatusCode::OK, &HeaderMap::new()));
    }

    #[test]
    fn other_methods_are_not_cacheable() {
        for method in [Method::POST, Method::PUT, Method::DELETE, Method::PATCH, Method::OPTIONS] {
            assert!(!can_cache(&method, StatusCode::OK, &HeaderMap::new()), "{method}");
        }
    }

    #[test]
    fn non_200_is_not_cacheable() {
        for status in [
            StatusCode::NOT_FOUND,
            StatusCode::CREATED,
            StatusCode::NO_CONTENT,
            StatusCode::MOVED_PERMANENTLY,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            assert!(!can_cache(&Method::GET, status, &HeaderMap::new()), "{status}");
        }
    }

    #[test]
    fn blocking_cache_control_directives() {
        for value in ["no-store", "no-cache", "private"] {
            let map = headers(&[("cache-control", value)]);
            assert!(!can_cache(&Method::GET, StatusCode::OK, &map), "{value}");
        }
    }

    #[test]
    fn directives_are_case_insensitive_and_trimmed() {
        let map = headers(&[("cache-control", "max-age=60,  No-Store ")]);
        assert!(!can_cache(&Method::GET, StatusCode::OK, &map));
    }

    #[test]
    fn directive_with_argument_still_blocks() {
        let map = headers(&[("cache-control", "no-cache=\"set-cookie\"")]);
        assert!(!can_cache(&Method::GET, StatusCode::OK, &map));
    }

    #[test]
    fn blocking_directive_in_second_header_line() {
        let map = headers(&[("cache-control", "public"), ("cache-control", "private")]);
        assert!(!can_cache(&Method::GET, StatusCode::OK, &map));
    }

    #[test]
    fn permissive_cache_control_is_cacheable() {
        let map = headers(&[("cache-control", "public, max-age=300")]);
        assert!(can_cache(&Method::GET, StatusCode::OK, &map));
    }

    #[test]
    fn similar_directive_names_do_not_block() {
        let map = headers(&[("cache-control", "no-transform, proxy-revalidate")]);
        assert!(can_cache(&Method::GET, StatusCode::OK, &map));
    }

    #[test]
    fn authorization_does_not_block() {
        // The policy looks at the response only; an Authorization header on
        // the request has no say.
        let map = headers(&[("content-type", "application/json")]);
        assert!(can_cache(&Method::GET, StatusCode::OK, &map));
    }
}
