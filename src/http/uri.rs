//! Upstream URL composition.
//!
//! # Rules
//! - Scheme, host and port come from the target base URL
//! - Path: base path without one trailing `/`, then `/`, then the request
//!   path without one leading `/`
//! - Query: base query and request query joined with `&` when both are set
//!
//! # Design Decisions
//! - Paths and queries are copied in their raw wire form. Nothing is
//!   decoded, re-encoded or normalized, so `%2F` stays escaped and a `..`
//!   segment reaches the upstream as sent
//! - The request fragment is dropped; it never reaches a server anyway

use axum::http::uri::{InvalidUri, Uri};

/// Error returned when the upstream URI cannot be composed.
#[derive(Debug, thiserror::Error)]
pub enum JoinError {
    #[error("target URL {url:?} is unparsable: {source}")]
    InvalidTarget {
        url: String,
        #[source]
        source: InvalidUri,
    },
    #[error("target URL {0:?} has no scheme or host")]
    NotAbsolute(String),
    #[error("joined URI is invalid: {0}")]
    Build(#[from] axum::http::Error),
}

/// Join a raw request target (`path[?query]`) onto the upstream base URL.
pub fn join_url(request_target: &str, target: &str) -> Result<Uri, JoinError> {
    let base: Uri = target.parse().map_err(|source| JoinError::InvalidTarget {
        url: target.to_string(),
        source,
    })?;
    let (Some(scheme), Some(authority)) = (base.scheme(), base.authority()) else {
        return Err(JoinError::NotAbsolute(target.to_string()));
    };

    let (request_path, request_query) = split_target(request_target);

    let base_path = base.path();
    let mut path_and_query = format!(
        "{}/{}",
        base_path.strip_suffix('/').unwrap_or(base_path),
        request_path.strip_prefix('/').unwrap_or(request_path)
    );

    match (base.query().unwrap_or(""), request_query) {
        ("", "") => {}
        ("", only) | (only, "") => {
            path_and_query.push('?');
            path_and_query.push_str(only);
        }
        (base_query, query) => {
            path_and_query.push('?');
            path_and_query.push_str(base_query);
            path_and_query.push('&');
            path_and_query.push_str(query);
        }
    }

    let joined = Uri::builder()
        .scheme(scheme.clone())
        .authority(authority.clone())
        .path_and_query(path_and_query)
        .build()?;
    Ok(joined)
}

fn split_target(target: &str) -> (&str, &str) {
    let target = target.split_once('#').map_or(target, |(before, _)| before);
    target.split_once('?').unwrap_or((target, ""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join(target: &str, request: &str) -> String {
        join_url(request, target).unwrap().to_string()
    }

    #[test]
    fn trailing_slash_in_target() {
        assert_eq!(join("http://example.com/api/", "users"), "http://example.com/api/users");
    }

    #[test]
    fn trailing_and_leading_slash() {
        assert_eq!(join("http://example.com/api/", "/users"), "http://example.com/api/users");
    }

    #[test]
    fn without_query_parameters() {
        assert_eq!(join("http://example.com/api", "/users"), "http://example.com/api/users");
    }

    #[test]
    fn query_in_target_only() {
        assert_eq!(
            join("http://example.com/api?a=test", "users"),
            "http://example.com/api/users?a=test"
        );
    }

    #[test]
    fn query_in_target_and_request() {
        assert_eq!(
            join("http://example.com/api?a=test", "users?b=test"),
            "http://example.com/api/users?a=test&b=test"
        );
    }

    #[test]
    fn query_in_request_only() {
        assert_eq!(
            join("http://example.com/api/", "/users?a=test"),
            "http://example.com/api/users?a=test"
        );
    }

    #[test]
    fn escaped_slash_is_preserved() {
        assert_eq!(join("http://example.com/api", "foo%2Fbar"), "http://example.com/api/foo%2Fbar");
    }

    #[test]
    fn escaped_target_path_is_preserved() {
        assert_eq!(
            join("http://example.com/a%2Fb/", "/c%20d"),
            "http://example.com/a%2Fb/c%20d"
        );
    }

    #[test]
    fn root_target_and_root_request() {
        assert_eq!(join("http://example.com", "/"), "http://example.com/");
        assert_eq!(join("http://example.com/", "/users"), "http://example.com/users");
    }

    #[test]
    fn only_one_slash_is_trimmed_on_each_side() {
        assert_eq!(join("http://example.com/api//", "//users"), "http://example.com/api///users");
    }

    #[test]
    fn port_and_scheme_come_from_target() {
        assert_eq!(
            join("https://origin.internal:8443/v1", "/items?id=7"),
            "https://origin.internal:8443/v1/items?id=7"
        );
    }

    #[test]
    fn fragment_is_dropped() {
        assert_eq!(join("http://example.com", "/page#top"), "http://example.com/page");
    }

    #[test]
    fn dot_segments_are_not_resolved() {
        assert_eq!(join("http://h/api", "/../admin"), "http://h/api/../admin");
        assert_eq!(join("http://h/api", "/%2e%2e/admin"), "http://h/api/%2e%2e/admin");
        assert_eq!(join("http://h/api/./v1", "./x"), "http://h/api/./v1/./x");
    }

    #[test]
    fn query_is_copied_verbatim() {
        assert_eq!(join("http://h/api", "/x?q='a'"), "http://h/api/x?q='a'");
        assert_eq!(
            join("http://h/api?k=$v", "/x?a=(1)&b=!*,;:@/?"),
            "http://h/api/x?k=$v&a=(1)&b=!*,;:@/?"
        );
        assert_eq!(join("http://h/api", "/x?s=%20%26"), "http://h/api/x?s=%20%26");
    }

    #[test]
    fn empty_queries_add_no_separator() {
        assert_eq!(join("http://h/api", "/x?"), "http://h/api/x");
    }

    #[test]
    fn unparsable_target_is_an_error() {
        assert!(matches!(
            join_url("/users", "http://exa mple.com/api"),
            Err(JoinError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn relative_target_is_an_error() {
        assert!(matches!(
            join_url("/users", "/api"),
            Err(JoinError::NotAbsolute(_))
        ));
        assert!(matches!(
            join_url("/users", "example.com:8080"),
            Err(JoinError::NotAbsolute(_))
        ));
    }
}
