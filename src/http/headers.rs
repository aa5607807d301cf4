//! Hop-by-hop header removal.
//!
//! Headers that only describe a single transport connection must not cross
//! the proxy. That is the fixed RFC 9110 set below plus any header the
//! sender listed in `Connection`.

use axum::http::{header::CONNECTION, HeaderMap};

/// Always removed, regardless of what `Connection` lists.
pub const HOP_BY_HOP_HEADERS: [&str; 9] = [
    "connection",
    "proxy-connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers in place.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<String> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect();

    for name in &listed {
        // Names that are not valid header names simply match nothing.
        headers.remove(name.as_str());
    }

    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
}
