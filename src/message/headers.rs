//! Conversion between `HeaderMap` and the ordered `"Name: Value"` line form
//! used by the on-disk cache metadata and by upstream transfers.

use http::header::{CONNECTION, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderName, HeaderValue};

/// Render a header map as `"Name: Value"` lines, preserving insertion order
/// per name. Values that are not UTF-8 cannot be written back byte for byte,
/// so they are dropped.
pub fn to_lines(headers: &HeaderMap) -> Vec<String> {
    headers
        .iter()
        .filter_map(|(name, value)| match std::str::from_utf8(value.as_bytes()) {
            Ok(value) => Some(format!("{}: {}", canonical_name(name), value)),
            Err(_) => {
                tracing::debug!("headers: dropping non-utf8 value, name={}", name);
                None
            }
        })
        .collect()
}

/// Parse `"Name: Value"` lines back into a header map.
///
/// Status lines (`HTTP/1.1 200 OK`), blank lines and lines that do not form a
/// valid header are skipped.
pub fn parse_lines<I, S>(lines: I) -> HeaderMap
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut headers = HeaderMap::new();
    for line in lines {
        let line = line.as_ref().trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() || line.starts_with("HTTP/") {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.trim().as_bytes()),
            HeaderValue::from_str(value.trim()),
        ) else {
            continue;
        };
        headers.append(name, value);
    }
    headers
}

/// Strip hop-by-hop headers that must not be forwarded across a proxy.
pub fn remove_hop_headers(headers: &mut HeaderMap) {
    let hop_headers: &[HeaderName] = &[
        CONNECTION,
        HeaderName::from_static("keep-alive"),
        HeaderName::from_static("proxy-authenticate"),
        HeaderName::from_static("proxy-authorization"),
        HeaderName::from_static("te"),
        HeaderName::from_static("trailers"),
        TRANSFER_ENCODING,
        HeaderName::from_static("upgrade"),
    ];

    for h in hop_headers {
        headers.remove(h);
    }
}

/// `content-type` -> `Content-Type`. Header names are case-insensitive, this
/// only makes stored metadata easier to read.
fn canonical_name(name: &HeaderName) -> String {
    let mut out = String::with_capacity(name.as_str().len());
    let mut upper = true;
    for c in name.as_str().chars() {
        if upper {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        upper = c == '-';
    }
    out
}
