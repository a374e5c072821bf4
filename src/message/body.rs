use crate::message::response::Response;
use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http_body_util::{BodyExt, Full};

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

/// Convert a gateway response into the hyper form sent downstream.
///
/// The body is always fully buffered, so `Content-Length` is rewritten to
/// the actual length and hop-by-hop headers are dropped.
pub fn into_hyper(resp: Response) -> hyper::Response<BoxBody> {
    let (status, mut headers, body) = resp.into_parts();
    crate::message::headers::remove_hop_headers(&mut headers);
    headers.insert(CONTENT_LENGTH, http::HeaderValue::from(body.len()));

    let mut out = hyper::Response::new(full_body(body));
    *out.status_mut() = status;
    *out.headers_mut() = headers;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::TRANSFER_ENCODING;
    use http::{HeaderMap, HeaderValue, StatusCode};

    #[tokio::test]
    async fn test_full_body_yields_its_bytes() {
        let body = full_body("hello");
        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(collected.as_ref(), b"hello");
    }

    #[tokio::test]
    async fn test_into_hyper_rewrites_length() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("999"));
        headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert("x-upstream", HeaderValue::from_static("api"));
        let resp = Response::new(StatusCode::ACCEPTED, headers, "abc");

        let out = into_hyper(resp);
        assert_eq!(out.status(), StatusCode::ACCEPTED);
        assert_eq!(out.headers().get(CONTENT_LENGTH).unwrap(), "3");
        assert!(out.headers().get(TRANSFER_ENCODING).is_none());
        assert_eq!(out.headers().get("x-upstream").unwrap(), "api");

        let collected = out.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(collected.as_ref(), b"abc");
    }
}
