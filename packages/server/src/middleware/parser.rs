//! Body-decoding middleware.
//!
//! Reads the request body (bounded by `parser.limit`), decodes JSON bodies
//! and stores the result as a [`ParsedBody`] request extension. The raw bytes
//! are put back on the request so downstream handlers can still read them.
//!
//! | Body | `ParsedBody` |
//! |------|--------------|
//! | empty | `null` |
//! | JSON content type, valid | decoded value |
//! | JSON content type, invalid | request rejected with 400 |
//! | any other content type | `null` |
//!
//! A body over the limit is rejected with 413. Any other failure to read the
//! body (a dropped connection, a broken stream) is a 400.

use async_trait::async_trait;
use std::error::Error as _;

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use serde_json::Value;

use super::lifecycle::{InitError, MiddlewareStep};
use crate::config::ParserOptions;
use crate::error::AppError;

/// The decoded request body, available to everything behind the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBody(pub Value);

/// Initialized body parser.
pub struct ParserMiddleware {
    limit: usize,
}

impl ParserMiddleware {
    /// Guarded initializer.
    pub fn init(options: ParserOptions) -> Result<Self, InitError> {
        if options.limit == 0 {
            return Err(InitError::Config("parser.limit must be greater than zero".into()));
        }
        Ok(Self {
            limit: options.limit,
        })
    }
}

#[async_trait]
impl MiddlewareStep for ParserMiddleware {
    async fn handle(&self, req: Request, next: Next) -> Response {
        match parse_request(req, self.limit).await {
            Ok((req, _)) => next.run(req).await,
            Err(e) => e.into_response(),
        }
    }
}

/// Decode `req`'s body, attach it as [`ParsedBody`] and return the request
/// with its body restored, along with the decoded value.
pub async fn parse_request(req: Request, limit: usize) -> Result<(Request, Value), AppError> {
    let (mut parts, body) = req.into_parts();
    let bytes = to_bytes(body, limit).await.map_err(body_error)?;
    let value = decode(&parts.headers, &bytes)?;
    parts.extensions.insert(ParsedBody(value.clone()));
    Ok((Request::from_parts(parts, Body::from(bytes)), value))
}

/// Map a body read failure to the response it deserves.
pub fn body_error(err: axum::Error) -> AppError {
    if exceeds_limit(&err) {
        AppError::PayloadTooLarge(format!("request body rejected: {err}"))
    } else {
        AppError::BadRequest(format!("failed to read request body: {err}"))
    }
}

/// Whether `err` was caused by the body limit rather than the transport.
fn exceeds_limit(err: &axum::Error) -> bool {
    let mut source = err.source();
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

/// Decode a body according to its content type.
pub fn decode(headers: &HeaderMap, bytes: &[u8]) -> Result<Value, AppError> {
    if bytes.iter().all(u8::is_ascii_whitespace) || !is_json(headers) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes)
        .map_err(|e| AppError::BadRequest(format!("malformed JSON body: {e}")))
}

/// `application/json` or any `+json` media type.
fn is_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Extension, Router};
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::middleware::lifecycle::extend;

    /// Echoes the parsed body and the raw byte count.
    async fn inspect(Extension(ParsedBody(body)): Extension<ParsedBody>, raw: String) -> String {
        json!({ "parsed": body, "raw_len": raw.len() }).to_string()
    }

    fn app(limit: usize) -> Router {
        extend("parser", ParserOptions { limit }, ParserMiddleware::init)
            .layer_onto(Router::new().route("/", post(inspect)))
    }

    async fn send(limit: usize, content_type: Option<&str>, body: &str) -> (StatusCode, Value) {
        let mut req = axum::http::Request::builder().method("POST").uri("/");
        if let Some(ct) = content_type {
            req = req.header("content-type", ct);
        }
        let resp = app(limit)
            .oneshot(req.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn json_body_is_decoded_and_kept() {
        let body = r#"{"foo":"test"}"#;
        let (status, out) = send(1024, Some("application/json"), body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(out["parsed"], json!({ "foo": "test" }));
        assert_eq!(out["raw_len"], body.len());
    }

    #[tokio::test]
    async fn malformed_json_returns_400() {
        let (status, out) = send(1024, Some("application/json"), "{nope").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(out["code"], "invalid_body");
    }

    #[tokio::test]
    async fn oversized_body_returns_413() {
        let (status, _) = send(8, Some("application/json"), r#"{"foo":"far too long"}"#).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn non_json_and_empty_bodies_parse_to_null() {
        let (_, out) = send(1024, Some("text/plain"), "hello").await;
        assert_eq!(out["parsed"], Value::Null);
        assert_eq!(out["raw_len"], 5);
        let (_, out) = send(1024, Some("application/json"), "").await;
        assert_eq!(out["parsed"], Value::Null);
    }

    #[tokio::test]
    async fn only_the_length_limit_maps_to_413() {
        let err = to_bytes(Body::from("toolong"), 2).await.unwrap_err();
        assert!(exceeds_limit(&err));
        assert_eq!(
            body_error(err).into_response().status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );

        let err = axum::Error::new(std::io::Error::other("connection reset"));
        assert!(!exceeds_limit(&err));
        assert_eq!(body_error(err).into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn broken_body_stream_returns_400() {
        let stream = futures_util::stream::iter(vec![
            Ok::<_, std::io::Error>(bytes::Bytes::from_static(b"{\"a\":")),
            Err(std::io::Error::other("connection reset")),
        ]);
        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from_stream(stream))
            .unwrap();
        let resp = app(1024).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let out: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(out["code"], "invalid_body");
    }

    #[test]
    fn json_media_types() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "application/json; charset=utf-8".parse().unwrap());
        assert!(is_json(&headers));
        headers.insert(header::CONTENT_TYPE, "application/vnd.api+json".parse().unwrap());
        assert!(is_json(&headers));
        headers.insert(header::CONTENT_TYPE, "text/json-ish".parse().unwrap());
        assert!(!is_json(&headers));
    }

    #[test]
    fn zero_limit_fails_init() {
        assert!(ParserMiddleware::init(ParserOptions { limit: 0 }).is_err());
    }
}
