//! Assembles the demo application [`Router`].
//!
//! Two stacks are built from the same configuration, following how an
//! embedding application would mount the middleware:
//!
//! - at the root, `auth` (when credentials are configured) and `parser`
//!   guard every route, including the component router;
//! - below `config.prefix`, a `component` stack serves the registry.

use axum::{
    body::to_bytes,
    extract::Request,
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};

use crate::{
    config::{
        AuthOptions, AuthType, ComponentOptions, MiddlewareOptions, ParserOptions, ServerConfig,
        DEFAULT_BODY_LIMIT,
    },
    middleware::{
        middleware,
        parser::{body_error, ParsedBody},
    },
    registry::HandlerCatalogue,
};

/// Build the complete application router.
pub fn build_app(config: &ServerConfig, catalogue: HandlerCatalogue) -> Router {
    let guard = middleware(MiddlewareOptions {
        auth: config.credentials.clone().map(|credentials| AuthOptions {
            kind: AuthType::Basic,
            credentials,
        }),
        parser: Some(ParserOptions {
            limit: config.body_limit,
        }),
        ..Default::default()
    });
    if config.credentials.is_none() {
        tracing::warn!("auth: no credentials configured, serving unauthenticated");
    }

    let components = middleware(MiddlewareOptions {
        component: Some(ComponentOptions {
            base_dir: config.component_dir.clone(),
            catalogue,
        }),
        root: config.root.clone(),
        ..Default::default()
    });

    let app = Router::new()
        .route("/", get(|| async { "OK" }))
        .route("/echo", post(echo))
        .nest_service(&config.prefix, components.into_router());

    guard.mount(app)
}

/// Respond with the request body exactly as received, under the request's
/// content type.
async fn echo(req: Request) -> Response {
    let content_type = req.headers().get(header::CONTENT_TYPE).cloned();
    // Behind the parser the body is already buffered and bounded.
    let limit = match req.extensions().get::<ParsedBody>() {
        Some(_) => usize::MAX,
        None => DEFAULT_BODY_LIMIT,
    };
    let bytes = match to_bytes(req.into_body(), limit).await {
        Ok(bytes) => bytes,
        Err(e) => return body_error(e).into_response(),
    };
    let mut resp = bytes.into_response();
    match content_type {
        Some(ct) => resp.headers_mut().insert(header::CONTENT_TYPE, ct),
        None => resp.headers_mut().remove(header::CONTENT_TYPE),
    };
    resp
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::builtin;
    use crate::config::Credentials;
    use crate::middleware::auth::basic_header;

    fn config() -> ServerConfig {
        ServerConfig {
            credentials: Some(Credentials {
                user: "bot".into(),
                pass: "s3cret".into(),
            }),
            ..Default::default()
        }
    }

    async fn send(
        app: Router,
        method: &str,
        uri: &str,
        auth: bool,
        body: Option<Value>,
    ) -> (StatusCode, bytes::Bytes) {
        let mut req = axum::http::Request::builder().method(method).uri(uri);
        if auth {
            req = req.header("authorization", basic_header("bot", "s3cret"));
        }
        let req = match body {
            Some(b) => req
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        (status, resp.into_body().collect().await.unwrap().to_bytes())
    }

    #[tokio::test]
    async fn root_requires_auth() {
        let app = build_app(&config(), builtin::catalogue());
        let (status, _) = send(app.clone(), "GET", "/", false, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, body) = send(app, "GET", "/", true, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn components_are_behind_auth_too() {
        let app = build_app(&config(), builtin::catalogue());
        let (status, _) = send(app, "GET", "/components", false, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn echo_returns_body_byte_for_byte() {
        let app = build_app(&config(), builtin::catalogue());
        let raw = r#"{"zeta":1,  "alpha":{"b":2,"a":1}}"#;
        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/echo")
            .header("authorization", basic_header("bot", "s3cret"))
            .header("content-type", "application/json")
            .body(Body::from(raw))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-type"], "application/json");
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], raw.as_bytes());
    }

    #[tokio::test]
    async fn builtin_components_are_mounted_at_prefix() {
        let app = build_app(&config(), builtin::catalogue());
        let (status, body) = send(app.clone(), "GET", "/components", true, None).await;
        assert_eq!(status, StatusCode::OK);
        let listing: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(listing["components"][0]["name"], "hello");

        let (status, body) = send(
            app,
            "POST",
            "/components/text/uppercase",
            true,
            Some(json!({ "text": "hi" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let envelope: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(envelope, json!({ "error": false, "payload": { "text": "HI" } }));
    }

    #[tokio::test]
    async fn no_credentials_means_no_auth() {
        let app = build_app(&ServerConfig::default(), builtin::catalogue());
        let (status, _) = send(app, "GET", "/", false, None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
