//! HTTP Basic authentication middleware.
//!
//! The single credential check guarding everything mounted behind it. A
//! request passes when its `Authorization` header carries
//! `Basic base64(user:pass)` matching the configured credentials; anything
//! else is answered with 401 and a `WWW-Authenticate` challenge before the
//! router is reached.

use async_trait::async_trait;
use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use subtle::ConstantTimeEq;

use super::lifecycle::{InitError, MiddlewareStep};
use crate::config::{AuthOptions, AuthType, Credentials};
use crate::error::AppError;

/// Initialized Basic auth check.
pub struct AuthMiddleware {
    credentials: Credentials,
}

impl AuthMiddleware {
    /// Guarded initializer: validates the configured credentials.
    pub fn init(options: AuthOptions) -> Result<Self, InitError> {
        match options.kind {
            AuthType::Basic => {}
        }
        if options.credentials.user.is_empty() {
            return Err(InitError::Config("auth.credentials.user must not be empty".into()));
        }
        if options.credentials.user.contains(':') {
            return Err(InitError::Config("auth.credentials.user must not contain ':'".into()));
        }
        Ok(Self {
            credentials: options.credentials,
        })
    }

    fn check(&self, headers: &HeaderMap) -> Result<(), String> {
        let value = headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| "missing Authorization header".to_string())?
            .to_str()
            .map_err(|_| "Authorization header is not valid ASCII".to_string())?;

        let (user, pass) = parse_basic(value)?;
        if self.matches(&user, &pass) {
            Ok(())
        } else {
            Err(format!("invalid credentials for user {user:?}"))
        }
    }
}

impl AuthMiddleware {
    /// Both halves are always compared, each in constant time.
    fn matches(&self, user: &str, pass: &str) -> bool {
        let user_ok = user.as_bytes().ct_eq(self.credentials.user.as_bytes());
        let pass_ok = pass.as_bytes().ct_eq(self.credentials.pass.as_bytes());
        (user_ok & pass_ok).into()
    }
}

#[async_trait]
impl MiddlewareStep for AuthMiddleware {
    async fn handle(&self, req: Request, next: Next) -> Response {
        match self.check(req.headers()) {
            Ok(()) => next.run(req).await,
            Err(reason) => {
                tracing::warn!("auth: rejected {} {}: {reason}", req.method(), req.uri().path());
                AppError::Unauthorized("authentication required".into()).into_response()
            }
        }
    }
}

/// Decode `Basic <base64(user:pass)>`. The scheme name is case-insensitive.
fn parse_basic(value: &str) -> Result<(String, String), String> {
    let (scheme, encoded) = value
        .trim()
        .split_once(' ')
        .ok_or_else(|| "malformed Authorization header".to_string())?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(format!("unsupported auth scheme {scheme:?}"));
    }
    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|e| format!("credentials are not valid base64: {e}"))?;
    let decoded =
        String::from_utf8(decoded).map_err(|_| "credentials are not valid UTF-8".to_string())?;
    let (user, pass) = decoded
        .split_once(':')
        .ok_or_else(|| "credentials must be user:pass".to_string())?;
    Ok((user.to_string(), pass.to_string()))
}

/// Build the `Authorization` header value for `user:pass`.
pub fn basic_header(user: &str, pass: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{pass}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
