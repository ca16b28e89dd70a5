//! Middleware options and server configuration.
//!
//! [`MiddlewareOptions`] is what an embedding application hands to
//! [`middleware`](crate::middleware::middleware). [`ServerConfig`] is the
//! demo binary's environment-driven configuration.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::registry::HandlerCatalogue;

/// Default request body limit: 100 KiB.
pub const DEFAULT_BODY_LIMIT: usize = 100 * 1024;

// ---------------------------------------------------------------------------
// Middleware options
// ---------------------------------------------------------------------------

/// Options for the middleware stack. A kind whose section is absent is not
/// constructed at all.
///
/// ```json
/// {
///   "auth": { "type": "BASIC", "credentials": { "user": "bot", "pass": "s3cret" } },
///   "parser": { "limit": 102400 },
///   "component": { "baseDir": "components" },
///   "root": "/srv/app"
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiddlewareOptions {
    pub auth: Option<AuthOptions>,
    pub parser: Option<ParserOptions>,
    pub component: Option<ComponentOptions>,
    /// Application root; relative component directories resolve against it.
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthOptions {
    #[serde(rename = "type")]
    pub kind: AuthType,
    pub credentials: Credentials,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuthType {
    Basic,
}

/// A username/password pair.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub user: String,
    pub pass: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Maximum accepted body size in bytes.
    pub limit: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_BODY_LIMIT,
        }
    }
}

/// Where component handlers come from.
///
/// With `base_dir` set, the directory layout defines the registry and each
/// file is resolved against `catalogue`. Without it, the catalogue's own
/// paths define the registry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentOptions {
    pub base_dir: Option<PathBuf>,
    #[serde(skip)]
    pub catalogue: HandlerCatalogue,
}

impl ComponentOptions {
    pub fn new(catalogue: HandlerCatalogue) -> Self {
        Self {
            base_dir: None,
            catalogue,
        }
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// The handler directory, joined onto `root` when it is relative.
    pub fn resolve_base_dir(&self, root: Option<&Path>) -> Option<PathBuf> {
        let dir = self.base_dir.as_deref()?;
        match root {
            Some(root) if dir.is_relative() => Some(root.join(dir)),
            _ => Some(dir.to_path_buf()),
        }
    }
}

// ---------------------------------------------------------------------------
// Server configuration
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SWITCHYARD_BIND must be a valid socket address (e.g. 0.0.0.0:3000), got {0:?}")]
    Bind(String),

    #[error("SWITCHYARD_BODY_LIMIT must be a positive integer, got {0:?}")]
    BodyLimit(String),

    #[error("SWITCHYARD_PREFIX must start with '/', not be '/' and not end with '/', got {0:?}")]
    Prefix(String),

    #[error("SWITCHYARD_USER and SWITCHYARD_PASS must be set together")]
    PartialCredentials,
}

/// Runtime configuration for the `switchyard` binary.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `SWITCHYARD_BIND` | `0.0.0.0:3000` | TCP socket address to listen on |
/// | `SWITCHYARD_PREFIX` | `/components` | Mount point of the component router |
/// | `SWITCHYARD_USER` | (absent) | Basic auth user; auth is off without it |
/// | `SWITCHYARD_PASS` | (absent) | Basic auth password |
/// | `SWITCHYARD_COMPONENT_DIR` | (absent = catalogue) | Handler directory to scan |
/// | `SWITCHYARD_ROOT` | (absent) | Base for a relative component directory |
/// | `SWITCHYARD_BODY_LIMIT` | `102400` | Maximum request body in bytes |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub prefix: String,
    pub credentials: Option<Credentials>,
    pub component_dir: Option<PathBuf>,
    pub root: Option<PathBuf>,
    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            prefix: "/components".into(),
            credentials: None,
            component_dir: None,
            root: None,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl ServerConfig {
    /// Populate config from the process environment, applying defaults where absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Populate config from an arbitrary variable source.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bind_addr = match var("SWITCHYARD_BIND") {
            Some(v) => v.parse().map_err(|_| ConfigError::Bind(v))?,
            None => defaults.bind_addr,
        };

        let prefix = match var("SWITCHYARD_PREFIX") {
            Some(v) if valid_prefix(&v) => v,
            Some(v) => return Err(ConfigError::Prefix(v)),
            None => defaults.prefix,
        };

        let credentials = match (var("SWITCHYARD_USER"), var("SWITCHYARD_PASS")) {
            (Some(user), Some(pass)) => Some(Credentials { user, pass }),
            (None, None) => None,
            _ => return Err(ConfigError::PartialCredentials),
        };

        let body_limit = match var("SWITCHYARD_BODY_LIMIT") {
            Some(v) => match v.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::BodyLimit(v)),
            },
            None => defaults.body_limit,
        };

        Ok(Self {
            bind_addr,
            prefix,
            credentials,
            component_dir: var("SWITCHYARD_COMPONENT_DIR").map(PathBuf::from),
            root: var("SWITCHYARD_ROOT").map(PathBuf::from),
            body_limit,
        })
    }
}

/// A prefix usable with `Router::nest_service`.
fn valid_prefix(prefix: &str) -> bool {
    prefix.starts_with('/')
        && prefix.len() > 1
        && !prefix.ends_with('/')
        && !prefix.contains(['{', '}', '*'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_vars(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_apply_without_variables() {
        let config = from(&[]).unwrap();
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.prefix, "/components");
        assert!(config.credentials.is_none());
        assert!(config.component_dir.is_none());
        assert_eq!(config.body_limit, 102_400);
    }

    #[test]
    fn variables_override_defaults() {
        let config = from(&[
            ("SWITCHYARD_BIND", "127.0.0.1:8080"),
            ("SWITCHYARD_PREFIX", "/bots/components"),
            ("SWITCHYARD_USER", "bot"),
            ("SWITCHYARD_PASS", "s3cret"),
            ("SWITCHYARD_COMPONENT_DIR", "handlers"),
            ("SWITCHYARD_BODY_LIMIT", "2048"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.prefix, "/bots/components");
        assert_eq!(config.credentials.unwrap().user, "bot");
        assert_eq!(config.component_dir, Some(PathBuf::from("handlers")));
        assert_eq!(config.body_limit, 2048);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(from(&[("SWITCHYARD_BIND", "nope")]), Err(ConfigError::Bind(_))));
        assert!(matches!(
            from(&[("SWITCHYARD_BODY_LIMIT", "0")]),
            Err(ConfigError::BodyLimit(_))
        ));
        assert!(matches!(
            from(&[("SWITCHYARD_USER", "bot")]),
            Err(ConfigError::PartialCredentials)
        ));
        for prefix in ["components", "/", "/components/", "/{x}"] {
            assert!(
                matches!(from(&[("SWITCHYARD_PREFIX", prefix)]), Err(ConfigError::Prefix(_))),
                "{prefix}"
            );
        }
    }

    #[test]
    fn middleware_options_deserialize() {
        let options: MiddlewareOptions = serde_json::from_value(serde_json::json!({
            "auth": { "type": "BASIC", "credentials": { "user": "bot", "pass": "pw" } },
            "parser": {},
            "component": { "baseDir": "components" },
            "root": "/srv/app"
        }))
        .unwrap();
        assert_eq!(options.auth.unwrap().kind, AuthType::Basic);
        assert_eq!(options.parser.unwrap().limit, DEFAULT_BODY_LIMIT);
        let component = options.component.unwrap();
        assert_eq!(
            component.resolve_base_dir(options.root.as_deref()),
            Some(PathBuf::from("/srv/app/components"))
        );
    }

    #[test]
    fn absolute_base_dir_ignores_root() {
        let options = ComponentOptions::default().with_base_dir("/opt/handlers");
        assert_eq!(
            options.resolve_base_dir(Some(Path::new("/srv/app"))),
            Some(PathBuf::from("/opt/handlers"))
        );
        assert_eq!(ComponentOptions::default().resolve_base_dir(None), None);
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials {
            user: "bot".into(),
            pass: "s3cret".into(),
        };
        let shown = format!("{creds:?}");
        assert!(shown.contains("bot"));
        assert!(!shown.contains("s3cret"));
    }
}
