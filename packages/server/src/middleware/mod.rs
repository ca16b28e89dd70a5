//! The middleware family and the facade that assembles it.
//!
//! [`middleware`] builds one handler per configured kind, in a fixed order:
//! `auth`, then `parser`, then `component`. A kind without options is never
//! initialized. Each kind goes through [`lifecycle::extend`], so a kind that
//! fails to initialize is logged and degrades to a pass-through.

pub mod auth;
pub mod component;
pub mod lifecycle;
pub mod parser;

use axum::Router;

use crate::config::MiddlewareOptions;
use crate::error::AppError;
use lifecycle::{extend, MiddlewareHandler};

/// Ordered, initialized middleware handlers.
#[derive(Clone, Default)]
pub struct MiddlewareStack {
    handlers: Vec<MiddlewareHandler>,
}

impl MiddlewareStack {
    pub fn handlers(&self) -> &[MiddlewareHandler] {
        &self.handlers
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// The handler for one kind, by name.
    pub fn get(&self, name: &str) -> Option<&MiddlewareHandler> {
        self.handlers.iter().find(|h| h.name() == name)
    }

    /// Layer the stack onto `router`; the first handler sees requests first.
    pub fn mount(self, router: Router) -> Router {
        self.handlers
            .into_iter()
            .rev()
            .fold(router, |router, handler| handler.layer_onto(router))
    }

    /// A standalone router: the stack in front of a 404 fallback. Suitable
    /// for `Router::nest_service`.
    pub fn into_router(self) -> Router {
        self.mount(Router::new().fallback(not_found))
    }
}

/// Construct every configured middleware kind.
pub fn middleware(options: MiddlewareOptions) -> MiddlewareStack {
    let MiddlewareOptions {
        auth,
        parser,
        component,
        root,
    } = options;

    let mut handlers = Vec::new();
    if let Some(auth) = auth {
        handlers.push(extend("auth", auth, auth::AuthMiddleware::init));
    }
    if let Some(parser) = parser {
        handlers.push(extend("parser", parser, parser::ParserMiddleware::init));
    }
    if let Some(component) = component {
        handlers.push(extend("component", (component, root), |(c, r)| {
            component::ComponentMiddleware::init(c, r.as_deref())
        }));
    }
    MiddlewareStack { handlers }
}

async fn not_found(uri: axum::http::Uri) -> AppError {
    AppError::NotFound(format!("no route for {}", uri.path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthOptions, AuthType, ComponentOptions, Credentials, ParserOptions};
    use crate::invocable::HandlerUnit;
    use crate::registry::HandlerCatalogue;
    use crate::testing::EchoComponent;

    #[test]
    fn nothing_configured_builds_nothing() {
        assert!(middleware(MiddlewareOptions::default()).is_empty());
    }

    #[test]
    fn configured_kinds_are_ordered() {
        let stack = middleware(MiddlewareOptions {
            component: Some(ComponentOptions::new(
                HandlerCatalogue::new().unit("echo", || HandlerUnit::instantiable(|| EchoComponent)),
            )),
            parser: Some(ParserOptions::default()),
            auth: Some(AuthOptions {
                kind: AuthType::Basic,
                credentials: Credentials {
                    user: "bot".into(),
                    pass: "pw".into(),
                },
            }),
            root: None,
        });
        let names: Vec<_> = stack.handlers().iter().map(|h| h.name()).collect();
        assert_eq!(names, ["auth", "parser", "component"]);
        assert!(stack.handlers().iter().all(|h| h.is_active()));
    }

    #[test]
    fn one_failing_kind_does_not_affect_the_others() {
        let stack = middleware(MiddlewareOptions {
            parser: Some(ParserOptions { limit: 0 }),
            component: Some(ComponentOptions::default()),
            ..Default::default()
        });
        assert_eq!(stack.len(), 2);
        assert!(!stack.get("parser").unwrap().is_active());
        assert!(stack.get("component").unwrap().is_active());
        assert!(stack.get("auth").is_none());
    }
}
