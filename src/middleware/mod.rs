//! Request middleware declared on modules, controllers and route handlers.
//!
//! The compiler turns raw [`MiddlewareItem`]s into [`PathMiddleware`] groups
//! keyed by path prefix. The routing layer consumes the resulting chain,
//! either directly or through [`MiddlewareLayer`].

use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response};
use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

mod composer;
mod consumer;
mod layer;

pub use composer::{extract_middleware, instantiate};
pub use consumer::{MiddlewareConfigProxy, MiddlewareConsumer};
pub use layer::{MiddlewareLayer, MiddlewareService};

/// A type-erased error for middleware
pub type MiddlewareError = Box<dyn std::error::Error + Send + Sync>;

/// Standard return type for middleware
pub type MiddlewareResult = Result<Response, MiddlewareError>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A middleware instance ready to be placed in a chain.
pub type MiddlewareHandler = Arc<dyn Middleware>;

/// Represents the rest of the chain
pub struct Next {
    run: Box<dyn FnOnce(Request<Body>) -> BoxFuture<'static, MiddlewareResult> + Send>,
}

impl Next {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Request<Body>) -> BoxFuture<'static, MiddlewareResult> + Send + 'static,
    {
        Self { run: Box::new(f) }
    }

    /// Execute the rest of the chain
    pub async fn run(self, request: Request<Body>) -> MiddlewareResult {
        (self.run)(request).await
    }
}

/// The Middleware trait
///
/// `handle` is the middleware's `use` method: it may inspect or rewrite the
/// request, short-circuit with its own response, or hand over to `next`.
///
/// # Example
/// ```
/// use meshestra_compiler::middleware::{Middleware, MiddlewareResult, Next};
/// use async_trait::async_trait;
/// use axum::{body::Body, http::Request};
///
/// #[derive(Default)]
/// struct RequestLogger;
///
/// #[async_trait]
/// impl Middleware for RequestLogger {
///     async fn handle(&self, request: Request<Body>, next: Next) -> MiddlewareResult {
///         tracing::info!(uri = %request.uri(), "request");
///         next.run(request).await
///     }
/// }
/// ```
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn handle(&self, request: Request<Body>, next: Next) -> MiddlewareResult;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Middleware backed by a plain function or closure.
pub struct FnMiddleware<F> {
    name: Cow<'static, str>,
    f: F,
}

#[async_trait]
impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Request<Body>, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MiddlewareResult> + Send + 'static,
{
    async fn handle(&self, request: Request<Body>, next: Next) -> MiddlewareResult {
        (self.f)(request, next).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A middleware type that is instantiated afresh each time it is applied.
#[derive(Clone)]
pub struct MiddlewareClass {
    name: &'static str,
    construct: Arc<dyn Fn() -> MiddlewareHandler + Send + Sync>,
}

impl MiddlewareClass {
    pub fn of<T: Middleware + Default>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            construct: Arc::new(|| Arc::new(T::default()) as MiddlewareHandler),
        }
    }

    pub fn new<F>(name: &'static str, construct: F) -> Self
    where
        F: Fn() -> MiddlewareHandler + Send + Sync + 'static,
    {
        Self {
            name,
            construct: Arc::new(construct),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn instantiate(&self) -> MiddlewareHandler {
        (self.construct)()
    }
}

impl fmt::Debug for MiddlewareClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MiddlewareClass").field(&self.name).finish()
    }
}

/// A raw middleware declaration, before instantiation.
#[derive(Clone)]
pub enum MiddlewareItem {
    /// Instantiated on use; its `handle` method becomes the handler.
    Class(MiddlewareClass),
    /// A function or an already bound instance, used as is.
    Function(MiddlewareHandler),
    /// Anything else. Silently dropped when the chain is composed.
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl MiddlewareItem {
    pub fn class<T: Middleware + Default>() -> Self {
        Self::Class(MiddlewareClass::of::<T>())
    }

    pub fn function<F, Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(Request<Body>, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = MiddlewareResult> + Send + 'static,
    {
        Self::Function(Arc::new(FnMiddleware {
            name: name.into(),
            f,
        }))
    }

    pub fn bound(middleware: impl Middleware) -> Self {
        Self::Function(Arc::new(middleware))
    }

    /// Turn the item into a handler; `None` for opaque items.
    pub fn to_handler(&self) -> Option<MiddlewareHandler> {
        match self {
            Self::Class(class) => Some(class.instantiate()),
            Self::Function(handler) => Some(Arc::clone(handler)),
            Self::Opaque(_) => None,
        }
    }
}

impl fmt::Debug for MiddlewareItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(class) => f.debug_tuple("Class").field(&class.name).finish(),
            Self::Function(handler) => f.debug_tuple("Function").field(&handler.name()).finish(),
            Self::Opaque(_) => f.write_str("Opaque"),
        }
    }
}

/// Middleware handlers applied to every request under a path prefix.
#[derive(Clone)]
pub struct PathMiddleware {
    path: String,
    handlers: Vec<MiddlewareHandler>,
    excluded: Vec<String>,
}

impl PathMiddleware {
    pub fn new(path: impl Into<String>, handlers: Vec<MiddlewareHandler>) -> Self {
        Self {
            path: path.into(),
            handlers,
            excluded: Vec::new(),
        }
    }

    pub fn excluding(mut self, paths: Vec<String>) -> Self {
        self.excluded = paths;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn handlers(&self) -> &[MiddlewareHandler] {
        &self.handlers
    }

    pub fn handler_names(&self) -> Vec<String> {
        self.handlers.iter().map(|h| h.name().to_string()).collect()
    }

    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Whether a request for `request_path` falls under this group.
    pub fn matches(&self, request_path: &str) -> bool {
        is_path_prefix(&self.path, request_path)
            && !self
                .excluded
                .iter()
                .any(|excluded| is_path_prefix(excluded, request_path))
    }
}

impl fmt::Debug for PathMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathMiddleware")
            .field("path", &self.path)
            .field("handlers", &self.handler_names())
            .field("excluded", &self.excluded)
            .finish()
    }
}

/// Flatten groups into `(path prefix, handler)` entries, preserving order.
pub fn entries(chain: &[PathMiddleware]) -> impl Iterator<Item = (&str, &MiddlewareHandler)> {
    chain
        .iter()
        .flat_map(|group| group.handlers.iter().map(move |h| (group.path(), h)))
}

/// Segment-aware prefix match: `/a` covers `/a` and `/a/b` but not `/ab`.
/// A `{param}` segment matches any single segment.
pub(crate) fn is_path_prefix(prefix: &str, path: &str) -> bool {
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    prefix
        .split('/')
        .filter(|s| !s.is_empty())
        .all(|expected| match segments.next() {
            Some(actual) => is_param(expected) || expected == actual,
            None => false,
        })
}

fn is_param(segment: &str) -> bool {
    segment.len() > 2 && segment.starts_with('{') && segment.ends_with('}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Noop;

    #[async_trait]
    impl Middleware for Noop {
        async fn handle(&self, request: Request<Body>, next: Next) -> MiddlewareResult {
            next.run(request).await
        }
    }

    #[test]
    fn test_path_prefix_is_segment_aware() {
        assert!(is_path_prefix("/a", "/a"));
        assert!(is_path_prefix("/a", "/a/b"));
        assert!(is_path_prefix("/a/", "/a/b"));
        assert!(is_path_prefix("", "/anything"));
        assert!(is_path_prefix("/", "/anything"));
        assert!(!is_path_prefix("/a", "/ab"));
        assert!(!is_path_prefix("/a/b", "/a"));
        assert!(is_path_prefix("/users/{id}", "/users/7/posts"));
        assert!(!is_path_prefix("/users/{id}", "/users"));
    }

    #[test]
    fn test_excluded_paths_do_not_match() {
        let group = PathMiddleware::new("/cats", vec![Arc::new(Noop) as MiddlewareHandler])
            .excluding(vec!["/cats/health".to_string()]);
        assert!(group.matches("/cats/1"));
        assert!(!group.matches("/cats/health"));
    }

    #[test]
    fn test_items_become_handlers() {
        let class = MiddlewareItem::class::<Noop>();
        let function = MiddlewareItem::function("passthrough", |req, next: Next| next.run(req));
        let opaque = MiddlewareItem::Opaque(Arc::new("not a middleware"));

        assert!(class.to_handler().unwrap().name().ends_with("Noop"));
        assert_eq!(function.to_handler().unwrap().name(), "passthrough");
        assert!(opaque.to_handler().is_none());
    }

    #[test]
    fn test_class_items_are_instantiated_each_time() {
        let class = MiddlewareClass::of::<Noop>();
        assert!(class.name().ends_with("Noop"));
        assert!(!Arc::ptr_eq(&class.instantiate(), &class.instantiate()));
    }

    #[test]
    fn test_entries_flatten_groups_in_order() {
        let chain = vec![
            PathMiddleware::new("/a", vec![]),
            PathMiddleware::new("/a/b", vec![Arc::new(Noop) as MiddlewareHandler]),
            PathMiddleware::new("/c", vec![Arc::new(Noop) as MiddlewareHandler, Arc::new(Noop)]),
        ];
        let paths: Vec<&str> = entries(&chain).map(|(path, _)| path).collect();
        assert_eq!(paths, vec!["/a/b", "/c", "/c"]);
    }
}
