//! Controller declarations.
//!
//! A controller is resolved like any class provider. Its base path, its own
//! middleware and the middleware of each route handler feed the module's
//! middleware chain.

use crate::di::{Component, Injectable, Token};
use crate::middleware::MiddlewareItem;

#[derive(Clone, Debug)]
pub struct ControllerDescriptor {
    component: Component,
    path: String,
    middleware: Vec<MiddlewareItem>,
    methods: Vec<MethodDescriptor>,
}

impl ControllerDescriptor {
    pub fn new<T: Injectable>(path: impl Into<String>) -> Self {
        Self::from_component(Component::class::<T>(), path)
    }

    pub fn from_component(component: Component, path: impl Into<String>) -> Self {
        Self {
            component,
            path: path.into(),
            middleware: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn middleware(mut self, item: MiddlewareItem) -> Self {
        self.middleware.push(item);
        self
    }

    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    pub fn key(&self) -> &Token {
        self.component.key()
    }

    pub fn component(&self) -> &Component {
        &self.component
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn middleware_items(&self) -> &[MiddlewareItem] {
        &self.middleware
    }

    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    /// Methods that are route handlers, in declaration order.
    pub fn handlers(&self) -> impl Iterator<Item = (&MethodDescriptor, &RouteMeta)> {
        self.methods
            .iter()
            .filter_map(|method| method.route.as_ref().map(|route| (method, route)))
    }
}

/// A method on a controller, optionally exposed as a route handler.
#[derive(Clone, Debug)]
pub struct MethodDescriptor {
    name: String,
    route: Option<RouteMeta>,
}

impl MethodDescriptor {
    /// A route handler with no path suffix and no middleware yet.
    pub fn handler(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            route: Some(RouteMeta::default()),
        }
    }

    /// A helper method that is not routed.
    pub fn helper(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            route: None,
        }
    }

    /// Path suffix of the route. Helpers stay unrouted.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        if let Some(route) = self.route.as_mut() {
            route.path = Some(path.into());
        }
        self
    }

    /// Middleware guarding the route. Helpers stay unrouted.
    pub fn middleware(mut self, item: MiddlewareItem) -> Self {
        if let Some(route) = self.route.as_mut() {
            route.middleware.push(item);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_handler(&self) -> bool {
        self.route.is_some()
    }

    pub fn route(&self) -> Option<&RouteMeta> {
        self.route.as_ref()
    }
}

#[derive(Clone, Debug, Default)]
pub struct RouteMeta {
    path: Option<String>,
    middleware: Vec<MiddlewareItem>,
}

impl RouteMeta {
    pub fn path(&self) -> &str {
        self.path.as_deref().unwrap_or("")
    }

    pub fn middleware_items(&self) -> &[MiddlewareItem] {
        &self.middleware
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::di::Injector;
    use crate::error::ResolveError;

    struct CatsController;

    impl Injectable for CatsController {
        fn inject(_: &Injector<'_>) -> Result<Self, ResolveError> {
            Ok(Self)
        }
    }

    #[test]
    fn test_handlers_skip_helpers() {
        let controller = ControllerDescriptor::new::<CatsController>("/cats")
            .method(MethodDescriptor::handler("find_all"))
            .method(MethodDescriptor::helper("validate"))
            .method(MethodDescriptor::handler("find_one").path("/{id}"));

        let handlers: Vec<(&str, &str)> = controller
            .handlers()
            .map(|(method, route)| (method.name(), route.path()))
            .collect();

        assert_eq!(handlers, vec![("find_all", ""), ("find_one", "/{id}")]);
        assert_eq!(controller.methods().len(), 3);
        assert_eq!(controller.key(), &Token::of::<CatsController>());
    }

    #[test]
    fn test_route_options_leave_helpers_unrouted() {
        let helper = MethodDescriptor::helper("validate").path("/validate");
        assert!(!helper.is_handler());

        let controller = ControllerDescriptor::new::<CatsController>("/cats").method(helper);
        assert_eq!(controller.handlers().count(), 0);
    }
}
