use crate::middleware::{MiddlewareItem, PathMiddleware};
use crate::module::{ModuleDescriptor, ProviderDescriptor};

/// Build a module's declarative middleware chain.
///
/// For every controller, in declaration order: one group at the controller
/// path holding the module's middleware providers followed by the
/// controller's own middleware, then one group per route handler at
/// `controller path + handler path` holding the handler's middleware.
pub fn extract_middleware(module: &ModuleDescriptor) -> Vec<PathMiddleware> {
    let module_items: Vec<MiddlewareItem> = module
        .providers()
        .iter()
        .filter_map(ProviderDescriptor::middleware_class)
        .cloned()
        .map(MiddlewareItem::Class)
        .collect();

    let mut chain = Vec::new();
    for controller in module.controllers() {
        chain.push(instantiate(
            controller.path(),
            module_items.iter().chain(controller.middleware_items()),
        ));

        for (method, route) in controller.handlers() {
            let path = format!("{}{}", controller.path(), route.path());
            tracing::trace!(controller = %controller.key(), handler = method.name(), %path, "Composing handler middleware");
            chain.push(instantiate(path, route.middleware_items()));
        }
    }
    chain
}

/// Instantiate raw items into a group. Items that are neither classes nor
/// functions are dropped.
pub fn instantiate<'a>(
    path: impl Into<String>,
    items: impl IntoIterator<Item = &'a MiddlewareItem>,
) -> PathMiddleware {
    let path = path.into();
    let handlers = items
        .into_iter()
        .filter_map(|item| {
            let handler = item.to_handler();
            if handler.is_none() {
                tracing::debug!(%path, "Dropping middleware item that is neither a class nor a function");
            }
            handler
        })
        .collect();
    PathMiddleware::new(path, handlers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{ControllerDescriptor, MethodDescriptor};
    use crate::di::{Injectable, Injector};
    use crate::error::ResolveError;
    use crate::middleware::{Middleware, MiddlewareResult, Next};
    use crate::module::Module;
    use async_trait::async_trait;
    use axum::{body::Body, http::Request};
    use std::sync::Arc;

    macro_rules! passthrough {
        ($name:ident) => {
            #[derive(Default)]
            struct $name;

            #[async_trait]
            impl Middleware for $name {
                async fn handle(&self, request: Request<Body>, next: Next) -> MiddlewareResult {
                    next.run(request).await
                }

                fn name(&self) -> &str {
                    stringify!($name)
                }
            }
        };
    }

    passthrough!(M1);
    passthrough!(M2);
    passthrough!(Guarded);

    struct AController;
    struct BController;

    impl Injectable for AController {
        fn inject(_: &Injector<'_>) -> Result<Self, ResolveError> {
            Ok(Self)
        }
    }

    impl Injectable for BController {
        fn inject(_: &Injector<'_>) -> Result<Self, ResolveError> {
            Ok(Self)
        }
    }

    struct FeatureModule;
    impl Module for FeatureModule {}

    fn shape(chain: &[PathMiddleware]) -> Vec<(String, Vec<String>)> {
        chain
            .iter()
            .map(|group| (group.path().to_string(), group.handler_names()))
            .collect()
    }

    #[test]
    fn test_controller_then_handler_paths() {
        let module = ModuleDescriptor::builder("FeatureModule", || FeatureModule)
            .controller(
                ControllerDescriptor::new::<AController>("/a").method(
                    MethodDescriptor::handler("get_b")
                        .path("/b")
                        .middleware(MiddlewareItem::class::<M2>()),
                ),
            )
            .build();

        assert_eq!(
            shape(&extract_middleware(&module)),
            vec![
                ("/a".to_string(), vec![]),
                ("/a/b".to_string(), vec!["M2".to_string()]),
            ]
        );
    }

    #[test]
    fn test_module_middleware_precedes_controller_middleware() {
        let module = ModuleDescriptor::builder("FeatureModule", || FeatureModule)
            .provider(ProviderDescriptor::middleware::<M1>())
            .controller(
                ControllerDescriptor::new::<AController>("/a")
                    .middleware(MiddlewareItem::class::<Guarded>())
                    .method(MethodDescriptor::handler("index")),
            )
            .controller(ControllerDescriptor::new::<BController>("/b"))
            .build();

        assert_eq!(
            shape(&extract_middleware(&module)),
            vec![
                ("/a".to_string(), vec!["M1".to_string(), "Guarded".to_string()]),
                ("/a".to_string(), vec![]),
                ("/b".to_string(), vec!["M1".to_string()]),
            ]
        );
    }

    #[test]
    fn test_functions_used_directly_and_opaque_items_dropped() {
        let module = ModuleDescriptor::builder("FeatureModule", || FeatureModule)
            .controller(
                ControllerDescriptor::new::<AController>("/a")
                    .middleware(MiddlewareItem::Opaque(Arc::new(42_u8)))
                    .middleware(MiddlewareItem::function("audit", |req, next: Next| {
                        next.run(req)
                    }))
                    .method(MethodDescriptor::helper("not_routed")),
            )
            .build();

        assert_eq!(
            shape(&extract_middleware(&module)),
            vec![("/a".to_string(), vec!["audit".to_string()])]
        );
    }

    #[test]
    fn test_module_without_controllers_has_no_chain() {
        let module = ModuleDescriptor::builder("FeatureModule", || FeatureModule)
            .provider(ProviderDescriptor::middleware::<M1>())
            .build();

        assert!(extract_middleware(&module).is_empty());
    }
}
