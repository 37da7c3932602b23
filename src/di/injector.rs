use crate::di::{Container, Injectable, Instance, InstanceResolver, ModuleScope, Token};
use crate::error::ResolveError;
use std::cell::RefCell;
use std::sync::Arc;

/// Handle given to constructors for pulling their dependencies.
///
/// Lookups are restricted to the providers of the scope the component is
/// being built in. Missing dependencies are constructed on demand, in the
/// scope of the module that declares them, and cached in the container.
pub struct Injector<'a> {
    container: &'a Container,
    scope: &'a ModuleScope,
    path: &'a RefCell<Vec<Token>>,
}

impl<'a> Injector<'a> {
    pub(crate) fn new(
        container: &'a Container,
        scope: &'a ModuleScope,
        path: &'a RefCell<Vec<Token>>,
    ) -> Self {
        Self {
            container,
            scope,
            path,
        }
    }

    /// Resolve a class-shaped dependency.
    pub fn resolve<T: Injectable>(&self) -> Result<Arc<T>, ResolveError> {
        self.get(&Token::of::<T>())
    }

    /// Resolve the dependency registered under `token` and downcast it.
    pub fn get<T: Send + Sync + 'static>(&self, token: &Token) -> Result<Arc<T>, ResolveError> {
        self.instance(token)?
            .downcast::<T>()
            .map_err(|_| ResolveError::DowncastFailed {
                type_name: std::any::type_name::<T>().to_string(),
            })
    }

    /// Resolve the dependency registered under `token` without downcasting.
    pub fn instance(&self, token: &Token) -> Result<Instance, ResolveError> {
        let scope: &'a ModuleScope = self.scope;
        if let Some((component, owner)) = scope.locate(token) {
            return self.container.construct_in(token, component, owner, self.path);
        }
        if self.scope.is_detached() {
            if let Some(instance) = self.container.lookup(token) {
                return Ok(instance);
            }
        }
        Err(ResolveError::DependencyNotFound {
            token: token.clone(),
            scope: self.scope.to_string(),
        })
    }

    pub fn scope(&self) -> &ModuleScope {
        self.scope
    }
}
