use crate::di::{Instance, Token};
use crate::middleware::PathMiddleware;
use crate::module::{ModuleId, ModuleInstance, ModuleRef, ProviderDescriptor};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Everything a compile pass derived from one module declaration.
pub struct ResolvedModule {
    pub(crate) descriptor: ModuleRef,
    pub(crate) imports: Vec<ModuleId>,
    pub(crate) providers: Vec<ProviderDescriptor>,
    pub(crate) provider_instances: HashMap<Token, Instance>,
    pub(crate) middleware_instances: HashMap<Token, Instance>,
    pub(crate) controller_instances: HashMap<Token, Instance>,
    pub(crate) middlewares: Vec<PathMiddleware>,
    pub(crate) instance: ModuleInstance,
}

impl ResolvedModule {
    pub fn id(&self) -> &ModuleId {
        self.descriptor.id()
    }

    pub fn descriptor(&self) -> &ModuleRef {
        &self.descriptor
    }

    pub fn is_global(&self) -> bool {
        self.descriptor.is_global()
    }

    /// Effective imports: implicit global modules first, then declared ones.
    pub fn imports(&self) -> &[ModuleId] {
        &self.imports
    }

    /// Effective providers, with the resolved async provider (if any) first.
    pub fn providers(&self) -> &[ProviderDescriptor] {
        &self.providers
    }

    pub fn provider_instances(&self) -> &HashMap<Token, Instance> {
        &self.provider_instances
    }

    pub fn middleware_instances(&self) -> &HashMap<Token, Instance> {
        &self.middleware_instances
    }

    pub fn controller_instances(&self) -> &HashMap<Token, Instance> {
        &self.controller_instances
    }

    /// Downcast a provider instance of this module.
    pub fn provider<T: Send + Sync + 'static>(&self, token: &Token) -> Option<Arc<T>> {
        self.provider_instances
            .get(token)?
            .clone()
            .downcast::<T>()
            .ok()
    }

    pub fn controller<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.controller_instances
            .get(&Token::of::<T>())?
            .clone()
            .downcast::<T>()
            .ok()
    }

    /// The module's declarative middleware chain.
    pub fn middlewares(&self) -> &[PathMiddleware] {
        &self.middlewares
    }

    pub fn instance(&self) -> &ModuleInstance {
        &self.instance
    }

    /// Keys of `instances` in effective provider order.
    pub(crate) fn ordered_keys(&self, instances: &HashMap<Token, Instance>) -> Vec<Token> {
        self.providers
            .iter()
            .map(ProviderDescriptor::key)
            .filter(|key| instances.contains_key(*key))
            .cloned()
            .collect()
    }
}

impl fmt::Debug for ResolvedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedModule")
            .field("id", self.id())
            .field("imports", &self.imports)
            .field("providers", &self.ordered_keys(&self.provider_instances))
            .field("middleware", &self.ordered_keys(&self.middleware_instances))
            .field("controllers", &self.controller_instances.len())
            .field("middlewares", &self.middlewares)
            .finish()
    }
}

/// Resolved modules of one compile pass, in registration order.
///
/// Holds at most one entry per module id.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    order: Vec<ModuleId>,
    modules: HashMap<ModuleId, ResolvedModule>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, module: ResolvedModule) {
        let id = module.id().clone();
        if self.modules.insert(id.clone(), module).is_none() {
            self.order.push(id);
        }
    }

    /// Swap the stored module object, keeping everything else.
    pub(crate) fn replace_instance(&mut self, id: &ModuleId, instance: ModuleInstance) -> bool {
        match self.modules.get_mut(id) {
            Some(module) => {
                module.instance = instance;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &ModuleId) -> Option<&ResolvedModule> {
        self.modules.get(id)
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.modules.contains_key(id)
    }

    pub fn ids(&self) -> &[ModuleId] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedModule> {
        self.order.iter().filter_map(|id| self.modules.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
