use crate::di::{Component, Instance, Token};
use crate::error::ResolveError;
use crate::module::ModuleId;
use async_trait::async_trait;
use std::fmt;

/// The providers a module can see while its components are being constructed.
///
/// This is the module's own injectable providers followed by the injectable
/// providers exported by its (effective) imports. Each import keeps its own
/// scope, so an exported provider is built where it was declared.
#[derive(Clone, Default)]
pub struct ModuleScope {
    module: Option<ModuleId>,
    providers: Vec<Component>,
    imports: Vec<ModuleScope>,
}

impl ModuleScope {
    pub fn new(module: ModuleId, providers: impl IntoIterator<Item = Component>) -> Self {
        Self {
            module: Some(module),
            providers: providers.into_iter().collect(),
            imports: Vec::new(),
        }
    }

    /// A scope not bound to any module; only already cached instances are reachable.
    pub fn detached() -> Self {
        Self::default()
    }

    /// Attach the scopes of the module's imports, in import order.
    pub fn with_imports(mut self, imports: impl IntoIterator<Item = ModuleScope>) -> Self {
        self.imports.extend(imports);
        self
    }

    pub fn module(&self) -> Option<&ModuleId> {
        self.module.as_ref()
    }

    pub fn imports(&self) -> &[ModuleScope] {
        &self.imports
    }

    pub fn is_detached(&self) -> bool {
        self.module.is_none()
    }

    /// First visible component registered under `token`.
    pub fn find(&self, token: &Token) -> Option<&Component> {
        self.locate(token).map(|(component, _)| component)
    }

    /// First visible component registered under `token`, with the scope it
    /// must be constructed in.
    pub fn locate(&self, token: &Token) -> Option<(&Component, &ModuleScope)> {
        if let Some(own) = self.own(token) {
            return Some((own, self));
        }
        self.imports
            .iter()
            .find_map(|import| import.own(token).map(|exported| (exported, import)))
    }

    fn own(&self, token: &Token) -> Option<&Component> {
        self.providers.iter().find(|c| c.key() == token)
    }

    pub fn contains(&self, token: &Token) -> bool {
        self.find(token).is_some()
    }

    /// Visible tokens: own providers first, then each import's exports.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.providers
            .iter()
            .chain(self.imports.iter().flat_map(|import| import.providers.iter()))
            .map(Component::key)
    }

    pub fn len(&self) -> usize {
        self.tokens().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for ModuleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.module {
            Some(module) => write!(f, "{}", module),
            None => f.write_str("<detached>"),
        }
    }
}

/// Capability the module compiler consumes to build providers and controllers.
///
/// Implementations own their instance cache and their internal dependency
/// resolution; the compiler only asks for instances and stores what it gets.
#[async_trait]
pub trait InstanceResolver: Send + Sync {
    /// Resolve a component with the providers visible in `scope`.
    async fn resolve(
        &self,
        component: &Component,
        scope: &ModuleScope,
    ) -> Result<Instance, ResolveError>;

    /// Resolve a token-bound component, caching the result under `token`.
    async fn resolve_token(
        &self,
        component: &Component,
        token: &Token,
    ) -> Result<Instance, ResolveError>;

    /// An already resolved instance, if any.
    fn lookup(&self, token: &Token) -> Option<Instance>;
}
