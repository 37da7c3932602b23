//! Module graph compiler.
//!
//! Walks the import graph from a root module, resolving each module's
//! controllers and providers through an [`InstanceResolver`], building one
//! module object per module id, collecting lifecycle hooks in pre-order and
//! composing middleware chains.
//!
//! # Example
//! ```
//! use meshestra_compiler::compiler::ModuleCompiler;
//! use meshestra_compiler::module::{Module, ModuleDescriptor};
//!
//! struct AppModule;
//! impl Module for AppModule {}
//!
//! # #[tokio::main]
//! # async fn main() {
//! let root = ModuleDescriptor::builder("AppModule", || AppModule).build();
//! let app = ModuleCompiler::new(root).compile().await.unwrap();
//!
//! assert_eq!(app.modules().len(), 1);
//! # }
//! ```

use crate::config::CompilerConfig;
use crate::di::{Component, Container, Instance, InstanceResolver, ModuleScope, Token};
use crate::error::{CompileError, Result};
use crate::lifecycle::{self, HookRegistry};
use crate::middleware::{
    BoxFuture, MiddlewareConsumer, MiddlewareLayer, PathMiddleware, extract_middleware,
};
use crate::module::{ModuleId, ModuleRef, ProviderDescriptor};
use crate::report::GraphReport;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

mod async_provider;
mod registry;


pub use registry::{ModuleRegistry, ResolvedModule};

/// One compile pass over a module graph.
///
/// A compiler is consumed by [`ModuleCompiler::compile`]; build a new one
/// for every pass.
pub struct ModuleCompiler {
    root: ModuleRef,
    resolver: Arc<dyn InstanceResolver>,
    config: CompilerConfig,
    pass_id: Uuid,
    registry: ModuleRegistry,
    hooks: HookRegistry,
    consumer: MiddlewareConsumer,
    globals: Vec<ModuleRef>,
    /// Modules entered but not yet finished, outermost first.
    stack: Vec<ModuleId>,
}

/// What resolving a module's providers and controllers yields.
struct ResolvedProviders {
    providers: Vec<ProviderDescriptor>,
    provider_instances: HashMap<Token, Instance>,
    middleware_instances: HashMap<Token, Instance>,
    controller_instances: HashMap<Token, Instance>,
    middlewares: Vec<PathMiddleware>,
}

impl ModuleCompiler {
    /// A compiler backed by a fresh [`Container`].
    pub fn new(root: ModuleRef) -> Self {
        Self::with_resolver(root, Arc::new(Container::new()))
    }

    pub fn with_resolver(root: ModuleRef, resolver: Arc<dyn InstanceResolver>) -> Self {
        Self {
            root,
            resolver,
            config: CompilerConfig::default(),
            pass_id: Uuid::new_v4(),
            registry: ModuleRegistry::new(),
            hooks: HookRegistry::new(),
            consumer: MiddlewareConsumer::new(),
            globals: Vec::new(),
            stack: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn pass_id(&self) -> Uuid {
        self.pass_id
    }

    /// Resolve the whole graph reachable from the root module.
    pub async fn compile(mut self) -> Result<CompiledApplication> {
        let root = Arc::clone(&self.root);
        tracing::info!(pass = %self.pass_id, root = %root.id(), "Compiling module graph");

        self.resolve_module(Arc::clone(&root), Vec::new(), true)
            .await
            .inspect_err(|e| tracing::error!(pass = %self.pass_id, "Compilation failed: {}", e))?;

        tracing::info!(
            pass = %self.pass_id,
            modules = self.registry.len(),
            hooks = self.hooks.len(),
            "Module graph compiled"
        );

        Ok(CompiledApplication {
            pass_id: self.pass_id,
            compiled_at: Utc::now(),
            root: root.id().clone(),
            modules: self.registry,
            hooks: Arc::new(self.hooks),
            configured: self.consumer.into_registrations(),
            resolver: self.resolver,
            config: self.config,
        })
    }

    fn resolve_module(
        &mut self,
        module: ModuleRef,
        implicit: Vec<ModuleRef>,
        is_root: bool,
    ) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let id = module.id().clone();
            self.stack.push(id.clone());

            let imports = effective_imports(&module, &implicit);
            tracing::debug!(pass = %self.pass_id, module = %id, imports = imports.len(), "Resolving module");

            let resolved = self.resolve_providers_of(&module, &imports).await?;

            let instance = module.instantiate();
            self.hooks.extract(&id, &instance);
            self.registry.insert(ResolvedModule {
                descriptor: Arc::clone(&module),
                imports: imports.iter().map(|m| m.id().clone()).collect(),
                providers: resolved.providers,
                provider_instances: resolved.provider_instances,
                middleware_instances: resolved.middleware_instances,
                controller_instances: resolved.controller_instances,
                middlewares: resolved.middlewares,
                instance,
            });

            if is_root {
                for global in imports.iter().filter(|m| m.is_global()) {
                    let implicit = self.globals.clone();
                    self.visit_import(global, implicit, false).await?;
                    if !self.is_global_module(global.id()) {
                        tracing::debug!(module = %global.id(), "Registered global module");
                        self.globals.push(Arc::clone(global));
                    }
                }
            }

            for import in &imports {
                if self.is_global_module(import.id()) {
                    continue;
                }
                let implicit = self.globals.clone();
                self.visit_import(import, implicit, true).await?;
            }

            self.stack.pop();
            Ok(())
        })
    }

    async fn visit_import(
        &mut self,
        import: &ModuleRef,
        implicit: Vec<ModuleRef>,
        reinstantiate: bool,
    ) -> Result<()> {
        if let Some(start) = self.stack.iter().position(|id| id == import.id()) {
            let mut cycle = self.stack[start..].to_vec();
            cycle.push(import.id().clone());
            return Err(CompileError::CyclicModuleGraph { cycle });
        }

        if self.registry.contains(import.id()) {
            tracing::trace!(module = %import.id(), "Import already resolved, skipping");
            return Ok(());
        }

        self.resolve_module(Arc::clone(import), implicit, false).await?;

        if reinstantiate && self.config.reinstantiate_imports {
            tracing::warn!(module = %import.id(), "Re-instantiating resolved import");
            let instance = import.instantiate();
            self.hooks.extract(import.id(), &instance);
            self.registry.replace_instance(import.id(), instance);
        }
        Ok(())
    }

    /// Controllers, then middleware, then the async provider, then the
    /// injectable providers.
    async fn resolve_providers_of(
        &mut self,
        module: &ModuleRef,
        imports: &[ModuleRef],
    ) -> Result<ResolvedProviders> {
        let scope = self.scope_of(module, module.providers(), imports);
        let mut controller_instances = HashMap::new();
        for controller in module.controllers() {
            let instance = self.resolve_component(controller.component(), &scope).await?;
            controller_instances.insert(controller.key().clone(), instance);
        }

        let middlewares = extract_middleware(module);
        if module.configure(&mut self.consumer) {
            tracing::debug!(module = %module.id(), "Ran configure hook");
        }

        let mut providers = module.providers().to_vec();
        if let Some(provider) = self.resolve_async_provider(module, imports).await? {
            providers.insert(0, provider);
        }

        let scope = self.scope_of(module, &providers, imports);
        let mut provider_instances = HashMap::new();
        let mut middleware_instances = HashMap::new();
        for provider in providers.iter().filter(|p| p.is_injectable()) {
            let instance = self.resolve_component(provider.component(), &scope).await?;
            tracing::debug!(module = %module.id(), provider = %provider.key(), "Resolved provider");
            let target = if provider.is_middleware() {
                &mut middleware_instances
            } else {
                &mut provider_instances
            };
            target.insert(provider.key().clone(), instance);
        }

        Ok(ResolvedProviders {
            providers,
            provider_instances,
            middleware_instances,
            controller_instances,
            middlewares,
        })
    }

    async fn resolve_component(
        &self,
        component: &Component,
        scope: &ModuleScope,
    ) -> Result<Instance> {
        let instance = if component.is_class() {
            self.resolver.resolve(component, scope).await?
        } else {
            self.resolver.resolve_token(component, component.key()).await?
        };
        Ok(instance)
    }

    fn is_global_module(&self, id: &ModuleId) -> bool {
        self.globals.iter().any(|g| g.id() == id)
    }

    /// Injectable providers an import makes visible to its importers.
    fn exports_of(&self, import: &ModuleRef) -> Vec<ProviderDescriptor> {
        let providers = match self.registry.get(import.id()) {
            Some(resolved) => resolved.providers(),
            None => import.providers(),
        };
        providers.iter().filter(|p| p.is_injectable()).cloned().collect()
    }

    /// The module's own injectable providers followed by its imports' exports.
    fn scope_of(
        &self,
        module: &ModuleRef,
        providers: &[ProviderDescriptor],
        imports: &[ModuleRef],
    ) -> ModuleScope {
        let mut entered = vec![module.id().clone()];
        self.build_scope(module, providers, imports, &mut entered)
    }

    /// Each import gets its own nested scope. `entered` holds the modules on
    /// the current path so forward-import cycles terminate.
    fn build_scope(
        &self,
        module: &ModuleRef,
        providers: &[ProviderDescriptor],
        imports: &[ModuleRef],
        entered: &mut Vec<ModuleId>,
    ) -> ModuleScope {
        let mut nested = Vec::with_capacity(imports.len());
        for import in imports {
            if entered.contains(import.id()) {
                continue;
            }
            entered.push(import.id().clone());
            let (exports, transitive) = self.view_of(import);
            nested.push(self.build_scope(import, &exports, &transitive, entered));
            entered.pop();
        }

        let own = providers
            .iter()
            .filter(|p| p.is_injectable())
            .map(|p| p.component().clone());
        ModuleScope::new(module.id().clone(), own).with_imports(nested)
    }

    /// Providers and effective imports of `import`, as resolved so far.
    fn view_of(&self, import: &ModuleRef) -> (Vec<ProviderDescriptor>, Vec<ModuleRef>) {
        match self.registry.get(import.id()) {
            Some(resolved) => {
                let imports = resolved
                    .imports()
                    .iter()
                    .filter_map(|id| self.registry.get(id))
                    .map(|m| Arc::clone(m.descriptor()))
                    .collect();
                (resolved.providers().to_vec(), imports)
            }
            None => (import.providers().to_vec(), effective_imports(import, &self.globals)),
        }
    }

    /// The scope an import resolves its own components in.
    fn import_scope(&self, import: &ModuleRef) -> ModuleScope {
        let (providers, imports) = self.view_of(import);
        self.scope_of(import, &providers, &imports)
    }
}

/// Implicit imports first, without the module itself, then declared ones.
fn effective_imports(module: &ModuleRef, implicit: &[ModuleRef]) -> Vec<ModuleRef> {
    let mut seen = HashSet::new();
    implicit
        .iter()
        .filter(|m| m.id() != module.id())
        .cloned()
        .chain(module.imports())
        .filter(|m| seen.insert(m.id().clone()))
        .collect()
}

/// The output of a compile pass.
pub struct CompiledApplication {
    pass_id: Uuid,
    compiled_at: DateTime<Utc>,
    root: ModuleId,
    modules: ModuleRegistry,
    hooks: Arc<HookRegistry>,
    configured: Vec<PathMiddleware>,
    resolver: Arc<dyn InstanceResolver>,
    config: CompilerConfig,
}

impl CompiledApplication {
    pub fn pass_id(&self) -> Uuid {
        self.pass_id
    }

    pub fn compiled_at(&self) -> DateTime<Utc> {
        self.compiled_at
    }

    pub fn root(&self) -> &ModuleId {
        &self.root
    }

    pub fn root_module(&self) -> Option<&ResolvedModule> {
        self.modules.get(&self.root)
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    pub fn module(&self, id: &ModuleId) -> Option<&ResolvedModule> {
        self.modules.get(id)
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// Shared handle to the hooks, e.g. for a [`ShutdownHandler`].
    ///
    /// [`ShutdownHandler`]: crate::lifecycle::ShutdownHandler
    pub fn hooks_handle(&self) -> Arc<HookRegistry> {
        Arc::clone(&self.hooks)
    }

    pub fn resolver(&self) -> &Arc<dyn InstanceResolver> {
        &self.resolver
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// An instance the resolver built during the pass.
    pub fn get<T: Send + Sync + 'static>(&self, token: &Token) -> Option<Arc<T>> {
        self.resolver.lookup(token)?.downcast::<T>().ok()
    }

    /// Declarative middleware of every module, in traversal order.
    pub fn middlewares(&self) -> Vec<PathMiddleware> {
        self.modules
            .iter()
            .flat_map(|m| m.middlewares().iter().cloned())
            .collect()
    }

    /// Middleware registered through `configure` hooks.
    pub fn configured(&self) -> &[PathMiddleware] {
        &self.configured
    }

    /// Declarative middleware followed by configured middleware.
    pub fn chain(&self) -> Vec<PathMiddleware> {
        let mut chain = self.middlewares();
        chain.extend(self.configured.iter().cloned());
        chain
    }

    pub fn layer(&self) -> MiddlewareLayer {
        MiddlewareLayer::new(self.chain())
    }

    /// Every module reachable through effective imports, excluding `id`
    /// itself, in depth-first order.
    pub fn import_closure(&self, id: &ModuleId) -> Vec<ModuleId> {
        let mut seen = HashSet::from([id.clone()]);
        let mut closure = Vec::new();
        let mut pending: Vec<ModuleId> = match self.modules.get(id) {
            Some(module) => module.imports().iter().rev().cloned().collect(),
            None => return closure,
        };

        while let Some(next) = pending.pop() {
            if !seen.insert(next.clone()) {
                continue;
            }
            if let Some(module) = self.modules.get(&next) {
                pending.extend(module.imports().iter().rev().cloned());
            }
            closure.push(next);
        }
        closure
    }

    pub async fn run_startup(&self) -> lifecycle::Result<()> {
        match self.config.hook_timeout() {
            Some(timeout) => self.hooks.run_startup_with_timeout(timeout).await,
            None => self.hooks.run_startup().await,
        }
    }

    pub async fn run_shutdown(&self) -> lifecycle::Result<()> {
        match self.config.hook_timeout() {
            Some(timeout) => self.hooks.run_shutdown_with_timeout(timeout).await,
            None => self.hooks.run_shutdown().await,
        }
    }

    pub fn report(&self) -> GraphReport {
        GraphReport::from_application(self)
    }
}
