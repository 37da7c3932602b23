use crate::controller::ControllerDescriptor;
use crate::middleware::MiddlewareConsumer;
use crate::module::{AsyncProvider, Module, ModuleId, ModuleInstance, ModuleRef, ProviderDescriptor};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

type ConstructModuleFn = Arc<dyn Fn() -> ModuleInstance + Send + Sync>;
type ConfigureFn = Arc<dyn Fn(&mut MiddlewareConsumer) + Send + Sync>;
type ForwardFn = Arc<dyn Fn() -> Option<ModuleRef> + Send + Sync>;

/// An import entry as declared.
#[derive(Clone)]
enum Import {
    Eager(Option<ModuleRef>),
    /// Looked up when the imports are read, so that two modules can refer
    /// to each other.
    Forward(ForwardFn),
}

impl Import {
    fn get(&self) -> Option<ModuleRef> {
        match self {
            Self::Eager(module) => module.clone(),
            Self::Forward(lookup) => lookup(),
        }
    }
}

/// Static declaration of a module.
///
/// Descriptors are immutable once built and may be shared between compile
/// passes; everything a pass derives from them lives in its own registry.
pub struct ModuleDescriptor {
    id: ModuleId,
    imports: Vec<Import>,
    providers: Vec<ProviderDescriptor>,
    controllers: Vec<ControllerDescriptor>,
    global: bool,
    async_provider: Option<AsyncProvider>,
    construct: ConstructModuleFn,
    configure: Option<ConfigureFn>,
}

impl ModuleDescriptor {
    pub fn builder<M, F>(id: impl Into<ModuleId>, construct: F) -> ModuleBuilder<M>
    where
        M: Module,
        F: Fn() -> M + Send + Sync + 'static,
    {
        ModuleBuilder {
            id: id.into(),
            imports: Vec::new(),
            providers: Vec::new(),
            controllers: Vec::new(),
            global: false,
            async_provider: None,
            construct: Arc::new(construct),
            configure: None,
        }
    }

    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    /// Declared imports with empty entries dropped and duplicates removed.
    pub fn imports(&self) -> Vec<ModuleRef> {
        let mut seen = HashSet::new();
        self.imports
            .iter()
            .filter_map(Import::get)
            .filter(|m| seen.insert(m.id().clone()))
            .collect()
    }

    /// Declared imports as written, including empty entries.
    pub fn raw_imports(&self) -> Vec<Option<ModuleRef>> {
        self.imports.iter().map(Import::get).collect()
    }

    pub fn providers(&self) -> &[ProviderDescriptor] {
        &self.providers
    }

    pub fn controllers(&self) -> &[ControllerDescriptor] {
        &self.controllers
    }

    pub fn is_global(&self) -> bool {
        self.global
    }

    pub fn async_provider(&self) -> Option<&AsyncProvider> {
        self.async_provider.as_ref()
    }

    pub fn has_configure(&self) -> bool {
        self.configure.is_some()
    }

    /// Build a new module object.
    pub fn instantiate(&self) -> ModuleInstance {
        (self.construct)()
    }

    /// Run the `configure` hook on a throwaway instance. Returns `false` when
    /// the module declares none.
    pub fn configure(&self, consumer: &mut MiddlewareConsumer) -> bool {
        match &self.configure {
            Some(configure) => {
                configure(consumer);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("id", &self.id)
            .field(
                "imports",
                &self.imports().iter().map(|m| m.id().clone()).collect::<Vec<_>>(),
            )
            .field("providers", &self.providers)
            .field("controllers", &self.controllers)
            .field("global", &self.global)
            .field("async_provider", &self.async_provider)
            .field("configure", &self.configure.is_some())
            .finish()
    }
}

/// Builder for [`ModuleDescriptor`]
///
/// # Example
/// ```
/// use meshestra_compiler::module::{Module, ModuleDescriptor};
///
/// struct ConfigModule;
/// impl Module for ConfigModule {}
///
/// struct AppModule;
/// impl Module for AppModule {}
///
/// let config = ModuleDescriptor::builder("ConfigModule", || ConfigModule)
///     .global()
///     .build();
///
/// let app = ModuleDescriptor::builder("AppModule", || AppModule)
///     .import(config)
///     .build();
///
/// assert_eq!(app.imports().len(), 1);
/// ```
pub struct ModuleBuilder<M> {
    id: ModuleId,
    imports: Vec<Import>,
    providers: Vec<ProviderDescriptor>,
    controllers: Vec<ControllerDescriptor>,
    global: bool,
    async_provider: Option<AsyncProvider>,
    construct: Arc<dyn Fn() -> M + Send + Sync>,
    configure: Option<ConfigureFn>,
}

impl<M: Module> ModuleBuilder<M> {
    pub fn import(mut self, module: ModuleRef) -> Self {
        self.imports.push(Import::Eager(Some(module)));
        self
    }

    /// Import a module that may be absent, e.g. behind a runtime switch.
    pub fn import_optional(mut self, module: Option<ModuleRef>) -> Self {
        self.imports.push(Import::Eager(module));
        self
    }

    pub fn imports(mut self, modules: impl IntoIterator<Item = ModuleRef>) -> Self {
        self.imports
            .extend(modules.into_iter().map(|m| Import::Eager(Some(m))));
        self
    }

    /// Import a module that is not built yet. `lookup` runs every time the
    /// imports are read; a `None` result is treated like an empty entry.
    pub fn import_forward<F>(mut self, lookup: F) -> Self
    where
        F: Fn() -> Option<ModuleRef> + Send + Sync + 'static,
    {
        self.imports.push(Import::Forward(Arc::new(lookup)));
        self
    }

    pub fn provider(mut self, provider: ProviderDescriptor) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn providers(mut self, providers: impl IntoIterator<Item = ProviderDescriptor>) -> Self {
        self.providers.extend(providers);
        self
    }

    pub fn controller(mut self, controller: ControllerDescriptor) -> Self {
        self.controllers.push(controller);
        self
    }

    /// Make this module's exports visible to every module resolved after it.
    pub fn global(mut self) -> Self {
        self.global = true;
        self
    }

    pub fn async_provider(mut self, provider: AsyncProvider) -> Self {
        self.async_provider = Some(provider);
        self
    }

    /// Register manual, path-scoped middleware.
    ///
    /// The hook receives a fresh module object, separate from the one kept in
    /// the compiled registry.
    pub fn configure<F>(mut self, configure: F) -> Self
    where
        F: Fn(&M, &mut MiddlewareConsumer) + Send + Sync + 'static,
    {
        let construct = Arc::clone(&self.construct);
        self.configure = Some(Arc::new(move |consumer: &mut MiddlewareConsumer| {
            let fresh = construct();
            configure(&fresh, consumer);
        }));
        self
    }

    pub fn build(self) -> ModuleRef {
        let construct = self.construct;
        Arc::new(ModuleDescriptor {
            id: self.id,
            imports: self.imports,
            providers: self.providers,
            controllers: self.controllers,
            global: self.global,
            async_provider: self.async_provider,
            construct: Arc::new(move || Arc::new(construct()) as ModuleInstance),
            configure: self.configure,
        })
    }
}
