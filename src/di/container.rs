use crate::di::{Component, Injector, InstanceResolver, Instance, ModuleScope, Token};
use crate::error::ResolveError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::cell::RefCell;
use std::sync::Arc;

/// Thread-safe instance cache and default [`InstanceResolver`].
///
/// Holds at most one instance per token. Components are constructed on demand
/// through the scope they are requested from.
#[derive(Clone, Default)]
pub struct Container {
    instances: Arc<DashMap<Token, Instance>>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pre-built instance under its type token.
    pub fn register<T: 'static + Send + Sync>(&self, instance: T) -> &Self {
        self.register_instance(Token::of::<T>(), Arc::new(instance))
    }

    pub fn register_instance(&self, token: Token, instance: Instance) -> &Self {
        self.instances.insert(token, instance);
        self
    }

    pub fn get<T: 'static + Send + Sync>(&self, token: &Token) -> Option<Arc<T>> {
        self.lookup(token)?.downcast::<T>().ok()
    }

    pub fn contains(&self, token: &Token) -> bool {
        self.instances.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub(crate) fn construct_in(
        &self,
        key: &Token,
        component: &Component,
        scope: &ModuleScope,
        path: &RefCell<Vec<Token>>,
    ) -> Result<Instance, ResolveError> {
        if let Some(existing) = self.lookup(key) {
            return Ok(existing);
        }

        if path.borrow().contains(key) {
            let mut cycle: Vec<String> = path.borrow().iter().map(Token::to_string).collect();
            cycle.push(key.to_string());
            return Err(ResolveError::CircularDependency {
                cycle: cycle.join(" -> "),
            });
        }

        path.borrow_mut().push(key.clone());
        let built = component.construct(&Injector::new(self, scope, path));
        path.borrow_mut().pop();

        let instance = built?;
        tracing::trace!(token = %key, scope = %scope, "Constructed instance");
        self.instances.insert(key.clone(), Arc::clone(&instance));
        Ok(instance)
    }
}

#[async_trait]
impl InstanceResolver for Container {
    async fn resolve(
        &self,
        component: &Component,
        scope: &ModuleScope,
    ) -> Result<Instance, ResolveError> {
        let path = RefCell::new(Vec::new());
        self.construct_in(component.key(), component, scope, &path)
    }

    async fn resolve_token(
        &self,
        component: &Component,
        token: &Token,
    ) -> Result<Instance, ResolveError> {
        let path = RefCell::new(Vec::new());
        self.construct_in(token, component, &ModuleScope::detached(), &path)
    }

    fn lookup(&self, token: &Token) -> Option<Instance> {
        self.instances.get(token).map(|entry| Arc::clone(entry.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::di::Injectable;
    use crate::module::ModuleId;

    struct Repository {
        value: i32,
    }

    impl Injectable for Repository {
        fn inject(_: &Injector<'_>) -> Result<Self, ResolveError> {
            Ok(Self { value: 42 })
        }
    }

    struct Service {
        repository: Arc<Repository>,
    }

    impl Injectable for Service {
        fn inject(injector: &Injector<'_>) -> Result<Self, ResolveError> {
            Ok(Self {
                repository: injector.resolve::<Repository>()?,
            })
        }
    }

    struct Facade {
        service: Arc<Service>,
    }

    impl Injectable for Facade {
        fn inject(injector: &Injector<'_>) -> Result<Self, ResolveError> {
            Ok(Self {
                service: injector.resolve::<Service>()?,
            })
        }
    }

    struct Left;
    struct Right;

    impl Injectable for Left {
        fn inject(injector: &Injector<'_>) -> Result<Self, ResolveError> {
            injector.resolve::<Right>()?;
            Ok(Self)
        }
    }

    impl Injectable for Right {
        fn inject(injector: &Injector<'_>) -> Result<Self, ResolveError> {
            injector.resolve::<Left>()?;
            Ok(Self)
        }
    }

    fn scope(components: Vec<Component>) -> ModuleScope {
        ModuleScope::new(ModuleId::new("TestModule"), components)
    }

    #[test]
    fn test_register_and_get() {
        let container = Container::new();
        container.register(Repository { value: 7 });
        let repository = container.get::<Repository>(&Token::of::<Repository>()).unwrap();
        assert_eq!(repository.value, 7);
    }

    #[tokio::test]
    async fn test_resolve_builds_dependencies_on_demand() {
        let container = Container::new();
        let scope = scope(vec![Component::class::<Service>(), Component::class::<Repository>()]);

        let instance = container
            .resolve(&Component::class::<Service>(), &scope)
            .await
            .unwrap();
        let service = instance.downcast::<Service>().unwrap();

        assert_eq!(service.repository.value, 42);
        assert!(container.contains(&Token::of::<Repository>()));
        assert_eq!(container.len(), 2);
    }

    #[tokio::test]
    async fn test_exported_component_uses_its_declaring_scope() {
        let container = Container::new();
        let db = ModuleScope::new(ModuleId::new("Db"), vec![Component::class::<Repository>()]);
        let storage =
            ModuleScope::new(ModuleId::new("Storage"), vec![Component::class::<Service>()])
                .with_imports(vec![db]);
        let root = ModuleScope::new(ModuleId::new("Root"), vec![Component::class::<Facade>()])
            .with_imports(vec![storage]);

        assert!(root.contains(&Token::of::<Service>()));
        assert!(!root.contains(&Token::of::<Repository>()));

        let instance = container
            .resolve(&Component::class::<Facade>(), &root)
            .await
            .unwrap();

        assert_eq!(instance.downcast::<Facade>().unwrap().service.repository.value, 42);
    }

    #[tokio::test]
    async fn test_resolve_caches_one_instance_per_token() {
        let container = Container::new();
        let scope = scope(vec![Component::class::<Repository>()]);
        let component = Component::class::<Repository>();

        let first = container.resolve(&component, &scope).await.unwrap();
        let second = container.resolve(&component, &scope).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_invisible_dependency_is_not_found() {
        let container = Container::new();
        let scope = scope(vec![Component::class::<Service>()]);

        let err = container
            .resolve(&Component::class::<Service>(), &scope)
            .await
            .err()
            .unwrap();

        assert!(matches!(err, ResolveError::DependencyNotFound { .. }));
    }

    #[tokio::test]
    async fn test_circular_dependency_is_reported() {
        let container = Container::new();
        let scope = scope(vec![Component::class::<Left>(), Component::class::<Right>()]);

        let err = container
            .resolve(&Component::class::<Left>(), &scope)
            .await
            .err()
            .unwrap();

        assert!(matches!(err, ResolveError::CircularDependency { .. }));
    }

    #[tokio::test]
    async fn test_resolve_token_uses_given_token() {
        let container = Container::new();
        let component = Component::value("CONFIG", Arc::new(String::from("on")));

        container
            .resolve_token(&component, &Token::new("CONFIG"))
            .await
            .unwrap();

        let value = container.get::<String>(&Token::new("CONFIG")).unwrap();
        assert_eq!(value.as_str(), "on");
    }
}
