use crate::di::{Component, Injectable, Injector, Instance, Token};
use crate::error::ResolveError;
use crate::middleware::{BoxFuture, Middleware, MiddlewareClass};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// How the compiler treats a provider declaration.
#[derive(Clone, Debug)]
pub enum ProviderKind {
    /// Kept as a raw descriptor only; never instantiated.
    Plain,
    /// Instantiated into the module's provider instances.
    Injectable,
    /// Instantiated into the module's middleware instances, and applied to
    /// every controller of the module.
    Middleware(MiddlewareClass),
}

#[derive(Clone, Debug)]
pub struct ProviderDescriptor {
    component: Component,
    kind: ProviderKind,
}

impl ProviderDescriptor {
    pub fn class<T: Injectable>() -> Self {
        Self {
            component: Component::class::<T>(),
            kind: ProviderKind::Injectable,
        }
    }

    pub fn factory<T, F>(token: impl Into<Token>, produce: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Injector<'_>) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        Self {
            component: Component::factory(token, produce),
            kind: ProviderKind::Injectable,
        }
    }

    pub fn value<T: Send + Sync + 'static>(token: impl Into<Token>, value: T) -> Self {
        Self::injectable_value(token, Arc::new(value))
    }

    /// Wrap an already built instance as an injectable, token-keyed provider.
    pub fn injectable_value(token: impl Into<Token>, instance: Instance) -> Self {
        Self {
            component: Component::value(token, instance),
            kind: ProviderKind::Injectable,
        }
    }

    pub fn middleware<T: Middleware + Default>() -> Self {
        Self {
            component: Component::Class {
                key: Token::of::<T>(),
                construct: Arc::new(|_: &Injector<'_>| -> Result<Instance, ResolveError> {
                    Ok(Arc::new(T::default()))
                }),
            },
            kind: ProviderKind::Middleware(MiddlewareClass::of::<T>()),
        }
    }

    /// Drop the injectable marker.
    pub fn untagged(mut self) -> Self {
        self.kind = ProviderKind::Plain;
        self
    }

    pub fn key(&self) -> &Token {
        self.component.key()
    }

    pub fn component(&self) -> &Component {
        &self.component
    }

    pub fn kind(&self) -> &ProviderKind {
        &self.kind
    }

    pub fn is_injectable(&self) -> bool {
        !matches!(self.kind, ProviderKind::Plain)
    }

    pub fn is_middleware(&self) -> bool {
        matches!(self.kind, ProviderKind::Middleware(_))
    }

    pub fn middleware_class(&self) -> Option<&MiddlewareClass> {
        match &self.kind {
            ProviderKind::Middleware(class) => Some(class),
            _ => None,
        }
    }
}

/// Arguments handed to an async factory, keyed by parameter token.
#[derive(Clone, Default)]
pub struct FactoryArgs {
    values: HashMap<Token, Instance>,
}

impl FactoryArgs {
    pub(crate) fn insert(&mut self, token: Token, instance: Instance) {
        self.values.insert(token, instance);
    }

    pub fn get<T: Send + Sync + 'static>(&self, token: &Token) -> Option<Arc<T>> {
        self.values.get(token)?.clone().downcast::<T>().ok()
    }

    pub fn require<T: Send + Sync + 'static>(&self, token: &Token) -> anyhow::Result<Arc<T>> {
        self.get(token).ok_or_else(|| {
            anyhow::anyhow!(
                "factory argument {} was not supplied as {}",
                token,
                std::any::type_name::<T>()
            )
        })
    }

    pub fn contains(&self, token: &Token) -> bool {
        self.values.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

type FactoryFuture = BoxFuture<'static, anyhow::Result<Instance>>;
type FactoryFn = Arc<dyn Fn(FactoryArgs) -> FactoryFuture + Send + Sync>;

/// Factory of an async provider.
///
/// Synchronous and asynchronous factories share this one type; both are
/// invoked by awaiting [`AsyncFactory::invoke`].
#[derive(Clone)]
pub struct AsyncFactory {
    params: Vec<Token>,
    call: FactoryFn,
}

impl AsyncFactory {
    pub fn new<T, F, Fut>(params: impl IntoIterator<Item = Token>, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(FactoryArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self {
            params: params.into_iter().collect(),
            call: Arc::new(move |args: FactoryArgs| -> FactoryFuture {
                let pending = factory(args);
                Box::pin(async move { Ok(Arc::new(pending.await?) as Instance) })
            }),
        }
    }

    pub fn sync<T, F>(params: impl IntoIterator<Item = Token>, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(FactoryArgs) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self {
            params: params.into_iter().collect(),
            call: Arc::new(move |args: FactoryArgs| -> FactoryFuture {
                let built = factory(args).map(|value| Arc::new(value) as Instance);
                Box::pin(std::future::ready(built))
            }),
        }
    }

    /// Tokens of the parameters this factory expects.
    pub fn params(&self) -> &[Token] {
        &self.params
    }

    pub async fn invoke(&self, args: FactoryArgs) -> anyhow::Result<Instance> {
        (self.call)(args).await
    }
}

impl fmt::Debug for AsyncFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncFactory")
            .field("params", &self.params)
            .finish()
    }
}

/// A token-bound provider built before the module's other providers.
///
/// Exactly one of a value or a factory must be set.
///
/// # Example
/// ```
/// use meshestra_compiler::di::Token;
/// use meshestra_compiler::module::{AsyncFactory, AsyncProvider};
///
/// let provider = AsyncProvider::new("DATABASE_URL").use_factory(AsyncFactory::new(
///     [],
///     |_| async { Ok(String::from("postgres://localhost/app")) },
/// ));
///
/// assert_eq!(provider.token(), &Token::new("DATABASE_URL"));
/// ```
#[derive(Clone)]
pub struct AsyncProvider {
    token: Token,
    value: Option<Instance>,
    factory: Option<AsyncFactory>,
    inject: Vec<Token>,
}

impl AsyncProvider {
    pub fn new(token: impl Into<Token>) -> Self {
        Self {
            token: token.into(),
            value: None,
            factory: None,
            inject: Vec::new(),
        }
    }

    pub fn use_value<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.value = Some(Arc::new(value));
        self
    }

    pub fn use_factory(mut self, factory: AsyncFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Tokens the factory may receive from the module's imports.
    pub fn inject(mut self, tokens: impl IntoIterator<Item = Token>) -> Self {
        self.inject.extend(tokens);
        self
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn value(&self) -> Option<&Instance> {
        self.value.as_ref()
    }

    pub fn factory(&self) -> Option<&AsyncFactory> {
        self.factory.as_ref()
    }

    pub fn inject_tokens(&self) -> &[Token] {
        &self.inject
    }
}

impl fmt::Debug for AsyncProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncProvider")
            .field("token", &self.token)
            .field("value", &self.value.is_some())
            .field("factory", &self.factory)
            .field("inject", &self.inject)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_async_factory_is_awaited() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let factory = AsyncFactory::new([], move |_| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(7_u32)
            }
        });

        let value = factory.invoke(FactoryArgs::default()).await.unwrap();
        assert_eq!(*value.downcast::<u32>().unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sync_factory_shares_the_async_path() {
        let factory = AsyncFactory::sync([Token::new("PORT")], |args| {
            let port = args.require::<u16>(&Token::new("PORT"))?;
            Ok(format!("0.0.0.0:{}", port))
        });

        let mut args = FactoryArgs::default();
        args.insert(Token::new("PORT"), Arc::new(8080_u16));

        let value = factory.invoke(args).await.unwrap();
        assert_eq!(value.downcast::<String>().unwrap().as_str(), "0.0.0.0:8080");
    }

    #[tokio::test]
    async fn test_require_reports_missing_argument() {
        let factory = AsyncFactory::sync([Token::new("PORT")], |args| {
            args.require::<u16>(&Token::new("PORT")).map(|port| *port)
        });

        let err = factory.invoke(FactoryArgs::default()).await.err().unwrap();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_untagged_provider_is_not_injectable() {
        let provider = ProviderDescriptor::value("FLAG", true).untagged();
        assert!(!provider.is_injectable());
        assert!(!provider.is_middleware());
        assert_eq!(provider.key(), &Token::new("FLAG"));
    }
}
