use crate::di::{Injectable, Injector, Instance, Token};
use crate::error::ResolveError;
use std::fmt;
use std::sync::Arc;

/// Constructor invoked by a resolver, given the injector for the current scope.
pub type ConstructFn =
    Arc<dyn Fn(&Injector<'_>) -> Result<Instance, ResolveError> + Send + Sync>;

/// Something a resolver knows how to turn into an instance.
#[derive(Clone)]
pub enum Component {
    /// Class-shaped: constructed from its dependencies, keyed by its type.
    Class { key: Token, construct: ConstructFn },
    /// Token-bound: a value or factory registered under an explicit token.
    Factory { token: Token, produce: ConstructFn },
}

impl Component {
    pub fn class<T: Injectable>() -> Self {
        Self::Class {
            key: Token::of::<T>(),
            construct: Arc::new(|injector: &Injector<'_>| -> Result<Instance, ResolveError> {
                Ok(Arc::new(T::inject(injector)?) as Instance)
            }),
        }
    }

    pub fn factory<T, F>(token: impl Into<Token>, produce: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Injector<'_>) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        Self::Factory {
            token: token.into(),
            produce: Arc::new(move |injector: &Injector<'_>| -> Result<Instance, ResolveError> {
                Ok(Arc::new(produce(injector)?) as Instance)
            }),
        }
    }

    /// A token bound to an already built instance.
    pub fn value(token: impl Into<Token>, instance: Instance) -> Self {
        Self::Factory {
            token: token.into(),
            produce: Arc::new(move |_: &Injector<'_>| -> Result<Instance, ResolveError> {
                Ok(Arc::clone(&instance))
            }),
        }
    }

    pub fn key(&self) -> &Token {
        match self {
            Self::Class { key, .. } => key,
            Self::Factory { token, .. } => token,
        }
    }

    pub fn is_class(&self) -> bool {
        matches!(self, Self::Class { .. })
    }

    pub(crate) fn construct(&self, injector: &Injector<'_>) -> Result<Instance, ResolveError> {
        match self {
            Self::Class { construct, .. } => construct(injector),
            Self::Factory { produce, .. } => produce(injector),
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class { key, .. } => f.debug_tuple("Class").field(key).finish(),
            Self::Factory { token, .. } => f.debug_tuple("Factory").field(token).finish(),
        }
    }
}
