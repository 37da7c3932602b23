use crate::lifecycle::{HookKind, LifecycleError};
use async_trait::async_trait;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

mod descriptor;
mod provider;

pub use descriptor::{ModuleBuilder, ModuleDescriptor};
pub use provider::{AsyncFactory, AsyncProvider, FactoryArgs, ProviderDescriptor, ProviderKind};

/// Shared handle to a static module declaration.
pub type ModuleRef = Arc<ModuleDescriptor>;

/// A constructed module object.
pub type ModuleInstance = Arc<dyn Module>;

/// Identity of a module declaration, used as the registry key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ModuleId(Cow<'static, str>);

impl ModuleId {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for ModuleId {
    fn from(name: &'static str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ModuleId {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Trait for application modules
///
/// A module object is built once per compile pass. The hooks it lists in
/// [`Module::declared_hooks`] are bound to that instance and handed to the
/// bootstrap sequencer in traversal order.
///
/// # Example
/// ```
/// use meshestra_compiler::lifecycle::{HookKind, LifecycleError};
/// use meshestra_compiler::module::Module;
/// use async_trait::async_trait;
///
/// struct DatabaseModule;
///
/// #[async_trait]
/// impl Module for DatabaseModule {
///     fn declared_hooks(&self) -> &'static [HookKind] {
///         &[HookKind::OnStartup]
///     }
///
///     async fn on_startup(&self) -> Result<(), LifecycleError> {
///         tracing::info!("Connecting to database");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Module: Send + Sync + 'static {
    /// Hooks this module wants invoked by the bootstrap sequencer.
    fn declared_hooks(&self) -> &'static [HookKind] {
        &[]
    }

    async fn on_startup(&self) -> Result<(), LifecycleError> {
        Ok(())
    }

    async fn on_shutdown(&self) -> Result<(), LifecycleError> {
        Ok(())
    }
}
