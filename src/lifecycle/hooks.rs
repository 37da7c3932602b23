//! Hook Registry
//!
//! Collects the lifecycle hooks of resolved modules and runs them.

use super::{LifecycleError, Result};
use crate::module::{ModuleId, ModuleInstance};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Lifecycle hooks a module may declare
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr, Serialize,
)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum HookKind {
    OnStartup,
    OnShutdown,
}

/// A hook bound to the module instance it was extracted from
#[derive(Clone)]
pub struct BoundHook {
    module: ModuleId,
    kind: HookKind,
    target: ModuleInstance,
}

impl BoundHook {
    pub fn new(module: ModuleId, kind: HookKind, target: ModuleInstance) -> Self {
        Self {
            module,
            kind,
            target,
        }
    }

    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    pub fn kind(&self) -> HookKind {
        self.kind
    }

    pub fn target(&self) -> &ModuleInstance {
        &self.target
    }

    pub async fn invoke(&self) -> Result<()> {
        match self.kind {
            HookKind::OnStartup => self.target.on_startup().await,
            HookKind::OnShutdown => self.target.on_shutdown().await,
        }
    }
}

impl fmt::Debug for BoundHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundHook")
            .field("module", &self.module)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Ordered hooks per kind, appended in module traversal order
///
/// # Example
///
/// ```rust,ignore
/// let app = ModuleCompiler::new(root).compile().await?;
///
/// app.hooks().run_startup().await?;
/// // ... application runs ...
/// app.hooks().run_shutdown().await?;
/// ```
#[derive(Clone, Debug, Default)]
pub struct HookRegistry {
    hooks: HashMap<HookKind, Vec<BoundHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every hook `instance` declares, once per kind.
    pub fn extract(&mut self, module: &ModuleId, instance: &ModuleInstance) {
        let mut seen = HashSet::new();
        for kind in instance.declared_hooks().iter().copied() {
            if !seen.insert(kind) {
                continue;
            }
            tracing::trace!(%module, hook = %kind, "Collected lifecycle hook");
            self.push(BoundHook::new(module.clone(), kind, Arc::clone(instance)));
        }
    }

    pub fn push(&mut self, hook: BoundHook) {
        self.hooks.entry(hook.kind).or_default().push(hook);
    }

    pub fn hooks(&self, kind: HookKind) -> &[BoundHook] {
        self.hooks.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Module ids in the order their hooks of `kind` were collected.
    pub fn order(&self, kind: HookKind) -> Vec<ModuleId> {
        self.hooks(kind).iter().map(|h| h.module.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.hooks.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Execute all startup hooks
    ///
    /// Hooks run in the order they were collected; the first failure aborts.
    pub async fn run_startup(&self) -> Result<()> {
        tracing::info!("Calling {} hooks...", HookKind::OnStartup);

        for hook in self.hooks(HookKind::OnStartup) {
            tracing::debug!("Starting: {}", hook.module);
            hook.invoke().await.map_err(|e| {
                tracing::error!("{} failed for {}: {}", HookKind::OnStartup, hook.module, e);
                LifecycleError::hook_failed(hook.module.clone(), HookKind::OnStartup, e.to_string())
            })?;
        }

        tracing::info!(
            "{} complete ({} hooks executed)",
            HookKind::OnStartup,
            self.hooks(HookKind::OnStartup).len()
        );
        Ok(())
    }

    pub async fn run_startup_with_timeout(&self, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.run_startup())
            .await
            .map_err(|_| {
                LifecycleError::timeout(HookKind::OnStartup, format!("Timeout after {:?}", timeout))
            })?
    }

    /// Execute all shutdown hooks
    ///
    /// Hooks run in the order they were collected. Failures are logged and
    /// the remaining hooks still run.
    pub async fn run_shutdown(&self) -> Result<()> {
        tracing::info!("Calling {} hooks...", HookKind::OnShutdown);

        for hook in self.hooks(HookKind::OnShutdown) {
            tracing::debug!("Shutting down: {}", hook.module);
            if let Err(e) = hook.invoke().await {
                tracing::error!("{} failed for {}: {}", HookKind::OnShutdown, hook.module, e);
            }
        }

        tracing::info!(
            "{} complete ({} hooks executed)",
            HookKind::OnShutdown,
            self.hooks(HookKind::OnShutdown).len()
        );
        Ok(())
    }

    pub async fn run_shutdown_with_timeout(&self, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.run_shutdown())
            .await
            .map_err(|_| {
                LifecycleError::timeout(
                    HookKind::OnShutdown,
                    format!("Timeout after {:?}", timeout),
                )
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Module;
    use async_trait::async_trait;
    use std::str::FromStr;
    use strum::IntoEnumIterator;
    use tokio::sync::RwLock;

    struct Recording {
        id: &'static str,
        fail_on: Option<HookKind>,
        log: Arc<RwLock<Vec<String>>>,
    }

    #[async_trait]
    impl Module for Recording {
        fn declared_hooks(&self) -> &'static [HookKind] {
            &[HookKind::OnStartup, HookKind::OnShutdown]
        }

        async fn on_startup(&self) -> Result<()> {
            self.log.write().await.push(format!("start:{}", self.id));
            match self.fail_on {
                Some(HookKind::OnStartup) => Err(LifecycleError::startup_failed("boom")),
                _ => Ok(()),
            }
        }

        async fn on_shutdown(&self) -> Result<()> {
            self.log.write().await.push(format!("stop:{}", self.id));
            match self.fail_on {
                Some(HookKind::OnShutdown) => Err(LifecycleError::shutdown_failed("boom")),
                _ => Ok(()),
            }
        }
    }

    struct Slow;

    #[async_trait]
    impl Module for Slow {
        fn declared_hooks(&self) -> &'static [HookKind] {
            &[HookKind::OnStartup]
        }

        async fn on_startup(&self) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
    }

    struct Silent;
    impl Module for Silent {}

    struct Repeating;

    impl Module for Repeating {
        fn declared_hooks(&self) -> &'static [HookKind] {
            &[HookKind::OnStartup, HookKind::OnShutdown, HookKind::OnStartup]
        }
    }

    fn registry(
        modules: &[(&'static str, Option<HookKind>)],
        log: &Arc<RwLock<Vec<String>>>,
    ) -> HookRegistry {
        let mut registry = HookRegistry::new();
        for (id, fail_on) in modules {
            let instance: ModuleInstance = Arc::new(Recording {
                id,
                fail_on: *fail_on,
                log: Arc::clone(log),
            });
            registry.extract(&ModuleId::new(*id), &instance);
        }
        registry
    }

    #[test]
    fn test_hook_names() {
        let names: Vec<String> = HookKind::iter().map(|k| k.to_string()).collect();
        assert_eq!(names, vec!["onStartup", "onShutdown"]);
        assert_eq!(HookKind::from_str("onShutdown").unwrap(), HookKind::OnShutdown);
    }

    #[test]
    fn test_extract_skips_modules_without_hooks() {
        let mut registry = HookRegistry::new();
        let instance: ModuleInstance = Arc::new(Silent);
        registry.extract(&ModuleId::new("Silent"), &instance);
        assert!(registry.is_empty());
        assert!(registry.hooks(HookKind::OnStartup).is_empty());
    }

    #[test]
    fn test_extract_binds_each_kind_once() {
        let mut registry = HookRegistry::new();
        let instance: ModuleInstance = Arc::new(Repeating);
        registry.extract(&ModuleId::new("Repeating"), &instance);

        assert_eq!(registry.hooks(HookKind::OnStartup).len(), 1);
        assert_eq!(registry.hooks(HookKind::OnShutdown).len(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_hooks_run_in_collection_order() {
        let log = Arc::new(RwLock::new(Vec::new()));
        let registry = registry(&[("A", None), ("B", None)], &log);

        registry.run_startup().await.unwrap();
        registry.run_shutdown().await.unwrap();

        assert_eq!(
            *log.read().await,
            vec!["start:A", "start:B", "stop:A", "stop:B"]
        );
        assert_eq!(registry.len(), 4);
    }

    #[tokio::test]
    async fn test_startup_failure_aborts() {
        let log = Arc::new(RwLock::new(Vec::new()));
        let registry = registry(&[("A", Some(HookKind::OnStartup)), ("B", None)], &log);

        let err = registry.run_startup().await.unwrap_err();

        assert!(matches!(
            err,
            LifecycleError::HookFailed { hook: HookKind::OnStartup, .. }
        ));
        assert_eq!(*log.read().await, vec!["start:A"]);
    }

    #[tokio::test]
    async fn test_shutdown_failure_continues() {
        let log = Arc::new(RwLock::new(Vec::new()));
        let registry = registry(&[("A", Some(HookKind::OnShutdown)), ("B", None)], &log);

        registry.run_shutdown().await.unwrap();

        assert_eq!(*log.read().await, vec!["stop:A", "stop:B"]);
    }

    #[tokio::test]
    async fn test_startup_timeout() {
        let mut registry = HookRegistry::new();
        let instance: ModuleInstance = Arc::new(Slow);
        registry.extract(&ModuleId::new("Slow"), &instance);

        let err = registry
            .run_startup_with_timeout(Duration::from_millis(10))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LifecycleError::Timeout { phase: HookKind::OnStartup, .. }
        ));
    }
}
