//! Graceful Shutdown Handler
//!
//! Waits for an OS signal, then runs the compiled shutdown hooks.

use super::HookRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

/// Runs the shutdown hooks of a compiled application once a signal arrives
///
/// # Example
///
/// ```rust,no_run
/// use meshestra_compiler::compiler::ModuleCompiler;
/// use meshestra_compiler::lifecycle::ShutdownHandler;
/// use meshestra_compiler::module::{Module, ModuleDescriptor};
///
/// struct AppModule;
/// impl Module for AppModule {}
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let root = ModuleDescriptor::builder("AppModule", || AppModule).build();
/// let app = ModuleCompiler::new(root).compile().await?;
/// let handler = ShutdownHandler::new(app.hooks_handle());
///
/// tokio::spawn(async move {
///     handler.wait_for_shutdown().await;
///     std::process::exit(0);
/// });
/// # Ok(())
/// # }
/// ```
pub struct ShutdownHandler {
    hooks: Arc<HookRegistry>,
    timeout: Option<Duration>,
}

impl ShutdownHandler {
    pub fn new(hooks: Arc<HookRegistry>) -> Self {
        Self {
            hooks,
            timeout: None,
        }
    }

    /// Bound the time the shutdown hooks may take.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Wait for SIGTERM or Ctrl+C, then run the shutdown hooks.
    pub async fn wait_for_shutdown(&self) {
        shutdown_signal().await;
        self.shutdown().await;
    }

    /// Run the shutdown hooks without waiting for a signal.
    pub async fn shutdown(&self) {
        tracing::info!("Starting graceful shutdown...");

        let result = match self.timeout {
            Some(timeout) => self.hooks.run_shutdown_with_timeout(timeout).await,
            None => self.hooks.run_shutdown().await,
        };
        if let Err(e) = result {
            tracing::error!("Error during shutdown: {}", e);
        }

        tracing::info!("Graceful shutdown complete");
    }
}

/// Create a future that completes when a shutdown signal is received
///
/// # Example
///
/// ```rust,ignore
/// use meshestra_compiler::lifecycle::shutdown_signal;
///
/// tokio::select! {
///     _ = shutdown_signal() => {
///         println!("Shutdown signal received");
///     }
///     _ = server.serve() => {}
/// }
/// ```
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{HookKind, LifecycleError};
    use crate::module::{Module, ModuleId, ModuleInstance};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl Module for Counting {
        fn declared_hooks(&self) -> &'static [HookKind] {
            &[HookKind::OnShutdown]
        }

        async fn on_shutdown(&self) -> Result<(), LifecycleError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_shutdown_runs_hooks() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut hooks = HookRegistry::new();
        let instance: ModuleInstance = Arc::new(Counting(Arc::clone(&calls)));
        hooks.extract(&ModuleId::new("Counting"), &instance);

        ShutdownHandler::new(Arc::new(hooks))
            .with_timeout(Duration::from_secs(1))
            .shutdown()
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
