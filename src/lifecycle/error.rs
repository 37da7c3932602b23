//! Lifecycle-specific error types

use crate::lifecycle::HookKind;
use crate::module::ModuleId;
use thiserror::Error;

/// Errors that can occur while running lifecycle hooks
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A module failed to start
    #[error("Startup failed: {0}")]
    StartupFailed(String),

    /// A module failed to shut down
    #[error("Shutdown failed: {0}")]
    ShutdownFailed(String),

    /// Operation timed out
    #[error("Timeout during {phase}: {message}")]
    Timeout {
        /// The hook phase where the timeout occurred
        phase: HookKind,
        /// Additional error message
        message: String,
    },

    /// Hook execution failed
    #[error("{hook} failed for {module}: {message}")]
    HookFailed {
        /// Module whose hook failed
        module: ModuleId,
        /// The hook that failed
        hook: HookKind,
        /// Error message
        message: String,
    },
}

impl LifecycleError {
    /// Create a startup failure error
    pub fn startup_failed(msg: impl Into<String>) -> Self {
        Self::StartupFailed(msg.into())
    }

    /// Create a shutdown failure error
    pub fn shutdown_failed(msg: impl Into<String>) -> Self {
        Self::ShutdownFailed(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(phase: HookKind, message: impl Into<String>) -> Self {
        Self::Timeout {
            phase,
            message: message.into(),
        }
    }

    /// Create a hook failure error
    pub fn hook_failed(module: ModuleId, hook: HookKind, message: impl Into<String>) -> Self {
        Self::HookFailed {
            module,
            hook,
            message: message.into(),
        }
    }
}

/// A specialized Result type for lifecycle operations
pub type Result<T> = std::result::Result<T, LifecycleError>;
