//! Lifecycle Hooks Module
//!
//! Modules declare the hooks they implement through [`Module::declared_hooks`].
//! The compiler binds each declared hook to the module instance it built and
//! appends it to a [`HookRegistry`] in traversal order.
//!
//! # Lifecycle Phases
//!
//! ```text
//! 1. Module graph compilation
//!    ↓
//! 2. onStartup (each module, traversal order)   ← Lifecycle Hook
//!    ↓
//! [Running...]
//!    ↓
//! 3. Shutdown Signal (SIGTERM/SIGINT)
//!    ↓
//! 4. onShutdown (each module, traversal order)  ← Lifecycle Hook
//! ```
//!
//! [`Module::declared_hooks`]: crate::module::Module::declared_hooks

mod error;
mod hooks;
mod shutdown;

pub use error::{LifecycleError, Result};
pub use hooks::{BoundHook, HookKind, HookRegistry};
pub use shutdown::{ShutdownHandler, shutdown_signal};
