//! # Meshestra Compiler
//!
//! Module graph resolution and lifecycle-hook compilation for the Meshestra
//! dependency injection framework.
//!
//! Given a root [`ModuleDescriptor`], the [`ModuleCompiler`] resolves every
//! reachable module exactly once, builds its controllers and providers
//! through an [`InstanceResolver`], collects `onStartup`/`onShutdown` hooks in
//! traversal order and composes the middleware chain handed to the routing
//! layer.
//!
//! ## Features
//!
//! - **Memoized traversal**: one module object per module id, cycles rejected
//! - **Global modules**: exports of root-level global modules become visible
//!   to every module resolved after them
//! - **Async providers**: value or factory providers resolved before the
//!   module's other providers
//! - **Middleware composition**: module, controller and handler middleware
//!   flattened into path-prefixed groups, plus a tower [`Layer`] to run them
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use meshestra_compiler::prelude::*;
//!
//! struct UserRepository;
//!
//! impl Injectable for UserRepository {
//!     fn inject(_: &Injector<'_>) -> Result<Self, ResolveError> {
//!         Ok(Self)
//!     }
//! }
//!
//! struct UserModule;
//! impl Module for UserModule {}
//!
//! struct AppModule;
//! impl Module for AppModule {}
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let users = ModuleDescriptor::builder("UserModule", || UserModule)
//!         .provider(ProviderDescriptor::class::<UserRepository>())
//!         .build();
//!     let root = ModuleDescriptor::builder("AppModule", || AppModule)
//!         .import(users)
//!         .build();
//!
//!     let app = ModuleCompiler::new(root).compile().await?;
//!     app.run_startup().await?;
//!
//!     let _router: Router = Router::new().layer(app.layer());
//!     // Serve your app...
//!
//!     app.run_shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! [`ModuleDescriptor`]: module::ModuleDescriptor
//! [`ModuleCompiler`]: compiler::ModuleCompiler
//! [`InstanceResolver`]: di::InstanceResolver
//! [`Layer`]: tower::Layer

pub mod compiler;
pub mod config;
pub mod controller;
pub mod di;
pub mod error;
pub mod lifecycle;
pub mod middleware;
pub mod module;
pub mod report;

// Re-export core types
pub use compiler::{CompiledApplication, ModuleCompiler};
pub use config::{CompilerConfig, ConfigService};
pub use di::{Container, Injectable, InstanceResolver, Token};
pub use error::{CompileError, ResolveError, Result};
pub use module::{Module, ModuleDescriptor};

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;
pub use axum;

/// Prelude module for convenient imports
///
/// ```
/// use meshestra_compiler::prelude::*;
/// ```
pub mod prelude {
    pub use crate::compiler::{CompiledApplication, ModuleCompiler, ResolvedModule};
    pub use crate::config::{CompilerConfig, ConfigService};
    pub use crate::controller::{ControllerDescriptor, MethodDescriptor};
    pub use crate::di::{Container, Injectable, Injector, InstanceResolver, Token};
    pub use crate::error::{CompileError, ResolveError};
    pub use crate::lifecycle::{
        HookKind, HookRegistry, LifecycleError, ShutdownHandler, shutdown_signal,
    };
    pub use crate::middleware::{
        Middleware, MiddlewareConsumer, MiddlewareItem, MiddlewareLayer, MiddlewareResult, Next,
    };
    pub use crate::module::{
        AsyncFactory, AsyncProvider, Module, ModuleDescriptor, ModuleRef, ProviderDescriptor,
    };
    pub use async_trait::async_trait;
    pub use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        response::{IntoResponse, Response},
    };
    pub use std::sync::Arc;
}
