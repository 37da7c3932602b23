use crate::di::Token;
use crate::module::ModuleId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompileError>;

/// Errors raised by an instance resolver while constructing a component.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Dependency not found: {token} (requested from {scope})")]
    DependencyNotFound { token: Token, scope: String },

    #[error("Failed to downcast type: {type_name}")]
    DowncastFailed { type_name: String },

    #[error("Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    #[error("Construction of {token} failed: {source}")]
    Construction {
        token: Token,
        #[source]
        source: anyhow::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResolveError {
    pub fn construction(token: Token, source: impl Into<anyhow::Error>) -> Self {
        Self::Construction {
            token,
            source: source.into(),
        }
    }
}

/// Errors that abort a compile pass.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Cyclic module graph: {}", format_cycle(.cycle))]
    CyclicModuleGraph { cycle: Vec<ModuleId> },

    #[error("Invalid async provider {token} on {module}: {reason}")]
    InvalidAsyncProvider {
        module: ModuleId,
        token: Token,
        reason: &'static str,
    },

    #[error("Factory for {token} on {module} expects {param}, which is not an injectable export of its imports")]
    MissingInjectToken {
        module: ModuleId,
        token: Token,
        param: Token,
    },

    #[error("Factory for {token} on {module} failed: {source}")]
    Factory {
        module: ModuleId,
        token: Token,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

fn format_cycle(cycle: &[ModuleId]) -> String {
    cycle
        .iter()
        .map(ModuleId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}
