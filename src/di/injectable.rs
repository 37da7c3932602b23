use crate::di::Injector;
use crate::error::ResolveError;

/// Trait for types that can be constructed by a resolver
///
/// Dependencies are pulled from the injector, which only sees the providers
/// visible to the module the component is declared in.
///
/// # Example
/// ```
/// use meshestra_compiler::di::{Injectable, Injector};
/// use meshestra_compiler::error::ResolveError;
/// use std::sync::Arc;
///
/// pub struct UserRepository;
///
/// impl Injectable for UserRepository {
///     fn inject(_: &Injector<'_>) -> Result<Self, ResolveError> {
///         Ok(Self)
///     }
/// }
///
/// pub struct UserService {
///     repository: Arc<UserRepository>,
/// }
///
/// impl Injectable for UserService {
///     fn inject(injector: &Injector<'_>) -> Result<Self, ResolveError> {
///         Ok(Self {
///             repository: injector.resolve::<UserRepository>()?,
///         })
///     }
/// }
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Create an instance by resolving dependencies from the injector
    ///
    /// # Errors
    /// Returns an error if any required dependency is not visible or fails to build.
    fn inject(injector: &Injector<'_>) -> Result<Self, ResolveError>;
}
