use super::ModuleCompiler;
use crate::di::Token;
use crate::error::{CompileError, Result};
use crate::module::{FactoryArgs, ModuleDescriptor, ModuleRef, ProviderDescriptor};

impl ModuleCompiler {
    /// Turn the module's async provider, if any, into an injectable value
    /// provider. The caller prepends it to the module's providers.
    pub(super) async fn resolve_async_provider(
        &self,
        module: &ModuleDescriptor,
        imports: &[ModuleRef],
    ) -> Result<Option<ProviderDescriptor>> {
        let Some(provider) = module.async_provider() else {
            return Ok(None);
        };
        let invalid = |reason: &'static str| CompileError::InvalidAsyncProvider {
            module: module.id().clone(),
            token: provider.token().clone(),
            reason,
        };

        let factory = match (provider.value(), provider.factory()) {
            (Some(_), Some(_)) => return Err(invalid("both a value and a factory are set")),
            (None, None) => return Err(invalid("neither a value nor a factory is set")),
            (Some(value), None) => {
                tracing::debug!(module = %module.id(), token = %provider.token(), "Using async provider value");
                return Ok(Some(ProviderDescriptor::injectable_value(
                    provider.token().clone(),
                    value.clone(),
                )));
            }
            (None, Some(factory)) => factory,
        };

        // Only inject tokens that some import exports as an injectable provider.
        let exports: Vec<(&ModuleRef, ProviderDescriptor)> = imports
            .iter()
            .flat_map(|import| {
                self.exports_of(import)
                    .into_iter()
                    .map(move |export| (import, export))
            })
            .collect();
        let inject: Vec<&Token> = provider
            .inject_tokens()
            .iter()
            .filter(|token| exports.iter().any(|(_, export)| export.key() == *token))
            .collect();

        let mut args = FactoryArgs::default();
        for param in factory.params() {
            let owner = exports
                .iter()
                .find(|(_, export)| export.key() == param)
                .filter(|_| inject.contains(&param));

            let Some((import, export)) = owner else {
                if self.config.strict_inject {
                    return Err(CompileError::MissingInjectToken {
                        module: module.id().clone(),
                        token: provider.token().clone(),
                        param: param.clone(),
                    });
                }
                tracing::debug!(module = %module.id(), %param, "Leaving factory parameter unsupplied");
                continue;
            };

            let instance = match self.resolver.lookup(param) {
                Some(instance) => instance,
                None => {
                    let scope = self.import_scope(import);
                    self.resolve_component(export.component(), &scope).await?
                }
            };
            args.insert(param.clone(), instance);
        }

        tracing::debug!(
            module = %module.id(),
            token = %provider.token(),
            args = args.len(),
            "Invoking async provider factory"
        );
        let value = factory
            .invoke(args)
            .await
            .map_err(|source| CompileError::Factory {
                module: module.id().clone(),
                token: provider.token().clone(),
                source,
            })?;

        Ok(Some(ProviderDescriptor::injectable_value(
            provider.token().clone(),
            value,
        )))
    }
}
