use crate::infrastructure::config::config_module;
use crate::infrastructure::database::database_module;
use crate::modules::user::user_module;
use meshestra_compiler::prelude::*;

pub struct AppModule;

#[async_trait]
impl Module for AppModule {
    fn declared_hooks(&self) -> &'static [HookKind] {
        &[HookKind::OnStartup, HookKind::OnShutdown]
    }

    async fn on_startup(&self) -> Result<(), LifecycleError> {
        tracing::info!("Application bootstrapped");
        Ok(())
    }

    async fn on_shutdown(&self) -> Result<(), LifecycleError> {
        tracing::info!("Application shutting down");
        Ok(())
    }
}

pub fn app_module() -> ModuleRef {
    ModuleDescriptor::builder("AppModule", || AppModule)
        .import(user_module())
        .import(config_module())
        .import(database_module())
        .build()
}
