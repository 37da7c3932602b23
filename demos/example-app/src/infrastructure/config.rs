use meshestra_compiler::prelude::*;

pub const DATABASE_URL: &str = "DATABASE_URL";

/// Global module exposing settings read from the environment.
pub struct ConfigModule;

impl Module for ConfigModule {}

pub fn config_module() -> ModuleRef {
    let service = ConfigService::new();
    let url = service
        .get(DATABASE_URL)
        .unwrap_or_else(|| "postgres://localhost:5432/app".to_string());

    ModuleDescriptor::builder("ConfigModule", || ConfigModule)
        .provider(ProviderDescriptor::value(Token::of::<ConfigService>(), service))
        .async_provider(AsyncProvider::new(DATABASE_URL).use_value(url))
        .global()
        .build()
}
