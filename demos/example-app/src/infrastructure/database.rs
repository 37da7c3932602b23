use super::config::DATABASE_URL;
use meshestra_compiler::prelude::*;
use std::collections::HashMap;
use std::sync::RwLock;

pub const DATABASE: &str = "DATABASE";

/// In-memory stand-in for a connection pool.
pub struct Database {
    url: String,
    rows: RwLock<HashMap<u64, String>>,
}

impl Database {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        tracing::info!("Connecting to {}", url);
        let rows = HashMap::from([(1, "alice".to_string()), (2, "bob".to_string())]);
        Ok(Self {
            url: url.to_string(),
            rows: RwLock::new(rows),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn find(&self, id: u64) -> Option<String> {
        self.rows.read().ok()?.get(&id).cloned()
    }

    pub fn all(&self) -> Vec<(u64, String)> {
        let mut rows: Vec<(u64, String)> = self
            .rows
            .read()
            .map(|rows| rows.iter().map(|(id, name)| (*id, name.clone())).collect())
            .unwrap_or_default();
        rows.sort();
        rows
    }
}

pub struct DatabaseModule;

#[async_trait]
impl Module for DatabaseModule {
    fn declared_hooks(&self) -> &'static [HookKind] {
        &[HookKind::OnStartup, HookKind::OnShutdown]
    }

    async fn on_startup(&self) -> Result<(), LifecycleError> {
        tracing::info!("Database module ready");
        Ok(())
    }

    async fn on_shutdown(&self) -> Result<(), LifecycleError> {
        tracing::info!("Closing database connections");
        Ok(())
    }
}

pub fn database_module() -> ModuleRef {
    ModuleDescriptor::builder("DatabaseModule", || DatabaseModule)
        .async_provider(
            AsyncProvider::new(DATABASE)
                .use_factory(AsyncFactory::new([Token::new(DATABASE_URL)], |args| async move {
                    let url = args.require::<String>(&Token::new(DATABASE_URL))?;
                    Database::connect(&url).await
                }))
                .inject([Token::new(DATABASE_URL)]),
        )
        .global()
        .build()
}
