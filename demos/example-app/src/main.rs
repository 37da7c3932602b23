use meshestra_compiler::module::ModuleId;
use meshestra_compiler::prelude::*;

mod app_module;
mod infrastructure;
mod modules;

use app_module::app_module;
use infrastructure::database::{DATABASE, Database};
use modules::user::UserController;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    tracing::info!("🚀 Starting Example App...");

    // 1. Compile the module graph
    let config = CompilerConfig::from_env()?;
    let app = ModuleCompiler::new(app_module())
        .with_config(config)
        .compile()
        .await?;
    tracing::info!("Module graph:\n{}", app.report().to_json_pretty()?);

    // 2. Run startup hooks
    app.run_startup().await?;

    if let Some(database) = app.get::<Database>(&Token::new(DATABASE)) {
        tracing::info!("Database at {}", database.url());
    }

    // 3. Create Router
    let user_controller = app
        .module(&ModuleId::new("UserModule"))
        .and_then(|module| module.controller::<UserController>())
        .ok_or_else(|| anyhow::anyhow!("UserController was not resolved"))?;

    let router = Router::new()
        .nest(
            UserController::base_path(),
            UserController::router(user_controller),
        )
        .layer(app.layer());

    // 4. Start server with graceful shutdown
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{}:{}", host, port);

    tracing::info!("✅ Server running on http://127.0.0.1:{}", port);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("🛑 Initiating graceful shutdown...");
    if let Err(e) = app.run_shutdown().await {
        tracing::error!("Error during shutdown: {}", e);
    }

    tracing::info!("👋 Server stopped");
    Ok(())
}
