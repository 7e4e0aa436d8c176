use anyhow::Context;
use shelf_app::{open_storage, register_all};
use shelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load shelf settings")?;
    shelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        backend = ?settings.database.backend,
        db = %shelf_db::sanitize_connection_url(&settings.database.url),
        "shelf bootstrap starting"
    );

    let storage = open_storage(&settings.database).await?;

    let mut registry = ModuleRegistry::new();
    register_all(&mut registry, storage.store.clone(), &settings.server.api_prefix);

    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;

    let served = shelf_http::start_server(&registry, &settings).await;

    if let Err(e) = registry.stop_modules().await {
        tracing::error!(error = %e, "module shutdown failed");
    }
    if let Some(pool) = &storage.pool {
        shelf_db::close(pool).await;
    }

    served?;
    tracing::info!("shelf stopped");
    Ok(())
}
