use anyhow::Result;
use restaurant_orderservice::{
    MIGRATIONS,
    app::{
        bootstrap::{self, bootstrap},
        config, db,
    },
    routes,
};

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();
    bootstrap::init_env();

    let app = routes::app();

    tracing::info!("Running migrations...");
    let config = config::load()?;
    let migrations_count = db::run_migrations_blocking(MIGRATIONS, &config.database.url).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    tracing::info!("Bootstrapping...");
    bootstrap("OrderService", app, &config).await?;
    Ok(())
}
