mod auth;
mod config;
mod error;
mod rate_limit;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use promptduel_core::db::{Database, SyncConfig};

use config::AppConfig;
use routes::{app_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only load .env in development; production uses platform-native env injection.
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("promptduel_api=info".parse().expect("valid directive")),
        )
        .init();

    let config = Arc::new(AppConfig::from_env()?);
    tracing::info!("Starting promptduel-api with config: {:?}", config);

    let database = open_database(&config).await?;
    let state = AppState::new(config.clone(), Arc::new(database));
    let router = app_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("promptduel-api listening on {}", config.bind_addr);
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

async fn open_database(config: &AppConfig) -> Result<Database, promptduel_core::Error> {
    if let Some(turso) = &config.turso {
        tracing::info!("Opening embedded replica synced with Turso");
        Database::open_with_sync(
            &config.db_path,
            SyncConfig::new(&turso.database_url, &turso.auth_token),
        )
        .await
    } else {
        Database::open(&config.db_path).await
    }
}
