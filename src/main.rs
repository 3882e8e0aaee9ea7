//src/main.rs

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;

use crate::config::{AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG controla o nível; sem ele, info
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let app_state = AppState::new(AppConfig::from_env()?).await?;
    let config = app_state.config.clone();

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    if let Some(admin) = &config.admin {
        app_state
            .auth_service
            .ensure_admin(&admin.name, &admin.email, &admin.password)
            .await?;
        tracing::info!("👤 Administrador {} disponível", admin.email);
    }

    services::otp_store::spawn_sweeper(app_state.otp_store.clone(), config.otp_sweep_interval);

    let app = routes::build_router(app_state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    tracing::info!("📚 Documentação em /swagger-ui");

    axum::serve(listener, app).await?;
    Ok(())
}
