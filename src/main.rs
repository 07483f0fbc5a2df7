use anyhow::Context;
use proleads::{api, config::Config, db::init_db, Repository};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("loading configuration")?;
    let port = config.port;

    let pool = init_db(&config.database_path)
        .await
        .with_context(|| format!("initializing database at {}", config.database_path))?;

    let repo = Arc::new(Repository::new(pool));
    let app = api::create_router(api::AppState::new(repo, config.commission));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;

    tracing::info!(
        %addr,
        lead_platform_pct = %config.commission.lead_platform_pct,
        request_platform_pct = %config.commission.request_platform_pct,
        "Server listening"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
