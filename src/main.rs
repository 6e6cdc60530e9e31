use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use exam_proctor::{
    config::{get_config, init_config},
    database::pool::create_pool,
    routes,
    services::{memory_store::MemoryExamStore, pg_store::PgExamStore},
    AppState,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();
    init_config()?;
    let config = get_config();

    let app_state = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url, config.database_max_connections).await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Using PostgreSQL exam store");
            AppState::new(Arc::new(PgExamStore::new(pool)), &config.jwt_secret)
        }
        None => {
            tracing::warn!("DATABASE_URL is not set; exams, results and messages are kept in memory");
            AppState::new(Arc::new(MemoryExamStore::new()), &config.jwt_secret)
        }
    };

    {
        let registry = app_state.sessions.registry().clone();
        let retention = chrono::Duration::seconds(config.session_retention_secs as i64);
        let max_age = chrono::Duration::seconds(config.session_max_age_secs as i64);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(60)).await;
                registry.sweep(retention, max_age).await;
            }
        });
    }

    let app = routes::create_router(app_state);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
