use closeknit::{auth::Tokens, config::Config, db, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("closeknit=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let db_pool = db::connect(&config.database_url, config.db_max_connections).await?;

    let app_state = AppState::new(db_pool, Tokens::from_config(&config), config.outbound_queue);
    let app = closeknit::app(app_state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
