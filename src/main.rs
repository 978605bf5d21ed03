use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use vtu_billing::config::Config;
use vtu_billing::database::settings_repository::SettingsRepository;
use vtu_billing::database::{health_check, init_pool, PoolConfig};
use vtu_billing::proxy::upstream::ReqwestUpstream;
use vtu_billing::proxy::{router, ProxyState};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    let config = Config::from_env()?;

    tracing::info!("Starting VTU proxy");
    tracing::info!("Environment: {}", config.server.environment);
    tracing::info!("Proxy path: {}", config.proxy.path);
    if config.proxy.client_token.is_none() {
        tracing::warn!("PROXY_CLIENT_TOKEN not set; client credentials are not checked");
    }

    let pool = init_pool(
        &config.database.url,
        Some(PoolConfig {
            max_connections: config.database.max_connections,
            min_connections: config.database.max_connections.min(5),
            ..Default::default()
        }),
    )
    .await?;
    health_check(&pool).await?;

    let state = ProxyState {
        settings: Arc::new(SettingsRepository::new(pool)),
        upstream: Arc::new(ReqwestUpstream::new(Duration::from_secs(
            config.proxy.provider_timeout_secs,
        ))?),
        client_token: config.proxy.client_token.clone(),
        environment: config.server.environment.clone(),
    };

    let app = router(state, &config.proxy.path);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
