use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kubeview_backend::{
    api::AppState,
    clusters::load_default_kubeconfig,
    config::Config,
    create_router,
    db::Database,
    monitor::Monitor,
};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    // LOG_FORMAT=json for log shippers, human readable otherwise
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!("Starting KubeView Backend");

    // Load configuration
    let config = Config::load()?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let db = Database::new(&config.database_url).await?;
    db.run_migrations().await?;
    tracing::info!("Database initialized");

    let metrics = PrometheusBuilder::new().install_recorder()?;

    // Build application state
    let state = AppState::new(db, config.clone()).with_metrics(metrics);
    if !config.auth_enabled {
        tracing::warn!("Authentication is disabled, every request acts as admin");
    }

    // Register the default cluster
    if let Some(kubeconfig) = load_default_kubeconfig(&config) {
        match state
            .clusters
            .register(&config.default_cluster_name, &kubeconfig)
            .await
        {
            Ok(cluster) => tracing::info!(cluster_id = %cluster.id, "Default cluster registered"),
            Err(e) => tracing::warn!("Failed to register default cluster: {}", e),
        }
    }

    Monitor::spawn(state.clone());

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
