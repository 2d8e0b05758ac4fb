use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use storyforge_comfyui::api::ComfyUIApi;
use storyforge_comfyui::catalog::WorkflowCatalog;
use storyforge_comfyui::gateway::ComfyUIGateway;
use storyforge_pipeline::{ComfyUISourceStore, Orchestrator, PgTaskLedger};
use storyforge_synthesis::SynthesisClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storyforge_api::config::{GenerationConfig, ServerConfig};
use storyforge_api::router::build_app_router;
use storyforge_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "storyforge_api=debug,storyforge_pipeline=debug,storyforge_comfyui=info,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let generation = GenerationConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");
    tracing::info!(
        comfyui_url = %generation.comfyui_url,
        synthesis_url = %generation.synthesis.url,
        "Loaded generation configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = storyforge_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    storyforge_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    storyforge_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Workflow catalog ---
    let catalog = WorkflowCatalog::load_dir(&generation.workflow_catalog_dir)
        .unwrap_or_else(|e| panic!("Failed to load workflow catalog: {e}"));

    // --- Generation pipeline ---
    let http = reqwest::Client::new();
    let comfyui = ComfyUIApi::with_client(http.clone(), generation.comfyui_url.clone());
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(PgTaskLedger::new(pool.clone())),
        Arc::new(SynthesisClient::with_client(http, generation.synthesis.clone())),
        Arc::new(ComfyUIGateway::new(comfyui.clone())),
        Arc::new(ComfyUISourceStore::new(comfyui)),
        Arc::new(catalog),
        generation.pipeline_settings(),
    ));
    tracing::info!("Generation orchestrator ready");

    // --- App state and router ---
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let state = AppState::new(pool, config.clone(), Arc::clone(&orchestrator));
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    if orchestrator.shutdown(shutdown_timeout).await {
        tracing::info!("Generation tasks drained");
    } else {
        tracing::warn!(
            in_flight = orchestrator.tracker().len(),
            "Shutdown timeout elapsed with generation tasks still running",
        );
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
