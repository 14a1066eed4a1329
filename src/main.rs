use ayursutra_results::config::Config;
use ayursutra_results::controller::ReportController;
use ayursutra_results::handlers::{self, AppState};
use ayursutra_results::store::AssessmentStore;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// Initializes tracing, loads configuration, wires the assessment store to the
/// report controller, and serves the results surface.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ayursutra_results=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store = AssessmentStore::new();
    let controller = ReportController::from_config(store.clone(), &config)?;
    tracing::info!(
        "✓ Report client initialized: {} (timeout {}s)",
        config.report_endpoint(),
        config.report_timeout_secs
    );

    let addr = format!("0.0.0.0:{}", config.port);
    let app_state = Arc::new(AppState::new(config, store, controller));

    let app = handlers::app(app_state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
