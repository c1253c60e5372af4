//! Survey-audit server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use audit_api::{AppState, caller_middleware, router as api_router};
use audit_common::{Config, LocalStorage, StorageService};
use audit_core::{AuditService, ReportService, SurveyService, UploadService};
use audit_db::repositories::{AuditRepository, SurveyRepository};
use axum::{Router, extract::DefaultBodyLimit, middleware};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Room left in a request body for multipart framing around the file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "audit=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting survey-audit server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = Arc::new(audit_db::init(&config).await?);
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    audit_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize repositories
    let survey_repo = SurveyRepository::new(Arc::clone(&db));
    let audit_repo = AuditRepository::new(Arc::clone(&db));

    // Initialize blob storage
    tokio::fs::create_dir_all(&config.storage.base_path).await?;
    let storage: StorageService = Arc::new(LocalStorage::new(
        config.storage.base_path.clone(),
        config.storage.base_url.clone(),
    ));
    info!(path = %config.storage.base_path.display(), "Local storage ready");

    // Initialize services
    let survey_service = SurveyService::new(survey_repo.clone());
    let audit_service = AuditService::new(audit_repo, survey_repo);
    let report_service = ReportService::new(audit_service.clone(), survey_service.clone());
    let upload_service = UploadService::new(storage, config.storage.max_upload_bytes);

    let state = AppState {
        survey_service,
        audit_service,
        report_service,
        upload_service,
    };

    // Build router
    let mut app = Router::new().nest("/api", api_router());
    if config.storage.base_url.starts_with('/') {
        app = app.nest_service(
            &config.storage.base_url,
            ServeDir::new(&config.storage.base_path),
        );
    }
    let app = app
        .layer(middleware::from_fn(caller_middleware))
        .layer(DefaultBodyLimit::max(
            config.storage.max_upload_bytes + MULTIPART_OVERHEAD,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
