//! MCR API Gateway
//!
//! The HTTP entry point for the managed care reporting service.
//! Handles:
//! - Caller identity (bearer tokens) and role/state authorization
//! - Report, entity, dashboard and form endpoints
//! - Rate limiting, timeouts and body limits
//! - Observability (logging, metrics, tracing)

mod handlers;
mod middleware;
#[cfg(test)]
mod tests;

use axum::{
    extract::{DefaultBodyLimit, FromRef, Request},
    middleware::Next,
    routing::{get, post, put},
    Router,
};
use mcr_common::{
    config::{AppConfig, StoreBackend},
    db::DbPool,
    metrics, FormRegistry, JwtManager, MemoryStore, ReportService, ReportStore, Repository,
    RouteTable,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwt: Arc<JwtManager>,
    pub reports: ReportService,
    pub routes: Arc<RouteTable>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn ReportStore>) -> mcr_common::Result<Self> {
        let forms = Arc::new(FormRegistry::builtin()?);
        let routes = Arc::new(RouteTable::from_registry(&forms));
        let jwt = Arc::new(JwtManager::new(
            config.jwt_secret(),
            config.auth.jwt_expiration_secs,
        ));

        Ok(Self {
            config: Arc::new(config),
            jwt,
            reports: ReportService::new(store, forms),
            routes,
        })
    }
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    init_tracing(&config);
    info!("Starting MCR API Gateway v{}", mcr_common::VERSION);

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .set_buckets(metrics::LATENCY_BUCKETS)?
            .install()?;
        info!("Metrics exporter listening on {}", metrics_addr);
    }
    metrics::register_metrics();

    // Initialize the report store
    let store: Arc<dyn ReportStore> = match config.store.backend {
        StoreBackend::Postgres => {
            let db = DbPool::new(&config.database).await?;
            if config.database.run_migrations {
                db.run_migrations(&config.database.migrations_dir).await?;
            }
            Arc::new(Repository::new(db))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory report store; data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    // Create app state
    let state = AppState::new(config, store)?;

    // Build the router
    let app = create_router(state);

    // Start the server
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.observability.json_logging {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().pretty()).init();
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    use handlers::{dashboard, entities, forms, health, navigation, reports};

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let timeout = TimeoutLayer::new(state.config.request_timeout());
    let body_limit = DefaultBodyLimit::max(state.config.server.max_body_bytes);

    // API routes
    let api_routes = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        // Report endpoints
        .route(
            "/reports/{report_type}/{state}",
            get(reports::list_reports).post(reports::create_report),
        )
        .route(
            "/reports/{report_type}/{state}/{id}",
            get(reports::get_report).put(reports::update_report),
        )
        .route(
            "/reports/{report_type}/{state}/{id}/autosave",
            post(reports::autosave),
        )
        .route(
            "/reports/{report_type}/{state}/{id}/archive",
            put(reports::archive_report),
        )
        .route(
            "/reports/{report_type}/{state}/{id}/submit",
            post(reports::submit_report),
        )
        // Entity endpoints
        .route(
            "/reports/{report_type}/{state}/{id}/entities/{entity_type}",
            get(entities::list_entities).post(entities::add_entity),
        )
        .route(
            "/reports/{report_type}/{state}/{id}/entities/{entity_type}/{entity_id}",
            put(entities::update_entity).delete(entities::delete_entity),
        )
        // Dashboard, templates and navigation
        .route("/dashboard/{report_type}", get(dashboard::dashboard))
        .route("/templates/{report_type}", get(forms::get_template))
        .route("/forms/{form_id}/validate", post(forms::validate_form))
        .route("/routes/resolve", get(navigation::resolve_route));

    let mut app = Router::new()
        .nest("/v1", api_routes)
        .layer(axum::middleware::from_fn(middleware::metrics::track_metrics));

    if state.config.rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(
            state.config.rate_limit.requests_per_second,
            state.config.rate_limit.burst,
        );
        app = app.layer(axum::middleware::from_fn(
            move |request: Request, next: Next| {
                middleware::rate_limit::rate_limit_middleware(request, next, limiter.clone())
            },
        ));
    }

    // Compose the app
    app.layer(body_limit)
        .layer(timeout)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
