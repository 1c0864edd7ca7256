use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

mod config;
mod error;
mod extract;
mod interaction;
mod middleware;
mod notifier;
mod responder;
mod routes;
mod session;
mod state;
#[cfg(test)]
mod testing;
mod transcript;
mod upstream;

use config::{BridgeConfig, ConfigError};
use interaction::InteractionEngine;
use responder::{BackgroundRunner, DeadlineResponder};
use session::{Cursor, CursorStore, InFlightMarker, MarkerStore, MemoryStore};
use upstream::{HttpMessagingApi, HttpTicketingApi, UpstreamError, UpstreamHttp};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "DeskBridge API",
        version = "0.1.0",
        description = "Bridges an inbox chat widget to the ticketing system. Every event is answered with a panel before the inbox deadline."
    ),
    paths(routes::health::health_check, routes::events::handle_event),
    components(schemas(
        routes::health::HealthResponse,
        deskbridge_core::events::InboundEvent,
        deskbridge_core::events::SessionFields,
        deskbridge_core::events::PanelResponse,
        deskbridge_core::panel::Panel,
        deskbridge_core::panel::Element,
        deskbridge_core::panel::TextStyle,
        deskbridge_core::panel::ActionStyle,
        deskbridge_core::panel::ChoiceOption,
        deskbridge_core::error::ApiError,
    ))
)]
struct ApiDoc;

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("could not build upstream client: {0}")]
    Upstream(#[from] UpstreamError),
    #[error("rate limiter configuration rejected")]
    RateLimit,
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deskbridge_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    if let Err(err) = run().await {
        tracing::error!(error = %err, "deskbridge-api stopped");
        std::process::exit(1);
    }
}

fn build_engine(config: &BridgeConfig) -> Result<InteractionEngine, StartupError> {
    let ticketing = HttpTicketingApi::new(
        UpstreamHttp::new("ticketing", config.upstream_timeout, config.retry)?,
        &config.ticketing,
    );
    let messaging = HttpMessagingApi::new(
        UpstreamHttp::new("messaging", config.upstream_timeout, config.retry)?,
        &config.messaging,
    );

    Ok(InteractionEngine::new(
        Arc::new(ticketing),
        Arc::new(messaging),
        CursorStore::new(MemoryStore::<Cursor>::shared(), config.lists),
        MarkerStore::new(MemoryStore::<InFlightMarker>::shared()),
        DeadlineResponder::new(config.deadline, BackgroundRunner::default()),
    ))
}

async fn run() -> Result<(), StartupError> {
    let config = BridgeConfig::from_env()?;
    let app_state = state::AppState {
        engine: build_engine(&config)?,
        signing_secret: config.signing_secret.as_deref().map(Arc::from),
    };
    if app_state.signing_secret.is_none() {
        tracing::warn!("BRIDGE_SIGNING_SECRET not set, inbound events are not authenticated");
    }

    let events_limit = middleware::rate_limit::events_layer().ok_or(StartupError::RateLimit)?;

    let app = Router::new()
        .route(
            "/api-doc/openapi.json",
            axum::routing::get(|| async { axum::Json(ApiDoc::openapi()) }),
        )
        .merge(routes::health::router())
        .merge(routes::events::router(app_state.clone()).layer(events_limit))
        .layer(axum::middleware::from_fn(middleware::security_headers::apply))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::cors::build_cors_layer()),
        )
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(
        %addr,
        deadline_ms = config.deadline.as_millis() as u64,
        "DeskBridge API listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
