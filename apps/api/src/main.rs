use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::services::{AppointmentStore, InMemoryAppointmentStore, SupabaseAppointmentStore};
use appointment_cell::{AppointmentBookingService, AppointmentState};
use shared_config::{AppConfig, StoreBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Amae appointments API");

    let config = Arc::new(AppConfig::from_env());
    if !config.is_configured() {
        warn!("Configuration is incomplete; authenticated routes will reject every token");
    }

    let store: Arc<dyn AppointmentStore> = match config.store_backend {
        StoreBackend::Memory => {
            warn!("Using the in-memory appointment store; data is lost on restart");
            Arc::new(InMemoryAppointmentStore::default())
        }
        StoreBackend::Supabase => {
            info!("Using the Supabase appointment store at {}", config.supabase_url);
            Arc::new(SupabaseAppointmentStore::new(&config))
        }
    };

    let booking = AppointmentBookingService::new(&config, store);
    let state = Arc::new(AppointmentState::new(config.clone(), booking));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router::create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
