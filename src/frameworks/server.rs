// Framework bootstrap for the block runtime host.

use crate::domain::Effect;
use crate::frameworks::config;
use crate::interface_adapters::http::{
    breakpoint_handler, debug_handler, input_handler, level_handler, pause_handler,
    resume_handler, run_handler, speed_handler, state_handler, step_handler, stop_handler,
};
use crate::interface_adapters::net::ws_handler;
use crate::interface_adapters::state::AppState;
use crate::use_cases::Runtime;

use axum::{
    Router,
    routing::{get, post, put},
};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};
use tokio::sync::broadcast;

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/run", post(run_handler))
        .route("/stop", post(stop_handler))
        .route("/speed", post(speed_handler))
        .route("/debug", post(debug_handler))
        .route("/breakpoints/{id}", post(breakpoint_handler))
        .route("/step", post(step_handler))
        .route("/pause", post(pause_handler))
        .route("/resume", post(resume_handler))
        .route("/input", post(input_handler))
        .route("/level", put(level_handler))
        .route("/state", get(state_handler))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state();
    let app = router(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state() -> Arc<AppState> {
    let settings = config::runtime_settings();
    let capacity = config::effect_capacity();
    tracing::debug!(
        tick_ms = settings.tick_interval.as_millis(),
        publish_ms = settings.publish_interval.as_millis(),
        slice_ms = settings.time_slice.as_millis(),
        effect_capacity = capacity,
        "runtime configured"
    );

    // Effects fan out to every observer; the runtime only sees the sink side.
    let (effect_tx, _effect_rx) = broadcast::channel::<Effect>(capacity);
    let runtime = Arc::new(Runtime::new(settings, Arc::new(effect_tx.clone())));

    Arc::new(AppState { runtime, effect_tx })
}
