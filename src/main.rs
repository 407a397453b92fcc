use fanout_trigger::config::Config;
use fanout_trigger::dispatcher::Dispatcher;
use fanout_trigger::router::create_router;
use fanout_trigger::state::AppState;
use fanout_trigger::transport::ReqwestTransport;
use fanout_trigger::worker::MAX_CONCURRENT_REQUESTS;

use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fanout_trigger=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting fan-out trigger...");

    // Load configuration
    let config = Arc::new(Config::from_env());
    info!("Configuration loaded: {:?}", config);

    // Shared outbound client
    let transport = match ReqwestTransport::new() {
        Ok(transport) => Arc::new(transport),
        Err(e) => {
            error!(error = %e, "Failed to initialize outbound transport");
            std::process::exit(1);
        }
    };
    let dispatcher = Dispatcher::new(transport);
    info!(
        max_concurrent = MAX_CONCURRENT_REQUESTS,
        "Dispatcher initialized"
    );

    // Create shared app state
    let app_state = Arc::new(AppState {
        dispatcher,
        config: config.clone(),
    });

    // Build router
    let app = create_router(app_state);

    // Bind and serve
    let port = config.server_port;
    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, port = port, "Failed to bind to port");
            std::process::exit(1);
        }
    };

    info!(port = port, "Server listening");

    // Graceful shutdown handler; detached dispatches are abandoned on exit
    let shutdown_signal = async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutting down...");
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
    {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
