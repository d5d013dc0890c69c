use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use courier_notification_service::channels::create_senders;
use courier_notification_service::config::Settings;
use courier_notification_service::queue::QueueConsumer;
use courier_notification_service::server::{create_app, AppState};
use courier_notification_service::store::create_store;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    init_tracing();

    // Load configuration
    let settings = Settings::new()?;
    tracing::info!("Configuration loaded");

    // Initialize the store and every channel adapter before taking traffic
    let store = create_store(&settings.store).await?;
    let senders = create_senders(&settings.channels);

    // Create application state
    let state = AppState::new(settings.clone(), store, senders);
    tracing::info!("Application state initialized");

    // Create queue consumer
    let consumer = Arc::new(QueueConsumer::new(
        settings.queue.clone(),
        state.service.clone(),
        state.dispatcher.clone(),
    ));
    let shutdown_signal = consumer.shutdown_signal();

    // Start queue consumer in background
    let consumer_clone = consumer.clone();
    let consumer_handle = tokio::spawn(async move {
        if let Err(e) = consumer_clone.start().await {
            tracing::error!(error = %e, "Queue consumer failed");
        }
    });

    // Create Axum app
    let app = create_app(state);

    // Start server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(shutdown_signal))
        .await?;

    // Wait for background tasks to finish
    tracing::info!("Waiting for background tasks to finish...");
    let _ = consumer_handle.await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal_handler(shutdown_tx: tokio::sync::broadcast::Sender<()>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    // Send shutdown signal to the queue consumer
    let _ = shutdown_tx.send(());
}
