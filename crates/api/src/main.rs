use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use fuzzdeck_events::{EventBus, ResultCollector, ResultStore};
use fuzzdeck_runner::{CommandSpawner, ControllerSettings, JobController};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fuzzdeck_api::config::ServerConfig;
use fuzzdeck_api::picker::CommandPicker;
use fuzzdeck_api::router::build_app_router;
use fuzzdeck_api::server::bind_first_free;
use fuzzdeck_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "fuzzdeck_api=debug,fuzzdeck_runner=debug,fuzzdeck_events=info,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        engine = %config.engine_bin,
        "Loaded server configuration"
    );

    // --- Event bus and result store ---
    let bus = Arc::new(EventBus::new(config.event_buffer));
    let store = Arc::new(ResultStore::new());

    // Spawn the result collector (feeds the store from the bus).
    let collector_cancel = CancellationToken::new();
    let collector_handle = tokio::spawn(ResultCollector::run(
        Arc::clone(&store),
        bus.receiver(),
        collector_cancel.clone(),
    ));
    tracing::info!(capacity = config.event_buffer, "Event bus and result collector started");

    // --- Job controller ---
    let controller = JobController::new(
        Arc::new(CommandSpawner::new(config.engine_bin.clone())),
        bus,
        store,
        ControllerSettings {
            stop_grace: Duration::from_secs(config.stop_grace_secs),
            ..ControllerSettings::default()
        },
    );

    // --- App state ---
    let picker = CommandPicker::new(
        config.picker_open_cmd.as_deref(),
        config.picker_save_cmd.as_deref(),
    );
    let state = AppState {
        controller: controller.clone(),
        picker: Arc::new(picker),
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let host: IpAddr = config.host.parse().expect("Invalid HOST address");
    let listener = bind_first_free(host, config.port, config.port_attempts)
        .await
        .expect("Failed to bind to address");
    let addr = listener.local_addr().expect("Listener has no local address");
    tracing::info!(%addr, "Starting server");

    // Event streams stay open until the job ends: stop it before draining.
    let shutdown_controller = controller.clone();
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_controller.shutdown(shutdown_timeout).await;
            tracing::info!(state = %shutdown_controller.status(), "Job controller shut down");
        })
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    collector_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), collector_handle).await;
    tracing::info!("Result collector stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
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
