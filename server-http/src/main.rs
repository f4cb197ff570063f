use axum::{extract::Request, ServiceExt};
use server_http::{bootstrap, build_app, telemetry, AppState};
use shared::config::Config;
use std::process::ExitCode;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables before reading configuration
    let env_file = bootstrap::load_env_file();
    let config = Config::from_env();

    telemetry::init_tracing(&config.log_level);

    match env_file {
        Ok(path) => info!("Loaded environment variables from {}", path.display()),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), BoxError> {
    info!("Starting orders HTTP server...");

    let durable = bootstrap::build_durable_store(&config).await?;
    let repository = bootstrap::build_repository(&config, durable);
    let app = build_app(AppState::new(repository), config.request_timeout);

    let address = config.bind_address();
    let listener = TcpListener::bind(&address).await?;
    info!("HTTP Server listening on http://{}", address);

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    tokio::select! {
        result = &mut server => {
            result??;
            return Ok(());
        }
        _ = shutdown_signal() => {}
    }

    let _ = stop_tx.send(());

    // In-flight requests get `shutdown_timeout` to drain.
    match tokio::time::timeout(config.shutdown_timeout, &mut server).await {
        Ok(result) => {
            result??;
            info!("HTTP server stopped gracefully");
        }
        Err(_) => {
            warn!("Forced shutdown: timeout exceeded");
            server.abort();
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    info!("Shutting down gracefully...");
}
