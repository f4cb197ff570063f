//! Creates the `orders` table and its index.

use server_http::{bootstrap, telemetry};
use shared::config::Config;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let env_file = bootstrap::load_env_file();
    let config = Config::from_env();

    telemetry::init_tracing(&config.log_level);

    if let Ok(path) = env_file {
        info!("Loaded environment variables from {}", path.display());
    }

    match migrate(&config).await {
        Ok(()) => {
            info!("Migration completed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Migration failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn migrate(config: &Config) -> shared::Result<()> {
    let store = bootstrap::connect_postgres(&config.postgres).await?;
    store.migrate().await
}
