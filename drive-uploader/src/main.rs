use anyhow::Context;
use drive_uploader::core::auth_manager::AuthManager;
use drive_uploader::core::config_store::{default_config_path, ConfigStore};
use drive_uploader::core::poll_loop::PollLoop;
use drive_uploader::core::upload_engine::UploadEngine;
use drive_uploader::providers::google_drive::GoogleDriveProvider;
use drive_uploader::utils::logging::{self, LoggingConfig};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _logging = logging::init(LoggingConfig::default()).context("Failed to initialize logging")?;

    tracing::info!("Starting image uploader...");

    let store = ConfigStore::new(default_config_path());
    let config = store
        .load()
        .with_context(|| format!("Failed to load configuration from {}", store.path().display()))?;
    config.log_summary();

    let client = GoogleDriveProvider::http_client(&config.application_name)?;
    let auth = AuthManager::from_key_file(&config.client_secret_file, client.clone())
        .context("Failed to load service account credentials")?;
    let drive = Arc::new(GoogleDriveProvider::new(auth, client));

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Interrupt received, stopping...");
                interrupt.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for interrupt: {}", e),
        }
    });

    let poll_loop = PollLoop::new(config.interval(), cancel);
    let mut engine = UploadEngine::new(drive, config, store);
    poll_loop.run(&mut engine).await;

    Ok(())
}
