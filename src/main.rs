use std::env;
use std::path::Path;
use std::sync::Arc;

use camrec::configuration::Config;
use camrec::recording::supervisor::SupervisorSettings;
use camrec::recording::{CameraEndpoint, FfmpegBackend, RecordingSupervisor, SystemClock};
use camrec::storage::ArchiveStorage;
use camrec::web_interface::WebServer;
use log::{error, info};
use tokio::sync::watch;

const DEFAULT_CONFIG_FILE: &str = "camrec.toml";

#[tokio::main]
async fn main() {
    // Example how to log
    // https://docs.rs/env_logger/latest/env_logger/
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    println!(
        "
 ██████╗ █████╗ ███╗   ███╗██████╗ ███████╗ ██████╗
██╔════╝██╔══██╗████╗ ████║██╔══██╗██╔════╝██╔════╝
██║     ███████║██╔████╔██║██████╔╝█████╗  ██║
██║     ██╔══██║██║╚██╔╝██║██╔══██╗██╔══╝  ██║
╚██████╗██║  ██║██║ ╚═╝ ██║██║  ██║███████╗╚██████╗
 ╚═════╝╚═╝  ╚═╝╚═╝     ╚═╝╚═╝  ╚═╝╚══════╝ ╚═════╝
====================================================
      Continuous RTSP camera recorder v0.1.0
====================================================
"
    );

    info!("Importing configuration");

    // Flags on the command line take precedence over the config file.
    let config = if env::args().len() > 1 {
        Config::from_args()
    } else {
        match Config::from_file(Path::new(DEFAULT_CONFIG_FILE)) {
            Ok(config) => config,
            Err(e) => {
                error!("Unable to import configuration from {}: {}", DEFAULT_CONFIG_FILE, e);
                std::process::exit(1);
            }
        }
    };
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }
    info!("Configuration imported successfully");

    let storage = match ArchiveStorage::new(&config.storage_path) {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            error!("Unable to open archive at {}: {}", config.storage_path.display(), e);
            std::process::exit(1);
        }
    };

    let endpoint = CameraEndpoint::new(config.camera_url.clone());
    let backend = FfmpegBackend::new(config.size_cap.clone(), config.capture_grace());
    let supervisor = RecordingSupervisor::new(
        endpoint,
        Arc::clone(&storage),
        backend,
        SystemClock,
        SupervisorSettings::from_config(&config),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    info!("Spawning the recording supervisor");
    let recorder = tokio::spawn(supervisor.run(shutdown_rx));

    if config.web_enabled {
        let server = WebServer::new(Arc::clone(&storage), config.quota_bytes);
        let port = config.web_port;
        tokio::spawn(async move {
            if let Err(e) = server.start(port).await {
                error!("Web server error: {}", e);
            }
        });
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown requested, stopping recorder");
    let _ = shutdown_tx.send(true);

    if let Err(e) = recorder.await {
        error!("Error joining the recording supervisor: {:?}", e);
        std::process::exit(1);
    }
}
