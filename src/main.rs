//! Puppet3D - Headless hand/face tracking service for 3D puppets
//!
//! Main entry point for the CLI application.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use puppet3d::{
    assets::{AssetRegistry, Catalog, JsonFileStore, MemoryStore, SettingsStore},
    config::Config,
    error::{Puppet3dError, SessionError},
    scene::GltfLoader,
    session::{CreditGate, OpenGate, SessionGate},
    tracking::{subprocess::check_mediapipe_available, MediaPipeSource},
    web::WebServer,
    AppState,
};

/// Puppet3D - drive 3D assets with your hands and face
#[derive(Parser, Debug)]
#[command(name = "puppet3d", version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// HTTP server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Disable HTTP server
    #[arg(long)]
    no_http: bool,

    /// Start a tracking session immediately
    #[arg(long)]
    start: bool,

    /// Session credits (overrides config)
    #[arg(long)]
    credits: Option<u32>,

    /// List the asset catalog and exit
    #[arg(long)]
    list_assets: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    info!("Starting {} v{}", puppet3d::NAME, puppet3d::VERSION);

    if args.list_assets {
        list_assets(&Catalog::default());
        return Ok(());
    }

    let config = load_config(&args)?;
    let state = build_state(config);

    let http_task = if state.config.http.enabled {
        let server = WebServer::new(Arc::clone(&state), &state.config.http);
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("HTTP server error: {}", e);
            }
        }))
    } else {
        info!("HTTP server disabled");
        None
    };

    if state.config.session.auto_start {
        if let Err(e) = state.start_session().await {
            error!("Failed to start session: {}", e);
        }
    }

    shutdown_signal().await;
    info!("Shutdown signal received");

    match state.stop_session().await {
        Ok(()) | Err(Puppet3dError::Session(SessionError::NotRunning)) => {}
        Err(e) => warn!("Session teardown incomplete: {}", e),
    }
    state.shutdown();

    if let Some(task) = http_task {
        let _ = task.await;
    }

    info!("Puppet3D stopped");
    Ok(())
}

/// Load config and apply CLI overrides
fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = if let Some(ref path) = args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    if args.no_http {
        config.http.enabled = false;
    }
    if let Some(port) = args.port {
        config.http.port = port;
    }
    if let Some(credits) = args.credits {
        config.session.credits = Some(credits);
    }
    if args.start {
        config.session.auto_start = true;
    }

    config.validate()?;

    info!("Detector port: {}", config.detector.port);
    if config.storage.persist {
        info!("Settings file: {}", config.storage.path.display());
    }
    info!("HTTP server: {}", config.http.enabled);
    Ok(config)
}

/// Restore settings and wire the services into shared state
fn build_state(config: Config) -> Arc<AppState> {
    let store: Arc<dyn SettingsStore> = if config.storage.persist {
        Arc::new(JsonFileStore::new(config.storage.path.clone()))
    } else {
        info!("Settings persistence disabled");
        Arc::new(MemoryStore::new())
    };
    let registry = AssetRegistry::restore(Arc::new(Catalog::default()), store, &config.storage.key);

    let loader = Arc::new(GltfLoader::new(config.assets.base_dir.clone()));

    if config.detector.auto_launch && !check_mediapipe_available() {
        warn!("Python package 'mediapipe' not found; the tracker helper will fail to start");
    }
    let source = Box::new(MediaPipeSource::new(&config.detector));

    let gate: Arc<dyn SessionGate> = match config.session.credits {
        Some(credits) => {
            info!("Session credits: {}", credits);
            Arc::new(CreditGate::new(credits))
        }
        None => Arc::new(OpenGate),
    };

    AppState::new(config, registry, loader, source, gate)
}

fn list_assets(catalog: &Catalog) {
    println!("Available assets:\n");
    for asset in catalog.all() {
        println!(
            "  {:<16} {:<16} {:?} (scale {})",
            asset.id, asset.name, asset.default_control, asset.default_scale
        );
        if !asset.clips.is_empty() {
            println!("  {:<16} clips: {}", "", asset.clips.join(", "));
        }
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
