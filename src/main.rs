//! s3emu - a local, in-process emulator of the S3 object-storage HTTP API.

use axum::Router;
use clap::Parser;
use s3emu::api::build_router;
use s3emu::api::state::AppState;
use s3emu::config::Config;
use s3emu::metrics::Metrics;
use s3emu::tls::build_rustls_config;
use s3emu::types::ObjectOwnership;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn version_long() -> &'static str {
    static V: std::sync::OnceLock<String> = std::sync::OnceLock::new();
    V.get_or_init(|| format!("{} (built {})", env!("CARGO_PKG_VERSION"), env!("S3EMU_BUILD_TIME")))
}

/// Local S3 API emulator.
#[derive(Parser, Debug)]
#[command(name = "s3emu")]
#[command(version = version_long())]
#[command(author, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// HTTP listen port (overrides config)
    #[arg(long, value_name = "PORT")]
    http_port: Option<u16>,

    /// HTTPS listen port (overrides config)
    #[arg(long, value_name = "PORT")]
    https_port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = if let Some(ref path) = cli.config {
        Config::from_file(path)?
    } else {
        Config::load()
    };
    if let Some(port) = cli.http_port {
        config.http_port = port;
    }
    if let Some(port) = cli.https_port {
        config.https_port = port;
    }
    if cli.verbose {
        config.verbose = true;
    }

    let initial_filter = EnvFilter::try_from_default_env()
        .or_else(|_| std::env::var("S3EMU_LOG_LEVEL").map(EnvFilter::new))
        .unwrap_or_else(|_| {
            if config.verbose {
                EnvFilter::new("s3emu=trace,tower_http=trace")
            } else {
                EnvFilter::new("s3emu=info,tower_http=info")
            }
        });
    tracing_subscriber::fmt().with_env_filter(initial_filter).init();

    info!("Starting s3emu v{}", version_long());
    info!("  Region: {}", config.region);
    info!("  HTTP port: {}", config.http_port);
    info!("  HTTPS port: {}", config.https_port);

    let data_dir = config.data_dir();
    info!("  Data directory: {:?}", data_dir);
    if !config.retain_files_on_exit {
        info!("  Data directory will be removed on exit");
    }
    std::fs::create_dir_all(&data_dir)?;

    let metrics = Metrics::new();
    metrics.process_start_time_seconds.set(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64(),
    );
    metrics
        .build_info
        .with_label_values(&[env!("CARGO_PKG_VERSION")])
        .set(1.0);

    let state = AppState::new(config.clone(), metrics);

    for bucket in &config.initial_buckets {
        if !state.buckets().bucket_exists(bucket).await {
            state
                .buckets()
                .create_bucket(bucket, &config.region, ObjectOwnership::default())
                .await?;
            info!("  Seeded bucket: {bucket}");
        }
    }

    let app: Router = build_router(state);

    let retain = config.retain_files_on_exit;
    let result = run_listeners(&config, app).await;

    if !retain {
        if let Err(e) = std::fs::remove_dir_all(&data_dir) {
            warn!("failed to remove data directory {:?}: {e}", data_dir);
        }
    }

    result
}

async fn run_listeners(
    config: &Config,
    app: Router,
) -> Result<(), Box<dyn std::error::Error>> {
    let http_addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let https_addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.https_port));

    let rustls_config = build_rustls_config().await?;

    let http_app = app.clone();
    let http_listener = TcpListener::bind(http_addr).await?;
    info!("s3emu listening on http://{http_addr}");
    let http_server = axum::serve(http_listener, http_app).with_graceful_shutdown(shutdown_signal());

    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_handle.graceful_shutdown(Some(std::time::Duration::from_secs(10)));
    });
    info!("s3emu listening on https://{https_addr}");
    let https_server = axum_server::bind_rustls(https_addr, rustls_config)
        .handle(handle)
        .serve(app.into_make_service());

    let (http_result, https_result) = tokio::join!(http_server, https_server);
    http_result?;
    https_result?;

    info!("Server shutdown complete");
    Ok(())
}

/// Handle shutdown signals (SIGINT, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
