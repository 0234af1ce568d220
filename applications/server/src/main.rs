/// Lit Listener Server - audio effect processing over HTTP
use clap::{Args, Parser, Subcommand};
use lit_pipeline::{CancellationToken, EffectPipeline, PipelineConfig, TransformRequest};
use lit_server::{api, config::ServerConfig, services::ProcessingService, state::AppState};
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "lit-server")]
#[command(about = "Lit Listener audio processing server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Apply effects to a single file and print the working file path
    Process(ProcessArgs),
}

#[derive(Args)]
struct ProcessArgs {
    /// Source audio file
    path: PathBuf,
    /// Pitch factor, applied when in (0.5, 2.0)
    #[arg(long)]
    pitch: Option<f64>,
    /// Volume factor, applied when in (0.1, 5.0)
    #[arg(long)]
    amplification: Option<f64>,
    /// Compressor threshold in dB, with --ratio
    #[arg(long, allow_hyphen_values = true)]
    threshold: Option<f64>,
    /// Compressor ratio, with --threshold
    #[arg(long)]
    ratio: Option<f64>,
    /// Band-pass center frequency in Hz, with --bandwidth
    #[arg(long)]
    frequency: Option<f64>,
    /// Band-pass width in Hz, with --frequency
    #[arg(long)]
    bandwidth: Option<f64>,
    /// Run noise reduction first
    #[arg(long)]
    denoise: bool,
    /// Kill any stage running longer than this
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// ffmpeg binary
    #[arg(long, env = "LIT_PROCESSING__FFMPEG_PATH", default_value = "ffmpeg")]
    ffmpeg: PathBuf,
}

impl ProcessArgs {
    fn transform(&self) -> TransformRequest {
        TransformRequest {
            pitch_factor: self.pitch,
            amplification_factor: self.amplification,
            compression_threshold: self.threshold,
            compression_ratio: self.ratio,
            filter_frequency: self.frequency,
            filter_bandwidth: self.bandwidth,
            denoise: self.denoise,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "lit_server=info,lit_pipeline=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => {
            serve(config).await?;
        }
        Commands::Process(args) => {
            process_file(args).await?;
        }
    }

    Ok(())
}

async fn serve(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    // Load configuration
    let config = ServerConfig::load_from(config_path.as_deref())?;
    config.validate()?;

    tracing::info!("Starting Lit Listener server");
    tracing::info!("Host: {}", config.server.host);
    tracing::info!("Port: {}", config.server.port);
    tracing::info!("Audio directory: {}", config.storage.audio_dir.display());

    tokio::fs::create_dir_all(&config.storage.audio_dir).await?;

    let processing = Arc::new(ProcessingService::new(&config)?);
    tracing::info!(
        "Processing with {}",
        config.processing.ffmpeg_path.display()
    );

    let shutdown = CancellationToken::new();
    let app_state = AppState::new(processing, shutdown.clone());

    let app = api::router(app_state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                return;
            }
            tracing::info!("Shutting down, cancelling running pipelines");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}

async fn process_file(args: ProcessArgs) -> anyhow::Result<()> {
    let source = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()?.join(&args.path)
    };

    let pipeline = EffectPipeline::new(PipelineConfig {
        tool_path: args.ffmpeg.clone(),
        stage_timeout: args.timeout_secs.map(Duration::from_secs),
        ..PipelineConfig::default()
    })?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after killing the running stage");
            on_interrupt.cancel();
        }
    });

    match pipeline
        .process_with_cancel(&source, &args.transform(), &cancel)
        .await
    {
        Ok(report) => {
            tracing::info!(
                "Applied {:?}, skipped {:?}",
                report.applied,
                report.skipped
            );
            println!("{}", report.working_file.display());
            Ok(())
        }
        Err(failure) => {
            eprintln!("{}", failure.error.detail());
            if let Some(working) = &failure.working_file {
                eprintln!(
                    "{} keeps {:?}",
                    working.display(),
                    failure.committed
                );
            }
            Err(failure.into())
        }
    }
}
