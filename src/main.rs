use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scene_assist::device::{HeadlessCamera, HeadlessMicrophone, HeadlessSpeaker};
use scene_assist::{
    CaptureOrchestrator, Config, Devices, LocalStorage, Mode, ModeController, PlaybackOutcome,
    ResponsePlayer, Storage,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scene-assist", version, about = "Ask a spoken question about a photo")]
struct Cli {
    /// Config file (extension optional)
    #[arg(long, global = true, default_value = "config/scene-assist")]
    config: String,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send one photo and one recorded question, print the answer
    Ask {
        /// JPEG to use as the captured photo
        #[arg(long)]
        image: PathBuf,

        /// Pre-recorded question
        #[arg(long)]
        audio: PathBuf,

        /// Typed question overriding the audio
        #[arg(long)]
        question: Option<String>,

        /// Override the configured mode (normal | blind)
        #[arg(long)]
        mode: Option<Mode>,

        /// Wait for the spoken answer's duration
        #[arg(long)]
        realtime: bool,
    },
    /// Check that the Analysis Service is up
    Health,
    /// Show the configured mode
    Mode,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let cfg = Config::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config))?;
    info!("Analysis Service: {}", cfg.service.base_url);

    let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new());

    match cli.command {
        Command::Ask {
            image,
            audio,
            question,
            mode,
            realtime,
        } => {
            let devices = Devices {
                camera: Arc::new(HeadlessCamera::new(image)),
                microphone: Arc::new(HeadlessMicrophone::new(
                    audio,
                    cfg.storage.transient_dir.join("recorder"),
                )),
                storage: Arc::clone(&storage),
            };
            let player = ResponsePlayer::new(
                Arc::new(HeadlessSpeaker::new(realtime)),
                Arc::clone(&storage),
                cfg.storage.transient_dir.clone(),
            );
            let modes = Arc::new(ModeController::new(mode.unwrap_or(cfg.capture.mode)));

            let orchestrator = CaptureOrchestrator::new(
                cfg.capture_config(),
                devices,
                cfg.upload_client(Arc::clone(&storage))?,
                player,
                modes,
            );

            orchestrator.start_with_question(question).await?;
            let outcome = orchestrator.stop().await?;

            println!("{}", outcome.answer);
            if let PlaybackOutcome::Failed(reason) = outcome.playback {
                eprintln!("(spoken answer unavailable: {})", reason);
            }
        }
        Command::Health => {
            let client = cfg.upload_client(storage)?;
            let health = client.health().await?;
            println!("{} at {}: {}", health.status, health.timestamp, health.message);
        }
        Command::Mode => {
            let modes = ModeController::new(cfg.capture.mode);
            println!("current: {}", modes.current());
            println!("toggled: {}", modes.toggle());
        }
    }

    Ok(())
}
