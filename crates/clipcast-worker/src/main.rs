//! Clip-to-Shorts worker binary.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use clipcast_bot::{BotListener, Notifier, NullNotifier, TelegramClient, TelegramConfig, TelegramNotifier};
use clipcast_media::{check_ffmpeg, check_ffprobe, check_ytdlp, FrameReframer, SubjectLocator, VideoCompositor, YtDlpFetcher};
use clipcast_twitch::{ClipSelector, HelixClient};
use clipcast_youtube::YoutubeUploader;
use clipcast_worker::{ChatCommands, ManualTrigger, Orchestrator, Pipeline, StatusBoard, WorkerConfig};

/// Wired services.
struct App {
    orchestrator: Orchestrator,
    listener: Option<BotListener>,
}

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting clipcast-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    if let Some(addr) = config.metrics_addr {
        match clipcast_worker::metrics::init_exporter(addr) {
            Ok(()) => info!(%addr, "Serving Prometheus metrics"),
            Err(e) => warn!("Failed to start metrics exporter: {}", e),
        }
    }

    let app = match build(config).await {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to start worker: {:#}", e);
            std::process::exit(1);
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Setup signal handler
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal, finishing current cycle");
        let _ = shutdown_tx.send(true);
    });

    let listener_task = app
        .listener
        .map(|listener| tokio::spawn(listener.run(shutdown_rx.clone())));

    app.orchestrator.run(shutdown_rx).await;

    if let Some(task) = listener_task {
        task.await.ok();
    }

    info!("Worker shutdown complete");
}

/// Initialize tracing with colored output for dev, JSON for production.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("clipcast=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn build(config: WorkerConfig) -> anyhow::Result<App> {
    check_ffmpeg().context("ffmpeg is required for conversion")?;
    check_ffprobe().context("ffprobe is required for conversion")?;
    check_ytdlp().context("yt-dlp is required for downloads")?;

    let helix = HelixClient::from_env().context("Twitch client")?;
    let selector = ClipSelector::new(Arc::new(helix));

    let locator = SubjectLocator::from_model_path(config.face_model_path.as_deref());
    info!(locator = locator.name(), "Subject locator selected");
    let converter = VideoCompositor::new(FrameReframer::new(locator));

    let publisher = YoutubeUploader::from_env().context("YouTube uploader")?;

    let trigger = Arc::new(ManualTrigger::load(&config.trigger_state_path).await);
    let status = Arc::new(StatusBoard::new());

    let (notifier, listener): (Arc<dyn Notifier>, Option<BotListener>) =
        match TelegramConfig::from_env().context("Telegram bot")? {
            Some(bot_config) => {
                let chat_id = bot_config.chat_id;
                let client = Arc::new(TelegramClient::new(bot_config).context("Telegram client")?);
                let handler = Arc::new(ChatCommands::new(Arc::clone(&trigger), Arc::clone(&status)));
                let listener = BotListener::new(Arc::clone(&client), handler);

                let notifier: Arc<dyn Notifier> = match chat_id {
                    Some(chat_id) => Arc::new(TelegramNotifier::new(client, chat_id)),
                    None => {
                        warn!("CHAT_ID not set; commands are accepted from any chat and reports are dropped");
                        Arc::new(NullNotifier)
                    }
                };
                (notifier, Some(listener))
            }
            None => {
                info!("BOT_TOKEN not set, chat commands disabled");
                (Arc::new(NullNotifier), None)
            }
        };

    let pipeline = Pipeline::new(
        config,
        selector,
        Arc::new(YtDlpFetcher::new()),
        Arc::new(converter),
        Arc::new(publisher),
    );

    Ok(App {
        orchestrator: Orchestrator::new(Arc::new(pipeline), trigger, status, notifier),
        listener,
    })
}
