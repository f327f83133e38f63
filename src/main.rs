//! CDJ Scrobbler - Main entry point
//!
//! Replays captured deck status through the tracking pipeline, or manages
//! the configuration file.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cdj_scrobbler::accountant::{ComplianceAccountant, ComplianceRules};
use cdj_scrobbler::event::event_queue;
use cdj_scrobbler::on_air::{warn_channel, LoggingSink, OnAirSignal};
use cdj_scrobbler::replay::{ReplaySource, StatusSource};
use cdj_scrobbler::resolver::{MetadataResolver, StaticCatalog};
use cdj_scrobbler::tracklist::TracklistLogger;
use cdj_scrobbler::{Config, EventDispatcher, EventKind, EventProcessor, APP_NAME};

#[derive(Parser)]
#[command(name = "cdj-scrobbler")]
#[command(author, version, about = "Playback tracking for DJ decks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, env = "CDJ_SCROBBLER_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed a JSON-lines status capture through the tracker
    Replay {
        /// Capture file, one status snapshot per line
        capture: PathBuf,

        /// Metadata catalog (overrides the configured one)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Pace snapshots by their timestamps instead of as fast as possible
        #[arg(long)]
        realtime: bool,
    },

    /// Show or edit configuration
    Config {
        /// Print current configuration
        #[arg(long)]
        show: bool,

        /// Create default configuration file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load and validate configuration
    let config = if let Some(ref path) = cli.config {
        Config::load_from(path).with_context(|| format!("reading {}", path.display()))?
    } else {
        Config::load()?
    };
    config.validate()?;

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(config.general.log_level.to_lowercase())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Replay {
            capture,
            catalog,
            realtime,
        } => run_replay(config, &capture, catalog, realtime).await,

        Commands::Config { show, init } => {
            if init {
                let default_config = Config::default();
                default_config.save()?;
                println!(
                    "Created default configuration at {}",
                    Config::config_path()?.display()
                );
            } else if show {
                let contents = toml::to_string_pretty(&config)?;
                println!("{contents}");
            } else {
                println!("Configuration path: {}", Config::config_path()?.display());
            }
            Ok(())
        }
    }
}

async fn run_replay(
    config: Config,
    capture: &Path,
    catalog: Option<PathBuf>,
    realtime: bool,
) -> anyhow::Result<()> {
    info!("{} {} starting", APP_NAME, cdj_scrobbler::VERSION);

    let resolver: Arc<dyn MetadataResolver> = match catalog.or(config.catalog.path) {
        Some(path) => Arc::new(
            StaticCatalog::load_from(&path)
                .with_context(|| format!("loading catalog {}", path.display()))?,
        ),
        None => {
            warn!("No catalog configured, every track will be unknown");
            Arc::new(StaticCatalog::new())
        }
    };

    let (queue, events) = event_queue();
    let processor = EventProcessor::new(events, resolver);

    let mut on_air = None;
    if config.accountant.enabled {
        let (warnings, warning_updates) = warn_channel();
        let accountant = Arc::new(ComplianceAccountant::new(
            ComplianceRules::from(&config.accountant),
            warnings,
        ));
        processor.add_listener(EventKind::TrackLoaded, accountant.clone());
        processor.add_listener(EventKind::NowPlaying, accountant);

        if config.on_air.enabled {
            let signal = OnAirSignal::new(
                warning_updates,
                Box::new(LoggingSink),
                config.on_air.blink_interval(),
            );
            on_air = Some(signal.spawn()?);
        }
    }

    if config.tracklist.enabled {
        info!("Logging tracklist to {:?}", config.tracklist.path);
        processor.add_listener(
            EventKind::Scrobble,
            Arc::new(TracklistLogger::new(&config.tracklist.path)),
        );
    }

    let processor_thread = processor.spawn()?;

    let source = ReplaySource::open(capture)
        .with_context(|| format!("opening capture {}", capture.display()))?
        .realtime(realtime);
    let dispatcher = EventDispatcher::new(queue, config.tracking.now_playing_point());

    let stop = Arc::new(AtomicBool::new(false));
    let ingest_stop = Arc::clone(&stop);
    let mut ingest_task =
        tokio::task::spawn_blocking(move || ingest(source, dispatcher, &ingest_stop));

    let replayed = tokio::select! {
        result = &mut ingest_task => result??,
        () = shutdown_signal() => {
            info!("Received shutdown signal, stopping...");
            stop.store(true, Ordering::SeqCst);
            ingest_task.await??
        }
    };

    // the dispatcher is gone, so the processor drains the queue and exits
    tokio::task::spawn_blocking(move || processor_thread.join())
        .await?
        .map_err(|_| anyhow!("event processor panicked"))?;

    if let Some(on_air) = on_air {
        on_air.shutdown();
    }

    info!("Replayed {} snapshots", replayed);
    Ok(())
}

/// Feed snapshots to the dispatcher until the source runs dry or `stop`
/// is set. Dropping the dispatcher at the end closes the event queue.
fn ingest(
    mut source: impl StatusSource,
    mut dispatcher: EventDispatcher,
    stop: &AtomicBool,
) -> cdj_scrobbler::Result<usize> {
    let mut count = 0;
    while !stop.load(Ordering::SeqCst) {
        let Some(status) = source.next_status()? else {
            break;
        };
        dispatcher.received(&status)?;
        count += 1;
    }
    info!("Saw {} devices", dispatcher.device_count());
    Ok(count)
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
                return;
            }
            Err(e) => {
                warn!("Failed to register SIGTERM handler: {}. Use Ctrl+C to stop.", e);
            }
        }
    }

    let _ = signal::ctrl_c().await;
}
