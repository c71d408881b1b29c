use clap::Parser;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracker::clock::SystemClock;
use tracker::config::{
    load_servers_file, register_new_servers, TrackerConfig, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_POLL_TIMEOUT_SECS, DEFAULT_SESSIONS_FILE,
};
use tracker::console::RconConsole;
use tracker::reconciler::Reconciler;
use tracker::scheduler::Scheduler;
use tracker::store::{JsonlSessionStore, MemoryRegistry};

#[derive(Parser, Debug)]
#[command(author, version, about = "Tracks live status and player sessions of game servers over RCON", long_about = None)]
struct Args {
    /// Seconds between polling passes
    #[arg(long, env = "POLL_INTERVAL_SECONDS", default_value_t = DEFAULT_POLL_INTERVAL_SECS,
          value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval_secs: u64,

    /// Seconds allowed for connecting to and querying one server
    #[arg(long, env = "POLL_TIMEOUT_SECONDS", default_value_t = DEFAULT_POLL_TIMEOUT_SECS,
          value_parser = clap::value_parser!(u64).range(1..))]
    poll_timeout_secs: u64,

    /// Server to track (`host` or `host:port`); may be repeated
    #[arg(short, long = "server")]
    servers: Vec<String>,

    /// JSON file holding an array of server addresses to track; re-read
    /// every poll interval to pick up new servers
    #[arg(long)]
    servers_file: Option<PathBuf>,

    /// RCON password shared by the tracked servers
    #[arg(short = 'P', long, env = "RCON_PASSWORD", default_value = "", hide_env_values = true)]
    rcon_password: String,

    /// RCON port used for addresses without one
    #[arg(long, env = "RCON_PORT", default_value_t = shared::DEFAULT_RCON_PORT)]
    rcon_port: u16,

    /// Where completed sessions are appended, one JSON object per line
    #[arg(long, default_value = DEFAULT_SESSIONS_FILE)]
    sessions_file: PathBuf,
}

impl Args {
    fn into_config(self) -> Result<TrackerConfig, tracker::TrackerError> {
        let mut servers: Vec<shared::Address> =
            self.servers.into_iter().map(shared::Address::from).collect();
        if let Some(path) = &self.servers_file {
            servers.extend(load_servers_file(path)?);
        }

        TrackerConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            poll_timeout: Duration::from_secs(self.poll_timeout_secs),
            rcon_password: self.rcon_password,
            rcon_port: self.rcon_port,
            sessions_file: self.sessions_file,
            servers_file: self.servers_file,
            servers,
        }
        .validate()
    }
}

/// Registers servers added to the servers file while the tracker runs
async fn watch_servers_file(
    registry: Arc<MemoryRegistry>,
    path: PathBuf,
    every: Duration,
    default_port: u16,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut timer = interval(every);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The file was read at startup
    timer.tick().await;

    loop {
        tokio::select! {
            _ = timer.tick() => {
                match register_new_servers(&registry, &path, default_port).await {
                    Ok(added) => debug!("{} new servers in {}", added, path.display()),
                    Err(e) => warn!("Failed to reload {}: {}", path.display(), e),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = Args::parse().into_config()?;

    info!("Starting presence tracker");
    if config.servers.is_empty() {
        warn!("No servers to track; pass --server or --servers-file");
    }
    for address in &config.servers {
        info!("Tracking {}", address);
    }

    let registry = Arc::new(MemoryRegistry::new(config.servers.clone()));
    let sessions = Arc::new(JsonlSessionStore::open(&config.sessions_file).await?);
    let console = Arc::new(RconConsole::new(config.rcon_password.clone(), config.rcon_port));

    let reconciler = Reconciler::new(
        registry.clone(),
        sessions,
        console,
        Arc::new(SystemClock),
    )
    .with_poll_timeout(config.poll_timeout);
    let mut scheduler = Scheduler::new(reconciler, config.poll_interval);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    if let Some(path) = config.servers_file.clone() {
        tokio::spawn(watch_servers_file(
            registry.clone(),
            path,
            config.poll_interval,
            config.rcon_port,
            shutdown_rx.clone(),
        ));
    }
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(shutdown_rx).await;
    });

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down...");
    let _ = shutdown_tx.send(true);
    scheduler_handle.await?;

    Ok(())
}
