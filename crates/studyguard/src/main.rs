mod monitor;
mod popup;

use clap::{Parser, Subcommand};
use monitor::Monitor;
use std::path::PathBuf;
use studyguard_engine::config::ConfigLoader;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "studyguard", version, about = "StudyGuard study activity monitor")]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// Config file (defaults to ./studyguard.yaml, then ~/.studyguard/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Mode {
    /// Watch tabs of a Chromium browser via CDP
    Headless {
        /// Launch browser in visible mode (not headless)
        #[arg(long)]
        visible: bool,
        /// Attach to a running browser instead, e.g. http://127.0.0.1:9222
        #[arg(long)]
        debug_url: Option<String>,
    },
    /// Watch tabs reported by the companion extension over WebSocket
    Remote {
        /// WebSocket port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Check whether the local collector is reachable
    Health,
    /// List the known courses
    Courses {
        /// Fetch from the collector instead of reading the cache
        #[arg(long)]
        refresh: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout is for command output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = ConfigLoader::load(args.config.as_deref()).await?;

    match args.mode {
        Mode::Headless { visible, debug_url } => {
            config.headless.visible |= visible;
            if debug_url.is_some() {
                config.headless.debug_url = debug_url;
            }
            Monitor::new(config)?.run_headless().await
        }
        Mode::Remote { port } => {
            if let Some(port) = port {
                config.remote.port = port;
            }
            Monitor::new(config)?.run_remote().await
        }
        Mode::Health => popup::health(&config).await,
        Mode::Courses { refresh } => popup::courses(&config, refresh).await,
    }
}
