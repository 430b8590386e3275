use clap::Parser;
use parking_lot::RwLock;
use std::{
    fs,
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
    time::Duration,
};

use super::types::LogLevel;

// -----------------------------------------------------------------------------
// ----- Global Singleton ------------------------------------------------------

static CLI_CONFIG: OnceLock<Arc<RwLock<CliConfig>>> = OnceLock::new();

// -----------------------------------------------------------------------------
// ----- CliConfig -------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct CliConfig {
    pub listen_addr: SocketAddr,
    pub settings_file_location: Option<PathBuf>,
    pub connect_timeout: Option<Duration>,
    pub log_level: LogLevel,
}

impl CliConfig {
    pub fn init() {
        CLI_CONFIG.get_or_init(|| {
            let cfg = Self::from_args(Args::try_parse());
            cfg.validate();
            Arc::new(RwLock::new(cfg))
        });
    }

    pub fn snapshot() -> CliConfig {
        handle().read().clone()
    }
}

// -----------------------------------------------------------------------------
// ----- CliConfig: Private ----------------------------------------------------

impl CliConfig {
    fn from_args(args: Result<Args, clap::Error>) -> Self {
        let args = args.unwrap_or_else(|e| e.exit());

        Self {
            listen_addr: SocketAddr::from((args.host, args.port)),
            settings_file_location: args.config_file,
            connect_timeout: args.connect_timeout,
            log_level: args.log_level,
        }
    }

    fn validate(&self) {
        if let Some(path) = &self.settings_file_location {
            must_exist_file(path, "--config / tcpcrab.toml");
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Args ------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "tcpcrab", version, about = "TCP client socket bridge")]
struct Args {
    // Address the host bridge listens on. Loopback unless told otherwise.
    #[arg(long = "host", short = 'H', env = "TCPCRAB_HOST", default_value = "127.0.0.1")]
    host: IpAddr,

    #[arg(long = "port", short = 'p', env = "TCPCRAB_PORT", default_value_t = 7070)]
    port: u16,

    #[arg(long = "log", default_value = "info")]
    log_level: LogLevel,

    // Optional; when given it must exist.
    #[arg(long = "config", env = "TCPCRAB_CONFIG_FILE")]
    config_file: Option<PathBuf>,

    // Overrides [client].connect_timeout from the settings file (e.g. "10s", "500ms").
    #[arg(
        long = "connect-timeout",
        env = "TCPCRAB_CONNECT_TIMEOUT",
        value_parser = humantime::parse_duration
    )]
    connect_timeout: Option<Duration>,
}

// -----------------------------------------------------------------------------
// ----- Private Utils ---------------------------------------------------------

fn handle() -> Arc<RwLock<CliConfig>> {
    CLI_CONFIG
        .get()
        .expect("cli config not initialized; call CliConfig::init() first")
        .clone()
}

fn must_exist_file(path: &Path, hint: &str) {
    let md = fs::metadata(path).unwrap_or_else(|_| {
        panic!("required file missing: {} (from {hint})", path.display());
    });

    if !md.is_file() {
        panic!("path is not a file: {} (from {hint})", path.display());
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
