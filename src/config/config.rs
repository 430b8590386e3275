use parking_lot::RwLock;
use std::{
    net::SocketAddr,
    sync::{Arc, OnceLock},
};

use super::{cli::CliConfig, settings::ClientSettings, types::LogLevel};

// -----------------------------------------------------------------------------
// ----- Global Singleton ------------------------------------------------------

static ROOT_CONFIG: OnceLock<Arc<RwLock<Config>>> = OnceLock::new();

// -----------------------------------------------------------------------------
// ----- Config ----------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: LogLevel,
    pub client: ClientSettings,
}

// -----------------------------------------------------------------------------
// ----- Config: Static --------------------------------------------------------

impl Config {
    /// Init: panic on any error. Do not continue with a bad state.
    pub async fn init() {
        CliConfig::init();

        let cli = CliConfig::snapshot();
        let client = match load_client_settings(&cli).await {
            Ok(client) => client,
            Err(e) => panic!("{e}"),
        };

        Self::store(Self::assemble(&cli, client));
    }

    pub fn snapshot() -> Config {
        Self::handle().read().clone()
    }
}

// -----------------------------------------------------------------------------
// ----- Config: Private -------------------------------------------------------

impl Config {
    fn assemble(cli: &CliConfig, mut client: ClientSettings) -> Config {
        if cli.connect_timeout.is_some() {
            client.connect_timeout = cli.connect_timeout;
        }

        Config {
            listen_addr: cli.listen_addr,
            log_level: cli.log_level,
            client,
        }
    }

    fn store(next: Config) {
        if let Some(handle) = ROOT_CONFIG.get() {
            *handle.write() = next;
        } else {
            let _ = ROOT_CONFIG.set(Arc::new(RwLock::new(next)));
        }
    }

    fn handle() -> Arc<RwLock<Config>> {
        ROOT_CONFIG
            .get()
            .expect("Config not initialized; call Config::init().await first")
            .clone()
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

async fn load_client_settings(cli: &CliConfig) -> Result<ClientSettings, String> {
    let Some(path) = cli.settings_file_location.as_deref() else {
        return Ok(ClientSettings::default());
    };

    ClientSettings::from_file_async(path)
        .await
        .map_err(|e| format!("failed to load settings from {:?}: {e}", path))
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
