use serde::Deserialize;
use std::{path::Path, time::Duration};
use thiserror::Error;
use tokio::fs;

// -----------------------------------------------------------------------------
// ----- Defaults --------------------------------------------------------------

pub const DEFAULT_REMOTE_PORT: u16 = 9100;
pub const DEFAULT_READ_LEN: usize = 1024;
pub const DEFAULT_MAX_READ_LEN: usize = 64 * 1024;
pub const DEFAULT_IO_WORKERS: usize = 64;

// -----------------------------------------------------------------------------
// ----- ClientSettings --------------------------------------------------------

/// Knobs for outbound client sockets. Every field has a default, so an absent
/// settings file and an empty one behave the same.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub default_port: u16,
    pub default_read_len: usize,
    pub max_read_len: usize,
    /// `None` leaves the OS connect timeout in charge.
    pub connect_timeout: Option<Duration>,
    pub nodelay: bool,
    pub io_workers: usize,
    pub close_previous_on_connect: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            default_port: DEFAULT_REMOTE_PORT,
            default_read_len: DEFAULT_READ_LEN,
            max_read_len: DEFAULT_MAX_READ_LEN,
            connect_timeout: None,
            nodelay: true,
            io_workers: DEFAULT_IO_WORKERS,
            close_previous_on_connect: false,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- ClientSettings: Static ------------------------------------------------

impl ClientSettings {
    pub async fn from_file_async(path: &Path) -> Result<ClientSettings, SettingsError> {
        let raw = fs::read_to_string(path)
            .await
            .map_err(|e| SettingsError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<ClientSettings, SettingsError> {
        let doc: SettingsFile = toml::from_str(raw).map_err(|e| SettingsError::Toml { source: e })?;
        let entry = doc.client.unwrap_or_default();

        let defaults = ClientSettings::default();
        let settings = ClientSettings {
            default_port: entry.default_port.unwrap_or(defaults.default_port),
            default_read_len: entry.default_read_len.unwrap_or(defaults.default_read_len),
            max_read_len: entry.max_read_len.unwrap_or(defaults.max_read_len),
            connect_timeout: entry.connect_timeout,
            nodelay: entry.nodelay.unwrap_or(defaults.nodelay),
            io_workers: entry.io_workers.unwrap_or(defaults.io_workers),
            close_previous_on_connect: entry.close_previous_on_connect,
        };

        validate(&settings)?;
        Ok(settings)
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: On-disk format ----------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    client: Option<ClientSettingsEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClientSettingsEntry {
    #[serde(default)]
    default_port: Option<u16>,

    #[serde(default)]
    default_read_len: Option<usize>,

    #[serde(default)]
    max_read_len: Option<usize>,

    #[serde(default, deserialize_with = "de_ms")]
    connect_timeout: Option<Duration>,

    #[serde(default)]
    nodelay: Option<bool>,

    #[serde(default)]
    io_workers: Option<usize>,

    #[serde(default)]
    close_previous_on_connect: bool,
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

fn validate(s: &ClientSettings) -> Result<(), SettingsError> {
    if s.default_port == 0 {
        return Err(SettingsError::InvalidField("default_port".into()));
    }
    if s.max_read_len == 0 {
        return Err(SettingsError::InvalidField("max_read_len".into()));
    }
    if s.default_read_len == 0 || s.default_read_len > s.max_read_len {
        return Err(SettingsError::InvalidField("default_read_len".into()));
    }
    if s.io_workers == 0 {
        return Err(SettingsError::InvalidField("io_workers".into()));
    }
    if s.connect_timeout == Some(Duration::ZERO) {
        return Err(SettingsError::InvalidField("connect_timeout".into()));
    }
    Ok(())
}

fn de_ms<'de, D>(d: D) -> Result<Option<Duration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{Error, Unexpected, Visitor};
    use std::fmt;

    struct OptVisitor;
    struct MsVisitor;

    impl<'de> Visitor<'de> for OptVisitor {
        type Value = Option<Duration>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("integer milliseconds (e.g., 10000)")
        }
        fn visit_none<E: Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
        fn visit_unit<E: Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
        fn visit_some<D2>(self, d2: D2) -> Result<Self::Value, D2::Error>
        where
            D2: serde::Deserializer<'de>,
        {
            d2.deserialize_any(MsVisitor)
        }
    }

    impl<'de> Visitor<'de> for MsVisitor {
        type Value = Option<Duration>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("integer milliseconds (e.g., 10000)")
        }

        fn visit_u64<E: Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(Duration::from_millis(v)))
        }

        fn visit_i64<E: Error>(self, v: i64) -> Result<Self::Value, E> {
            if v < 0 {
                return Err(E::invalid_value(Unexpected::Signed(v), &self));
            }
            Ok(Some(Duration::from_millis(v as u64)))
        }

        fn visit_str<E: Error>(self, v: &str) -> Result<Self::Value, E> {
            Err(E::invalid_value(Unexpected::Str(v), &self))
        }
    }

    d.deserialize_option(OptVisitor)
}

// -----------------------------------------------------------------------------
// ----- Errors ----------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid value for field '{0}'")]
    InvalidField(String),

    #[error("read error for {path:?}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("toml parse error: {source}")]
    Toml { source: toml::de::Error },
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
