pub mod cli;
pub mod config;
pub mod settings;
pub mod types;

pub use config::Config;
pub use settings::{ClientSettings, SettingsError};
pub use types::LogLevel;
