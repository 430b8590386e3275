pub mod analytics;
pub mod bridge;
pub mod config;
pub mod encoding;
pub mod errors;
pub mod registry;

pub use bridge::{Dispatcher, HostSession};
pub use config::{ClientSettings, Config};
pub use encoding::Encoding;
pub use errors::SocketError;
pub use registry::{ConnectionRegistry, Handle};
