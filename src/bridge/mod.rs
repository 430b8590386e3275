//! Host-facing surface: JSON-lines requests in, JSON-lines responses out.

pub mod dispatch;
pub mod messages;
pub mod session;

pub use dispatch::{Dispatcher, Outcome};
pub use messages::{Call, RawRequest, Reply, Response};
pub use session::HostSession;
