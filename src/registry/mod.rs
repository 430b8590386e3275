//! Handle-indexed table of outbound TCP client connections.

pub mod connection;
pub mod registry;

pub use connection::{ConnState, Connection, ConnectionInfo, Handle};
pub use registry::{ConnectionRegistry, ReadTask, SendTask, join_read, join_send};
