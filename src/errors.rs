use thiserror::Error;

// -----------------------------------------------------------------------------
// ----- Messages --------------------------------------------------------------

pub const MSG_MISSING_ADDRESS: &str = "Must provide ip address to connect";
pub const MSG_MISSING_CLIENT: &str = "No client specified";
pub const MSG_MISSING_CLIENT_OR_LEN: &str = "Client or length not specified";
pub const MSG_UNSUPPORTED_ENCODING: &str = "Unsupported data type";
pub const MSG_INVALID_HEX: &str = "Invalid hex string format";
pub const MSG_INVALID_BASE64: &str = "Invalid Base64 string";

// -----------------------------------------------------------------------------
// ----- SocketError -----------------------------------------------------------

/// Every failure the host can observe. `Display` is the exact text handed
/// back to the host, so I/O variants carry the underlying message verbatim.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SocketError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("Socket not connected")]
    NotConnected,

    #[error("{0}")]
    ConnectFailed(String),

    #[error("{0}")]
    WriteFailed(String),

    #[error("{0}")]
    ReadFailed(String),

    #[error("{0}")]
    CloseFailed(String),
}

// -----------------------------------------------------------------------------
// ----- SocketError: Static ---------------------------------------------------

impl SocketError {
    pub fn invalid(message: impl Into<String>) -> Self {
        SocketError::InvalidArgument(message.into())
    }

    pub fn connect(err: &std::io::Error) -> Self {
        SocketError::ConnectFailed(err.to_string())
    }

    pub fn write(err: &std::io::Error) -> Self {
        SocketError::WriteFailed(err.to_string())
    }

    pub fn read(err: &std::io::Error) -> Self {
        SocketError::ReadFailed(err.to_string())
    }

    pub fn close(err: &std::io::Error) -> Self {
        SocketError::CloseFailed(err.to_string())
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
