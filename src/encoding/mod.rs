//! Conversions between host-side text and socket bytes.
//!
//! Outbound: `send` payloads arrive as text tagged with an encoding name and
//! are decoded into the bytes that go on the wire. Inbound: bytes returned by
//! `read` are rendered back into text in the encoding the caller asked for.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::errors::{MSG_INVALID_BASE64, MSG_INVALID_HEX, MSG_UNSUPPORTED_ENCODING, SocketError};

// -----------------------------------------------------------------------------
// ----- Encoding --------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Hex,
    Base64,
}

// -----------------------------------------------------------------------------
// ----- Encoding: Static ------------------------------------------------------

impl Encoding {
    /// Names are matched exactly, the way hosts send them.
    pub fn from_name(name: &str) -> Result<Self, SocketError> {
        match name {
            "utf8" => Ok(Encoding::Utf8),
            "hex" => Ok(Encoding::Hex),
            "base64" => Ok(Encoding::Base64),
            _ => Err(SocketError::invalid(MSG_UNSUPPORTED_ENCODING)),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Encoding: Public ------------------------------------------------------

impl Encoding {
    /// Host text -> wire bytes.
    pub fn decode(self, data: &str) -> Result<Vec<u8>, SocketError> {
        match self {
            Encoding::Utf8 => Ok(data.as_bytes().to_vec()),
            Encoding::Hex => decode_hex(data),
            Encoding::Base64 => BASE64
                .decode(data)
                .map_err(|_| SocketError::invalid(MSG_INVALID_BASE64)),
        }
    }

    /// Wire bytes -> host text. Invalid UTF-8 is replaced, never rejected.
    pub fn render(self, bytes: &[u8]) -> String {
        match self {
            Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Encoding::Hex => hex::encode(bytes),
            Encoding::Base64 => BASE64.encode(bytes),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

/// Odd-length input gets a single leading '0' so "abc" reads as "0abc".
fn decode_hex(data: &str) -> Result<Vec<u8>, SocketError> {
    let decoded = if data.len() % 2 == 0 {
        hex::decode(data)
    } else {
        hex::decode(format!("0{data}"))
    };

    decoded.map_err(|_| SocketError::invalid(MSG_INVALID_HEX))
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
