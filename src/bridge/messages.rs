//! bridge::messages
//!
//! JSON shapes exchanged with the host, one object per line.
//!
//! Request:  `{"id": 1, "method": "connect", "params": {"ipAddress": "10.0.0.5"}}`
//! Response: `{"id": 1, "result": {"client": 0}}` or `{"id": 1, "error": "..."}`

use bytes::Bytes;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};

use crate::errors::SocketError;
use crate::registry::Handle;

// -----------------------------------------------------------------------------
// ----- RawRequest ------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RawRequest {
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

// -----------------------------------------------------------------------------
// ----- Call ------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Connect(ConnectParams),
    Send(SendParams),
    Read(ReadParams),
    Disconnect(DisconnectParams),
}

impl Call {
    pub fn from_raw(method: &str, params: Value) -> Result<Call, SocketError> {
        match method {
            "connect" => Ok(Call::Connect(params_from(params)?)),
            "send" => Ok(Call::Send(params_from(params)?)),
            "read" => Ok(Call::Read(params_from(params)?)),
            "disconnect" => Ok(Call::Disconnect(params_from(params)?)),
            other => Err(SocketError::invalid(format!("Unsupported method: {other}"))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Call::Connect(_) => "connect",
            Call::Send(_) => "send",
            Call::Read(_) => "read",
            Call::Disconnect(_) => "disconnect",
        }
    }
}

// Integers stay signed so the host's "-1 means unset" convention reaches the
// dispatcher instead of dying in serde.

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub port: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendParams {
    #[serde(default)]
    pub client: Option<i64>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadParams {
    #[serde(default)]
    pub client: Option<i64>,
    #[serde(default)]
    pub expect_len: Option<i64>,
    #[serde(default)]
    pub encoding: Option<String>,
    /// Seconds.
    #[serde(default)]
    pub timeout: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectParams {
    #[serde(default)]
    pub client: Option<i64>,
}

// -----------------------------------------------------------------------------
// ----- Reply -----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Client(Handle),
    Ack,
    Data(String),
}

impl Reply {
    pub fn to_value(&self) -> Value {
        match self {
            Reply::Client(handle) => json!({ "client": handle }),
            Reply::Ack => Value::Object(Map::new()),
            Reply::Data(text) => json!({ "result": text }),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Response --------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn from_result(id: Option<u64>, res: Result<Reply, SocketError>) -> Self {
        match res {
            Ok(reply) => Self {
                id,
                result: Some(reply.to_value()),
                error: None,
            },
            Err(e) => Self::error(id, e.to_string()),
        }
    }

    pub fn error(id: Option<u64>, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(message.into()),
        }
    }

    /// Serialized line, `\n` included.
    pub fn to_line(&self) -> serde_json::Result<Bytes> {
        let mut buf = serde_json::to_vec(self)?;
        buf.push(b'\n');
        Ok(Bytes::from(buf))
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

fn params_from<T: DeserializeOwned>(params: Value) -> Result<T, SocketError> {
    let params = match params {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };

    serde_json::from_value(params).map_err(|e| SocketError::invalid(format!("invalid params: {e}")))
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
