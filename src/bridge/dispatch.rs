use std::{sync::Arc, time::Duration};

use crate::encoding::Encoding;
use crate::errors::{MSG_MISSING_CLIENT, MSG_MISSING_CLIENT_OR_LEN, SocketError};
use crate::registry::{ConnectionRegistry, Handle, ReadTask, SendTask, join_read, join_send};

use super::messages::{Call, ConnectParams, DisconnectParams, ReadParams, Reply, SendParams};

// -----------------------------------------------------------------------------
// ----- Outcome ---------------------------------------------------------------

/// What a dispatched call turned into. `Done` is already settled; the other
/// two are running on registry workers and settle when awaited.
#[derive(Debug)]
pub enum Outcome {
    Done(Result<Reply, SocketError>),
    Sending(SendTask),
    Reading(ReadTask, Encoding),
}

impl Outcome {
    pub fn is_pending(&self) -> bool {
        !matches!(self, Outcome::Done(_))
    }

    pub async fn finish(self) -> Result<Reply, SocketError> {
        match self {
            Outcome::Done(res) => res,
            Outcome::Sending(task) => join_send(task).await.map(|()| Reply::Ack),
            Outcome::Reading(task, encoding) => join_read(task)
                .await
                .map(|bytes| Reply::Data(encoding.render(&bytes))),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Dispatcher ------------------------------------------------------------

/// Validates host requests and maps them onto the registry.
///
/// `connect` and `disconnect` settle inline. `send` and `read` are checked
/// inline (arguments, then the connected check) and then handed to a worker,
/// so the caller never waits on socket I/O for them.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ConnectionRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub async fn dispatch(&self, call: Call) -> Outcome {
        match call {
            Call::Connect(params) => Outcome::Done(self.connect(params).await),
            Call::Disconnect(params) => Outcome::Done(self.disconnect(params).await),
            Call::Send(params) => match self.send(params).await {
                Ok(task) => Outcome::Sending(task),
                Err(e) => Outcome::Done(Err(e)),
            },
            Call::Read(params) => match self.read(params).await {
                Ok((task, encoding)) => Outcome::Reading(task, encoding),
                Err(e) => Outcome::Done(Err(e)),
            },
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Dispatcher: Private ---------------------------------------------------

impl Dispatcher {
    async fn connect(&self, params: ConnectParams) -> Result<Reply, SocketError> {
        let address = params.ip_address.unwrap_or_default();

        let port = match params.port {
            None => None,
            Some(p) => Some(
                u16::try_from(p)
                    .ok()
                    .filter(|p| *p != 0)
                    .ok_or_else(|| SocketError::invalid(format!("port out of range: {p}")))?,
            ),
        };

        let handle = self.registry.connect(&address, port).await?;
        Ok(Reply::Client(handle))
    }

    async fn send(&self, params: SendParams) -> Result<SendTask, SocketError> {
        let handle = client_handle(params.client, MSG_MISSING_CLIENT)?;
        let encoding = Encoding::from_name(params.encoding.as_deref().unwrap_or("utf8"))?;
        let bytes = encoding.decode(params.data.as_deref().unwrap_or(""))?;

        self.registry.spawn_send(handle, bytes).await
    }

    async fn read(&self, params: ReadParams) -> Result<(ReadTask, Encoding), SocketError> {
        let handle = client_handle(params.client, MSG_MISSING_CLIENT_OR_LEN)?;

        let max_len = match params.expect_len {
            None => self.registry.settings().default_read_len,
            Some(n) => {
                usize::try_from(n).map_err(|_| SocketError::invalid(MSG_MISSING_CLIENT_OR_LEN))?
            }
        };

        let encoding = Encoding::from_name(params.encoding.as_deref().unwrap_or("utf8"))?;

        let timeout = match params.timeout {
            None => None,
            Some(secs) => Some(
                Duration::try_from_secs_f64(secs)
                    .map_err(|_| SocketError::invalid(format!("invalid timeout: {secs}")))?,
            ),
        };

        let task = self.registry.spawn_read(handle, max_len, timeout).await?;
        Ok((task, encoding))
    }

    async fn disconnect(&self, params: DisconnectParams) -> Result<Reply, SocketError> {
        let handle = client_handle(params.client, MSG_MISSING_CLIENT)?;

        let handle = self.registry.disconnect(handle).await?;
        Ok(Reply::Client(handle))
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

/// Missing and negative values (the host sends -1 for "unset") are both
/// "not specified".
fn client_handle(client: Option<i64>, missing: &str) -> Result<Handle, SocketError> {
    client
        .and_then(|c| Handle::try_from(c).ok())
        .ok_or_else(|| SocketError::invalid(missing))
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
