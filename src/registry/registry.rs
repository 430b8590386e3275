use std::{io, sync::Arc, time::Duration};

use parking_lot::{Mutex, RwLock};
use tokio::{net::TcpStream, sync::Semaphore, task::JoinHandle};
use tracing::{debug, info, warn};

use super::connection::{Connection, ConnectionInfo, Handle};
use crate::analytics;
use crate::config::ClientSettings;
use crate::errors::{MSG_MISSING_ADDRESS, MSG_MISSING_CLIENT_OR_LEN, SocketError};

// -----------------------------------------------------------------------------
// ----- ConnectionRegistry ----------------------------------------------------

/// Append-only table of outbound connections, indexed by handle.
///
/// Slots are never removed, so a handle keeps pointing at the same remote
/// endpoint for the life of the process. The table lock is held only to look
/// up or append a slot, never across I/O.
#[derive(Debug)]
pub struct ConnectionRegistry {
    settings: ClientSettings,
    slots: RwLock<Vec<Arc<Connection>>>,
    last_opened: Mutex<Option<Handle>>,
    workers: Arc<Semaphore>,
}

pub type SendTask = JoinHandle<Result<(), SocketError>>;
pub type ReadTask = JoinHandle<Result<Vec<u8>, SocketError>>;

// -----------------------------------------------------------------------------
// ----- ConnectionRegistry: Static --------------------------------------------

impl ConnectionRegistry {
    pub fn new(settings: ClientSettings) -> Self {
        let workers = Arc::new(Semaphore::new(settings.io_workers.max(1)));
        Self {
            settings,
            slots: RwLock::new(Vec::new()),
            last_opened: Mutex::new(None),
            workers,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- ConnectionRegistry: Public --------------------------------------------

impl ConnectionRegistry {
    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    pub fn get(&self, handle: Handle) -> Option<Arc<Connection>> {
        self.slots.read().get(handle).cloned()
    }

    pub fn snapshot(&self) -> Vec<ConnectionInfo> {
        self.slots.read().iter().map(|c| c.info()).collect()
    }

    /// Opens a new connection and returns its handle. `port` falls back to
    /// the configured default.
    pub async fn connect(&self, address: &str, port: Option<u16>) -> Result<Handle, SocketError> {
        if address.is_empty() {
            return Err(SocketError::invalid(MSG_MISSING_ADDRESS));
        }
        let port = port.unwrap_or(self.settings.default_port);

        if self.settings.close_previous_on_connect {
            self.close_last_opened().await;
        }

        let stream = match self.open_stream(address, port).await {
            Ok(stream) => stream,
            Err(e) => {
                analytics::inc_connect_failure();
                warn!("connect to {address}:{port} failed: {e}");
                return Err(SocketError::connect(&e));
            }
        };

        if let Err(e) = stream.set_nodelay(self.settings.nodelay) {
            debug!("set_nodelay on {address}:{port} failed: {e}");
        }

        let handle = {
            let mut slots = self.slots.write();
            let handle = slots.len();
            slots.push(Arc::new(Connection::open(
                handle,
                address,
                port,
                stream,
                self.workers.clone(),
            )));
            handle
        };
        *self.last_opened.lock() = Some(handle);

        analytics::inc_connect();
        info!("client {handle} connected to {address}:{port}");

        Ok(handle)
    }

    /// Resolves `handle` to an open connection. A slot that is present but
    /// no longer open is released before `NotConnected` is reported.
    pub async fn checkout(&self, handle: Handle) -> Result<Arc<Connection>, SocketError> {
        let Some(conn) = self.get(handle) else {
            return Err(SocketError::NotConnected);
        };

        if !conn.is_open() {
            conn.release().await;
            return Err(SocketError::NotConnected);
        }

        Ok(conn)
    }

    /// Checks the handle inline, then writes on a worker task.
    pub async fn spawn_send(&self, handle: Handle, bytes: Vec<u8>) -> Result<SendTask, SocketError> {
        let conn = self.checkout(handle).await?;

        Ok(tokio::spawn(async move {
            match conn.write_all(&bytes).await {
                Ok(()) => {
                    analytics::add_bytes_sent(bytes.len());
                    debug!("client {} sent {} bytes", conn.handle(), bytes.len());
                    Ok(())
                }
                Err(e) => {
                    analytics::inc_io_failure();
                    warn!("client {} send failed: {e}", conn.handle());
                    Err(e)
                }
            }
        }))
    }

    /// Checks arguments and the handle inline, then reads on a worker task.
    pub async fn spawn_read(
        &self,
        handle: Handle,
        max_len: usize,
        timeout: Option<Duration>,
    ) -> Result<ReadTask, SocketError> {
        self.check_read_len(max_len)?;

        let conn = self.checkout(handle).await?;

        Ok(tokio::spawn(async move {
            match conn.read_some(max_len, timeout).await {
                Ok(bytes) => {
                    analytics::add_bytes_received(bytes.len());
                    debug!("client {} read {} bytes", conn.handle(), bytes.len());
                    Ok(bytes)
                }
                Err(e) => {
                    analytics::inc_io_failure();
                    warn!("client {} read failed: {e}", conn.handle());
                    Err(e)
                }
            }
        }))
    }

    pub async fn send(&self, handle: Handle, bytes: Vec<u8>) -> Result<(), SocketError> {
        join_send(self.spawn_send(handle, bytes).await?).await
    }

    pub async fn read(
        &self,
        handle: Handle,
        max_len: usize,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, SocketError> {
        join_read(self.spawn_read(handle, max_len, timeout).await?).await
    }

    /// Closes the connection behind `handle` and echoes the handle back.
    ///
    /// Always reports state: a connection that was already closed is closed
    /// again (a no-op) and the call fails with `NotConnected`.
    pub async fn disconnect(&self, handle: Handle) -> Result<Handle, SocketError> {
        let Some(conn) = self.get(handle) else {
            return Err(SocketError::NotConnected);
        };

        let was_open = conn.close().await.inspect_err(|e| {
            warn!("client {handle} close failed: {e}");
        })?;

        if !was_open {
            return Err(SocketError::NotConnected);
        }

        analytics::inc_disconnect();
        info!("client {handle} disconnected");

        Ok(handle)
    }

    /// Closes every open connection. Used at shutdown.
    pub async fn close_all(&self) {
        let slots: Vec<Arc<Connection>> = self.slots.read().clone();
        for conn in slots.iter().filter(|c| c.is_open()) {
            if let Err(e) = conn.close().await {
                warn!("client {} close failed: {e}", conn.handle());
            }
        }
    }
}

// -----------------------------------------------------------------------------
// ----- ConnectionRegistry: Private -------------------------------------------

impl ConnectionRegistry {
    async fn open_stream(&self, address: &str, port: u16) -> io::Result<TcpStream> {
        let connect = TcpStream::connect((address, port));

        let Some(limit) = self.settings.connect_timeout else {
            return connect.await;
        };

        match tokio::time::timeout(limit, connect).await {
            Ok(res) => res,
            Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "connect timed out")),
        }
    }

    /// Legacy single-slot behavior: only the most recent connection is closed.
    async fn close_last_opened(&self) {
        let last = *self.last_opened.lock();
        let Some(handle) = last else {
            return;
        };
        let Some(conn) = self.get(handle) else {
            return;
        };
        if !conn.is_open() {
            return;
        }

        debug!("closing client {handle} before opening a new connection");
        if let Err(e) = conn.close().await {
            warn!("client {handle} close failed: {e}");
        }
    }

    fn check_read_len(&self, max_len: usize) -> Result<(), SocketError> {
        if max_len == 0 {
            return Err(SocketError::invalid(MSG_MISSING_CLIENT_OR_LEN));
        }
        if max_len > self.settings.max_read_len {
            return Err(SocketError::invalid(format!(
                "expectLen exceeds limit of {} bytes",
                self.settings.max_read_len
            )));
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// ----- Worker Tasks ----------------------------------------------------------

/// Awaits a send worker. A worker that panicked or was cancelled counts as a
/// failed write.
pub async fn join_send(task: SendTask) -> Result<(), SocketError> {
    join(task, SocketError::WriteFailed).await
}

/// Awaits a read worker. A worker that panicked or was cancelled counts as a
/// failed read.
pub async fn join_read(task: ReadTask) -> Result<Vec<u8>, SocketError> {
    join(task, SocketError::ReadFailed).await
}

async fn join<T>(
    task: JoinHandle<Result<T, SocketError>>,
    failed: fn(String) -> SocketError,
) -> Result<T, SocketError> {
    task.await.unwrap_or_else(|e| Err(failed(e.to_string())))
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
