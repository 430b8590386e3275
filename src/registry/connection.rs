use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::{
    io::AsyncWriteExt,
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    select,
    sync::{Mutex, Semaphore, watch},
};

use crate::errors::SocketError;

// -----------------------------------------------------------------------------
// ----- Handle / ConnState ----------------------------------------------------

/// Index of a connection in the registry. Never reused.
pub type Handle = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Open,
    Closed,
}

impl ConnState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnState::Open => "open",
            ConnState::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub handle: Handle,
    pub address: String,
    pub port: u16,
    pub state: ConnState,
}

// -----------------------------------------------------------------------------
// ----- Connection ------------------------------------------------------------

/// One outbound TCP socket.
///
/// The read and write halves sit behind separate locks, so a read parked on a
/// quiet peer never holds up a send on the same handle. Closing flips `open`
/// and fires `closed_tx`; anything parked on a half wakes up, fails, and lets
/// go of its lock so the halves can be dropped.
///
/// `pool` is shared by every connection in the registry. A permit is held
/// only while bytes are copied to or from a socket that is already ready,
/// never while waiting on the peer, so a quiet socket cannot starve the rest.
#[derive(Debug)]
pub struct Connection {
    handle: Handle,
    address: String,
    port: u16,

    open: AtomicBool,
    closed_tx: watch::Sender<bool>,
    pool: Arc<Semaphore>,

    reader: Mutex<Option<OwnedReadHalf>>,
    writer: Mutex<Option<OwnedWriteHalf>>,
}

// -----------------------------------------------------------------------------
// ----- Connection: Static ----------------------------------------------------

impl Connection {
    pub fn open(
        handle: Handle,
        address: &str,
        port: u16,
        stream: TcpStream,
        pool: Arc<Semaphore>,
    ) -> Self {
        let (read_half, write_half) = stream.into_split();
        let (closed_tx, _) = watch::channel(false);

        Self {
            handle,
            address: address.to_string(),
            port,
            open: AtomicBool::new(true),
            closed_tx,
            pool,
            reader: Mutex::new(Some(read_half)),
            writer: Mutex::new(Some(write_half)),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Connection: Public ----------------------------------------------------

impl Connection {
    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn state(&self) -> ConnState {
        if self.is_open() {
            ConnState::Open
        } else {
            ConnState::Closed
        }
    }

    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            handle: self.handle,
            address: self.address.clone(),
            port: self.port,
            state: self.state(),
        }
    }

    /// Full write of `bytes`. Any failure closes the connection.
    pub async fn write_all(&self, bytes: &[u8]) -> Result<(), SocketError> {
        if !self.is_open() {
            return Err(SocketError::NotConnected);
        }

        let closed = wait_closed(self.closed_tx.subscribe());
        tokio::pin!(closed);

        let mut guard = select! {
            guard = self.writer.lock() => guard,
            _ = &mut closed => return Err(SocketError::write(&closed_error())),
        };

        let Some(writer) = guard.as_ref() else {
            return Err(SocketError::NotConnected);
        };

        let res = select! {
            res = self.write_when_ready(writer, bytes) => res,
            _ = &mut closed => Err(closed_error()),
        };

        if let Err(e) = res {
            guard.take();
            drop(guard);
            self.release().await;
            return Err(SocketError::write(&e));
        }

        Ok(())
    }

    /// At most one underlying read of up to `max_len` bytes.
    ///
    /// `Ok(empty)` on EOF, or when `timeout` elapses before anything arrives;
    /// neither closes the connection. I/O errors do.
    pub async fn read_some(
        &self,
        max_len: usize,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, SocketError> {
        if !self.is_open() {
            return Err(SocketError::NotConnected);
        }

        let closed = wait_closed(self.closed_tx.subscribe());
        tokio::pin!(closed);

        let mut guard = select! {
            guard = self.reader.lock() => guard,
            _ = &mut closed => return Err(SocketError::read(&closed_error())),
        };

        let Some(reader) = guard.as_ref() else {
            return Err(SocketError::NotConnected);
        };

        let mut buf = vec![0u8; max_len];
        let res = select! {
            res = self.read_when_ready(reader, &mut buf) => res,
            _ = sleep_or_pending(timeout) => Ok(0),
            _ = &mut closed => Err(closed_error()),
        };

        match res {
            Ok(n) => {
                buf.truncate(n);
                Ok(buf)
            }
            Err(e) => {
                guard.take();
                drop(guard);
                self.release().await;
                Err(SocketError::read(&e))
            }
        }
    }

    /// Shuts the socket down. Returns whether it was open before the call;
    /// closing an already closed connection is a no-op that returns `false`.
    pub async fn close(&self) -> Result<bool, SocketError> {
        let was_open = self.mark_closed();

        let writer = self.writer.lock().await.take();
        self.reader.lock().await.take();

        if let Some(mut half) = writer {
            half.shutdown().await.map_err(|e| SocketError::close(&e))?;
        }

        Ok(was_open)
    }

    /// Marks the connection closed and drops both halves, ignoring errors.
    pub async fn release(&self) {
        let _ = self.close().await;
    }
}

// -----------------------------------------------------------------------------
// ----- Connection: Private ---------------------------------------------------

impl Connection {
    fn mark_closed(&self) -> bool {
        let was_open = self.open.swap(false, Ordering::AcqRel);
        self.closed_tx.send_replace(true);
        was_open
    }

    async fn write_when_ready(&self, half: &OwnedWriteHalf, mut bytes: &[u8]) -> io::Result<()> {
        while !bytes.is_empty() {
            half.writable().await?;

            let _permit = self.pool.acquire().await.map_err(|_| pool_closed())?;
            match half.try_write(bytes) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => bytes = &bytes[n..],
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn read_when_ready(&self, half: &OwnedReadHalf, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            half.readable().await?;

            let _permit = self.pool.acquire().await.map_err(|_| pool_closed())?;
            match half.try_read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

async fn wait_closed(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|closed| *closed).await;
}

async fn sleep_or_pending(timeout: Option<Duration>) {
    match timeout {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "socket closed")
}

fn pool_closed() -> io::Error {
    io::Error::other("worker pool closed")
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
