use std::net::SocketAddr;

use bytes::{Bytes, BytesMut};
use memchr::memchr;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::mpsc,
};
use tracing::{debug, error, info, warn};

use super::dispatch::Dispatcher;
use super::messages::{Call, RawRequest, Response};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const SCRATCH_CAPACITY_HINT: usize = 4096;
const MAX_LINE_LEN: usize = 4 * 1024 * 1024;

// -----------------------------------------------------------------------------
// ----- HostSession -----------------------------------------------------------

/// One host connected to the bridge. Requests come in as JSON lines; every
/// response leaves through a single writer task, so responses from workers
/// finishing out of order never interleave on the wire.
#[derive(Debug)]
pub struct HostSession {
    peer: SocketAddr,
    dispatcher: Dispatcher,

    inbox: BytesMut,
    reader: OwnedReadHalf,
    async_writer: mpsc::UnboundedSender<Bytes>,
}

// -----------------------------------------------------------------------------
// ----- HostSession: Static ---------------------------------------------------

impl HostSession {
    pub fn new(stream: TcpStream, peer: SocketAddr, dispatcher: Dispatcher) -> Self {
        let (reader, writer) = stream.into_split();

        let (writer_tx, writer_rx) = mpsc::unbounded_channel::<Bytes>();
        spawn_writer_task(writer, writer_rx);

        Self {
            peer,
            dispatcher,
            inbox: BytesMut::with_capacity(SCRATCH_CAPACITY_HINT),
            reader,
            async_writer: writer_tx,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- HostSession: Public ---------------------------------------------------

impl HostSession {
    pub async fn serve(mut self) -> std::io::Result<()> {
        info!("host {} attached", self.peer);

        loop {
            self.inbox.reserve(SCRATCH_CAPACITY_HINT);
            let n = self.reader.read_buf(&mut self.inbox).await?;
            if n == 0 {
                break;
            }

            while let Some(line) = self.pull_next_line() {
                self.process_line(line).await;
            }

            if self.inbox.len() > MAX_LINE_LEN {
                self.respond(Response::error(None, "request line too long"));
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "request line too long",
                ));
            }
        }

        info!("host {} detached", self.peer);
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// ----- HostSession: Private --------------------------------------------------

impl HostSession {
    /// Next complete line without its terminator. Blank lines are skipped.
    fn pull_next_line(&mut self) -> Option<BytesMut> {
        loop {
            let pos = memchr(b'\n', &self.inbox)?;
            let mut line = self.inbox.split_to(pos + 1);

            line.truncate(pos);
            if line.last() == Some(&b'\r') {
                line.truncate(pos - 1);
            }

            if !line.iter().all(u8::is_ascii_whitespace) {
                return Some(line);
            }
        }
    }

    async fn process_line(&self, line: BytesMut) {
        let raw: RawRequest = match serde_json::from_slice(&line) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("host {} sent an unparsable request: {e}", self.peer);
                self.respond(Response::error(None, format!("invalid request: {e}")));
                return;
            }
        };

        let id = raw.id;
        let call = match Call::from_raw(&raw.method, raw.params) {
            Ok(call) => call,
            Err(e) => {
                self.respond(Response::from_result(Some(id), Err(e)));
                return;
            }
        };

        debug!("host {} request {id}: {}", self.peer, call.name());

        let outcome = self.dispatcher.dispatch(call).await;

        if !outcome.is_pending() {
            let res = outcome.finish().await;
            self.respond(Response::from_result(Some(id), res));
            return;
        }

        let tx = self.async_writer.clone();
        tokio::spawn(async move {
            let res = outcome.finish().await;
            send_line(&tx, &Response::from_result(Some(id), res));
        });
    }

    fn respond(&self, response: Response) {
        send_line(&self.async_writer, &response);
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

fn send_line(tx: &mpsc::UnboundedSender<Bytes>, response: &Response) {
    let line = match response.to_line() {
        Ok(line) => line,
        Err(e) => {
            error!("failed to encode response: {e}");
            return;
        }
    };

    // Host gone; nothing left to tell it.
    let _ = tx.send(line);
}

fn spawn_writer_task(mut writer: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<Bytes>) {
    tokio::spawn(async move {
        while let Some(mut buf) = rx.recv().await {
            if writer.write_all_buf(&mut buf).await.is_err() {
                break;
            }

            // coalesce bursts to cut syscalls
            while let Ok(mut more) = rx.try_recv() {
                if writer.write_all_buf(&mut more).await.is_err() {
                    return;
                }
            }
        }
    });
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
