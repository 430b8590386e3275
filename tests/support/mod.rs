use std::{sync::Arc, time::Duration};

use serde_json::Value;
use tcpcrab::{ClientSettings, ConnectionRegistry, Dispatcher, HostSession};
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, Lines},
    net::{
        TcpListener, TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    task::JoinHandle,
};

// Every helper binds 127.0.0.1:0 so tests can run in parallel.

#[allow(dead_code)]
pub fn registry() -> Arc<ConnectionRegistry> {
    Arc::new(ConnectionRegistry::new(ClientSettings::default()))
}

/// Echoes every byte back on every accepted connection.
#[allow(dead_code)]
pub async fn echo_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind echo");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut rd, mut wr) = stream.split();
                let _ = tokio::io::copy(&mut rd, &mut wr).await;
            });
        }
    });

    port
}

/// Accepts one connection and collects everything it receives until EOF.
#[allow(dead_code)]
pub async fn capture_server() -> (u16, JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind capture");
    let port = listener.local_addr().unwrap().port();

    let task = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept capture");
        let mut received = Vec::new();
        let _ = stream.read_to_end(&mut received).await;
        received
    });

    (port, task)
}

/// Accepts one connection and hands the raw stream to the test.
#[allow(dead_code)]
pub async fn peer_server() -> (u16, JoinHandle<TcpStream>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind peer");
    let port = listener.local_addr().unwrap().port();

    let task = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept peer");
        stream
    });

    (port, task)
}

/// Drops `stream` with SO_LINGER 0, so the other side sees a reset rather
/// than an orderly EOF.
#[allow(dead_code, deprecated)]
pub fn reset(stream: TcpStream) {
    stream.set_linger(Some(Duration::ZERO)).expect("set linger");
    drop(stream);
}

// -----------------------------------------------------------------------------
// ----- Bridge ----------------------------------------------------------------

#[allow(dead_code)]
pub struct BridgeClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    next_id: u64,
}

#[allow(dead_code)]
impl BridgeClient {
    /// Starts a bridge listener on an ephemeral port and attaches to it.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind bridge");
        let addr = listener.local_addr().unwrap();
        let dispatcher = Dispatcher::new(registry());

        tokio::spawn(async move {
            while let Ok((stream, peer)) = listener.accept().await {
                let session = HostSession::new(stream, peer, dispatcher.clone());
                tokio::spawn(session.serve());
            }
        });

        let stream = TcpStream::connect(addr).await.expect("attach bridge");
        let (rd, writer) = stream.into_split();

        Self {
            lines: BufReader::new(rd).lines(),
            writer,
            next_id: 1,
        }
    }

    pub async fn send_raw(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
    }

    pub async fn next_response(&mut self) -> Value {
        let line = self.lines.next_line().await.unwrap().expect("bridge closed");
        serde_json::from_str(&line).expect("response is json")
    }

    /// Sends one request and waits for its response.
    pub async fn call(&mut self, method: &str, params: Value) -> Value {
        let id = self.next_id;
        self.next_id += 1;

        let request = serde_json::json!({ "id": id, "method": method, "params": params });
        self.send_raw(&request.to_string()).await;

        let response = self.next_response().await;
        assert_eq!(response["id"], id, "response id mismatch: {response}");
        response
    }
}
