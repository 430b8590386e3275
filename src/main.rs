use std::sync::Arc;

use tokio::net::{TcpListener, TcpSocket};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

use tcpcrab::analytics;
use tcpcrab::{Config, ConnectionRegistry, Dispatcher, HostSession};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const APP_NAME: &str = "🦀 tcpcrab";

// -----------------------------------------------------------------------------
// ----- Main ------------------------------------------------------------------

#[tokio::main]
async fn main() -> std::io::Result<()> {
    setup().await;
    run_forever().await
}

// -----------------------------------------------------------------------------
// ----- Setup -----------------------------------------------------------------

async fn setup() {
    // This has to be the first thing we do, because it initializes the config
    Config::init().await;

    init_tracing();
}

fn init_tracing() {
    let config = Config::snapshot();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

// -----------------------------------------------------------------------------
// ----- Run -------------------------------------------------------------------

async fn run_forever() -> std::io::Result<()> {
    let config = Config::snapshot();

    let registry = Arc::new(ConnectionRegistry::new(config.client.clone()));
    let dispatcher = Dispatcher::new(registry.clone());

    let socket = if config.listen_addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };

    socket.set_reuseaddr(true)?;
    socket.bind(config.listen_addr)?;

    let listener: TcpListener = socket.listen(1024)?;

    info!("{} listening on {}", APP_NAME, config.listen_addr);

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("{} shutting down", APP_NAME);
                break;
            }

            accept_res = listener.accept() => {
                let (stream, peer) = match accept_res {
                    Ok(v) => v,
                    Err(e) => { error!("accept error: {e}"); continue; }
                };

                let _ = stream.set_nodelay(true);

                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    let session = HostSession::new(stream, peer, dispatcher);

                    if let Err(e) = session.serve().await {
                        error!("host {peer} error: {e}");
                    }
                });
            }
        }
    }

    for conn in registry.snapshot() {
        info!(
            "client {} {}:{} {}",
            conn.handle,
            conn.address,
            conn.port,
            conn.state.as_str()
        );
    }
    registry.close_all().await;

    info!("{}", analytics::format_io_stats(analytics::snapshot()));

    Ok(())
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
