use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IoStats {
    pub connects: u64,
    pub connect_failures: u64,
    pub disconnects: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub io_failures: u64,
}

static CONNECTS: AtomicU64 = AtomicU64::new(0);
static CONNECT_FAILURES: AtomicU64 = AtomicU64::new(0);
static DISCONNECTS: AtomicU64 = AtomicU64::new(0);
static BYTES_SENT: AtomicU64 = AtomicU64::new(0);
static BYTES_RECEIVED: AtomicU64 = AtomicU64::new(0);
static IO_FAILURES: AtomicU64 = AtomicU64::new(0);

pub fn inc_connect() {
    CONNECTS.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_connect_failure() {
    CONNECT_FAILURES.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_disconnect() {
    DISCONNECTS.fetch_add(1, Ordering::Relaxed);
}

pub fn add_bytes_sent(n: usize) {
    BYTES_SENT.fetch_add(n as u64, Ordering::Relaxed);
}

pub fn add_bytes_received(n: usize) {
    BYTES_RECEIVED.fetch_add(n as u64, Ordering::Relaxed);
}

pub fn inc_io_failure() {
    IO_FAILURES.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> IoStats {
    IoStats {
        connects: CONNECTS.load(Ordering::Relaxed),
        connect_failures: CONNECT_FAILURES.load(Ordering::Relaxed),
        disconnects: DISCONNECTS.load(Ordering::Relaxed),
        bytes_sent: BYTES_SENT.load(Ordering::Relaxed),
        bytes_received: BYTES_RECEIVED.load(Ordering::Relaxed),
        io_failures: IO_FAILURES.load(Ordering::Relaxed),
    }
}

pub fn format_io_stats(stats: IoStats) -> String {
    format!(
        "connects={} connect_failures={} disconnects={} bytes_sent={} bytes_received={} io_failures={}",
        stats.connects,
        stats.connect_failures,
        stats.disconnects,
        stats.bytes_sent,
        stats.bytes_received,
        stats.io_failures
    )
}
