mod support;

use tcpcrab::SocketError;
use tcpcrab::registry::ConnState;

#[tokio::test]
async fn connect_then_disconnect_then_io_fails() {
    let port = support::echo_server().await;
    let registry = support::registry();

    let handle = registry
        .connect("127.0.0.1", Some(port))
        .await
        .expect("connect should succeed");
    assert_eq!(handle, 0);

    assert_eq!(registry.disconnect(handle).await.unwrap(), handle);

    let err = registry.send(handle, b"late".to_vec()).await.unwrap_err();
    assert_eq!(err, SocketError::NotConnected);

    let err = registry.read(handle, 16, None).await.unwrap_err();
    assert_eq!(err, SocketError::NotConnected);
}

#[tokio::test]
async fn disconnect_twice_reports_not_connected() {
    let port = support::echo_server().await;
    let registry = support::registry();
    let handle = registry.connect("127.0.0.1", Some(port)).await.unwrap();

    registry.disconnect(handle).await.unwrap();
    let err = registry.disconnect(handle).await.unwrap_err();
    assert_eq!(err.to_string(), "Socket not connected");

    let info = registry.get(handle).expect("slot persists after close");
    assert_eq!(info.state(), ConnState::Closed);
}

#[tokio::test]
async fn closed_handles_are_never_reused() {
    let port = support::echo_server().await;
    let registry = support::registry();

    let first = registry.connect("127.0.0.1", Some(port)).await.unwrap();
    registry.disconnect(first).await.unwrap();
    let second = registry.connect("127.0.0.1", Some(port)).await.unwrap();

    assert_ne!(first, second);
    let slots = registry.snapshot();
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[first].address, "127.0.0.1");
    assert_eq!(slots[first].state, ConnState::Closed);
    assert_eq!(slots[second].address, "127.0.0.1");
    assert_eq!(slots[second].state, ConnState::Open);
}

#[tokio::test]
async fn disconnect_closes_the_peer_side() {
    let (port, captured) = support::capture_server().await;
    let registry = support::registry();

    let handle = registry.connect("127.0.0.1", Some(port)).await.unwrap();
    registry.send(handle, b"bye".to_vec()).await.unwrap();
    registry.disconnect(handle).await.unwrap();

    // capture only finishes once it sees EOF
    assert_eq!(captured.await.unwrap(), b"bye");
}

#[tokio::test]
async fn failures_leave_other_handles_alone() {
    let port = support::echo_server().await;
    let registry = support::registry();

    let good = registry.connect("127.0.0.1", Some(port)).await.unwrap();
    let bad = registry.connect("127.0.0.1", Some(port)).await.unwrap();
    registry.disconnect(bad).await.unwrap();

    assert!(registry.send(bad, b"x".to_vec()).await.is_err());
    assert!(registry.disconnect(99).await.is_err());
    assert!(registry.connect("", None).await.is_err());

    registry.send(good, b"still here".to_vec()).await.unwrap();
    let echoed = registry.read(good, 64, None).await.unwrap();
    assert!(!echoed.is_empty());
    assert!(b"still here".starts_with(&echoed));
}
