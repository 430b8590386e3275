mod support;

use std::time::Duration;

use serde_json::json;
use support::BridgeClient;
use tokio::time::timeout;

const GUARD: Duration = Duration::from_secs(5);

#[tokio::test]
async fn full_session_against_echo_peer() {
    let port = support::echo_server().await;
    let mut bridge = BridgeClient::start().await;

    let res = bridge
        .call("connect", json!({ "ipAddress": "127.0.0.1", "port": port }))
        .await;
    assert_eq!(res["result"], json!({ "client": 0 }));

    let res = bridge
        .call("send", json!({ "client": 0, "data": "48656c6c6f", "encoding": "hex" }))
        .await;
    assert_eq!(res["result"], json!({}));

    let res = timeout(
        GUARD,
        bridge.call("read", json!({ "client": 0, "expectLen": 5, "encoding": "utf8" })),
    )
    .await
    .expect("read should answer");
    let text = res["result"]["result"].as_str().unwrap();
    assert!(!text.is_empty() && "Hello".starts_with(text));

    let res = bridge.call("disconnect", json!({ "client": 0 })).await;
    assert_eq!(res["result"], json!({ "client": 0 }));

    let res = bridge.call("send", json!({ "client": 0, "data": "late" })).await;
    assert_eq!(res["error"], "Socket not connected");

    let res = bridge.call("disconnect", json!({ "client": 0 })).await;
    assert_eq!(res["error"], "Socket not connected");
}

#[tokio::test]
async fn base64_read_renders_received_bytes() {
    let port = support::echo_server().await;
    let mut bridge = BridgeClient::start().await;

    bridge
        .call("connect", json!({ "ipAddress": "127.0.0.1", "port": port }))
        .await;
    bridge
        .call("send", json!({ "client": 0, "data": "/w==", "encoding": "base64" }))
        .await;

    let res = timeout(
        GUARD,
        bridge.call("read", json!({ "client": 0, "expectLen": 1, "encoding": "hex" })),
    )
    .await
    .unwrap();
    assert_eq!(res["result"]["result"], "ff");
}

#[tokio::test]
async fn argument_errors_use_host_messages() {
    let mut bridge = BridgeClient::start().await;

    let res = bridge.call("connect", json!({})).await;
    assert_eq!(res["error"], "Must provide ip address to connect");

    let res = bridge.call("send", json!({ "data": "x" })).await;
    assert_eq!(res["error"], "No client specified");

    let res = bridge.call("read", json!({ "client": -1, "expectLen": 4 })).await;
    assert_eq!(res["error"], "Client or length not specified");

    let res = bridge.call("disconnect", json!({ "client": -1 })).await;
    assert_eq!(res["error"], "No client specified");

    let res = bridge
        .call("send", json!({ "client": 0, "data": "zz", "encoding": "hex" }))
        .await;
    assert_eq!(res["error"], "Invalid hex string format");

    let res = bridge
        .call("send", json!({ "client": 0, "data": "!!!", "encoding": "base64" }))
        .await;
    assert_eq!(res["error"], "Invalid Base64 string");

    let res = bridge
        .call("send", json!({ "client": 0, "data": "x", "encoding": "ascii" }))
        .await;
    assert_eq!(res["error"], "Unsupported data type");

    let res = bridge.call("listen", json!({})).await;
    assert_eq!(res["error"], "Unsupported method: listen");
}

#[tokio::test]
async fn unknown_handle_is_not_connected() {
    let mut bridge = BridgeClient::start().await;

    let res = bridge.call("read", json!({ "client": 7, "expectLen": 4 })).await;
    assert_eq!(res["error"], "Socket not connected");
}

#[tokio::test]
async fn connect_failure_is_reported() {
    // grab a free port and release it so nothing is listening there
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let mut bridge = BridgeClient::start().await;

    let res = bridge
        .call("connect", json!({ "ipAddress": "127.0.0.1", "port": port }))
        .await;
    assert!(res["error"].is_string());
    assert!(res.get("result").is_none());
}

#[tokio::test]
async fn garbage_then_valid_request() {
    let mut bridge = BridgeClient::start().await;

    bridge.send_raw("{ this is not json").await;
    let res = bridge.next_response().await;
    assert!(res["id"].is_null());
    assert!(res["error"].as_str().unwrap().starts_with("invalid request:"));

    let res = bridge.call("disconnect", json!({ "client": 0 })).await;
    assert_eq!(res["error"], "Socket not connected");
}

#[tokio::test]
async fn parked_read_does_not_block_other_requests() {
    let (port, _peer) = support::peer_server().await;
    let mut bridge = BridgeClient::start().await;

    bridge
        .call("connect", json!({ "ipAddress": "127.0.0.1", "port": port }))
        .await;

    // id 2: parks, nothing will ever arrive
    bridge
        .send_raw(r#"{"id":2,"method":"read","params":{"client":0,"expectLen":8}}"#)
        .await;
    bridge
        .send_raw(r#"{"id":3,"method":"send","params":{"client":0,"data":"ping"}}"#)
        .await;

    let res = timeout(GUARD, bridge.next_response()).await.unwrap();
    assert_eq!(res["id"], 3);
    assert_eq!(res["result"], json!({}));

    bridge
        .send_raw(r#"{"id":4,"method":"disconnect","params":{"client":0}}"#)
        .await;

    let mut seen = Vec::new();
    for _ in 0..2 {
        let res = timeout(GUARD, bridge.next_response()).await.unwrap();
        seen.push((res["id"].as_u64().unwrap(), res));
    }
    seen.sort_by_key(|(id, _)| *id);

    assert_eq!(seen[0].1["error"], "socket closed");
    assert_eq!(seen[1].1["result"], json!({ "client": 0 }));
}
