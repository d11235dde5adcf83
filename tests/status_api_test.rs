//! End-to-end status API test: a running daemon fed through the channel
//! transport, observed over HTTP.

mod common;

use std::time::Duration;

use common::*;
use manetd::{Daemon, api, channel_transport};

#[tokio::test]
async fn status_api_reflects_a_live_neighborhood() {
    let clock = manetd::ManualClock::new();
    let engine = common::engine(&clock);
    let (transport, mut harness) = channel_transport(64);
    let (daemon, handle) = Daemon::new(engine, transport);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let status = handle.status();
    tokio::spawn(async move {
        axum::serve(listener, api::router(status)).await.unwrap();
    });
    let daemon_task = tokio::spawn(daemon.run());

    // Give the engine a neighborhood: a symmetric neighbor advertising one
    // node behind it.
    harness
        .inbound
        .send(hello(
            0x0A00_0002,
            1,
            &[
                (SELF_ID, manetd::LinkStatus::Symmetric),
                (0x0A00_0003, manetd::LinkStatus::Symmetric),
            ],
        ))
        .await
        .unwrap();

    // Let a few quanta elapse so the snapshot feed refreshes.
    tokio::time::sleep(Duration::from_millis(400)).await;

    let base = format!("http://{addr}");
    let client = reqwest::Client::new();

    let status: serde_json::Value = client
        .get(format!("{base}/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["node"], u64::from(SELF_ID));
    assert_eq!(status["stats"]["hellos_received"], 1);

    let neighbors: serde_json::Value = client
        .get(format!("{base}/neighbors"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let listed = neighbors["neighbors"].as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], u64::from(0x0A00_0002u32));
    assert_eq!(listed[0]["link"], "symmetric");
    assert_eq!(neighbors["mpr_set"].as_array().unwrap().len(), 1);

    let routes: serde_json::Value = client
        .get(format!("{base}/routes"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let table = routes["routes"].as_array().unwrap();
    assert_eq!(table.len(), 2);

    // The daemon also emitted at least one beacon through the transport.
    let outbound = tokio::time::timeout(Duration::from_secs(2), harness.outbound.recv())
        .await
        .expect("beacon expected")
        .unwrap();
    assert_eq!(outbound.kind, manetd::MsgKind::Hello);

    handle.shutdown();
    daemon_task.await.unwrap().unwrap();
}
