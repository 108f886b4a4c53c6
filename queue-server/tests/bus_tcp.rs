//! 总线 TCP 接入集成测试
//!
//! 起真实监听端口，验证协议握手、按订阅主题过滤的转发和
//! 断线后的注册表清理。每个测试用独立端口，互不干扰。

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use queue_server::message::{
    BusMessage, EventType, HandshakePayload, MessageBus, QueueUpdate, ResponsePayload,
    TcpTransport, Topic, Transport, TransportConfig,
};
use queue_server::utils::AppError;
use shared::message::PROTOCOL_VERSION;

const READ_TIMEOUT: Duration = Duration::from_secs(2);

fn bus_on(port: u16) -> Arc<MessageBus> {
    let bus = Arc::new(MessageBus::from_config(TransportConfig {
        tcp_listen_addr: format!("127.0.0.1:{port}"),
        channel_capacity: 64,
    }));

    let server = bus.clone();
    tokio::spawn(async move {
        if let Err(e) = server.start_tcp_server().await {
            eprintln!("bus TCP server exited: {e}");
        }
    });

    bus
}

async fn connect_with_retry(port: u16) -> TcpTransport {
    let addr = format!("127.0.0.1:{port}");
    for _ in 0..100 {
        if let Ok(transport) = TcpTransport::connect(&addr).await {
            return transport;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("bus TCP server did not come up on {addr}");
}

async fn handshake(
    transport: &TcpTransport,
    client_id: &str,
    topics: Vec<Topic>,
) -> ResponsePayload {
    let request = BusMessage::handshake(&HandshakePayload {
        version: PROTOCOL_VERSION,
        client_name: Some(client_id.to_string()),
        client_id: Some(client_id.to_string()),
        topics,
        identity: None,
    });
    transport
        .write_message(&request)
        .await
        .expect("send handshake");

    let reply = timeout(READ_TIMEOUT, transport.read_message())
        .await
        .expect("handshake reply in time")
        .expect("read handshake reply");
    assert_eq!(reply.event_type, EventType::Response);
    assert_eq!(reply.correlation_id, Some(request.request_id));
    reply.parse_payload().expect("response payload")
}

async fn wait_until(what: &str, cond: impl Fn() -> bool) {
    for _ in 0..100 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for {what}");
}

#[tokio::test]
async fn test_handshake_registers_and_forwards_by_topic() {
    let bus = bus_on(19473);

    let display = connect_with_retry(19473).await;
    let ack = handshake(&display, "display-42", vec![Topic::Displays]).await;
    assert!(ack.success);
    assert!(ack.message.contains("display-42"));

    wait_until("client registration", || {
        bus.get_connected_clients()
            .iter()
            .any(|c| c.id == "display-42" && c.topics == vec![Topic::Displays])
    })
    .await;

    // 两条广播走同一条通道：经理端主题的会被过滤掉，
    // 所以客户端读到的第一条就是 displays 那条
    let hidden = QueueUpdate::TicketCountUpdate {
        category: "MASTER".to_string(),
        waiting: 9,
    };
    bus.publish(BusMessage::queue_update(Topic::Managers, &hidden));

    let visible = QueueUpdate::TicketCountUpdate {
        category: "MASTER".to_string(),
        waiting: 1,
    };
    bus.publish(BusMessage::queue_update(Topic::Displays, &visible));

    let msg = timeout(READ_TIMEOUT, display.read_message())
        .await
        .expect("broadcast in time")
        .expect("read broadcast");
    assert_eq!(msg.event_type, EventType::QueueUpdate);
    assert_eq!(msg.topic, Some(Topic::Displays));
    let update: QueueUpdate = msg.parse_payload().expect("queue update payload");
    assert_eq!(update, visible);

    bus.shutdown();
}

#[tokio::test]
async fn test_version_mismatch_is_rejected() {
    let bus = bus_on(19474);

    let client = connect_with_retry(19474).await;
    let request = BusMessage::handshake(&HandshakePayload {
        version: PROTOCOL_VERSION + 1,
        client_name: Some("stale-display".to_string()),
        client_id: Some("stale-display".to_string()),
        topics: vec![Topic::Displays],
        identity: None,
    });
    client.write_message(&request).await.expect("send handshake");

    let reply = timeout(READ_TIMEOUT, client.read_message())
        .await
        .expect("error reply in time")
        .expect("read error reply");
    assert_eq!(reply.event_type, EventType::Response);
    let payload: ResponsePayload = reply.parse_payload().expect("response payload");
    assert!(!payload.success);
    assert!(payload.message.contains("version"));

    // 服务端随后关闭连接，被拒的客户端不会进注册表
    let err = timeout(READ_TIMEOUT, client.read_message())
        .await
        .expect("server closes in time")
        .expect_err("connection should be closed");
    assert!(matches!(err, AppError::ClientDisconnected));
    assert!(bus.get_connected_clients().is_empty());

    bus.shutdown();
}

#[tokio::test]
async fn test_disconnect_cleans_registry() {
    let bus = bus_on(19475);

    let manager = connect_with_retry(19475).await;
    let ack = handshake(&manager, "manager-console", vec![Topic::Managers]).await;
    assert!(ack.success);

    wait_until("client registration", || {
        !bus.get_connected_clients().is_empty()
    })
    .await;

    drop(manager);

    wait_until("registry cleanup", || {
        bus.get_connected_clients().is_empty()
    })
    .await;

    bus.shutdown();
}
