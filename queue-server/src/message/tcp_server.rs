//! TCP 服务器实现
//!
//! 负责处理 TCP 客户端连接，包括：
//! - 监听连接
//! - 协议握手验证（版本 + 订阅主题）
//! - 按主题过滤的消息转发
//! - 断线清理

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use shared::message::{
    BusMessage, EventType, HandshakePayload, PROTOCOL_VERSION, ResponsePayload, SyncPayload, Topic,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::bus::MessageBus;
use super::filter::should_deliver;
use super::transport::{TcpTransport, Transport};
use super::ClientSession;
use crate::utils::AppError;

impl MessageBus {
    /// Start TCP server (for network clients)
    ///
    /// This is a TCP server that:
    /// 1. Accepts connections
    /// 2. Performs the protocol handshake (version check, topic subscription)
    /// 3. Forwards matching server broadcasts to each connected client
    /// 4. Gracefully shuts down on cancellation signal
    pub async fn start_tcp_server(&self) -> Result<(), AppError> {
        let listener = TcpListener::bind(&self.config.tcp_listen_addr)
            .await
            .map_err(|e| AppError::internal(format!("Failed to bind: {}", e)))?;

        tracing::info!(
            "Message bus TCP server listening on {}",
            self.config.tcp_listen_addr
        );

        self.accept_loop(listener).await
    }

    /// Main accept loop
    async fn accept_loop(&self, listener: TcpListener) -> Result<(), AppError> {
        loop {
            tokio::select! {
                _ = self.shutdown_token().cancelled() => {
                    tracing::info!("Message bus TCP server shutting down");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            tracing::debug!("Client connected: {}", addr);
                            self.spawn_client_handler(stream, addr);
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Spawn a new task to handle client connection
    fn spawn_client_handler(&self, stream: TcpStream, addr: SocketAddr) {
        let server_tx = self.sender().clone();
        let shutdown_token = self.shutdown_token().clone();
        let clients = self.clients.clone();

        tokio::spawn(async move {
            if let Err(e) =
                handle_client_connection(stream, addr, server_tx, shutdown_token, clients).await
            {
                tracing::debug!("Client {} handler finished: {}", addr, e);
            }
        });
    }
}

/// Handle a single client connection
async fn handle_client_connection(
    stream: TcpStream,
    addr: SocketAddr,
    server_tx: broadcast::Sender<BusMessage>,
    shutdown_token: CancellationToken,
    clients: Arc<DashMap<String, ClientSession>>,
) -> Result<(), AppError> {
    let transport: Arc<dyn Transport> = Arc::new(TcpTransport::from_stream(stream));

    // Protocol handshake
    let handshake = perform_handshake(&transport, addr).await?;
    let client_id = handshake.client_id.clone();

    // Register client
    clients.insert(
        client_id.clone(),
        ClientSession {
            transport: transport.clone(),
            topics: handshake.topics.clone(),
            identity: handshake.identity.clone(),
        },
    );
    tracing::debug!("Client registered: {}", client_id);

    // 创建共享的断开检测 token
    let disconnect_token = CancellationToken::new();
    let disconnect_token_clone = disconnect_token.clone();

    // Start message forwarding (当客户端断开时，forwarder 也要停止)
    let forward_handle = spawn_server_to_client_forwarder(
        transport.clone(),
        server_tx.subscribe(),
        shutdown_token.clone(),
        client_id.clone(),
        handshake.topics,
        handshake.identity,
        disconnect_token_clone,
    );

    // Watch the read side - 当检测到断开时，取消 disconnect_token
    watch_client(&transport, &shutdown_token, &client_id, addr, disconnect_token).await;

    // Cleanup
    drop(forward_handle);
    let _ = transport.close().await;
    clients.remove(&client_id);
    tracing::debug!(client_id = %client_id, "Client removed from registry");

    Ok(())
}

/// 握手结果
struct HandshakeOutcome {
    client_id: String,
    topics: Vec<Topic>,
    identity: Option<String>,
}

/// Perform protocol handshake with client
async fn perform_handshake(
    transport: &Arc<dyn Transport>,
    addr: SocketAddr,
) -> Result<HandshakeOutcome, AppError> {
    tracing::debug!("Waiting for handshake from {}", addr);

    let msg = transport.read_message().await.map_err(|e| {
        tracing::warn!("❌ Client {} handshake error: {}", addr, e);
        e
    })?;

    if msg.event_type != EventType::Handshake {
        tracing::warn!(
            "❌ Client {} failed to handshake: expected Handshake, got {}",
            addr,
            msg.event_type
        );
        return Err(AppError::invalid("Expected Handshake message"));
    }

    let payload: HandshakePayload = msg.parse_payload().map_err(|e| {
        tracing::warn!("❌ Client {} sent invalid handshake payload: {}", addr, e);
        AppError::invalid(format!("Invalid handshake payload: {}", e))
    })?;

    // Version check
    if payload.version != PROTOCOL_VERSION {
        tracing::warn!(
            "❌ Client {} protocol version mismatch: expected {}, got {}",
            addr,
            PROTOCOL_VERSION,
            payload.version
        );

        send_handshake_error(
            transport,
            &msg,
            &format!(
                "Protocol version mismatch: server={}, client={}. Please update your client.",
                PROTOCOL_VERSION, payload.version
            ),
        )
        .await;

        return Err(AppError::invalid("Protocol version mismatch"));
    }

    let client_id = payload
        .client_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    tracing::debug!(
        "✅ Client {} handshake success (v{}, client: {:?}, id: {}, topics: {:?})",
        addr,
        payload.version,
        payload.client_name,
        client_id,
        payload.topics
    );

    // 发送握手应答 (用 correlation_id 关联客户端的 request_id)
    let response_payload =
        ResponsePayload::success(format!("Connected as client: {}", client_id), None);
    let response = BusMessage::response(&response_payload).with_correlation_id(msg.request_id);
    if let Err(e) = transport.write_message(&response).await {
        tracing::warn!("Failed to send handshake response: {}", e);
    }

    Ok(HandshakeOutcome {
        client_id,
        topics: payload.topics,
        identity: payload.identity,
    })
}

/// Delay before closing connection after sending error (allows client to receive the message)
const HANDSHAKE_ERROR_DELAY_MS: u64 = 100;

/// Send handshake error to client
async fn send_handshake_error(transport: &Arc<dyn Transport>, msg: &BusMessage, message: &str) {
    let response_payload = ResponsePayload::error(message, None);
    let response = BusMessage::response(&response_payload).with_correlation_id(msg.request_id);

    if let Err(e) = transport.write_message(&response).await {
        tracing::error!("Failed to send handshake error: {}", e);
    }

    // Give client some time to receive the message before closing
    tokio::time::sleep(tokio::time::Duration::from_millis(HANDSHAKE_ERROR_DELAY_MS)).await;
}

/// Spawn task to forward messages from server to client
///
/// 过滤规则见 [`should_deliver`]：按握手订阅的主题 + exclude 身份。
pub(crate) fn spawn_server_to_client_forwarder(
    transport: Arc<dyn Transport>,
    mut rx: broadcast::Receiver<BusMessage>,
    shutdown_token: CancellationToken,
    client_id: String,
    topics: Vec<Topic>,
    identity: Option<String>,
    disconnect_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown_token.cancelled() => {
                    tracing::debug!("Client {} forwarder shutting down", client_id);
                    break;
                }
                _ = disconnect_token.cancelled() => {
                    tracing::debug!(client_id = %client_id, "Client disconnected, forwarder stopping");
                    break;
                }
                msg_result = rx.recv() => {
                    match msg_result {
                        Ok(msg) => {
                            if !should_deliver(&msg, &topics, identity.as_deref()) {
                                continue;
                            }

                            if let Err(e) = transport.write_message(&msg).await {
                                tracing::debug!(client_id = %client_id, "Client write failed: {}", e);
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            // 弱网恢复：订阅端掉了 n 条广播，让它全量刷新而不是断开
                            tracing::warn!(
                                client_id = %client_id,
                                dropped_messages = n,
                                "Client lagged behind, sending resync notification"
                            );

                            let resync = BusMessage::sync(&SyncPayload::lagged(n));
                            if let Err(e) = transport.write_message(&resync).await {
                                tracing::debug!(client_id = %client_id, "Failed to send resync notification: {}", e);
                                break;
                            }

                            // Continue listening - don't disconnect the client
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            // Channel truly closed
                            tracing::debug!(client_id = %client_id, "Broadcast channel closed");
                            break;
                        }
                    }
                }
            }
        }

        tracing::debug!(client_id = %client_id, "Client forwarder stopped");
    })
}

/// Watch the client read side for disconnect
///
/// 总线是单向扇出：握手之后客户端不该再发消息，收到什么都只
/// 记日志丢弃。这个循环的真正用途是第一时间发现断线。
async fn watch_client(
    transport: &Arc<dyn Transport>,
    shutdown_token: &CancellationToken,
    client_id: &str,
    addr: SocketAddr,
    disconnect_token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown_token.cancelled() => {
                break;
            }

            read_result = transport.read_message() => {
                match read_result {
                    Ok(msg) => {
                        tracing::warn!(
                            client_id = %client_id,
                            event_type = %msg.event_type,
                            "⚠️ Unexpected message from subscriber, dropping"
                        );
                    }
                    Err(e) => {
                        if matches!(e, AppError::ClientDisconnected) {
                            tracing::debug!(client_id = %client_id, "Client {} disconnected", addr);
                        } else {
                            tracing::debug!(client_id = %client_id, "Client {} read error: {}", addr, e);
                        }
                        // 通知 forwarder 客户端已断开
                        disconnect_token.cancel();
                        break;
                    }
                }
            }
        }
    }
}
