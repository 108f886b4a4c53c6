//! Memory 传输层实现 (同进程通信)

use std::sync::Arc;

use async_trait::async_trait;
use shared::message::BusMessage;
use tokio::sync::Mutex;
use tokio::sync::mpsc;

use super::Transport;
use crate::utils::AppError;

/// 同进程双工传输，用于测试或内嵌客户端
///
/// [`MemoryTransport::pair`] 返回互联的两端：一端 `write_message`
/// 的消息从另一端 `read_message` 读出。对端被丢弃后读写都返回
/// `ClientDisconnected`，语义和 TCP 断开一致。
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    incoming: Arc<Mutex<mpsc::UnboundedReceiver<BusMessage>>>,
    outgoing: mpsc::UnboundedSender<BusMessage>,
    label: &'static str,
}

impl MemoryTransport {
    /// 创建互联的 (服务端, 客户端) 两端
    pub fn pair() -> (Self, Self) {
        let (to_client, from_server) = mpsc::unbounded_channel();
        let (to_server, from_client) = mpsc::unbounded_channel();

        let server_end = Self {
            incoming: Arc::new(Mutex::new(from_client)),
            outgoing: to_client,
            label: "memory:server",
        };
        let client_end = Self {
            incoming: Arc::new(Mutex::new(from_server)),
            outgoing: to_server,
            label: "memory:client",
        };
        (server_end, client_end)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn read_message(&self) -> Result<BusMessage, AppError> {
        let mut incoming = self.incoming.lock().await;
        incoming.recv().await.ok_or(AppError::ClientDisconnected)
    }

    async fn write_message(&self, msg: &BusMessage) -> Result<(), AppError> {
        self.outgoing
            .send(msg.clone())
            .map_err(|_| AppError::ClientDisconnected)
    }

    async fn close(&self) -> Result<(), AppError> {
        Ok(())
    }

    fn peer_addr(&self) -> Option<String> {
        Some(self.label.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::message::{QueueUpdate, Topic};

    #[tokio::test]
    async fn test_pair_is_duplex() {
        let (server_end, client_end) = MemoryTransport::pair();

        let update = QueueUpdate::TicketCountUpdate {
            category: "PHD".to_string(),
            waiting: 2,
        };
        let msg = BusMessage::queue_update(Topic::category("PHD"), &update);

        server_end.write_message(&msg).await.unwrap();
        let received = client_end.read_message().await.unwrap();
        assert_eq!(received.topic, Some(Topic::category("PHD")));

        client_end.write_message(&msg).await.unwrap();
        let echoed = server_end.read_message().await.unwrap();
        assert_eq!(echoed.request_id, msg.request_id);
    }

    #[tokio::test]
    async fn test_dropped_peer_reads_as_disconnect() {
        let (server_end, client_end) = MemoryTransport::pair();
        drop(client_end);

        let err = server_end.read_message().await.unwrap_err();
        assert!(matches!(err, AppError::ClientDisconnected));
    }
}
