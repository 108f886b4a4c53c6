//! Transport 传输层抽象
//!
//! 提供可插拔的传输层架构：
//! ```text
//!         ┌────────────────────┐
//!         │   Transport Trait  │  ◄── 可插拔接口
//!         └────────┬───────────┘
//!                  │
//!          ┌───────┴───────┐
//!          ▼               ▼
//!    TcpTransport    MemoryTransport
//!    (TCP 协议)      (同进程通信)
//! ```
//!
//! # 帧格式
//!
//! ```text
//! ┌──────────┬────────────┬────────────────┬───────────┬───────┬─────────────┬─────────┐
//! │ type u8  │ req_id 16B │ corr_id 16B    │ topic u16 │ topic │ payload u32 │ payload │
//! │          │            │ (nil = None)   │ (LE, len) │ utf8  │ (LE, len)   │ bytes   │
//! └──────────┴────────────┴────────────────┴───────────┴───────┴─────────────┴─────────┘
//! ```

mod memory;
mod tcp;

pub use memory::MemoryTransport;
pub use tcp::TcpTransport;

use async_trait::async_trait;
use shared::message::{BusMessage, EventType, Topic};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

use crate::utils::AppError;

/// 单帧载荷上限。客户端只该发握手帧，超长的长度头按恶意输入拒绝
const MAX_PAYLOAD_LEN: usize = 1024 * 1024;

/// Transport 传输层特征
///
/// 所有传输实现必须实现此特征，支持消息的读写和连接管理。
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// 从传输层读取一条消息
    async fn read_message(&self) -> Result<BusMessage, AppError>;

    /// 向传输层写入一条消息
    async fn write_message(&self, msg: &BusMessage) -> Result<(), AppError>;

    /// 关闭传输连接
    async fn close(&self) -> Result<(), AppError>;

    /// 获取对端地址
    fn peer_addr(&self) -> Option<String> {
        None
    }
}

// ========== 辅助函数 ==========

/// 从异步流中读取 BusMessage
pub(crate) async fn read_from_stream<R: AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<BusMessage, AppError> {
    // 读取事件类型 (1 字节)；这里的 EOF 是干净断开
    let mut type_buf = [0u8; 1];
    match reader.read_exact(&mut type_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(AppError::ClientDisconnected);
        }
        Err(e) => {
            return Err(AppError::internal(format!("Read type failed: {}", e)));
        }
    }

    let event_type =
        EventType::try_from(type_buf[0]).map_err(|_| AppError::invalid("Invalid event type"))?;

    // 读取 Request ID (16 字节)
    let mut uuid_buf = [0u8; 16];
    reader
        .read_exact(&mut uuid_buf)
        .await
        .map_err(|e| AppError::internal(format!("Read UUID failed: {}", e)))?;
    let request_id = Uuid::from_bytes(uuid_buf);

    // 读取 Correlation ID (16 字节)
    let mut correlation_buf = [0u8; 16];
    reader
        .read_exact(&mut correlation_buf)
        .await
        .map_err(|e| AppError::internal(format!("Read Correlation UUID failed: {}", e)))?;
    let correlation_id_raw = Uuid::from_bytes(correlation_buf);
    let correlation_id = if correlation_id_raw.is_nil() {
        None
    } else {
        Some(correlation_id_raw)
    };

    // 读取主题 (2 字节长度 + utf8，长度 0 表示无主题)
    let mut topic_len_buf = [0u8; 2];
    reader
        .read_exact(&mut topic_len_buf)
        .await
        .map_err(|e| AppError::internal(format!("Read topic len failed: {}", e)))?;
    let topic_len = u16::from_le_bytes(topic_len_buf) as usize;

    let topic = if topic_len == 0 {
        None
    } else {
        let mut topic_buf = vec![0u8; topic_len];
        reader
            .read_exact(&mut topic_buf)
            .await
            .map_err(|e| AppError::internal(format!("Read topic failed: {}", e)))?;
        let topic_str = String::from_utf8(topic_buf)
            .map_err(|_| AppError::invalid("Topic is not valid UTF-8"))?;
        Some(
            topic_str
                .parse::<Topic>()
                .map_err(|e| AppError::invalid(format!("Invalid topic: {}", e)))?,
        )
    };

    // 读取载荷长度 (4 字节)
    let mut len_buf = [0u8; 4];
    reader
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| AppError::internal(format!("Read len failed: {}", e)))?;

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_PAYLOAD_LEN {
        return Err(AppError::invalid(format!(
            "Payload too large: {} bytes",
            len
        )));
    }

    // 读取载荷内容
    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| AppError::internal(format!("Read payload failed: {}", e)))?;

    Ok(BusMessage {
        request_id,
        event_type,
        topic,
        correlation_id,
        exclude: None,
        payload,
    })
}

/// 向异步流写入 BusMessage
///
/// `exclude` 是服务端进程内的转发过滤字段，不写入线缆。
pub(crate) async fn write_to_stream<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    msg: &BusMessage,
) -> Result<(), AppError> {
    let mut data = Vec::new();
    data.push(msg.event_type as u8);
    data.extend_from_slice(msg.request_id.as_bytes());

    // Correlation ID (16 字节)，None 写 nil UUID
    let correlation_bytes = msg.correlation_id.unwrap_or(Uuid::nil()).into_bytes();
    data.extend_from_slice(&correlation_bytes);

    // 主题 (2 字节长度 + utf8)
    let topic_str = msg.topic.as_ref().map(|t| t.to_string());
    let topic_bytes = topic_str.as_deref().unwrap_or("").as_bytes();
    data.extend_from_slice(&(topic_bytes.len() as u16).to_le_bytes());
    data.extend_from_slice(topic_bytes);

    data.extend_from_slice(&(msg.payload.len() as u32).to_le_bytes());
    data.extend_from_slice(&msg.payload);

    writer
        .write_all(&data)
        .await
        .map_err(|e| AppError::internal(format!("Write failed: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::message::QueueUpdate;

    #[tokio::test]
    async fn test_frame_roundtrip() {
        let update = QueueUpdate::NewTicket {
            category: "MASTER".to_string(),
            number: 600,
            waiting: 1,
        };
        let msg = BusMessage::queue_update(Topic::category("MASTER"), &update)
            .with_exclude("manager:alice");

        let mut buf = Vec::new();
        write_to_stream(&mut buf, &msg).await.unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let decoded = read_from_stream(&mut cursor).await.unwrap();

        assert_eq!(decoded.event_type, EventType::QueueUpdate);
        assert_eq!(decoded.request_id, msg.request_id);
        assert_eq!(decoded.topic, Some(Topic::category("MASTER")));
        // exclude 不上线缆
        assert_eq!(decoded.exclude, None);
        let parsed: QueueUpdate = decoded.parse_payload().unwrap();
        assert_eq!(parsed, update);
    }

    #[tokio::test]
    async fn test_frame_without_topic_or_correlation() {
        let msg = BusMessage::sync(&shared::message::SyncPayload::lagged(7));

        let mut buf = Vec::new();
        write_to_stream(&mut buf, &msg).await.unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let decoded = read_from_stream(&mut cursor).await.unwrap();

        assert_eq!(decoded.event_type, EventType::Sync);
        assert_eq!(decoded.topic, None);
        assert_eq!(decoded.correlation_id, None);
    }

    #[tokio::test]
    async fn test_eof_maps_to_client_disconnected() {
        let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
        let err = read_from_stream(&mut cursor).await.unwrap_err();
        assert!(matches!(err, AppError::ClientDisconnected));
    }

    #[tokio::test]
    async fn test_invalid_event_type_rejected() {
        // type=200 后面随便补些字节
        let buf = vec![200u8; 64];
        let mut cursor = std::io::Cursor::new(buf);
        let err = read_from_stream(&mut cursor).await.unwrap_err();
        assert!(matches!(err, AppError::Invalid(_)));
    }
}
