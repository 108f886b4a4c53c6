//! 消息总线消息类型定义
//!
//! 这些类型在 queue-server 和 clients 之间共享，用于
//! 进程内（内存）和网络（TCP）通信。

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

pub mod payload;
pub use payload::*;

/// 协议版本号
pub const PROTOCOL_VERSION: u16 = 1;

/// 全局队列主题名
pub const TOPIC_ALL_QUEUES: &str = "all_queues";
/// 经理端主题名
pub const TOPIC_MANAGERS: &str = "managers";
/// 大厅显示屏主题名
pub const TOPIC_DISPLAYS: &str = "displays";
/// 单一类别主题前缀（如 "category/MASTER"）
pub const TOPIC_CATEGORY_PREFIX: &str = "category/";

/// 消息总线事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// 握手消息
    Handshake = 0,
    /// 队列变更广播 (new_ticket / ticket_called / ...)
    QueueUpdate = 1,
    /// 同步信号（订阅端丢消息后要求全量刷新）
    Sync = 2,
    /// 请求响应
    Response = 3,
}

impl TryFrom<u8> for EventType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EventType::Handshake),
            1 => Ok(EventType::QueueUpdate),
            2 => Ok(EventType::Sync),
            3 => Ok(EventType::Response),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Handshake => write!(f, "handshake"),
            EventType::QueueUpdate => write!(f, "queue_update"),
            EventType::Sync => write!(f, "sync"),
            EventType::Response => write!(f, "response"),
        }
    }
}

/// 广播主题
///
/// 订阅端在握手时声明自己关心的主题，服务端按主题过滤转发。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Topic {
    /// 所有队列的全局事件
    AllQueues,
    /// 单一类别的事件
    Category(String),
    /// 经理端事件（带 self-echo 抑制）
    Managers,
    /// 大厅显示屏事件（带播报文本/语音地址）
    Displays,
}

impl Topic {
    /// 单一类别主题
    pub fn category(name: impl Into<String>) -> Self {
        Topic::Category(name.into())
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::AllQueues => f.write_str(TOPIC_ALL_QUEUES),
            Topic::Category(name) => write!(f, "{TOPIC_CATEGORY_PREFIX}{name}"),
            Topic::Managers => f.write_str(TOPIC_MANAGERS),
            Topic::Displays => f.write_str(TOPIC_DISPLAYS),
        }
    }
}

/// 主题解析错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid topic: {0}")]
pub struct TopicParseError(pub String);

impl FromStr for Topic {
    type Err = TopicParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            TOPIC_ALL_QUEUES => Ok(Topic::AllQueues),
            TOPIC_MANAGERS => Ok(Topic::Managers),
            TOPIC_DISPLAYS => Ok(Topic::Displays),
            other => match other.strip_prefix(TOPIC_CATEGORY_PREFIX) {
                Some(name) if !name.is_empty() => Ok(Topic::Category(name.to_string())),
                _ => Err(TopicParseError(other.to_string())),
            },
        }
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.to_string()
    }
}

impl TryFrom<String> for Topic {
    type Error = TopicParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// 消息总线消息体
///
/// `exclude` 只在服务端进程内参与转发过滤（self-echo 抑制），不上线缆。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub request_id: Uuid,
    pub event_type: EventType,
    pub topic: Option<Topic>,
    pub correlation_id: Option<Uuid>,
    #[serde(skip)]
    pub exclude: Option<String>,
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn new(event_type: EventType, payload: Vec<u8>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            event_type,
            topic: None,
            correlation_id: None,
            exclude: None,
            payload,
        }
    }

    /// 设置广播主题
    pub fn with_topic(mut self, topic: Topic) -> Self {
        self.topic = Some(topic);
        self
    }

    /// 设置 self-echo 抑制的身份（该身份的订阅端收不到此消息）
    pub fn with_exclude(mut self, identity: &str) -> Self {
        self.exclude = Some(identity.to_string());
        self
    }

    /// 设置关联 ID (用于握手应答)
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// 创建握手消息
    pub fn handshake(payload: &HandshakePayload) -> Self {
        Self::new(
            EventType::Handshake,
            serde_json::to_vec(payload).expect("Failed to serialize handshake payload"),
        )
    }

    /// 创建队列变更广播消息
    pub fn queue_update(topic: Topic, update: &QueueUpdate) -> Self {
        Self::new(
            EventType::QueueUpdate,
            serde_json::to_vec(update).expect("Failed to serialize queue update"),
        )
        .with_topic(topic)
    }

    /// 创建同步信号消息
    pub fn sync(payload: &SyncPayload) -> Self {
        Self::new(
            EventType::Sync,
            serde_json::to_vec(payload).expect("Failed to serialize sync payload"),
        )
    }

    /// 创建响应消息
    pub fn response(payload: &ResponsePayload) -> Self {
        Self::new(
            EventType::Response,
            serde_json::to_vec(payload).expect("Failed to serialize response payload"),
        )
    }

    /// 解析载荷为指定类型
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_roundtrip() {
        let topics = [
            Topic::AllQueues,
            Topic::category("MASTER"),
            Topic::Managers,
            Topic::Displays,
        ];

        for topic in topics {
            let s = topic.to_string();
            let parsed: Topic = s.parse().unwrap();
            assert_eq!(parsed, topic);
        }

        assert_eq!("category/PHD".parse::<Topic>().unwrap(), Topic::category("PHD"));
        assert!("category/".parse::<Topic>().is_err());
        assert!("kitchen".parse::<Topic>().is_err());
    }

    #[test]
    fn test_handshake_message() {
        let payload = HandshakePayload {
            version: PROTOCOL_VERSION,
            client_name: Some("display-hall-1".to_string()),
            client_id: Some("uuid-v4".to_string()),
            topics: vec![Topic::Displays, Topic::AllQueues],
            identity: None,
        };

        let msg = BusMessage::handshake(&payload);
        assert_eq!(msg.event_type, EventType::Handshake);
        assert!(!msg.request_id.is_nil());

        let parsed: HandshakePayload = msg.parse_payload().unwrap();
        assert_eq!(parsed.version, PROTOCOL_VERSION);
        assert_eq!(parsed.topics.len(), 2);
    }

    #[test]
    fn test_queue_update_kind_tag() {
        let update = QueueUpdate::NewTicket {
            category: "MASTER".to_string(),
            number: 600,
            waiting: 3,
        };

        let msg = BusMessage::queue_update(Topic::AllQueues, &update);
        assert_eq!(msg.event_type, EventType::QueueUpdate);
        assert_eq!(msg.topic, Some(Topic::AllQueues));

        let json: serde_json::Value = serde_json::from_slice(&msg.payload).unwrap();
        assert_eq!(json["kind"], "new_ticket");
        assert_eq!(json["number"], 600);

        let parsed: QueueUpdate = msg.parse_payload().unwrap();
        assert_eq!(parsed, update);
    }

    #[test]
    fn test_exclude_not_serialized() {
        let update = QueueUpdate::TicketCountUpdate {
            category: "PHD".to_string(),
            waiting: 1,
        };
        let msg = BusMessage::queue_update(Topic::Managers, &update).with_exclude("manager:alice");

        let bytes = serde_json::to_vec(&msg).unwrap();
        let recovered: BusMessage = serde_json::from_slice(&bytes).unwrap();

        // exclude 是服务端内部字段，不参与序列化
        assert_eq!(recovered.exclude, None);
        assert_eq!(recovered.topic, Some(Topic::Managers));
    }

    #[test]
    fn test_event_type_u8_roundtrip() {
        for raw in 0u8..=3 {
            let event_type = EventType::try_from(raw).unwrap();
            assert_eq!(event_type as u8, raw);
        }
        assert!(EventType::try_from(9).is_err());
    }
}
