use serde::{Deserialize, Serialize};

use super::Topic;

// ==================== Payloads ====================

/// 握手载荷 (客户端 -> 服务端)
///
/// 携带协议版本与订阅声明。服务端校验版本后按 `topics` 过滤转发；
/// `identity` 用于 managers 主题的 self-echo 抑制（经理端填自己的
/// manager id，自己触发的叫号广播不会回流给自己）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakePayload {
    /// 协议版本
    pub version: u16,
    /// 客户端名称/标识
    pub client_name: Option<String>,
    /// 客户端唯一标识 (UUID)
    pub client_id: Option<String>,
    /// 订阅的主题列表
    #[serde(default)]
    pub topics: Vec<Topic>,
    /// 订阅者身份（可选）
    #[serde(default)]
    pub identity: Option<String>,
}

/// 队列变更广播载荷 (服务端 -> 订阅端)
///
/// `kind` 打在 JSON 标签上：new_ticket / ticket_called /
/// ticket_count_update / queue_status。
/// 同一事件对不同主题的投递形状不同（大厅显示屏会多拿到持票人姓名、
/// 播报文本等字段），缺省的可选字段不序列化。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueueUpdate {
    /// 新票号加入队列
    NewTicket {
        category: String,
        number: i64,
        waiting: u64,
    },
    /// 票号被叫到
    TicketCalled {
        category: String,
        number: i64,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        holder_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        location: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        announcement: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        audio_url: Option<String>,
        waiting: u64,
    },
    /// 等待人数变化
    TicketCountUpdate { category: String, waiting: u64 },
    /// 队列状态信号
    QueueStatus { category: String, status: QueueState },
}

/// 队列状态（目前只有 empty 一种）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueState {
    /// 队列被叫空
    Empty,
}

/// 同步信号载荷 (服务端 -> 单个订阅端)
///
/// 订阅端消费太慢、broadcast 通道溢出时单播下发，
/// 提示其通过 HTTP 快照接口全量刷新。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPayload {
    /// 触发原因 (例如: "lagged")
    pub reason: String,
    /// 估计丢失的消息数
    pub dropped: u64,
}

/// 通用响应载荷 (服务端 -> 客户端)
///
/// 用于应答握手
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsePayload {
    /// 是否成功
    pub success: bool,
    /// 响应消息/错误描述
    pub message: String,
    /// 响应数据 (可选)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// 错误代码 (可选, 仅在失败时有用)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

// ==================== Convenience Constructors ====================

impl QueueUpdate {
    /// 事件种类标签（与 JSON 的 `kind` 字段一致）
    pub fn kind(&self) -> &'static str {
        match self {
            QueueUpdate::NewTicket { .. } => "new_ticket",
            QueueUpdate::TicketCalled { .. } => "ticket_called",
            QueueUpdate::TicketCountUpdate { .. } => "ticket_count_update",
            QueueUpdate::QueueStatus { .. } => "queue_status",
        }
    }

    /// 事件涉及的类别名
    pub fn category(&self) -> &str {
        match self {
            QueueUpdate::NewTicket { category, .. }
            | QueueUpdate::TicketCalled { category, .. }
            | QueueUpdate::TicketCountUpdate { category, .. }
            | QueueUpdate::QueueStatus { category, .. } => category,
        }
    }
}

impl SyncPayload {
    pub fn lagged(dropped: u64) -> Self {
        Self {
            reason: "lagged".to_string(),
            dropped,
        }
    }
}

impl ResponsePayload {
    pub fn success(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            error_code: None,
        }
    }

    pub fn error(message: impl Into<String>, code: Option<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            error_code: code,
        }
    }
}
