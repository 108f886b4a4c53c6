//! 消息总线
//!
//! 面向大厅显示屏、经理端和类别看板的实时广播层：
//!
//! - [`bus`] - 总线核心（广播通道 + 客户端注册表）
//! - [`tcp_server`] - TCP 接入（握手、转发、断线清理）
//! - [`filter`] - 按主题/身份的转发过滤
//! - [`transport`] - 可插拔传输层 (TCP / Memory)
//! - [`broadcaster`] - 把队列事件整形成各订阅面的消息
//!
//! 消息类型 ([`BusMessage`]、[`Topic`]、载荷) 在 `shared` crate 里，
//! 服务端和客户端共用。

pub mod broadcaster;
pub mod bus;
pub mod filter;
pub mod tcp_server;
pub mod transport;

use std::sync::Arc;

pub use broadcaster::QueueBroadcaster;
pub use bus::{MessageBus, TransportConfig};
pub use filter::should_deliver;
pub use shared::message::{
    BusMessage, EventType, HandshakePayload, QueueState, QueueUpdate, ResponsePayload, SyncPayload,
    Topic,
};
pub use transport::{MemoryTransport, TcpTransport, Transport};

/// 服务端持有的客户端会话
#[derive(Debug, Clone)]
pub struct ClientSession {
    pub transport: Arc<dyn Transport>,
    /// 握手时声明的订阅主题
    pub topics: Vec<Topic>,
    /// 自报身份，用于 self-echo 抑制
    pub identity: Option<String>,
}

/// 已连接客户端信息（监控用）
#[derive(Debug, Clone)]
pub struct ConnectedClient {
    pub id: String,
    pub identity: Option<String>,
    pub addr: Option<String>,
    pub topics: Vec<Topic>,
}
