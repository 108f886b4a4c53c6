//! Talon 排队系统共享类型
//!
//! queue-server 与各类客户端（取号端、经理工作台、大厅显示屏）之间的
//! 公共协议层：消息总线信封 + 载荷、HTTP API DTO、时间工具。

pub mod client;
pub mod message;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Message bus re-exports (for convenient access)
pub use message::{BusMessage, EventType, Topic};
