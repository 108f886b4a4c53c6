//! 服务层 - 服务器核心服务
//!
//! # 服务列表
//!
//! - [`HttpService`] - HTTP 服务器
//! - [`MessageBusService`] - 消息总线服务

pub mod http;
pub mod message_bus;

pub use http::HttpService;
pub use message_bus::MessageBusService;
