//! 核心模块 - 叫号服务器的配置、状态和启动
//!
//! # 模块结构
//!
//! - [`Config`] - 环境变量驱动的服务器配置
//! - [`ServerState`] - 共享状态（数据库、引擎、消息总线）
//! - [`Server`] - HTTP + 总线 TCP 的启动与优雅关闭
//! - [`ServerError`] - 启动/关闭路径的错误

pub mod config;
pub mod error;
pub mod server;
pub mod state;

pub use config::Config;
pub use error::{Result, ServerError};
pub use server::Server;
pub use state::ServerState;
