//! Talon Queue Server - 招生大厅排队叫号服务
//!
//! # 架构概述
//!
//! 本模块是 Queue Server 的主入口，提供以下核心功能：
//!
//! - **调度引擎** (`dispatch`): 取号、叫号、授权与限时窗口
//! - **消息总线** (`message`): 面向显示屏和工作台的 TCP 实时广播
//! - **数据库** (`db`): 嵌入式 SurrealDB 存储
//! - **认证** (`auth`): JWT + Argon2 认证体系
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! queue-server/src/
//! ├── core/          # 配置、状态、错误
//! ├── auth/          # JWT 认证
//! ├── dispatch/      # 调度引擎
//! ├── announce/      # 叫号播报文案与语音 URL
//! ├── services/      # HTTP、消息总线服务
//! ├── api/           # HTTP 路由和处理器
//! ├── utils/         # 工具函数
//! ├── db/            # 数据库层
//! └── message/       # 消息总线
//! ```

pub mod announce;
pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod dispatch;
pub mod message;
pub mod services;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentManager, JwtService};
pub use core::{Config, Server, ServerState};
pub use dispatch::{CallOutcome, DispatchEngine, DispatchError, JoinOutcome, QueueEvent};
pub use message::{BusMessage, EventType, MessageBus, Topic};
pub use utils::{AppError, AppResponse, AppResult};

// Re-export logger functions
pub use utils::logger::init_logger_with_file;

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

pub fn print_banner() {
    println!(
        r#"
  ______      __
 /_  __/___ _/ /___  ____
  / / / __ `/ / __ \/ __ \
 / / / /_/ / / /_/ / / / /
/_/  \__,_/_/\____/_/ /_/
   ____
  / __ \__  _____  __  _____
 / / / / / / / _ \/ / / / _ \
/ /_/ / /_/ /  __/ /_/ /  __/
\___\_\__,_/\___/\__,_/\___/
    "#
    );
}

/// 进程级环境准备 (dotenv, 工作目录, 日志)
///
/// 在构建 [`ServerState`] 之前调用一次。
pub fn setup_environment() -> anyhow::Result<()> {
    // .env 不存在也没关系
    dotenv::dotenv().ok();

    let config = Config::from_env();
    config.ensure_work_dir_structure()?;

    let log_level = std::env::var("LOG_LEVEL").ok();
    let logs_dir = config.logs_dir();
    init_logger_with_file(log_level.as_deref(), logs_dir.to_str());

    Ok(())
}
