//! 工具模块 - 通用工具函数和类型
//!
//! # 内容
//!
//! - [`AppError`] - 应用错误类型
//! - [`AppResponse`] - API 响应结构
//! - 日志、时间、输入验证等工具

pub mod error;
pub mod logger;
pub mod result;
pub mod time;
pub mod validation;

// Re-export error types
pub use error::{AppError, AppResponse, ok};
pub use result::AppResult;
