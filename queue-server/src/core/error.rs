//! 顶层错误类型
//!
//! HTTP 处理器统一用 [`crate::utils::AppError`]；
//! 这里只覆盖启动/关闭路径。

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("内部服务器错误")]
    Internal(#[from] anyhow::Error),
}

/// 启动流程的 Result 类型别名
pub type Result<T> = std::result::Result<T, ServerError>;
