//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`auth`] - 认证相关接口
//! - [`queues`] - 取号和队列快照接口
//! - [`serving`] - 叫号、看板和日统计接口

pub mod convert;

pub mod auth;
pub mod health;
pub mod queues;
pub mod serving;

// Re-export common types for handlers
pub use crate::utils::{AppResponse, AppResult};
