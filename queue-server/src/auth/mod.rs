//! 认证授权模块
//!
//! 提供 JWT 认证和中间件：
//! - [`JwtService`] - JWT 令牌服务
//! - [`CurrentManager`] - 当前经理上下文
//! - [`require_auth`] - 认证中间件
//!
//! 令牌里只有身份。类别授权在叫号时由
//! [`dispatch::AuthorizationResolver`](crate::dispatch::AuthorizationResolver)
//! 从数据库现查。

pub mod extractor;
pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, CurrentManager, JwtConfig, JwtError, JwtService};
pub use middleware::require_auth;
