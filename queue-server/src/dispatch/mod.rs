//! 队列调度
//!
//! 取号、叫号、授权与营业时间的业务层：
//!
//! - [`engine`] - 调度引擎（join / call_next / overview）
//! - [`tickets`] - 锁内发号与认领
//! - [`registry`] - 类别解析
//! - [`authorize`] - 经理-类别授权
//! - [`hours`] - 发号限时窗口
//! - [`events`] - 领域事件
//! - [`error`] - 调度错误族

pub mod authorize;
pub mod engine;
pub mod error;
pub mod events;
pub mod hours;
pub mod registry;
pub mod tickets;

pub use authorize::AuthorizationResolver;
pub use engine::{CallOutcome, DispatchEngine, JoinOutcome, QueueOverview};
pub use error::{DispatchError, DispatchResult};
pub use events::{CategorySnapshot, ManagerSnapshot, QueueEvent, TicketSnapshot};
pub use hours::RestrictedHours;
pub use registry::CategoryRegistry;
pub use tickets::TicketService;
