//! 类型转换模块
//!
//! 将数据库模型 (db::models) 转换为 API 响应模型 (shared::client)

use shared::client::{CategoryInfo, QueueSnapshot, TicketInfo};

use crate::db::models::{Category, Ticket};
use crate::dispatch::QueueOverview;

// ============ Category ============

impl From<&Category> for CategoryInfo {
    fn from(c: &Category) -> Self {
        Self {
            name: c.name.clone(),
            label: c.label.clone(),
            min_number: c.min_number,
            max_number: c.max_number,
        }
    }
}

// ============ Ticket ============

/// 票据 → DTO
///
/// 票据本身只存类别记录 id，展示用的类别名由调用方提供。
pub fn ticket_info(ticket: &Ticket, category_name: &str) -> TicketInfo {
    TicketInfo {
        number: ticket.number,
        category: category_name.to_string(),
        holder_name: ticket.holder_name.clone(),
        token: ticket.token.clone(),
        created_at: ticket.created_at,
    }
}

// ============ Queue snapshot ============

impl From<&QueueOverview> for QueueSnapshot {
    fn from(o: &QueueOverview) -> Self {
        Self {
            category: CategoryInfo::from(&o.category),
            waiting: o.waiting,
            last_called: o.last_called,
        }
    }
}
