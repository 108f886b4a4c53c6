//! 队列领域事件
//!
//! 引擎在状态变更落库之后发事件，广播器再把事件整形成
//! 各订阅面看到的总线消息。事件只带快照，不带存储层类型的引用。

use crate::db::models::{Category, Manager, Ticket};

/// 类别快照
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySnapshot {
    pub name: String,
    pub label: String,
}

impl From<&Category> for CategorySnapshot {
    fn from(category: &Category) -> Self {
        Self {
            name: category.name.clone(),
            label: category.label.clone(),
        }
    }
}

/// 票据快照
#[derive(Debug, Clone, PartialEq)]
pub struct TicketSnapshot {
    pub number: i64,
    pub holder_name: String,
}

impl From<&Ticket> for TicketSnapshot {
    fn from(ticket: &Ticket) -> Self {
        Self {
            number: ticket.number,
            holder_name: ticket.holder_name.clone(),
        }
    }
}

/// 叫号经理快照
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerSnapshot {
    /// "manager:xxx" 形式的完整记录 id，总线上用作排除自身回声的身份
    pub id: String,
    pub display_name: String,
    /// 工位位置标签，无工位则为 None
    pub location: Option<String>,
}

impl ManagerSnapshot {
    pub fn from_manager(manager: &Manager, location: Option<String>) -> Self {
        Self {
            id: manager
                .id
                .as_ref()
                .map(|id| id.to_string())
                .unwrap_or_default(),
            display_name: manager.display_name.clone(),
            location,
        }
    }
}

/// 队列领域事件
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    /// 发出一张新票
    TicketIssued {
        category: CategorySnapshot,
        ticket: TicketSnapshot,
        waiting: u64,
    },
    /// 一张票被经理认领
    TicketClaimed {
        category: CategorySnapshot,
        ticket: TicketSnapshot,
        manager: ManagerSnapshot,
        announcement: String,
        audio_url: Option<String>,
        waiting: u64,
    },
    /// 认领之后队列被清空
    QueueEmptied { category: CategorySnapshot },
}

impl QueueEvent {
    /// 事件涉及的类别名
    pub fn category_name(&self) -> &str {
        match self {
            QueueEvent::TicketIssued { category, .. } => &category.name,
            QueueEvent::TicketClaimed { category, .. } => &category.name,
            QueueEvent::QueueEmptied { category } => &category.name,
        }
    }
}
