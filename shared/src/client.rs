//! Client-related types shared between server and client
//!
//! Common request/response types used in API communication.
//! These types are shared between queue-server and its clients
//! (取号端、经理工作台、大厅显示屏).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// =============================================================================
// Auth API DTOs
// =============================================================================

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub manager: ManagerInfo,
}

/// Manager information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerInfo {
    pub id: String,
    pub username: String,
    pub display_name: String,
    /// 工位标签（如 "Стол 11"），未分配工位时为 None
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub location: Option<String>,
    /// 可服务的类别名列表
    #[serde(default)]
    pub allowed_categories: Vec<String>,
}

// =============================================================================
// Queue API DTOs
// =============================================================================

/// 类别信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub name: String,
    pub label: String,
    pub min_number: i64,
    pub max_number: i64,
}

/// 票据信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketInfo {
    /// 展示用票号（在类别区间内回绕复用）
    pub number: i64,
    pub category: String,
    pub holder_name: String,
    /// 领取凭证 (UUID)，与票号无关、不会复用
    pub token: String,
    /// 创建时间 (UTC 毫秒)
    pub created_at: i64,
}

/// Join queue request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinQueueRequest {
    pub holder_name: String,
}

/// Join queue response
///
/// 营业时间外返回 `out_of_hours`，HTTP 状态仍是 200（软结果，不是错误）。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JoinQueueResponse {
    Issued {
        ticket: TicketInfo,
        category: CategoryInfo,
        waiting: u64,
    },
    OutOfHours {
        message: String,
    },
}

/// 单个队列的快照（GET /api/queues）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub category: CategoryInfo,
    pub waiting: u64,
    /// 最近一次被叫到的票号
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_called: Option<i64>,
}

// =============================================================================
// Serving API DTOs
// =============================================================================

/// Call next request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallNextRequest {
    pub category: String,
}

/// Call next response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallNextResponse {
    Called {
        ticket: TicketInfo,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        location: Option<String>,
        announcement: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        audio_url: Option<String>,
        /// 叫号后该类别剩余等待数
        waiting: u64,
    },
    Empty {
        category: String,
    },
}

/// 当前正在服务的票（GET /api/serving/current）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentServingResponse {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ticket: Option<TicketInfo>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub served_at: Option<i64>,
}

/// 叫号看板条目（GET /api/serving/board）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServingBoardEntry {
    pub category: String,
    pub number: i64,
    /// 叫号经理的展示名
    pub manager: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub location: Option<String>,
    pub served_at: i64,
}

/// 日统计报表（GET /api/serving/tally）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TallyReport {
    /// 业务时区下的日期 (YYYY-MM-DD)
    pub date: String,
    pub manager: String,
    pub total: i64,
    /// 类别名 -> 已服务数
    pub by_category: BTreeMap<String, i64>,
}
