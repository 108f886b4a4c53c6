//! Ticket Model

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Ticket ID type
pub type TicketId = RecordId;

/// 排队票据
///
/// `number` 是展示给访客的号码，在类别区间内回绕复用；
/// `ordinal` 是类别内单调递增的发放序号，永不复用，
/// FIFO 排序和"最后发出的票"都以它为准。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<TicketId>,
    #[serde(with = "serde_helpers::record_id")]
    pub category: RecordId,
    /// 展示用票号
    pub number: i64,
    /// 类别内发放序号 (单调递增)
    pub ordinal: i64,
    /// 持票人姓名
    pub holder_name: String,
    /// 领取凭证 (UUID v4)，与票号无关
    pub token: String,
    /// 是否已被叫到
    #[serde(default, deserialize_with = "serde_helpers::bool_false")]
    pub served: bool,
    /// 叫到该票的经理
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub served_by: Option<RecordId>,
    /// 创建时间 (UTC 毫秒)
    pub created_at: i64,
    /// 叫号时间 (UTC 毫秒)
    #[serde(default)]
    pub served_at: Option<i64>,
}
