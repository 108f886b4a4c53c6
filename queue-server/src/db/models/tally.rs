//! Daily Tally Model

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// 日统计行，粒度是 (经理, 日期, 类别)
///
/// record id 是确定性的复合键 `[manager_key, date, category_name]`，
/// 叫号成功后对同一行做一次 UPSERT 原子自增。同一经理同一天
/// 同一类别永远只有一行，不存在 get-then-insert 的竞态窗口。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyTally {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    #[serde(with = "serde_helpers::record_id")]
    pub manager: RecordId,
    /// 业务时区下的日期 (YYYY-MM-DD)
    pub date: String,
    /// 类别名（报表直接按名字分组，不用再 join category 表）
    pub category_name: String,
    /// 已服务数
    pub served: i64,
    /// 最后更新时间 (UTC 毫秒)
    pub updated_at: i64,
}
