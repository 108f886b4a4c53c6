//! Ticket Repository
//!
//! 票据行的所有读写。发号的互斥在上层 dispatch::tickets 的
//! per-category 锁里，认领的互斥靠这里的条件 UPDATE。

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::Ticket;
use serde::Deserialize;
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};
use uuid::Uuid;

/// 看板查询扫描的最近已服务票数上限
const BOARD_SCAN_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
struct CountRow {
    count: i64,
}

#[derive(Clone)]
pub struct TicketRepository {
    base: BaseRepository,
}

impl TicketRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// 发出一张新票
    ///
    /// `number` 和 `ordinal` 由调用方在该类别的发号锁内算好传入。
    pub async fn create(
        &self,
        category: &RecordId,
        number: i64,
        ordinal: i64,
        holder_name: &str,
        created_at: i64,
    ) -> RepoResult<Ticket> {
        let token = Uuid::new_v4().to_string();
        let mut result = self
            .base
            .db()
            .query(
                r#"CREATE ticket SET
                    category = $category,
                    number = $number,
                    ordinal = $ordinal,
                    holder_name = $holder_name,
                    token = $token,
                    served = false,
                    created_at = $created_at
                RETURN AFTER"#,
            )
            .bind(("category", category.clone()))
            .bind(("number", number))
            .bind(("ordinal", ordinal))
            .bind(("holder_name", holder_name.to_string()))
            .bind(("token", token))
            .bind(("created_at", created_at))
            .await?;

        let created: Option<Ticket> = result.take(0)?;
        created.ok_or_else(|| RepoError::Database("Failed to create ticket".to_string()))
    }

    /// 类别内最后发出的一张票 (ordinal 最大)
    ///
    /// 展示号码会回绕，所以"最后发的票"只能靠 ordinal 判断。
    pub async fn last_issued(&self, category: &RecordId) -> RepoResult<Option<Ticket>> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT * FROM ticket WHERE category = $category ORDER BY ordinal DESC LIMIT 1",
            )
            .bind(("category", category.clone()))
            .await?;
        let tickets: Vec<Ticket> = result.take(0)?;
        Ok(tickets.into_iter().next())
    }

    /// 类别内最早的未服务票 (FIFO 队头)
    pub async fn oldest_unserved(&self, category: &RecordId) -> RepoResult<Option<Ticket>> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT * FROM ticket WHERE category = $category AND served = false ORDER BY ordinal ASC LIMIT 1",
            )
            .bind(("category", category.clone()))
            .await?;
        let tickets: Vec<Ticket> = result.take(0)?;
        Ok(tickets.into_iter().next())
    }

    /// 类别内所有未服务票占用的展示号码
    ///
    /// 发号时要跳过这些号码，避免大厅里出现两张同号票。
    pub async fn unserved_numbers(&self, category: &RecordId) -> RepoResult<Vec<i64>> {
        let mut result = self
            .base
            .db()
            .query("SELECT VALUE number FROM ticket WHERE category = $category AND served = false")
            .bind(("category", category.clone()))
            .await?;
        let numbers: Vec<i64> = result.take(0)?;
        Ok(numbers)
    }

    /// 类别内等待人数
    pub async fn count_waiting(&self, category: &RecordId) -> RepoResult<u64> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT count() AS count FROM ticket WHERE category = $category AND served = false GROUP ALL",
            )
            .bind(("category", category.clone()))
            .await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.into_iter().next().map(|r| r.count.max(0) as u64).unwrap_or(0))
    }

    /// 原子认领一张票
    ///
    /// 条件 UPDATE：只有该票仍未服务时才写入。返回 `None` 表示
    /// 另一个经理先到一步，调用方应重新取队头再试。
    pub async fn claim(
        &self,
        ticket: &RecordId,
        manager: &RecordId,
        served_at: i64,
    ) -> RepoResult<Option<Ticket>> {
        let mut result = self
            .base
            .db()
            .query(
                r#"UPDATE $ticket SET
                    served = true,
                    served_by = $manager,
                    served_at = $served_at
                WHERE served = false
                RETURN AFTER"#,
            )
            .bind(("ticket", ticket.clone()))
            .bind(("manager", manager.clone()))
            .bind(("served_at", served_at))
            .await?;

        let claimed: Vec<Ticket> = result.take(0)?;
        Ok(claimed.into_iter().next())
    }

    /// 经理最近叫到的一张票
    pub async fn latest_served_by(&self, manager: &RecordId) -> RepoResult<Option<Ticket>> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT * FROM ticket WHERE served_by = $manager AND served = true ORDER BY served_at DESC LIMIT 1",
            )
            .bind(("manager", manager.clone()))
            .await?;
        let tickets: Vec<Ticket> = result.take(0)?;
        Ok(tickets.into_iter().next())
    }

    /// 类别内最近被叫到的一张票
    pub async fn latest_served_in(&self, category: &RecordId) -> RepoResult<Option<Ticket>> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT * FROM ticket WHERE category = $category AND served = true ORDER BY served_at DESC LIMIT 1",
            )
            .bind(("category", category.clone()))
            .await?;
        let tickets: Vec<Ticket> = result.take(0)?;
        Ok(tickets.into_iter().next())
    }

    /// 最近的已服务票，按叫号时间倒序（看板聚合用）
    pub async fn recent_served(&self, category: Option<&RecordId>) -> RepoResult<Vec<Ticket>> {
        let mut result = match category {
            Some(category) => {
                self.base
                    .db()
                    .query(format!(
                        "SELECT * FROM ticket WHERE served = true AND category = $category ORDER BY served_at DESC LIMIT {BOARD_SCAN_LIMIT}"
                    ))
                    .bind(("category", category.clone()))
                    .await?
            }
            None => {
                self.base
                    .db()
                    .query(format!(
                        "SELECT * FROM ticket WHERE served = true ORDER BY served_at DESC LIMIT {BOARD_SCAN_LIMIT}"
                    ))
                    .await?
            }
        };
        let tickets: Vec<Ticket> = result.take(0)?;
        Ok(tickets)
    }
}
