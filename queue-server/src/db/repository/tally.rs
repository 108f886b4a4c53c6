//! Daily Tally Repository
//!
//! 叫号计数的持久化。get-then-insert 在两个并发叫号下会丢计数，
//! 所以这里用确定性复合键 + UPSERT 自增，单条语句原子完成。

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::DailyTally;
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

#[derive(Clone)]
pub struct TallyRepository {
    base: BaseRepository,
}

impl TallyRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// 记一次成功叫号
    ///
    /// 行键是 `[manager_key, date, category_name]`，首次命中时建行
    /// (served 从 1 开始)，之后每次自增。
    pub async fn record_served(
        &self,
        manager: &RecordId,
        date: &str,
        category_name: &str,
        now: i64,
    ) -> RepoResult<DailyTally> {
        let manager_key = manager.key().to_string();
        let mut result = self
            .base
            .db()
            .query(
                r#"UPSERT type::thing('daily_tally', [$manager_key, $date, $category_name]) SET
                    manager = $manager,
                    date = $date,
                    category_name = $category_name,
                    served += 1,
                    updated_at = $now
                RETURN AFTER"#,
            )
            .bind(("manager_key", manager_key))
            .bind(("manager", manager.clone()))
            .bind(("date", date.to_string()))
            .bind(("category_name", category_name.to_string()))
            .bind(("now", now))
            .await?;

        let tally: Option<DailyTally> = result.take(0)?;
        tally.ok_or_else(|| RepoError::Database("Failed to upsert daily tally".to_string()))
    }

    /// 某经理某天的全部统计行（每个类别一行）
    pub async fn find_by_manager_and_date(
        &self,
        manager: &RecordId,
        date: &str,
    ) -> RepoResult<Vec<DailyTally>> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT * FROM daily_tally WHERE manager = $manager AND date = $date ORDER BY category_name",
            )
            .bind(("manager", manager.clone()))
            .bind(("date", date.to_string()))
            .await?;
        let rows: Vec<DailyTally> = result.take(0)?;
        Ok(rows)
    }
}
