//! 发号服务
//!
//! 同一类别的并发取号在 per-category 异步互斥锁内串行化：
//! "读最后一张票 -> 选下一个空闲号码 -> 建票" 必须是一个临界区，
//! 否则两个请求会拿到相同号码或乱序的 ordinal。
//! 不同类别互不阻塞。

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use surrealdb::RecordId;
use tokio::sync::Mutex;

use shared::util::now_millis;

use crate::db::models::{Category, Ticket};
use crate::db::repository::TicketRepository;
use crate::dispatch::error::{DispatchError, DispatchResult};

#[derive(Clone)]
pub struct TicketService {
    repo: TicketRepository,
    /// category name -> 发号锁
    issue_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl TicketService {
    pub fn new(repo: TicketRepository) -> Self {
        Self {
            repo,
            issue_locks: Arc::new(DashMap::new()),
        }
    }

    fn issue_lock(&self, category: &Category) -> Arc<Mutex<()>> {
        self.issue_locks
            .entry(category.name.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// 发一张新票
    ///
    /// ordinal 单调递增、永不回绕；展示号码在区间内顺时针走，
    /// 跳过仍被未服务票占用的号。整个区间都被占用时发号失败。
    pub async fn issue(&self, category: &Category, holder_name: &str) -> DispatchResult<Ticket> {
        let category_id = record_id(category)?;

        let lock = self.issue_lock(category);
        let _guard = lock.lock().await;

        let last = self.repo.last_issued(category_id).await?;
        let ordinal = last.as_ref().map(|t| t.ordinal + 1).unwrap_or(1);
        let number = self.allocate_number(category, category_id, last.as_ref()).await?;

        Ok(self
            .repo
            .create(category_id, number, ordinal, holder_name, now_millis())
            .await?)
    }

    /// 在区间内找下一个空闲号码
    ///
    /// 从最后发出号码的下一位开始走，满一圈仍没有空位
    /// 说明区间饱和。
    async fn allocate_number(
        &self,
        category: &Category,
        category_id: &RecordId,
        last: Option<&Ticket>,
    ) -> DispatchResult<i64> {
        let occupied: HashSet<i64> = self
            .repo
            .unserved_numbers(category_id)
            .await?
            .into_iter()
            .collect();

        let mut candidate = match last {
            Some(t) => category.next_number(t.number),
            None => category.min_number,
        };
        for _ in 0..category.capacity() {
            if !occupied.contains(&candidate) {
                return Ok(candidate);
            }
            candidate = category.next_number(candidate);
        }

        Err(DispatchError::RangeExhausted(format!(
            "Category '{}' has no free numbers in [{}, {}]",
            category.name, category.min_number, category.max_number
        )))
    }

    /// FIFO 队头（最早的未服务票）
    pub async fn next_waiting(&self, category: &Category) -> DispatchResult<Option<Ticket>> {
        Ok(self.repo.oldest_unserved(record_id(category)?).await?)
    }

    /// 原子认领，`None` 表示被并发对手抢先
    pub async fn claim(
        &self,
        ticket: &RecordId,
        manager: &RecordId,
    ) -> DispatchResult<Option<Ticket>> {
        Ok(self.repo.claim(ticket, manager, now_millis()).await?)
    }

    /// 类别内等待人数
    pub async fn waiting_count(&self, category: &Category) -> DispatchResult<u64> {
        Ok(self.repo.count_waiting(record_id(category)?).await?)
    }

    /// 类别内最近叫到的号码
    pub async fn last_called_number(&self, category: &Category) -> DispatchResult<Option<i64>> {
        Ok(self
            .repo
            .latest_served_in(record_id(category)?)
            .await?
            .map(|t| t.number))
    }
}

fn record_id(category: &Category) -> DispatchResult<&RecordId> {
    category
        .id
        .as_ref()
        .ok_or_else(|| DispatchError::Storage("Category record has no id".to_string()))
}
