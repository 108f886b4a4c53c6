//! 队列调度引擎
//!
//! 取号和叫号的业务核心。所有状态变更先落库，成功后再在
//! 进程内广播事件；订阅端掉光时事件直接丢弃，不影响请求本身。

use std::fmt;
use std::sync::Arc;

use chrono_tz::Tz;
use tokio::sync::broadcast;

use crate::announce::AnnouncementProvider;
use crate::db::models::{Category, Manager, Ticket, Workplace};
use crate::db::repository::TallyRepository;
use crate::dispatch::authorize::AuthorizationResolver;
use crate::dispatch::error::{DispatchError, DispatchResult};
use crate::dispatch::events::{CategorySnapshot, ManagerSnapshot, QueueEvent, TicketSnapshot};
use crate::dispatch::hours::RestrictedHours;
use crate::dispatch::registry::CategoryRegistry;
use crate::dispatch::tickets::TicketService;
use crate::security_log;
use crate::utils::AppError;
use crate::utils::time;
use crate::utils::validation::{MAX_NAME_LEN, validate_required_text};

/// 事件广播通道容量
const EVENT_CHANNEL_CAPACITY: usize = 4096;

/// 取号结果
///
/// 营业时间外是软结果而不是错误：客户端拿 200 + 提示文案。
#[derive(Debug, Clone)]
pub enum JoinOutcome {
    Issued {
        ticket: Ticket,
        category: Category,
        waiting: u64,
    },
    OutOfHours {
        message: String,
    },
}

/// 叫号结果
#[derive(Debug, Clone)]
pub enum CallOutcome {
    Called {
        ticket: Ticket,
        category: Category,
        location: Option<String>,
        announcement: String,
        audio_url: Option<String>,
        waiting: u64,
    },
    Empty {
        category: String,
    },
}

/// 单个类别的队列快照
#[derive(Debug, Clone)]
pub struct QueueOverview {
    pub category: Category,
    pub waiting: u64,
    pub last_called: Option<i64>,
}

pub struct DispatchEngine {
    registry: CategoryRegistry,
    tickets: TicketService,
    authorizer: AuthorizationResolver,
    tally: TallyRepository,
    announcer: Arc<dyn AnnouncementProvider>,
    restricted: Option<RestrictedHours>,
    tz: Tz,
    event_tx: broadcast::Sender<QueueEvent>,
}

impl DispatchEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: CategoryRegistry,
        tickets: TicketService,
        authorizer: AuthorizationResolver,
        tally: TallyRepository,
        announcer: Arc<dyn AnnouncementProvider>,
        restricted: Option<RestrictedHours>,
        tz: Tz,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            registry,
            tickets,
            authorizer,
            tally,
            announcer,
            restricted,
            tz,
            event_tx,
        }
    }

    /// 订阅队列事件
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.event_tx.subscribe()
    }

    pub fn registry(&self) -> &CategoryRegistry {
        &self.registry
    }

    /// 访客取号
    ///
    /// 流程：限时窗口 -> 类别解析 -> 姓名验证 -> 锁内发号 -> 广播。
    pub async fn join_queue(
        &self,
        category_name: &str,
        holder_name: &str,
    ) -> DispatchResult<JoinOutcome> {
        // 窗口只暂停取号，经理叫号随时可用
        if let Some(window) = &self.restricted {
            let now = time::now_local_time(self.tz);
            if window.contains(now) {
                tracing::info!(
                    category = category_name,
                    "Join rejected: inside restricted hours"
                );
                return Ok(JoinOutcome::OutOfHours {
                    message: window.closed_message(),
                });
            }
        }

        let category = self.registry.resolve(category_name).await?;

        validate_required_text(holder_name, "holder_name", MAX_NAME_LEN)
            .map_err(map_validation)?;
        let holder_name = holder_name.trim();

        let ticket = self.tickets.issue(&category, holder_name).await?;
        let waiting = self.tickets.waiting_count(&category).await?;

        tracing::info!(
            category = %category.name,
            number = ticket.number,
            waiting,
            "🎫 Ticket issued"
        );

        self.emit(QueueEvent::TicketIssued {
            category: CategorySnapshot::from(&category),
            ticket: TicketSnapshot::from(&ticket),
            waiting,
        });

        Ok(JoinOutcome::Issued {
            ticket,
            category,
            waiting,
        })
    }

    /// 经理叫号
    ///
    /// 认领是条件 UPDATE；输给并发对手时重新取队头再试，
    /// 直到认领成功或队列耗尽。
    pub async fn call_next(
        &self,
        manager: &Manager,
        category_name: &str,
    ) -> DispatchResult<CallOutcome> {
        let category = self.registry.resolve(category_name).await?;
        let category_id = category
            .id
            .as_ref()
            .ok_or_else(|| DispatchError::Storage("Category record has no id".to_string()))?;
        let manager_id = manager
            .id
            .as_ref()
            .ok_or_else(|| DispatchError::Storage("Manager record has no id".to_string()))?;

        let allowed = self.authorizer.allowed_ids(manager).await?;
        if !allowed.contains(category_id) {
            let allowed_names = self.registry.names_of(&allowed).await?;
            security_log!(
                "WARN",
                "call_next_forbidden",
                username = manager.username.clone(),
                category = category.name.clone()
            );
            return Err(DispatchError::Forbidden {
                message: format!(
                    "Manager '{}' is not authorized for category '{}'",
                    manager.username, category.name
                ),
                allowed: allowed_names,
            });
        }

        let workplace = self.authorizer.workplace_of(manager).await?;
        let location = workplace.as_ref().map(|w| w.location_label());

        // 队头可能被并发经理抢走，抢输就重取队头
        let claimed = loop {
            let Some(head) = self.tickets.next_waiting(&category).await? else {
                break None;
            };
            let head_id = head
                .id
                .clone()
                .ok_or_else(|| DispatchError::Storage("Ticket record has no id".to_string()))?;
            match self.tickets.claim(&head_id, manager_id).await? {
                Some(ticket) => break Some(ticket),
                None => {
                    tracing::debug!(
                        category = %category.name,
                        number = head.number,
                        "Claim lost to concurrent manager, retrying"
                    );
                }
            }
        };

        let Some(ticket) = claimed else {
            tracing::info!(
                category = %category.name,
                manager = %manager.username,
                "Call next on empty queue"
            );
            return Ok(CallOutcome::Empty {
                category: category.name,
            });
        };

        // 票已认领成功，之后的统计失败只记日志，不吞掉叫号结果
        let date = time::format_date(time::today_in_tz(self.tz));
        if let Err(e) = self
            .tally
            .record_served(manager_id, &date, &category.name, shared::util::now_millis())
            .await
        {
            tracing::error!(
                manager = %manager.username,
                category = %category.name,
                error = %e,
                "Failed to record daily tally"
            );
        }

        let waiting = self.tickets.waiting_count(&category).await?;
        let announcement = self
            .announcer
            .announcement_text(ticket.number, location.as_deref());
        let audio_url = self.announcer.audio_url(ticket.number);

        tracing::info!(
            category = %category.name,
            number = ticket.number,
            manager = %manager.username,
            waiting,
            "📣 Ticket called"
        );

        self.emit(QueueEvent::TicketClaimed {
            category: CategorySnapshot::from(&category),
            ticket: TicketSnapshot::from(&ticket),
            manager: ManagerSnapshot::from_manager(manager, location.clone()),
            announcement: announcement.clone(),
            audio_url: audio_url.clone(),
            waiting,
        });
        if waiting == 0 {
            self.emit(QueueEvent::QueueEmptied {
                category: CategorySnapshot::from(&category),
            });
        }

        Ok(CallOutcome::Called {
            ticket,
            category,
            location,
            announcement,
            audio_url,
            waiting,
        })
    }

    /// 经理侧写：工位 + 可服务的类别名
    ///
    /// 登录响应和 /api/auth/me 用，授权每次现查，
    /// 改授权不用重新登录。
    pub async fn manager_profile(
        &self,
        manager: &Manager,
    ) -> DispatchResult<(Option<Workplace>, Vec<String>)> {
        let workplace = self.authorizer.workplace_of(manager).await?;
        let allowed = self.authorizer.allowed_ids(manager).await?;
        let names = self.registry.names_of(&allowed).await?;
        Ok((workplace, names))
    }

    /// 所有启用类别的快照（等待数 + 最近叫到的号）
    pub async fn overview(&self) -> DispatchResult<Vec<QueueOverview>> {
        let mut out = Vec::new();
        for category in self.registry.active().await? {
            let waiting = self.tickets.waiting_count(&category).await?;
            let last_called = self.tickets.last_called_number(&category).await?;
            out.push(QueueOverview {
                category,
                waiting,
                last_called,
            });
        }
        Ok(out)
    }

    fn emit(&self, event: QueueEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::warn!("Queue event dropped: no active receivers");
        }
    }
}

impl fmt::Debug for DispatchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchEngine")
            .field("restricted", &self.restricted)
            .field("tz", &self.tz)
            .finish_non_exhaustive()
    }
}

fn map_validation(err: AppError) -> DispatchError {
    match err {
        AppError::Validation(msg) => DispatchError::Validation(msg),
        other => DispatchError::Storage(other.to_string()),
    }
}
