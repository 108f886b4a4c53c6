//! 叫号处理器

use std::collections::{BTreeMap, HashMap, HashSet};

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde::Deserialize;
use surrealdb::RecordId;

use shared::client::{
    CallNextRequest, CallNextResponse, CurrentServingResponse, ServingBoardEntry, TallyReport,
};

use crate::api::convert;
use crate::auth::CurrentManager;
use crate::core::ServerState;
use crate::db::models::{Manager, Ticket};
use crate::db::repository::{
    CategoryRepository, ManagerRepository, TallyRepository, TicketRepository, WorkplaceRepository,
};
use crate::dispatch::{CallOutcome, DispatchError};
use crate::utils::{AppError, AppResponse, AppResult, ok, time};

/// POST /api/serving/next - 叫下一号
///
/// 403 响应的 data 里带上该经理能服务的类别名，
/// 工作台可以直接提示该去哪个队列。
pub async fn next(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentManager>,
    Json(req): Json<CallNextRequest>,
) -> Result<Json<AppResponse<CallNextResponse>>, DispatchError> {
    let manager = resolve_manager(&state, &current).await?;
    let outcome = state.engine().call_next(&manager, &req.category).await?;

    let response = match outcome {
        CallOutcome::Called {
            ticket,
            category,
            location,
            announcement,
            audio_url,
            waiting,
        } => CallNextResponse::Called {
            ticket: convert::ticket_info(&ticket, &category.name),
            location,
            announcement,
            audio_url,
            waiting,
        },
        CallOutcome::Empty { category } => CallNextResponse::Empty { category },
    };

    Ok(ok(response))
}

/// GET /api/serving/current - 当前经理最近叫到的票
pub async fn current(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentManager>,
) -> AppResult<Json<AppResponse<CurrentServingResponse>>> {
    let manager_rid: RecordId = current
        .id
        .parse()
        .map_err(|_| AppError::invalid_token("Malformed manager id in token"))?;

    let tickets = TicketRepository::new(state.get_db());
    let latest = tickets.latest_served_by(&manager_rid).await?;

    let response = match latest {
        Some(ticket) => {
            let category_name = category_name_of(&state, &ticket).await?;
            CurrentServingResponse {
                served_at: ticket.served_at,
                ticket: Some(convert::ticket_info(&ticket, &category_name)),
            }
        }
        None => CurrentServingResponse {
            ticket: None,
            served_at: None,
        },
    };

    Ok(ok(response))
}

/// 看板查询参数
#[derive(Debug, Deserialize)]
pub struct BoardQuery {
    pub category: Option<String>,
}

/// GET /api/serving/board - 大厅看板
///
/// 每个 (经理, 类别) 一行，取该经理在该类别最近叫到的票。
/// 显示屏重连后用它重拉当前叫号状态。
pub async fn board(
    State(state): State<ServerState>,
    Query(query): Query<BoardQuery>,
) -> AppResult<Json<AppResponse<Vec<ServingBoardEntry>>>> {
    // 过滤类别先走注册表解析，未知类别直接 404
    let filter = match &query.category {
        Some(name) => Some(state.engine().registry().resolve(name).await?),
        None => None,
    };
    let filter_rid = filter.as_ref().and_then(|c| c.id.clone());

    let tickets = TicketRepository::new(state.get_db());
    let recent = tickets.recent_served(filter_rid.as_ref()).await?;

    // 查询已按叫号时间倒序，每个 (经理, 类别) 只留第一次出现的
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut latest: Vec<(RecordId, Ticket)> = Vec::new();
    for ticket in recent {
        let Some(manager_rid) = ticket.served_by.clone() else {
            continue;
        };
        let key = (manager_rid.to_string(), ticket.category.to_string());
        if seen.insert(key) {
            latest.push((manager_rid, ticket));
        }
    }

    // 类别名批量换，经理和工位逐个查但带缓存
    let categories = CategoryRepository::new(state.get_db());
    let managers = ManagerRepository::new(state.get_db());
    let workplaces = WorkplaceRepository::new(state.get_db());

    let mut category_ids: Vec<RecordId> = Vec::new();
    let mut seen_categories: HashSet<String> = HashSet::new();
    for (_, ticket) in &latest {
        if seen_categories.insert(ticket.category.to_string()) {
            category_ids.push(ticket.category.clone());
        }
    }
    let category_names: HashMap<String, String> = if category_ids.is_empty() {
        HashMap::new()
    } else {
        categories
            .find_by_ids(&category_ids)
            .await?
            .into_iter()
            .filter_map(|c| c.id.clone().map(|id| (id.to_string(), c.name)))
            .collect()
    };

    let mut manager_cache: HashMap<String, (String, Option<String>)> = HashMap::new();
    let mut entries = Vec::with_capacity(latest.len());
    for (manager_rid, ticket) in latest {
        let manager_key = manager_rid.to_string();
        let (display_name, location) = match manager_cache.get(&manager_key) {
            Some(cached) => cached.clone(),
            None => {
                let profile = board_profile(&managers, &workplaces, &manager_key).await?;
                manager_cache.insert(manager_key.clone(), profile.clone());
                profile
            }
        };

        entries.push(ServingBoardEntry {
            category: category_names
                .get(&ticket.category.to_string())
                .cloned()
                .unwrap_or_else(|| ticket.category.to_string()),
            number: ticket.number,
            manager: display_name,
            location,
            served_at: ticket.served_at.unwrap_or(ticket.created_at),
        });
    }

    Ok(ok(entries))
}

/// 统计查询参数
#[derive(Debug, Deserialize)]
pub struct TallyQuery {
    /// YYYY-MM-DD，缺省为业务时区下的今天
    pub date: Option<String>,
}

/// GET /api/serving/tally - 当前经理的日统计
pub async fn tally(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentManager>,
    Query(query): Query<TallyQuery>,
) -> AppResult<Json<AppResponse<TallyReport>>> {
    let tz = state.config.timezone;
    let date = match &query.date {
        Some(raw) => {
            let parsed = time::parse_date(raw)?;
            time::validate_not_future(parsed, tz)?;
            time::format_date(parsed)
        }
        None => time::format_date(time::today_in_tz(tz)),
    };

    let manager_rid: RecordId = current
        .id
        .parse()
        .map_err(|_| AppError::invalid_token("Malformed manager id in token"))?;

    let rows = TallyRepository::new(state.get_db())
        .find_by_manager_and_date(&manager_rid, &date)
        .await?;

    let mut by_category: BTreeMap<String, i64> = BTreeMap::new();
    let mut total = 0;
    for row in rows {
        total += row.served;
        by_category.insert(row.category_name, row.served);
    }

    Ok(ok(TallyReport {
        date,
        manager: current.display_name.clone(),
        total,
        by_category,
    }))
}

/// 令牌只证明身份，经理资料按请求现查；
/// 账号被删或停用后旧令牌立即失效。
async fn resolve_manager(
    state: &ServerState,
    current: &CurrentManager,
) -> Result<Manager, DispatchError> {
    let repo = ManagerRepository::new(state.get_db());
    let manager = repo
        .find_by_id(&current.id)
        .await?
        .ok_or_else(|| DispatchError::Forbidden {
            message: "Manager account not found".to_string(),
            allowed: vec![],
        })?;

    if !manager.is_active {
        return Err(DispatchError::Forbidden {
            message: "Manager account is disabled".to_string(),
            allowed: vec![],
        });
    }

    Ok(manager)
}

/// 看板行的经理侧写（展示名 + 工位标签）；经理被删时行保留，名字用记录 id 占位
async fn board_profile(
    managers: &ManagerRepository,
    workplaces: &WorkplaceRepository,
    manager_id: &str,
) -> AppResult<(String, Option<String>)> {
    let Some(manager) = managers.find_by_id(manager_id).await? else {
        return Ok((manager_id.to_string(), None));
    };

    let location = match &manager.workplace {
        Some(rid) => workplaces
            .find_by_record_id(rid)
            .await?
            .map(|w| w.location_label()),
        None => None,
    };

    Ok((manager.display_name, location))
}

/// 单张票的类别名；类别被删时退回记录 id
async fn category_name_of(state: &ServerState, ticket: &Ticket) -> AppResult<String> {
    let categories = CategoryRepository::new(state.get_db());
    let found = categories
        .find_by_ids(std::slice::from_ref(&ticket.category))
        .await?;
    Ok(found
        .into_iter()
        .next()
        .map(|c| c.name)
        .unwrap_or_else(|| ticket.category.to_string()))
}
