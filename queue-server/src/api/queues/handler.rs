//! 队列处理器

use axum::{
    Json,
    extract::{Path, State},
};

use shared::client::{CategoryInfo, JoinQueueRequest, JoinQueueResponse, QueueSnapshot};

use crate::api::convert;
use crate::core::ServerState;
use crate::dispatch::{DispatchError, JoinOutcome};
use crate::utils::{AppResponse, AppResult, ok};

/// GET /api/queues - 所有启用队列的快照
///
/// 显示屏断线重连后用它重拉全量状态。
pub async fn list(
    State(state): State<ServerState>,
) -> AppResult<Json<AppResponse<Vec<QueueSnapshot>>>> {
    let overview = state.engine().overview().await?;
    let snapshots: Vec<QueueSnapshot> = overview.iter().map(QueueSnapshot::from).collect();
    Ok(ok(snapshots))
}

/// POST /api/queues/{category}/join - 取号
///
/// 限时窗口内返回 200 + `out_of_hours`，不是错误状态码。
pub async fn join(
    State(state): State<ServerState>,
    Path(category): Path<String>,
    Json(req): Json<JoinQueueRequest>,
) -> Result<Json<AppResponse<JoinQueueResponse>>, DispatchError> {
    let outcome = state
        .engine()
        .join_queue(&category, &req.holder_name)
        .await?;

    let response = match outcome {
        JoinOutcome::Issued {
            ticket,
            category,
            waiting,
        } => JoinQueueResponse::Issued {
            ticket: convert::ticket_info(&ticket, &category.name),
            category: CategoryInfo::from(&category),
            waiting,
        },
        JoinOutcome::OutOfHours { message } => JoinQueueResponse::OutOfHours { message },
    };

    Ok(ok(response))
}
