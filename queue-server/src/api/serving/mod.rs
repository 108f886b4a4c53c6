//! 叫号路由 (经理工作台 + 大厅看板)

mod handler;

use axum::{Router, routing::get, routing::post};

use crate::core::ServerState;

/// Build serving router
/// - /api/serving/board: public (大厅看板不登录)
/// - 其余: protected (handled by global require_auth middleware)
pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/serving/board", get(handler::board))
        .route("/api/serving/next", post(handler::next))
        .route("/api/serving/current", get(handler::current))
        .route("/api/serving/tally", get(handler::tally))
}
