//! 队列路由 (取号端)

mod handler;

use axum::{Router, routing::get, routing::post};

use crate::core::ServerState;

/// Build queue router - 全部公共路由（取号终端和显示屏不登录）
pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/queues", get(handler::list))
        .route("/api/queues/{category}/join", post(handler::join))
}
