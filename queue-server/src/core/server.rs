//! Server Implementation
//!
//! HTTP 服务器启动和管理

use crate::core::{Config, Result, ServerState};

/// HTTP Server
pub struct Server {
    config: Config,
    state: ServerState,
}

impl Server {
    /// 状态由 main 先初始化好再交进来
    pub fn new(config: Config, state: ServerState) -> Self {
        Self { config, state }
    }

    pub async fn run(&self) -> Result<()> {
        let state = self.state.clone();

        // Start background tasks (queue broadcaster)
        state.start_background_tasks().await;

        // Start Message Bus TCP Server
        let message_bus_service = state.message_bus.clone();
        tokio::spawn(async move {
            if let Err(e) = message_bus_service.start_tcp_server().await {
                tracing::error!("Message Bus TCP server failed: {}", e);
            }
        });

        state.print_startup_banner_content().await;

        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        tracing::info!("🦀 Talon Queue Server starting on {}", addr);

        // 关闭时先停总线，让转发任务和客户端连接干净退出
        let shutdown_state = state.clone();
        let shutdown = async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
            shutdown_state.message_bus.shutdown();
        };

        state
            .http
            .start_server(shutdown)
            .await
            .map_err(|e| crate::core::ServerError::Internal(e.into()))?;

        Ok(())
    }
}
