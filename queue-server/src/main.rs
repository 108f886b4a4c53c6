use queue_server::{Config, Server, ServerState, print_banner, setup_environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 设置环境 (dotenv, 工作目录, 日志)
    setup_environment()?;

    print_banner();
    tracing::info!("🦀 Talon Queue Server starting...");

    // 2. 加载配置
    let config = Config::from_env();
    tracing::info!(
        http_port = config.http_port,
        bus_port = config.message_tcp_port,
        timezone = %config.timezone,
        environment = %config.environment,
        "Configuration loaded"
    );
    match &config.restricted_hours {
        Some(window) => tracing::info!(
            start = %window.start,
            end = %window.end,
            "Ticket issue pauses inside this window"
        ),
        None => tracing::info!("No restricted hours, tickets issue around the clock"),
    }

    // 3. 初始化服务器状态 (数据库、调度引擎、消息总线)
    let state = ServerState::initialize(&config).await;

    // 4. 启动 HTTP 服务器和总线 TCP (Server::run 会自动启动后台任务)
    let server = Server::new(config, state);

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
