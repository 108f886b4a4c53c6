use crate::core::Config;
use crate::core::ServerState;
use crate::message::{MessageBus, QueueBroadcaster, TransportConfig};
use std::sync::Arc;

/// 消息总线服务
///
/// 封装 MessageBus，提供：
/// - TCP 服务器启动
/// - 后台事件广播器
/// - 生命周期管理
#[derive(Clone, Debug)]
pub struct MessageBusService {
    /// 消息总线实例
    bus: Arc<MessageBus>,
    /// TCP 监听端口
    tcp_port: u16,
}

impl MessageBusService {
    /// 创建消息总线服务
    pub fn new(config: &Config) -> Self {
        let transport_config = TransportConfig {
            tcp_listen_addr: format!("0.0.0.0:{}", config.message_tcp_port),
            channel_capacity: 1024,
        };

        Self {
            bus: Arc::new(MessageBus::from_config(transport_config)),
            tcp_port: config.message_tcp_port,
        }
    }

    /// 获取消息总线引用
    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    /// 启动 TCP 服务器
    pub async fn start_tcp_server(&self) -> Result<(), crate::utils::AppError> {
        tracing::debug!(port = self.tcp_port, "Starting Message Bus TCP server");
        self.bus.start_tcp_server().await
    }

    /// 启动后台事件广播器
    ///
    /// QueueBroadcaster 订阅调度引擎的事件流，按受众整形后
    /// 发布到总线。
    pub fn start_background_tasks(&self, state: ServerState) {
        let receiver = state.engine().subscribe();
        let shutdown = self.bus.shutdown_token().clone();

        let broadcaster = QueueBroadcaster::new(receiver, self.bus.clone(), shutdown);

        tokio::spawn(async move {
            broadcaster.run().await;
        });

        tracing::debug!("Queue broadcaster started in background");
    }

    /// 关闭总线（通知所有客户端转发任务退出）
    pub fn shutdown(&self) {
        self.bus.shutdown();
    }
}
