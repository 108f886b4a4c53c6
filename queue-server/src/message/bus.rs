//! 消息总线核心实现
//!
//! # 架构
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     MessageBus                          │
//! │  ┌───────────────────────────────────────────────────┐  │
//! │  │  broadcast::Sender<BusMessage>  (server → clients)│  │
//! │  └───────────────────────────────────────────────────┘  │
//! └────────────────────────┬────────────────────────────────┘
//!                          │ per-client forwarder (按主题过滤)
//!              ┌───────────┴───────────┐
//!              │     Transport Trait   │  ◄── 可插拔实现
//!              └───────────┬───────────┘
//!                          │
//!              ┌───────────┴───────────┐
//!              ▼                       ▼
//!         TcpTransport           MemoryTransport
//!         (TCP 明文)             (同进程通信)
//! ```
//!
//! # 消息流
//!
//! 总线是单向扇出：服务端 `publish()` 进广播通道，每个客户端的
//! forwarder 按订阅主题过滤后写到自己的连接上。客户端在握手之后
//! 不再向服务端发消息。

use std::sync::Arc;

use dashmap::DashMap;
use shared::message::{BusMessage, Topic};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::tcp_server::spawn_server_to_client_forwarder;
use super::transport::{MemoryTransport, Transport};
use super::{ClientSession, ConnectedClient};

/// Configuration for transport layer
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tcp_listen_addr: String,
    /// Capacity of the broadcast channel (default: 1024)
    pub channel_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tcp_listen_addr: "0.0.0.0:9200".to_string(),
            channel_capacity: 1024,
        }
    }
}

/// 消息总线 - 负责消息路由和转发
///
/// # 职责
///
/// - 消息扇出 (publish)
/// - 客户端管理 (注册、断开清理、get_connected_clients)
/// - 传输层抽象 (TCP/Memory)
#[derive(Debug, Clone)]
pub struct MessageBus {
    /// 服务器到客户端的广播通道
    server_tx: broadcast::Sender<BusMessage>,
    /// 传输层配置
    pub(crate) config: TransportConfig,
    /// 关闭信号令牌
    shutdown_token: CancellationToken,
    /// 已连接的客户端 (Client ID -> Session)
    pub(crate) clients: Arc<DashMap<String, ClientSession>>,
}

impl MessageBus {
    /// 创建默认配置的消息总线
    pub fn new() -> Self {
        Self::from_config(TransportConfig::default())
    }

    /// 从配置创建消息总线
    pub fn from_config(config: TransportConfig) -> Self {
        let (server_tx, _) = broadcast::channel(config.channel_capacity);
        Self {
            server_tx,
            config,
            shutdown_token: CancellationToken::new(),
            clients: Arc::new(DashMap::new()),
        }
    }

    /// 发布消息 (服务器 -> 订阅者)
    ///
    /// 按消息上的 topic 扇出；没有订阅者时消息静默丢弃。
    pub fn publish(&self, msg: BusMessage) {
        if self.server_tx.send(msg).is_err() {
            tracing::trace!("Bus message dropped: no connected clients");
        }
    }

    /// 订阅服务器广播
    ///
    /// 进程内订阅端（测试、内嵌消费者）拿到的是未过滤的全量流。
    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.server_tx.subscribe()
    }

    /// 获取广播发送端 (高级用法)
    pub fn sender(&self) -> &broadcast::Sender<BusMessage> {
        &self.server_tx
    }

    /// 挂载一个同进程客户端
    ///
    /// 注册会话并启动和 TCP 客户端一样的转发任务（含主题过滤），
    /// 返回客户端侧的传输端。用于测试和内嵌显示屏。
    pub fn attach_memory_client(
        &self,
        client_id: &str,
        topics: Vec<Topic>,
        identity: Option<String>,
    ) -> MemoryTransport {
        let (server_end, client_end) = MemoryTransport::pair();
        let transport: Arc<dyn Transport> = Arc::new(server_end);

        self.clients.insert(
            client_id.to_string(),
            ClientSession {
                transport: transport.clone(),
                topics: topics.clone(),
                identity: identity.clone(),
            },
        );

        spawn_server_to_client_forwarder(
            transport,
            self.server_tx.subscribe(),
            self.shutdown_token.clone(),
            client_id.to_string(),
            topics,
            identity,
            CancellationToken::new(),
        );

        client_end
    }

    /// 获取关闭令牌 (用于监控关闭信号)
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown_token
    }

    /// 获取已连接客户端列表
    pub fn get_connected_clients(&self) -> Vec<ConnectedClient> {
        self.clients
            .iter()
            .map(|entry| ConnectedClient {
                id: entry.key().clone(),
                identity: entry.value().identity.clone(),
                addr: entry.value().transport.peer_addr(),
                topics: entry.value().topics.clone(),
            })
            .collect()
    }

    /// 优雅关闭消息总线
    ///
    /// 取消所有运行中的任务，包括 TCP 服务器
    pub fn shutdown(&self) {
        tracing::info!("Shutting down message bus");
        self.shutdown_token.cancel();
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}
