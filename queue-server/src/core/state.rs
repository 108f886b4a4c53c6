use std::sync::Arc;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use crate::announce::UrlAnnouncer;
use crate::auth::JwtService;
use crate::core::Config;
use crate::db::DbService;
use crate::db::models::CategoryCreate;
use crate::db::repository::{
    CategoryRepository, TallyRepository, TicketRepository, WorkplaceRepository,
};
use crate::dispatch::{AuthorizationResolver, CategoryRegistry, DispatchEngine, TicketService};
use crate::services::{HttpService, MessageBusService};

/// 服务器状态 - 持有所有服务的单例引用
///
/// ServerState 是叫号服务的核心数据结构，持有所有服务的共享引用。
/// 使用 Arc 实现浅拷贝，克隆成本极低。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | db | Surreal<Db> | 嵌入式数据库 |
/// | engine | Arc<DispatchEngine> | 取号/叫号调度引擎 |
/// | message_bus | MessageBusService | 消息总线服务 |
/// | http | HttpService | HTTP 服务 |
/// | jwt_service | Arc<JwtService> | JWT 认证服务 |
///
/// # 使用示例
///
/// ```ignore
/// // 获取数据库连接
/// let db = state.get_db();
///
/// // 叫下一号
/// let outcome = state.engine().call_next(&manager, "MASTER").await?;
/// ```
#[derive(Clone, Debug)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 嵌入式数据库 (SurrealDB)
    pub db: Surreal<Db>,
    /// 调度引擎
    pub engine: Arc<DispatchEngine>,
    /// 消息总线服务
    pub message_bus: MessageBusService,
    /// HTTP 服务
    pub http: HttpService,
    /// JWT 认证服务 (Arc 共享所有权)
    pub jwt_service: Arc<JwtService>,
}

impl ServerState {
    /// 创建服务器状态 (手动构造)
    ///
    /// 通常使用 [`ServerState::initialize()`] 代替
    pub fn new(
        config: Config,
        db: Surreal<Db>,
        engine: Arc<DispatchEngine>,
        message_bus: MessageBusService,
        http: HttpService,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            config,
            db,
            engine,
            message_bus,
            http,
            jwt_service,
        }
    }

    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构
    /// 2. 数据库 (work_dir/database/queue.db)，空库时写入默认类别
    /// 3. 调度引擎
    /// 4. 各服务 (MessageBus, HTTP, JWT)
    /// 5. HTTP 服务延迟初始化
    ///
    /// # Panics
    ///
    /// 数据库初始化失败时 panic
    pub async fn initialize(config: &Config) -> Self {
        // 0. Ensure work_dir structure exists
        config
            .ensure_work_dir_structure()
            .expect("Failed to create work directory structure");

        // 1. Initialize DB
        let db_path = config.database_dir().join("queue.db");
        let db_path_str = db_path.to_string_lossy();

        let db_service = DbService::new(&db_path_str)
            .await
            .expect("Failed to initialize database");
        let db = db_service.db;

        seed_default_categories(&db).await;

        // 2. Assemble the dispatch engine
        let engine = Arc::new(build_engine(config, db.clone()));

        // 3. Initialize services
        let message_bus = MessageBusService::new(config);
        let http = HttpService::new(config.clone());
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));

        let state = Self::new(
            config.clone(),
            db,
            engine,
            message_bus,
            http.clone(),
            jwt_service,
        );

        // 4. Late initialization for HttpService (needs state)
        http.initialize(state.clone());

        state
    }

    /// 启动后台任务
    ///
    /// 必须在 `Server::run()` 之前调用
    ///
    /// 启动的任务：
    /// - 队列事件广播器 (QueueBroadcaster)
    pub async fn start_background_tasks(&self) {
        self.message_bus.start_background_tasks(self.clone());
    }

    /// 获取数据库实例
    pub fn get_db(&self) -> Surreal<Db> {
        self.db.clone()
    }

    /// 获取 JWT 服务
    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }

    /// 获取调度引擎
    pub fn engine(&self) -> &Arc<DispatchEngine> {
        &self.engine
    }

    /// 获取消息总线
    pub fn message_bus(&self) -> &Arc<crate::message::MessageBus> {
        self.message_bus.bus()
    }

    /// 打印启动横幅内容 (日志)
    pub async fn print_startup_banner_content(&self) {
        let categories = self
            .engine
            .registry()
            .active()
            .await
            .unwrap_or_default()
            .iter()
            .map(|c| format!("{} [{}-{}]", c.name, c.min_number, c.max_number))
            .collect::<Vec<_>>()
            .join(", ");

        tracing::info!(
            "╔══════════════════════════════════════════════════════════════════════╗"
        );
        tracing::info!(
            "║                         TALON QUEUE SERVER                           ║"
        );
        tracing::info!(
            "╚══════════════════════════════════════════════════════════════════════╝"
        );
        tracing::info!("  HTTP API     : http://localhost:{}", self.config.http_port);
        tracing::info!(
            "  Message Bus  : tcp://localhost:{}",
            self.config.message_tcp_port
        );
        tracing::info!("  Timezone     : {}", self.config.timezone);
        match &self.config.restricted_hours {
            Some(w) => tracing::info!(
                "  No tickets   : {} - {}",
                w.start.format("%H:%M"),
                w.end.format("%H:%M")
            ),
            None => tracing::info!("  No tickets   : (always open)"),
        }
        tracing::info!("  Categories   : {}", categories);
        tracing::info!(
            "════════════════════════════════════════════════════════════════════════"
        );
    }
}

/// 用一个数据库句柄装配调度引擎
///
/// 单独成函数，测试里换上内存库即可复用同一套装配。
pub fn build_engine(config: &Config, db: Surreal<Db>) -> DispatchEngine {
    let registry = CategoryRegistry::new(CategoryRepository::new(db.clone()));
    let tickets = TicketService::new(TicketRepository::new(db.clone()));
    let authorizer = AuthorizationResolver::new(WorkplaceRepository::new(db.clone()));
    let tally = TallyRepository::new(db);
    let announcer = Arc::new(UrlAnnouncer::new(config.announce_audio_base_url.clone()));

    DispatchEngine::new(
        registry,
        tickets,
        authorizer,
        tally,
        announcer,
        config.restricted_hours,
        config.timezone,
    )
}

/// 空库时写入默认类别
///
/// 号段沿用招生大厅的既有分区；改区间直接改库，下次启动不会覆盖。
async fn seed_default_categories(db: &Surreal<Db>) {
    let categories = CategoryRepository::new(db.clone());
    match categories.find_all().await {
        Ok(existing) if !existing.is_empty() => return,
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(error = %e, "Skipping category seed: cannot read category table");
            return;
        }
    }

    let defaults = [
        ("BACHELOR_GRANT", "Бакалавр грант", 1, 499),
        ("BACHELOR_PAID", "Бакалавр платное", 500, 599),
        ("MASTER", "Магистратура", 600, 699),
        ("PHD", "Докторантура PhD", 700, 799),
        ("PLATONUS", "Platonus", 800, 999),
    ];

    for (name, label, min_number, max_number) in defaults {
        let created = categories
            .create(CategoryCreate {
                name: name.to_string(),
                label: label.to_string(),
                min_number,
                max_number,
            })
            .await;
        if let Err(e) = created {
            tracing::warn!(category = name, error = %e, "Failed to seed default category");
        }
    }

    tracing::info!("Seeded {} default categories", defaults.len());
}
