//! 广播链路集成测试 - 引擎事件到订阅端
//!
//! 把引擎、广播器和总线接成完整链路，用内存传输端验证
//! 每个订阅面实际收到的消息：主题路由、字段裁剪和回声抑制。

use std::sync::Arc;
use std::time::Duration;

use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};
use tokio_util::sync::CancellationToken;

use queue_server::announce::UrlAnnouncer;
use queue_server::db::DbService;
use queue_server::db::models::{Category, CategoryCreate, Manager, ManagerCreate, WorkplaceCreate};
use queue_server::db::repository::{
    CategoryRepository, ManagerRepository, TallyRepository, TicketRepository, WorkplaceRepository,
};
use queue_server::dispatch::{
    AuthorizationResolver, CategoryRegistry, DispatchEngine, TicketService,
};
use queue_server::message::{
    BusMessage, MemoryTransport, MessageBus, QueueBroadcaster, QueueState, QueueUpdate, Topic,
    Transport,
};

const TZ: &str = "Asia/Almaty";
const READ_TIMEOUT: Duration = Duration::from_secs(2);
const SILENCE_WINDOW: Duration = Duration::from_millis(200);

fn engine_over(db: Surreal<Db>) -> DispatchEngine {
    DispatchEngine::new(
        CategoryRegistry::new(CategoryRepository::new(db.clone())),
        TicketService::new(TicketRepository::new(db.clone())),
        AuthorizationResolver::new(WorkplaceRepository::new(db.clone())),
        TallyRepository::new(db),
        Arc::new(UrlAnnouncer::new(Some("http://localhost/media".to_string()))),
        None,
        TZ.parse().expect("valid timezone"),
    )
}

async fn memory_db() -> Surreal<Db> {
    DbService::memory().await.expect("in-memory db").db
}

async fn seed_category(db: &Surreal<Db>, name: &str, min: i64, max: i64) -> Category {
    CategoryRepository::new(db.clone())
        .create(CategoryCreate {
            name: name.to_string(),
            label: format!("{name} label"),
            min_number: min,
            max_number: max,
        })
        .await
        .expect("create category")
}

async fn seed_manager(db: &Surreal<Db>, username: &str, categories: Vec<RecordId>) -> Manager {
    let workplace = WorkplaceRepository::new(db.clone())
        .create(WorkplaceCreate {
            name: format!("Стол {username}"),
            location: None,
            allowed_categories: categories,
        })
        .await
        .expect("create workplace");

    ManagerRepository::new(db.clone())
        .create(ManagerCreate {
            username: username.to_string(),
            password: "secret123".to_string(),
            display_name: Some(username.to_string()),
            workplace: workplace.id.clone(),
            category_grants: vec![],
        })
        .await
        .expect("create manager")
}

/// 启动广播器后台任务，挂在引擎事件流上
fn spawn_broadcaster(engine: &DispatchEngine, bus: &Arc<MessageBus>) {
    let broadcaster = QueueBroadcaster::new(
        engine.subscribe(),
        bus.clone(),
        CancellationToken::new(),
    );
    tokio::spawn(broadcaster.run());
}

/// 读一条消息并解出载荷，超时视为测试失败
async fn next_update(client: &MemoryTransport) -> (BusMessage, QueueUpdate) {
    let msg = tokio::time::timeout(READ_TIMEOUT, client.read_message())
        .await
        .expect("message within timeout")
        .expect("readable transport");
    let update = msg.parse_payload().expect("queue update payload");
    (msg, update)
}

/// 断言这个订阅端在窗口内收不到任何消息
async fn expect_silence(client: &MemoryTransport) {
    let outcome = tokio::time::timeout(SILENCE_WINDOW, client.read_message()).await;
    assert!(outcome.is_err(), "client should stay silent, got {:?}", outcome);
}

#[tokio::test]
async fn test_issue_routes_by_topic() {
    let db = memory_db().await;
    seed_category(&db, "MASTER", 600, 699).await;
    let engine = engine_over(db);
    let bus = Arc::new(MessageBus::new());

    let lobby = bus.attach_memory_client("lobby", vec![Topic::AllQueues], None);
    let watcher = bus.attach_memory_client("watcher", vec![Topic::category("MASTER")], None);
    let display = bus.attach_memory_client(
        "display-1",
        vec![Topic::Displays],
        Some("display-1".to_string()),
    );
    let idle_manager = bus.attach_memory_client(
        "manager-probe",
        vec![Topic::Managers],
        Some("manager:probe".to_string()),
    );
    spawn_broadcaster(&engine, &bus);

    engine.join_queue("MASTER", "Айсулу").await.unwrap();

    let (msg, update) = next_update(&lobby).await;
    assert_eq!(msg.topic, Some(Topic::AllQueues));
    assert_eq!(
        update,
        QueueUpdate::NewTicket {
            category: "MASTER".to_string(),
            number: 600,
            waiting: 1,
        }
    );

    let (msg, update) = next_update(&watcher).await;
    assert_eq!(msg.topic, Some(Topic::category("MASTER")));
    assert_eq!(update.kind(), "new_ticket");

    let (_, update) = next_update(&display).await;
    assert_eq!(
        update,
        QueueUpdate::TicketCountUpdate {
            category: "MASTER".to_string(),
            waiting: 1,
        }
    );

    // 取号不打扰经理端
    expect_silence(&idle_manager).await;
}

#[tokio::test]
async fn test_claim_shapes_and_echo_suppression() {
    let db = memory_db().await;
    let master = seed_category(&db, "MASTER", 600, 699).await;
    let master_id = master.id.clone().expect("category id");
    let manager = seed_manager(&db, "aigul", vec![master_id]).await;
    let manager_identity = manager.id.clone().expect("manager id").to_string();
    let engine = engine_over(db);
    let bus = Arc::new(MessageBus::new());

    let lobby = bus.attach_memory_client("lobby", vec![Topic::AllQueues], None);
    let caller = bus.attach_memory_client(
        "manager-aigul",
        vec![Topic::Managers],
        Some(manager_identity),
    );
    let peer = bus.attach_memory_client(
        "manager-dana",
        vec![Topic::Managers],
        Some("manager:dana".to_string()),
    );
    let display = bus.attach_memory_client(
        "display-1",
        vec![Topic::Displays],
        Some("display-1".to_string()),
    );
    spawn_broadcaster(&engine, &bus);

    engine.join_queue("MASTER", "Мурат").await.unwrap();
    // 先把取号产生的消息读掉
    next_update(&lobby).await;
    next_update(&display).await;

    engine.call_next(&manager, "MASTER").await.unwrap();

    // 大厅流: 只有号码，没有个人信息
    let (_, update) = next_update(&lobby).await;
    match update {
        QueueUpdate::TicketCalled {
            number,
            holder_name,
            location,
            announcement,
            ..
        } => {
            assert_eq!(number, 600);
            assert!(holder_name.is_none());
            assert!(location.is_none());
            assert!(announcement.is_none());
        }
        other => panic!("expected ticket_called, got {:?}", other),
    }

    // 其他经理: 额外拿到工位
    let (msg, update) = next_update(&peer).await;
    assert_eq!(msg.topic, Some(Topic::Managers));
    match update {
        QueueUpdate::TicketCalled {
            location,
            holder_name,
            ..
        } => {
            assert_eq!(location.as_deref(), Some("Стол aigul"));
            assert!(holder_name.is_none());
        }
        other => panic!("expected ticket_called, got {:?}", other),
    }

    // 显示屏: 全量字段，随后是人数刷新
    let (_, update) = next_update(&display).await;
    match update {
        QueueUpdate::TicketCalled {
            holder_name,
            location,
            announcement,
            audio_url,
            waiting,
            ..
        } => {
            assert_eq!(holder_name.as_deref(), Some("Мурат"));
            assert_eq!(location.as_deref(), Some("Стол aigul"));
            let text = announcement.expect("announcement text");
            assert!(text.contains("600"));
            assert!(text.contains("Стол aigul"));
            assert_eq!(
                audio_url.as_deref(),
                Some("http://localhost/media/ticket_600.mp3")
            );
            assert_eq!(waiting, 0);
        }
        other => panic!("expected ticket_called, got {:?}", other),
    }
    let (_, update) = next_update(&display).await;
    assert_eq!(update.kind(), "ticket_count_update");

    // 发起叫号的经理不收自己的回声
    expect_silence(&caller).await;
}

#[tokio::test]
async fn test_drained_queue_broadcasts_empty_status() {
    let db = memory_db().await;
    let master = seed_category(&db, "MASTER", 600, 699).await;
    let master_id = master.id.clone().expect("category id");
    let manager = seed_manager(&db, "aigul", vec![master_id]).await;
    let engine = engine_over(db);
    let bus = Arc::new(MessageBus::new());

    let lobby = bus.attach_memory_client("lobby", vec![Topic::AllQueues], None);
    let display = bus.attach_memory_client(
        "display-1",
        vec![Topic::Displays],
        Some("display-1".to_string()),
    );
    spawn_broadcaster(&engine, &bus);

    engine.join_queue("MASTER", "Мурат").await.unwrap();
    engine.call_next(&manager, "MASTER").await.unwrap();

    // 大厅流按序: 取号、叫号、队列清空
    let (_, update) = next_update(&lobby).await;
    assert_eq!(update.kind(), "new_ticket");
    let (_, update) = next_update(&lobby).await;
    assert_eq!(update.kind(), "ticket_called");
    let (_, update) = next_update(&lobby).await;
    assert_eq!(
        update,
        QueueUpdate::QueueStatus {
            category: "MASTER".to_string(),
            status: QueueState::Empty,
        }
    );

    // 显示屏也会收到清空信号 (排在叫号和人数刷新之后)
    let (_, update) = next_update(&display).await;
    assert_eq!(update.kind(), "ticket_count_update");
    let (_, update) = next_update(&display).await;
    assert_eq!(update.kind(), "ticket_called");
    let (_, update) = next_update(&display).await;
    assert_eq!(update.kind(), "ticket_count_update");
    let (_, update) = next_update(&display).await;
    assert_eq!(update.kind(), "queue_status");
}
