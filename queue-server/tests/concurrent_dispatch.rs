//! 调度引擎并发测试
//!
//! 取号和叫号都可能被多个终端同时打到同一个类别上。
//! 这里验证发号锁和条件认领在竞争下的表现：
//! 号码不重复、一张票只会被一个经理叫到。

use std::collections::HashSet;
use std::sync::Arc;

use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

use queue_server::announce::UrlAnnouncer;
use queue_server::db::DbService;
use queue_server::db::models::{Category, CategoryCreate, Manager, ManagerCreate, WorkplaceCreate};
use queue_server::db::repository::{
    CategoryRepository, ManagerRepository, TallyRepository, TicketRepository, WorkplaceRepository,
};
use queue_server::dispatch::{
    AuthorizationResolver, CallOutcome, CategoryRegistry, DispatchEngine, JoinOutcome,
    TicketService,
};
use shared::util::now_millis;

const TZ: &str = "Asia/Almaty";

fn engine_over(db: Surreal<Db>) -> DispatchEngine {
    DispatchEngine::new(
        CategoryRegistry::new(CategoryRepository::new(db.clone())),
        TicketService::new(TicketRepository::new(db.clone())),
        AuthorizationResolver::new(WorkplaceRepository::new(db.clone())),
        TallyRepository::new(db),
        Arc::new(UrlAnnouncer::new(None)),
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

#[tokio::test]
async fn test_concurrent_joins_issue_unique_numbers() {
    let db = memory_db().await;
    seed_category(&db, "MASTER", 600, 699).await;
    let engine = Arc::new(engine_over(db));

    let mut handles = Vec::new();
    for i in 0..20 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .join_queue("MASTER", &format!("Посетитель {i}"))
                .await
        }));
    }

    let mut numbers = HashSet::new();
    let mut ordinals = HashSet::new();
    for handle in handles {
        match handle.await.expect("join task").expect("join queue") {
            JoinOutcome::Issued { ticket, .. } => {
                numbers.insert(ticket.number);
                ordinals.insert(ticket.ordinal);
            }
            other => panic!("expected issued ticket, got {:?}", other),
        }
    }

    // 发号锁保证号码和序号都不会撞车
    assert_eq!(numbers.len(), 20);
    assert_eq!(ordinals.len(), 20);
    for number in &numbers {
        assert!((600..=619).contains(number), "unexpected number {number}");
    }
}

#[tokio::test]
async fn test_two_managers_one_ticket_single_winner() {
    let db = memory_db().await;
    let master = seed_category(&db, "MASTER", 600, 699).await;
    let master_id = master.id.clone().expect("category id");
    let first = seed_manager(&db, "aigul", vec![master_id.clone()]).await;
    let second = seed_manager(&db, "dana", vec![master_id]).await;
    let engine = engine_over(db);

    engine.join_queue("MASTER", "Мурат").await.unwrap();

    let (left, right) = tokio::join!(
        engine.call_next(&first, "MASTER"),
        engine.call_next(&second, "MASTER"),
    );
    let mut called = 0;
    let mut empty = 0;
    for outcome in [left.expect("first call"), right.expect("second call")] {
        match outcome {
            CallOutcome::Called { .. } => called += 1,
            CallOutcome::Empty { .. } => empty += 1,
        }
    }
    assert_eq!(called, 1, "exactly one manager wins the ticket");
    assert_eq!(empty, 1, "the loser finds the queue drained");
}

#[tokio::test]
async fn test_two_managers_two_tickets_both_served() {
    let db = memory_db().await;
    let master = seed_category(&db, "MASTER", 600, 699).await;
    let master_id = master.id.clone().expect("category id");
    let first = seed_manager(&db, "aigul", vec![master_id.clone()]).await;
    let second = seed_manager(&db, "dana", vec![master_id]).await;
    let engine = engine_over(db);

    engine.join_queue("MASTER", "Мурат").await.unwrap();
    engine.join_queue("MASTER", "Салтанат").await.unwrap();

    let (left, right) = tokio::join!(
        engine.call_next(&first, "MASTER"),
        engine.call_next(&second, "MASTER"),
    );

    let mut numbers = HashSet::new();
    for outcome in [left.expect("first call"), right.expect("second call")] {
        match outcome {
            CallOutcome::Called { ticket, .. } => {
                numbers.insert(ticket.number);
            }
            other => panic!("expected both calls to land, got {:?}", other),
        }
    }
    // 输掉 600 竞争的一方重试后拿到 601
    assert_eq!(numbers, HashSet::from([600, 601]));
}

#[tokio::test]
async fn test_conditional_claim_single_winner() {
    let db = memory_db().await;
    let master = seed_category(&db, "MASTER", 600, 699).await;
    let master_id = master.id.clone().expect("category id");
    let first = seed_manager(&db, "aigul", vec![master_id.clone()]).await;
    let second = seed_manager(&db, "dana", vec![master_id.clone()]).await;
    let engine = engine_over(db.clone());

    engine.join_queue("MASTER", "Мурат").await.unwrap();

    let tickets = TicketRepository::new(db);
    let head = tickets
        .oldest_unserved(&master_id)
        .await
        .expect("queue head")
        .expect("one waiting ticket");
    let head_id = head.id.expect("ticket id");
    let first_id = first.id.expect("manager id");
    let second_id = second.id.expect("manager id");

    let now = now_millis();
    let (left, right) = tokio::join!(
        tickets.claim(&head_id, &first_id, now),
        tickets.claim(&head_id, &second_id, now),
    );

    let wins = [left.expect("first claim"), right.expect("second claim")]
        .into_iter()
        .flatten()
        .count();
    assert_eq!(wins, 1, "conditional update admits exactly one claimer");
}
