mod common;

use std::sync::Arc;

use actix::Actor;
use actix_web::{http::StatusCode, test, web, App};
use arena_server::{
    arena::ArenaService,
    ledger::{
        model::AuditKind,
        repository::{MemoryUserRepository, UserRepository},
        LedgerGateway,
    },
    routes,
    settlement::{BattleResolver, DuelService, FixedDraw},
    AppState,
};
use serde_json::{json, Value};

use common::{memory_repo, seeded_users, test_settings, FORCED_LOSS};

fn app_state(repo: Arc<MemoryUserRepository>, metrics_token: Option<&str>) -> AppState {
    let mut settings = test_settings();
    settings.server.metrics_auth_token = metrics_token.map(str::to_string);

    let ledger = LedgerGateway::new(repo, settings.ledger.clone());
    let resolver = BattleResolver::new(ledger.clone(), Arc::new(FixedDraw(FORCED_LOSS)));
    let arena_addr = ArenaService::new(resolver, settings.arena.clone()).start();

    let metrics_registry = prometheus::Registry::new();
    arena_metrics::register_custom_metrics(&metrics_registry).unwrap();

    AppState {
        settings,
        arena_addr,
        duel: DuelService::new(ledger.clone()),
        ledger,
        logger_manager: None,
        metrics_registry,
    }
}

#[actix_web::test]
async fn arena_lists_eligible_opponents() {
    let state = app_state(memory_repo(seeded_users()), None);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/arena?userId=u-neo").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let mut ids: Vec<String> = body["opponents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["id"].as_str().unwrap().to_string())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["u-morpheus".to_string(), "u-trinity".to_string()]);

    let req = test::TestRequest::get().uri("/arena?userId=ghost").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn attack_resolves_single_exchange() {
    let repo = memory_repo(seeded_users());
    let state = app_state(repo.clone(), None);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::configure),
    )
    .await;

    // 아무도 쓰러지지 않으면 무승부, 보상 없음
    let req = test::TestRequest::post()
        .uri("/attack")
        .set_json(json!({
            "attackerId": "u-neo",
            "defenderId": "u-trinity",
            "avatarName": "Mage"
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["winner"], "draw");
    assert_eq!(body["reward"], 0);
    assert_eq!(body["newBalance"], 100);

    let req = test::TestRequest::post()
        .uri("/attack")
        .set_json(json!({
            "attackerId": "u-neo",
            "defenderId": "u-trinity",
            "avatarName": "Reaper"
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["winner"], "attacker");
    assert_eq!(body["reward"], 100);
    assert_eq!(body["newBalance"], 200);
    assert!(body["battleMsg"].as_str().unwrap().contains("Reaper"));

    let stored = repo.find_user_by_id("u-neo").await.unwrap().unwrap();
    assert_eq!(stored.balance, 200);

    // 자기 자신 공격은 거부
    let req = test::TestRequest::post()
        .uri("/attack")
        .set_json(json!({
            "attackerId": "u-neo",
            "defenderId": "u-neo",
            "avatarName": "Mage"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["reason"], "InvalidRequest");
}

#[actix_web::test]
async fn gift_moves_taxed_amount() {
    let repo = memory_repo(seeded_users());
    let state = app_state(repo.clone(), None);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/gift")
        .set_json(json!({
            "senderId": "u-trinity",
            "receiverNickname": "morpheus",
            "amount": 50
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["sent"], 50);
    assert_eq!(body["received"], 45);
    assert_eq!(body["tax"], 5);
    assert_eq!(body["newBalance"], 200);

    let receiver = repo.find_user_by_id("u-morpheus").await.unwrap().unwrap();
    assert_eq!(receiver.balance, 65);
    assert!(repo.audit_log().iter().any(|e| e.kind == AuditKind::Gift));

    let req = test::TestRequest::post()
        .uri("/gift")
        .set_json(json!({
            "senderId": "u-morpheus",
            "receiverNickname": "neo",
            "amount": 1000
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["reason"], "InsufficientBalance");

    let req = test::TestRequest::post()
        .uri("/gift")
        .set_json(json!({
            "senderId": "u-neo",
            "receiverNickname": "nobody",
            "amount": 10
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn health_ready_and_guarded_metrics() {
    let state = app_state(memory_repo(seeded_users()), Some("secret"));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::configure),
    )
    .await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/ready").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "READY");
    assert_eq!(body["queueSize"], 0);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/metrics").to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/metrics")
        .insert_header(("Authorization", "Bearer secret"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}
