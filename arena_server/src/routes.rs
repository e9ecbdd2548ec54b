use std::time::Duration;

use actix_web::{get, post, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::{
    errors::{ArenaError, ArenaResult},
    ledger::model::{AuditEntry, AuditKind},
    session::Session,
    settlement::duel::OpponentView,
    AppState,
};

#[get("/ws/")]
async fn arena_ws_route(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session = Session::new(
        state.arena_addr.clone(),
        Duration::from_secs(state.settings.arena.heartbeat_interval_seconds),
        Duration::from_secs(state.settings.arena.client_timeout_seconds),
    );
    ws::start(session, &req, stream)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArenaQuery {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct ArenaView {
    pub opponents: Vec<OpponentView>,
}

#[get("/arena")]
async fn arena_opponents(
    query: web::Query<ArenaQuery>,
    state: web::Data<AppState>,
) -> ArenaResult<HttpResponse> {
    let repo = state.ledger.repository();
    if repo.find_user_by_id(&query.user_id).await?.is_none() {
        return Err(ArenaError::user_not_found(&query.user_id));
    }

    let opponents = state.duel.opponents(&query.user_id).await?;
    Ok(HttpResponse::Ok().json(ArenaView { opponents }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackRequest {
    pub attacker_id: String,
    pub defender_id: String,
    pub avatar_name: String,
}

#[post("/attack")]
async fn attack(
    body: web::Json<AttackRequest>,
    state: web::Data<AppState>,
) -> ArenaResult<HttpResponse> {
    let report = state
        .duel
        .attack(&body.attacker_id, &body.defender_id, &body.avatar_name)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "ok",
        "winner": report.winner,
        "reward": report.reward,
        "battleMsg": report.battle_msg,
        "newBalance": report.new_balance,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftRequest {
    pub sender_id: String,
    pub receiver_nickname: String,
    pub amount: u64,
}

#[post("/gift")]
async fn gift(body: web::Json<GiftRequest>, state: web::Data<AppState>) -> ArenaResult<HttpResponse> {
    let repo = state.ledger.repository();
    let receiver = repo
        .find_user_by_nickname(&body.receiver_nickname)
        .await?
        .ok_or_else(|| ArenaError::user_not_found(&body.receiver_nickname))?;

    let tax = state.ledger.gift_tax(body.amount);
    let receipt = state
        .ledger
        .transfer(&body.sender_id, &receiver.id, body.amount, tax)
        .await?;
    arena_metrics::GIFT_TRANSFERS_TOTAL.inc();

    let entry = AuditEntry::new(
        &body.sender_id,
        AuditKind::Gift,
        format!(
            "sent {} to {} ({} after tax {})",
            receipt.sent, receiver.nickname, receipt.received, receipt.tax
        ),
        receipt.sender_balance,
    );
    if let Err(e) = repo.append_log(&entry).await {
        error!("Failed to append audit log for user {}: {}", body.sender_id, e);
    }
    info!(
        "Gift {} -> {}: {} (tax {})",
        body.sender_id, receiver.id, receipt.sent, receipt.tax
    );

    Ok(HttpResponse::Ok().json(json!({
        "status": "ok",
        "sent": receipt.sent,
        "received": receipt.received,
        "tax": receipt.tax,
        "newBalance": receipt.sender_balance,
    })))
}

/// bearer 토큰이 설정되어 있으면 검사한다.
async fn metrics_route(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    if let Some(expected_token) = &state.settings.server.metrics_auth_token {
        let provided_token = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "));

        if provided_token != Some(expected_token.as_str()) {
            return HttpResponse::Unauthorized().body("Unauthorized: Invalid or missing token");
        }
    }

    let metric_families = state.metrics_registry.gather();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(format!("Metrics encode error: {}", e));
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

async fn health_route() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

async fn ready_route(state: web::Data<AppState>) -> HttpResponse {
    match state.arena_addr.send(crate::arena::messages::GetArenaStats).await {
        Ok(stats) => HttpResponse::Ok().json(json!({
            "status": "READY",
            "connections": stats.connections,
            "queueSize": stats.queue_size,
            "rooms": stats.rooms,
        })),
        Err(e) => {
            error!("ArenaService unavailable: {}", e);
            HttpResponse::ServiceUnavailable().body("ArenaService unavailable")
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(arena_ws_route)
        .service(arena_opponents)
        .service(attack)
        .service(gift)
        .route("/metrics", web::get().to(metrics_route))
        .route("/health", web::get().to(health_route))
        .route("/ready", web::get().to(ready_route));
}
