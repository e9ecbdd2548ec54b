use std::time::{Duration, Instant};

use actix::{Actor, ActorContext, Addr, AsyncContext, Running};
use actix_web_actors::ws;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    arena::{
        messages::{Connect, Disconnect},
        queue::ConnectionId,
        ArenaService,
    },
    protocol::{ErrorReason, ServerMessage},
};

pub mod handlers;

type Ctx = ws::WebsocketContext<Session>;

/// 웹소켓 연결 하나. 클라이언트 이벤트를 ArenaService 로 넘기고
/// ArenaService 가 보낸 ServerMessage 를 JSON 텍스트로 내보낸다.
pub struct Session {
    connection_id: ConnectionId,
    hb: Instant,
    arena_addr: Addr<ArenaService>,
    heartbeat_interval: Duration,
    client_timeout: Duration,
}

impl Session {
    pub fn new(
        arena_addr: Addr<ArenaService>,
        heartbeat_interval: Duration,
        client_timeout: Duration,
    ) -> Self {
        Self {
            connection_id: Uuid::new_v4(),
            hb: Instant::now(),
            arena_addr,
            heartbeat_interval,
            client_timeout,
        }
    }

    fn hb(&self, ctx: &mut Ctx) {
        ctx.run_interval(self.heartbeat_interval, |act, ctx| {
            if Instant::now().duration_since(act.hb) > act.client_timeout {
                info!(
                    "Websocket client {} heartbeat failed, disconnecting!",
                    act.connection_id
                );
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn send_json(&self, ctx: &mut Ctx, message: &ServerMessage) {
        match serde_json::to_string(message) {
            Ok(text) => ctx.text(text),
            Err(e) => warn!("Failed to serialize ServerMessage for client: {}", e),
        }
    }

    fn send_err(&self, ctx: &mut Ctx, reason: ErrorReason) {
        arena_metrics::ARENA_ERRORS_TOTAL
            .with_label_values(&[reason.as_str()])
            .inc();
        self.send_json(ctx, &ServerMessage::Error { reason });
    }
}

impl Actor for Session {
    type Context = Ctx;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!("Session {} started.", self.connection_id);
        self.hb(ctx);
        self.arena_addr.do_send(Connect {
            connection_id: self.connection_id,
            recipient: ctx.address().recipient(),
        });
    }

    fn stopping(&mut self, _ctx: &mut Self::Context) -> Running {
        // 정리는 ArenaService mailbox 에서 이어서 처리된다.
        self.arena_addr.do_send(Disconnect {
            connection_id: self.connection_id,
        });
        info!("Session {} is stopping.", self.connection_id);
        Running::Stop
    }
}
