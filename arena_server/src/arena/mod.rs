use std::{collections::HashMap, time::Duration};

use actix::{Actor, ActorContext, ActorFutureExt, AsyncContext, Context, Recipient, WrapFuture};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    arena::{
        queue::{ConnectionId, MatchQueue},
        room::{Room, RoomManager},
    },
    env::ArenaSettings,
    errors::ArenaError,
    protocol::{ParticipantView, ServerMessage},
    settlement::BattleResolver,
};

pub mod handlers;
pub mod messages;
pub mod queue;
pub mod room;

/// 대기열, 방 테이블, 연결 목록을 소유하는 액터.
///
/// 모든 변경은 이 액터의 mailbox 에서 하나씩 처리된다. 잔고 정산처럼 I/O 가 필요한
/// 작업은 mailbox 밖의 future 로 실행하고 결과만 다시 액터를 통해 전달한다.
pub struct ArenaService {
    queue: MatchQueue,
    rooms: RoomManager,
    connections: HashMap<ConnectionId, Recipient<ServerMessage>>,
    resolver: BattleResolver,
    settings: ArenaSettings,
    shutdown_token: Option<CancellationToken>,
}

impl ArenaService {
    pub fn new(resolver: BattleResolver, settings: ArenaSettings) -> Self {
        Self {
            queue: MatchQueue::new(),
            rooms: RoomManager::new(),
            connections: HashMap::new(),
            resolver,
            settings,
            shutdown_token: None,
        }
    }

    /// 토큰이 취소되면 액터를 멈춘다.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown_token = Some(token);
        self
    }

    /// 이미 떠난 connection 이면 조용히 버린다.
    fn send_to(&self, connection_id: ConnectionId, message: ServerMessage) {
        match self.connections.get(&connection_id) {
            Some(recipient) => recipient.do_send(message),
            None => debug!(
                "Dropping {} for departed connection {}",
                message.event_name(),
                connection_id
            ),
        }
    }

    fn send_error(&self, connection_id: ConnectionId, error: &ArenaError) {
        let reason = error.reason();
        arena_metrics::ARENA_ERRORS_TOTAL
            .with_label_values(&[reason.as_str()])
            .inc();
        self.send_to(connection_id, ServerMessage::from(error));
    }

    fn broadcast(&self, room: &Room, message: ServerMessage) {
        for participant in &room.participants {
            self.send_to(participant.connection_id, message.clone());
        }
    }

    fn participant_views(room: &Room) -> Vec<ParticipantView> {
        room.participants.iter().map(ParticipantView::from).collect()
    }

    fn update_gauges(&self) {
        arena_metrics::PLAYERS_IN_QUEUE.set(self.queue.len() as i64);
        arena_metrics::ACTIVE_ROOMS.set(self.rooms.len() as i64);
        arena_metrics::ACTIVE_WS_CONNECTIONS.set(self.connections.len() as i64);
    }
}

impl Actor for ArenaService {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let interval = Duration::from_secs(self.settings.queue_sweep_interval_seconds.max(1));
        info!(
            "ArenaService started. Queue sweep every {:?}, entry ttl {}s",
            interval, self.settings.queue_entry_ttl_seconds
        );
        ctx.run_interval(interval, |_act, ctx| {
            ctx.notify(messages::SweepQueue);
        });

        if let Some(token) = self.shutdown_token.clone() {
            ctx.spawn(
                async move { token.cancelled().await }
                    .into_actor(self)
                    .map(|_, _act, ctx| {
                        info!("Shutdown signal received, stopping ArenaService");
                        ctx.stop();
                    }),
            );
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!(
            "ArenaService stopped with {} connections, {} waiting",
            self.connections.len(),
            self.queue.len()
        );
    }
}
