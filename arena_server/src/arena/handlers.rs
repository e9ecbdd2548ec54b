use std::time::{Duration, Instant};

use actix::{ActorFutureExt, AsyncContext, Context, Handler, WrapFuture};
use tracing::{error, info, warn};

use crate::{
    arena::{
        messages::{
            ArenaStats, CancelMatch, Connect, Disconnect, GetArenaStats, JoinRoom,
            RequestBotBattle, RequestMatch, SweepQueue,
        },
        queue::{MatchRequest, WaitingEntry},
        room::{JoinOutcome, Participant, RoomState},
        ArenaService,
    },
    protocol::{BattleKind, ServerMessage},
};

const DEFAULT_AVATAR: &str = "default.png";

impl Handler<Connect> for ArenaService {
    type Result = ();

    fn handle(&mut self, msg: Connect, _ctx: &mut Context<Self>) -> Self::Result {
        self.connections.insert(msg.connection_id, msg.recipient);
        info!("Connection {} registered", msg.connection_id);
        self.update_gauges();
    }
}

impl Handler<Disconnect> for ArenaService {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _ctx: &mut Context<Self>) -> Self::Result {
        let connection_id = msg.connection_id;
        // 먼저 연결을 지워서 아래 정리 과정의 알림이 본인에게 가지 않게 한다.
        self.connections.remove(&connection_id);

        if self.queue.cancel(connection_id).is_some() {
            info!("Connection {} left the queue on disconnect", connection_id);
        }

        for departure in self.rooms.leave(connection_id) {
            info!(
                "Connection {} left room {} (destroyed: {})",
                connection_id, departure.room_id, departure.destroyed
            );
            for participant in &departure.remaining {
                self.send_to(
                    participant.connection_id,
                    ServerMessage::OpponentLeft {
                        room_id: departure.room_id.clone(),
                        connection_id,
                    },
                );
            }
        }

        self.update_gauges();
    }
}

impl Handler<RequestMatch> for ArenaService {
    type Result = ();

    fn handle(&mut self, msg: RequestMatch, _ctx: &mut Context<Self>) -> Self::Result {
        if !self.connections.contains_key(&msg.connection_id) {
            warn!("RequestMatch from unknown connection {}", msg.connection_id);
            return;
        }

        let entry = WaitingEntry::new(msg.connection_id, msg.nickname, msg.avatar);
        match self.queue.request_match(entry) {
            MatchRequest::Paired { waiting, newcomer } => {
                arena_metrics::MATCH_WAIT_DURATION_SECONDS
                    .observe(waiting.waited(Instant::now()).as_secs_f64());
                arena_metrics::MATCHES_CREATED_TOTAL.inc();

                let room = self
                    .rooms
                    .open_paired(Participant::from(waiting), Participant::from(newcomer));
                info!(
                    "Paired {} and {} into room {}",
                    room.participants[0].nickname, room.participants[1].nickname, room.room_id
                );

                let event = ServerMessage::MatchFound {
                    room_id: room.room_id.clone(),
                    participants: Self::participant_views(&room),
                };
                self.broadcast(&room, event);
            }
            MatchRequest::Waiting { queue_size } => {
                self.send_to(msg.connection_id, ServerMessage::MatchWaiting { queue_size });
            }
        }
        self.update_gauges();
    }
}

impl Handler<JoinRoom> for ArenaService {
    type Result = ();

    fn handle(&mut self, msg: JoinRoom, _ctx: &mut Context<Self>) -> Self::Result {
        if !self.connections.contains_key(&msg.connection_id) {
            warn!("JoinRoom from unknown connection {}", msg.connection_id);
            return;
        }

        let participant = Participant {
            connection_id: msg.connection_id,
            nickname: msg
                .nickname
                .unwrap_or_else(|| format!("guest-{}", &msg.connection_id.simple().to_string()[..8])),
            avatar: msg.avatar.unwrap_or_else(|| DEFAULT_AVATAR.to_string()),
        };

        match self.rooms.join(&msg.room_id, participant) {
            Ok(JoinOutcome::Forming(room)) => {
                let event = ServerMessage::RoomJoined {
                    room_id: room.room_id.clone(),
                    participants: Self::participant_views(&room),
                };
                self.send_to(msg.connection_id, event);
            }
            Ok(JoinOutcome::Ready(room)) => {
                info!("Invite room {} is ready", room.room_id);
                let event = ServerMessage::RoomReady {
                    room_id: room.room_id.clone(),
                    participants: Self::participant_views(&room),
                };
                self.broadcast(&room, event);
            }
            Ok(JoinOutcome::AlreadyJoined(room)) => {
                let room_id = room.room_id.clone();
                let participants = Self::participant_views(&room);
                let event = if room.state == RoomState::Active {
                    ServerMessage::RoomReady {
                        room_id,
                        participants,
                    }
                } else {
                    ServerMessage::RoomJoined {
                        room_id,
                        participants,
                    }
                };
                self.send_to(msg.connection_id, event);
            }
            Err(e) => {
                warn!("Connection {} could not join {}: {}", msg.connection_id, msg.room_id, e);
                self.send_error(msg.connection_id, &e);
            }
        }
        self.update_gauges();
    }
}

impl Handler<CancelMatch> for ArenaService {
    type Result = ();

    fn handle(&mut self, msg: CancelMatch, _ctx: &mut Context<Self>) -> Self::Result {
        if self.queue.cancel(msg.connection_id).is_some() {
            info!("Connection {} cancelled matchmaking", msg.connection_id);
            self.update_gauges();
        }
    }
}

impl Handler<RequestBotBattle> for ArenaService {
    type Result = ();

    fn handle(&mut self, msg: RequestBotBattle, ctx: &mut Context<Self>) -> Self::Result {
        let connection_id = msg.connection_id;
        if !self.connections.contains_key(&connection_id) {
            warn!("RequestBotBattle from unknown connection {}", connection_id);
            return;
        }

        // 실시간 매칭 경로를 떠나므로 정산보다 먼저 대기열에서 뺀다.
        if self.queue.cancel(connection_id).is_some() {
            self.update_gauges();
        }

        let resolver = self.resolver.clone();
        let user_id = msg.user_id;
        let multiplier = msg.multiplier;
        let settle = async move { resolver.resolve(&user_id, multiplier).await };

        ctx.spawn(settle.into_actor(self).map(move |result, act, _ctx| {
            match result {
                Ok(outcome) => act.send_to(
                    connection_id,
                    ServerMessage::BattleResult {
                        is_win: outcome.is_win,
                        opponent_name: outcome.opponent_label,
                        opponent_avatar: outcome.opponent_avatar,
                        prize: outcome.prize_awarded,
                        new_balance: outcome.new_balance,
                        kind: BattleKind::Bot,
                    },
                ),
                Err(e) => {
                    if e.is_user_facing() {
                        arena_metrics::BOT_BATTLES_TOTAL
                            .with_label_values(&["rejected"])
                            .inc();
                        warn!("Bot battle rejected for {}: {}", connection_id, e);
                    } else {
                        arena_metrics::BOT_BATTLES_TOTAL
                            .with_label_values(&["failed"])
                            .inc();
                        error!("Bot battle failed for {}: {}", connection_id, e);
                    }
                    act.send_error(connection_id, &e);
                }
            }
        }));
    }
}

impl Handler<SweepQueue> for ArenaService {
    type Result = ();

    fn handle(&mut self, _msg: SweepQueue, _ctx: &mut Context<Self>) -> Self::Result {
        let ttl = Duration::from_secs(self.settings.queue_entry_ttl_seconds);
        let now = Instant::now();
        let expired = self.queue.sweep_expired(now, ttl);
        if expired.is_empty() {
            return;
        }

        for entry in &expired {
            arena_metrics::QUEUE_ENTRIES_EXPIRED_TOTAL.inc();
            self.send_to(
                entry.connection_id,
                ServerMessage::QueueExpired {
                    waited_seconds: entry.waited(now).as_secs(),
                },
            );
        }
        info!("Expired {} waiting entries", expired.len());
        self.update_gauges();
    }
}

impl Handler<GetArenaStats> for ArenaService {
    type Result = ArenaStats;

    fn handle(&mut self, _msg: GetArenaStats, _ctx: &mut Context<Self>) -> Self::Result {
        ArenaStats {
            connections: self.connections.len(),
            queue_size: self.queue.len(),
            rooms: self.rooms.len(),
        }
    }
}
