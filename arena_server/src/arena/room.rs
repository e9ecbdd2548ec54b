use std::collections::HashMap;

use crate::{
    arena::queue::{ConnectionId, WaitingEntry},
    errors::{ArenaError, ArenaResult},
};

pub type RoomId = String;

/// 듀얼 방 정원. 그룹 기능용 대형 방은 여기서 다루지 않는다.
pub const DUEL_CAPACITY: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomOrigin {
    Queue,
    Invite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    Forming,
    Active,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub connection_id: ConnectionId,
    pub nickname: String,
    pub avatar: String,
}

impl From<WaitingEntry> for Participant {
    fn from(entry: WaitingEntry) -> Self {
        Self {
            connection_id: entry.connection_id,
            nickname: entry.nickname,
            avatar: entry.avatar,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub room_id: RoomId,
    pub participants: Vec<Participant>,
    pub origin: RoomOrigin,
    pub state: RoomState,
}

impl Room {
    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.participants
            .iter()
            .any(|p| p.connection_id == connection_id)
    }
}

#[derive(Debug, PartialEq)]
pub enum JoinOutcome {
    /// 상대를 기다리는 중.
    Forming(Room),
    /// 두 번째 참가자가 들어와 Active 로 전환됨.
    Ready(Room),
    /// 이미 참가한 방에 다시 join 한 경우. 상태 변화 없음.
    AlreadyJoined(Room),
}

/// 방을 떠난 결과. 남은 참가자에게 알림을 보내는 데 쓴다.
#[derive(Debug, PartialEq)]
pub struct Departure {
    pub room_id: RoomId,
    pub remaining: Vec<Participant>,
    pub destroyed: bool,
}

#[derive(Debug, Default)]
pub struct RoomManager {
    rooms: HashMap<RoomId, Room>,
}

impl RoomManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 큐 매칭 방 ID. 두 connection id 로부터 결정적으로 만들어 충돌을 피한다.
    pub fn queue_room_id(a: ConnectionId, b: ConnectionId) -> RoomId {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        format!("duel-{}-{}", low.simple(), high.simple())
    }

    /// 큐에서 짝지어진 두 참가자로 방을 만든다. 처음부터 Active 상태.
    pub fn open_paired(&mut self, first: Participant, second: Participant) -> Room {
        let room = Room {
            room_id: Self::queue_room_id(first.connection_id, second.connection_id),
            participants: vec![first, second],
            origin: RoomOrigin::Queue,
            state: RoomState::Active,
        };
        self.rooms.insert(room.room_id.clone(), room.clone());
        room
    }

    /// 초대 방 참가. 방이 없으면 Forming 상태로 새로 만든다.
    pub fn join(&mut self, room_id: &str, participant: Participant) -> ArenaResult<JoinOutcome> {
        let room = self
            .rooms
            .entry(room_id.to_string())
            .or_insert_with(|| Room {
                room_id: room_id.to_string(),
                participants: Vec::with_capacity(DUEL_CAPACITY),
                origin: RoomOrigin::Invite,
                state: RoomState::Forming,
            });

        if room.contains(participant.connection_id) {
            return Ok(JoinOutcome::AlreadyJoined(room.clone()));
        }
        if room.participants.len() >= DUEL_CAPACITY {
            return Err(ArenaError::room_full(room_id));
        }

        room.participants.push(participant);
        if room.participants.len() == DUEL_CAPACITY {
            room.state = RoomState::Active;
            Ok(JoinOutcome::Ready(room.clone()))
        } else {
            Ok(JoinOutcome::Forming(room.clone()))
        }
    }

    /// connection 이 속한 모든 방에서 나간다.
    ///
    /// Active 방은 한 명이 나가면 듀얼이 성립하지 않으므로 해산한다.
    /// Forming 방은 비었을 때만 제거한다.
    pub fn leave(&mut self, connection_id: ConnectionId) -> Vec<Departure> {
        let joined: Vec<RoomId> = self
            .rooms
            .values()
            .filter(|room| room.contains(connection_id))
            .map(|room| room.room_id.clone())
            .collect();

        let mut departures = Vec::with_capacity(joined.len());
        for room_id in joined {
            let Some(room) = self.rooms.get_mut(&room_id) else {
                continue;
            };
            room.participants
                .retain(|p| p.connection_id != connection_id);

            let destroyed = room.state == RoomState::Active || room.participants.is_empty();
            let remaining = room.participants.clone();
            if destroyed {
                self.rooms.remove(&room_id);
            }
            departures.push(Departure {
                room_id,
                remaining,
                destroyed,
            });
        }
        departures
    }

    pub fn get(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
