use actix::{Message, MessageResponse, Recipient};

use crate::{
    arena::{queue::ConnectionId, room::RoomId},
    protocol::ServerMessage,
};

#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect {
    pub connection_id: ConnectionId,
    pub recipient: Recipient<ServerMessage>,
}

/// 대기열과 모든 방에서 제거한다. 이후 이 connection 으로는 이벤트를 보내지 않는다.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub connection_id: ConnectionId,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct RequestMatch {
    pub connection_id: ConnectionId,
    pub nickname: String,
    pub avatar: String,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct JoinRoom {
    pub connection_id: ConnectionId,
    pub room_id: RoomId,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct CancelMatch {
    pub connection_id: ConnectionId,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct RequestBotBattle {
    pub connection_id: ConnectionId,
    pub user_id: String,
    pub multiplier: u32,
}

/// 만료된 대기열 항목 정리. 주기적으로 스스로에게 보낸다.
#[derive(Message)]
#[rtype(result = "()")]
pub struct SweepQueue;

#[derive(Message)]
#[rtype(result = "ArenaStats")]
pub struct GetArenaStats;

#[derive(MessageResponse, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaStats {
    pub connections: usize,
    pub queue_size: usize,
    pub rooms: usize,
}
