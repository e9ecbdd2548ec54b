use actix::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::arena::room::{Participant, RoomId};

// --- Client to Server Messages ---

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// 실시간 상대를 요청합니다. 대기 중인 플레이어가 있으면 즉시 매칭됩니다.
    #[serde(rename_all = "camelCase")]
    RequestMatch { nickname: String, avatar: String },

    /// 초대 방(private room)에 참가합니다.
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        room_id: RoomId,
        #[serde(default)]
        nickname: Option<String>,
        #[serde(default)]
        avatar: Option<String>,
    },

    /// 대기를 포기하고 봇과 배틀합니다.
    #[serde(rename_all = "camelCase")]
    RequestBotBattle { multiplier: u32, user_id: String },

    /// 매칭 대기열에서 나갑니다.
    CancelMatch,
}

// --- Server to Client Messages ---

#[derive(Serialize, Deserialize, Message, Clone, Debug, PartialEq)]
#[rtype(result = "()")]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// 상대가 없어 대기열에 등록되었음을 알립니다.
    #[serde(rename_all = "camelCase")]
    MatchWaiting { queue_size: usize },

    /// 큐 매칭이 성사되었습니다. 두 참가자 모두에게 전달됩니다.
    #[serde(rename_all = "camelCase")]
    MatchFound {
        room_id: RoomId,
        participants: Vec<ParticipantView>,
    },

    /// 초대 방에 참가했지만 아직 상대가 없습니다.
    #[serde(rename_all = "camelCase")]
    RoomJoined {
        room_id: RoomId,
        participants: Vec<ParticipantView>,
    },

    /// 초대 방에 두 번째 참가자가 들어와 배틀 준비가 끝났습니다.
    #[serde(rename_all = "camelCase")]
    RoomReady {
        room_id: RoomId,
        participants: Vec<ParticipantView>,
    },

    #[serde(rename_all = "camelCase")]
    OpponentLeft {
        room_id: RoomId,
        connection_id: Uuid,
    },

    /// 대기 시간이 만료되어 대기열에서 제거되었습니다.
    #[serde(rename_all = "camelCase")]
    QueueExpired { waited_seconds: u64 },

    #[serde(rename_all = "camelCase")]
    BattleResult {
        is_win: bool,
        opponent_name: String,
        opponent_avatar: String,
        prize: u64,
        new_balance: u64,
        #[serde(rename = "type")]
        kind: BattleKind,
    },

    /// 에러가 발생했음을 알립니다.
    Error { reason: ErrorReason },
}

impl ServerMessage {
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMessage::MatchWaiting { .. } => "match-waiting",
            ServerMessage::MatchFound { .. } => "match-found",
            ServerMessage::RoomJoined { .. } => "room-joined",
            ServerMessage::RoomReady { .. } => "room-ready",
            ServerMessage::OpponentLeft { .. } => "opponent-left",
            ServerMessage::QueueExpired { .. } => "queue-expired",
            ServerMessage::BattleResult { .. } => "battle-result",
            ServerMessage::Error { .. } => "error",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BattleKind {
    #[serde(rename = "BOT")]
    Bot,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ParticipantView {
    pub id: Uuid,
    pub nick: String,
    pub avatar: String,
}

impl From<&Participant> for ParticipantView {
    fn from(p: &Participant) -> Self {
        Self {
            id: p.connection_id,
            nick: p.nickname.clone(),
            avatar: p.avatar.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorReason {
    InsufficientBalance,
    UserNotFound,
    RoomFull,
    InvalidRequest,
    InvalidMessageFormat,
    SystemError,
}

impl ErrorReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorReason::InsufficientBalance => "InsufficientBalance",
            ErrorReason::UserNotFound => "UserNotFound",
            ErrorReason::RoomFull => "RoomFull",
            ErrorReason::InvalidRequest => "InvalidRequest",
            ErrorReason::InvalidMessageFormat => "InvalidMessageFormat",
            ErrorReason::SystemError => "SystemError",
        }
    }
}
