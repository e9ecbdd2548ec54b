use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 인벤토리 아이템(아바타) 하나. 모든 흐름이 이 타입 하나만 사용한다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avatar {
    pub name: String,
    pub image: String,
    pub attack: u32,
    pub defense: u32,
}

impl Avatar {
    pub fn new(name: impl Into<String>, image: impl Into<String>, attack: u32, defense: u32) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            attack,
            defense,
        }
    }
}

/// 영속 저장되는 유저 레코드.
///
/// `version` 은 CAS 저장에 쓰인다. 읽은 시점의 값을 그대로 들고 `save` 를 호출하면
/// 저장소가 비교 후 1 증가시킨다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub nickname: String,
    pub balance: u64,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub banned: bool,
    #[serde(default)]
    pub avatars: Vec<Avatar>,
    #[serde(default)]
    pub version: u64,
}

impl User {
    pub fn new(id: impl Into<String>, nickname: impl Into<String>, balance: u64) -> Self {
        Self {
            id: id.into(),
            nickname: nickname.into(),
            balance,
            wins: 0,
            losses: 0,
            banned: false,
            avatars: Vec::new(),
            version: 0,
        }
    }

    pub fn with_avatar(mut self, avatar: Avatar) -> Self {
        self.avatars.push(avatar);
        self
    }

    pub fn banned(mut self) -> Self {
        self.banned = true;
        self
    }

    pub fn avatar(&self, name: &str) -> Option<&Avatar> {
        self.avatars.iter().find(|a| a.name == name)
    }

    /// 방어 시 사용하는 대표 아바타 (인벤토리 첫 번째)
    pub fn lead_avatar(&self) -> Option<&Avatar> {
        self.avatars.first()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    BotBattle,
    PvpAttack,
    Gift,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub user_id: String,
    pub kind: AuditKind,
    pub detail: String,
    pub balance_after: u64,
    pub at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        user_id: impl Into<String>,
        kind: AuditKind,
        detail: impl Into<String>,
        balance_after: u64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            kind,
            detail: detail.into(),
            balance_after,
            at: Utc::now(),
        }
    }
}
