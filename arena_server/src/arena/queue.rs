use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use uuid::Uuid;

pub type ConnectionId = Uuid;

/// 실시간 상대를 기다리는 플레이어 한 명.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitingEntry {
    pub connection_id: ConnectionId,
    pub nickname: String,
    pub avatar: String,
    pub enqueued_at: Instant,
}

impl WaitingEntry {
    pub fn new(connection_id: ConnectionId, nickname: String, avatar: String) -> Self {
        Self {
            connection_id,
            nickname,
            avatar,
            enqueued_at: Instant::now(),
        }
    }

    pub fn waited(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.enqueued_at)
    }
}

#[derive(Debug, PartialEq)]
pub enum MatchRequest {
    /// `waiting` 은 풀에서 가장 오래 기다린 항목.
    Paired {
        waiting: WaitingEntry,
        newcomer: WaitingEntry,
    },
    Waiting { queue_size: usize },
}

/// FIFO 대기 풀. 우선순위나 실력 기반 정렬 없이 먼저 들어온 순서대로 매칭한다.
///
/// 하나의 connection_id 는 풀에 최대 한 번만 존재한다.
#[derive(Debug, Default)]
pub struct MatchQueue {
    pool: VecDeque<WaitingEntry>,
}

impl MatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_match(&mut self, entry: WaitingEntry) -> MatchRequest {
        // 이미 대기 중이면 원래 자리를 유지한다.
        if self.contains(entry.connection_id) {
            return MatchRequest::Waiting {
                queue_size: self.pool.len(),
            };
        }

        match self.pool.pop_front() {
            Some(waiting) => MatchRequest::Paired {
                waiting,
                newcomer: entry,
            },
            None => {
                self.pool.push_back(entry);
                MatchRequest::Waiting {
                    queue_size: self.pool.len(),
                }
            }
        }
    }

    /// 없는 항목을 취소해도 에러가 아니다.
    pub fn cancel(&mut self, connection_id: ConnectionId) -> Option<WaitingEntry> {
        let index = self
            .pool
            .iter()
            .position(|e| e.connection_id == connection_id)?;
        self.pool.remove(index)
    }

    /// `ttl` 이상 기다린 항목을 제거해서 돌려준다.
    /// 풀은 enqueue 순서이므로 앞에서부터만 보면 된다.
    pub fn sweep_expired(&mut self, now: Instant, ttl: Duration) -> Vec<WaitingEntry> {
        let mut expired = Vec::new();
        while let Some(front) = self.pool.front() {
            if front.waited(now) < ttl {
                break;
            }
            if let Some(entry) = self.pool.pop_front() {
                expired.push(entry);
            }
        }
        expired
    }

    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.pool.iter().any(|e| e.connection_id == connection_id)
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}
