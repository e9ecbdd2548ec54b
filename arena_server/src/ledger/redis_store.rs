use std::sync::Arc;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, RedisResult, Script};
use tracing::{debug, warn};

use crate::{
    circuit_breaker::CircuitBreaker,
    errors::{ArenaError, ArenaResult},
    ledger::{
        model::{AuditEntry, User},
        repository::{SaveOutcome, UserRepository},
        scripts,
    },
};

const USERS_SET_KEY: &str = "users";
const AUDIT_LOG_KEY: &str = "arena:audit";

fn user_key(id: &str) -> String {
    format!("user:{}", id)
}

fn nickname_key(nickname: &str) -> String {
    format!("user:nick:{}", nickname)
}

fn seed_pipeline(user: &User, payload: String) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .set_nx(user_key(&user.id), payload)
        .set_nx(nickname_key(&user.nickname), &user.id)
        .ignore()
        .sadd(USERS_SET_KEY, &user.id)
        .ignore();
    pipe
}

/// Redis 기반 UserRepository.
///
/// 유저 문서는 `user:{id}` 에 JSON 으로 저장하고, CAS 는 Lua 스크립트 한 번으로
/// version 비교와 쓰기를 원자적으로 처리한다.
#[derive(Clone)]
pub struct RedisUserRepository {
    redis: ConnectionManager,
    audit_log_cap: usize,
    circuit: Arc<CircuitBreaker>,
}

impl RedisUserRepository {
    pub fn new(redis: ConnectionManager, audit_log_cap: usize, circuit: Arc<CircuitBreaker>) -> Self {
        Self {
            redis,
            audit_log_cap: audit_log_cap.max(1),
            circuit,
        }
    }

    /// 시드 유저의 문서와 인덱스를 기록한다. 이미 있는 문서는 덮어쓰지 않으므로
    /// 재시작해도 잔액이 초기화되지 않는다. 새로 만들었으면 true.
    pub async fn seed(&self, user: &User) -> ArenaResult<bool> {
        self.guard()?;
        let payload = serde_json::to_string(user)?;
        let mut conn = self.redis.clone();
        let result: RedisResult<(bool,)> = seed_pipeline(user, payload)
            .query_async(&mut conn)
            .await;
        self.track(result).map(|(created,)| created)
    }

    fn guard(&self) -> ArenaResult<()> {
        self.circuit.check().map_err(ArenaError::persistence)
    }

    /// redis 호출 결과를 circuit 에 반영한다.
    fn track<T>(&self, result: RedisResult<T>) -> ArenaResult<T> {
        match result {
            Ok(value) => {
                self.circuit.record_success();
                Ok(value)
            }
            Err(e) => {
                self.circuit.record_failure();
                Err(e.into())
            }
        }
    }

    fn decode(raw: Option<String>) -> ArenaResult<Option<User>> {
        raw.map(|json| serde_json::from_str::<User>(&json))
            .transpose()
            .map_err(ArenaError::from)
    }

    fn bumped(user: &User) -> ArenaResult<String> {
        let next = User {
            version: user.version + 1,
            ..user.clone()
        };
        Ok(serde_json::to_string(&next)?)
    }
}

/// 밴 되지 않은 유저만 limit 까지 채운다.
fn collect_eligible(docs: Vec<Option<String>>, picked: &mut Vec<User>, limit: usize) {
    for doc in docs.into_iter().flatten() {
        if picked.len() >= limit {
            break;
        }
        match serde_json::from_str::<User>(&doc) {
            Ok(user) if !user.banned => picked.push(user),
            Ok(_) => {}
            Err(e) => warn!("Skipping undecodable user document: {}", e),
        }
    }
}

#[async_trait]
impl UserRepository for RedisUserRepository {
    async fn find_user_by_id(&self, id: &str) -> ArenaResult<Option<User>> {
        self.guard()?;
        let mut conn = self.redis.clone();
        let raw: RedisResult<Option<String>> = conn.get(user_key(id)).await;
        Self::decode(self.track(raw)?)
    }

    async fn find_user_by_nickname(&self, nickname: &str) -> ArenaResult<Option<User>> {
        self.guard()?;
        let mut conn = self.redis.clone();
        let id: RedisResult<Option<String>> = conn.get(nickname_key(nickname)).await;
        match self.track(id)? {
            Some(id) => self.find_user_by_id(&id).await,
            None => Ok(None),
        }
    }

    async fn sample_opponents(&self, exclude: &str, limit: usize) -> ArenaResult<Vec<User>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.guard()?;
        let mut conn = self.redis.clone();

        let total: RedisResult<usize> = conn.scard(USERS_SET_KEY).await;
        let total = self.track(total)?;

        // 밴 유저와 자기 자신을 걸러낼 여유분을 두고 뽑고, 모자라면 범위를 넓힌다.
        // 집합 크기 이상을 뽑으면 SRANDMEMBER 가 전체를 돌려주므로 거기서 끝난다.
        let mut draw = limit * 4 + 1;
        let mut picked: Vec<User> = Vec::with_capacity(limit);
        loop {
            let ids: RedisResult<Vec<String>> =
                conn.srandmember_multiple(USERS_SET_KEY, draw).await;
            let ids: Vec<String> = self
                .track(ids)?
                .into_iter()
                .filter(|id| id != exclude && !picked.iter().any(|u| &u.id == id))
                .collect();

            if !ids.is_empty() {
                let keys: Vec<String> = ids.iter().map(|id| user_key(id)).collect();
                let raw: RedisResult<Vec<Option<String>>> = redis::cmd("MGET")
                    .arg(&keys)
                    .query_async(&mut conn)
                    .await;
                collect_eligible(self.track(raw)?, &mut picked, limit);
            }

            if picked.len() >= limit || draw >= total {
                break;
            }
            draw = (draw * 2).min(total);
        }
        Ok(picked)
    }

    async fn save(&self, user: &User) -> ArenaResult<SaveOutcome> {
        self.guard()?;
        let payload = Self::bumped(user)?;
        let mut conn = self.redis.clone();

        let result: RedisResult<i64> = Script::new(scripts::save_user_script())
            .key(user_key(&user.id))
            .arg(user.version)
            .arg(payload)
            .invoke_async(&mut conn)
            .await;

        match self.track(result)? {
            1 => Ok(SaveOutcome::Committed),
            0 => {
                debug!("CAS conflict saving user {} at version {}", user.id, user.version);
                Ok(SaveOutcome::Conflict)
            }
            _ => Err(ArenaError::user_not_found(&user.id)),
        }
    }

    async fn save_pair(&self, first: &User, second: &User) -> ArenaResult<SaveOutcome> {
        if first.id == second.id {
            return Err(ArenaError::invalid_target("cannot save the same user twice in a pair"));
        }
        self.guard()?;
        let first_payload = Self::bumped(first)?;
        let second_payload = Self::bumped(second)?;
        let mut conn = self.redis.clone();

        let result: RedisResult<i64> = Script::new(scripts::save_user_pair_script())
            .key(user_key(&first.id))
            .key(user_key(&second.id))
            .arg(first.version)
            .arg(second.version)
            .arg(first_payload)
            .arg(second_payload)
            .invoke_async(&mut conn)
            .await;

        match self.track(result)? {
            1 => Ok(SaveOutcome::Committed),
            0 => Ok(SaveOutcome::Conflict),
            -2 => Err(ArenaError::user_not_found(&second.id)),
            _ => Err(ArenaError::user_not_found(&first.id)),
        }
    }

    async fn append_log(&self, entry: &AuditEntry) -> ArenaResult<()> {
        self.guard()?;
        let payload = serde_json::to_string(entry)?;
        let mut conn = self.redis.clone();
        let cap = self.audit_log_cap as isize;

        let result: RedisResult<()> = redis::pipe()
            .atomic()
            .rpush(AUDIT_LOG_KEY, payload)
            .ignore()
            .ltrim(AUDIT_LOG_KEY, -cap, -1)
            .ignore()
            .query_async(&mut conn)
            .await;
        self.track(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_layout() {
        assert_eq!(user_key("u1"), "user:u1");
        assert_eq!(nickname_key("neo"), "user:nick:neo");
    }

    #[test]
    fn bumped_document_carries_next_version() {
        let mut user = User::new("u1", "neo", 100);
        user.version = 7;
        let json = RedisUserRepository::bumped(&user).unwrap();
        let decoded: User = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.version, 8);
        assert_eq!(decoded.balance, 100);
    }

    #[test]
    fn seed_never_overwrites_existing_documents() {
        let user = User::new("u1", "neo", 100);
        let packed = seed_pipeline(&user, "{}".to_string()).get_packed_pipeline();
        let packed = String::from_utf8(packed).unwrap();
        assert!(packed.contains("SETNX"));
        assert!(!packed.contains("\r\nSET\r\n"));
        assert!(packed.contains("user:u1"));
        assert!(packed.contains("user:nick:neo"));
        assert!(packed.contains("SADD"));
    }

    #[test]
    fn eligible_collection_skips_banned_until_limit() {
        let doc = |user: User| Some(serde_json::to_string(&user).unwrap());
        let docs = vec![
            doc(User::new("b1", "b1", 0).banned()),
            None,
            doc(User::new("u1", "neo", 0)),
            doc(User::new("b2", "b2", 0).banned()),
            Some("garbage".to_string()),
        ];
        let mut picked = Vec::new();
        collect_eligible(docs, &mut picked, 3);
        assert_eq!(picked.len(), 1);

        // 다음 추첨분으로 이어서 채운다
        let more = vec![
            doc(User::new("u2", "trinity", 0)),
            doc(User::new("u3", "morpheus", 0)),
            doc(User::new("u4", "smith", 0)),
        ];
        collect_eligible(more, &mut picked, 3);
        let ids: Vec<_> = picked.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u2", "u3"]);
    }

    #[test]
    fn decode_handles_missing_document() {
        assert!(RedisUserRepository::decode(None).unwrap().is_none());
        assert!(RedisUserRepository::decode(Some("not json".into())).is_err());
    }
}
