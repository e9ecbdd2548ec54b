use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::seq::SliceRandom;

use crate::{
    errors::{ArenaError, ArenaResult},
    ledger::model::{AuditEntry, User},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Committed,
    /// 읽은 뒤 다른 쓰기가 먼저 커밋됨. 다시 읽고 재시도해야 한다.
    Conflict,
}

/// 유저 레코드와 감사 로그를 보관하는 영속 계층.
///
/// `save` 와 `save_pair` 는 `User.version` 기반 compare-and-swap 이다.
/// 저장된 version 이 넘겨준 레코드의 version 과 같을 때만 쓰고 version 을 1 올린다.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user_by_id(&self, id: &str) -> ArenaResult<Option<User>>;

    async fn find_user_by_nickname(&self, nickname: &str) -> ArenaResult<Option<User>>;

    /// 밴 되지 않은 유저 중 `exclude` 를 제외하고 최대 `limit` 명을 무작위로 고른다.
    async fn sample_opponents(&self, exclude: &str, limit: usize) -> ArenaResult<Vec<User>>;

    async fn save(&self, user: &User) -> ArenaResult<SaveOutcome>;

    /// 두 레코드를 모두 쓰거나 아무것도 쓰지 않는다.
    async fn save_pair(&self, first: &User, second: &User) -> ArenaResult<SaveOutcome>;

    async fn append_log(&self, entry: &AuditEntry) -> ArenaResult<()>;
}

/// 프로세스 메모리 저장소. 개발 환경 기본값이자 테스트 더블.
#[derive(Default)]
pub struct MemoryUserRepository {
    users: Mutex<HashMap<String, User>>,
    audit: Mutex<Vec<AuditEntry>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let repo = Self::new();
        for user in users {
            repo.insert(user);
        }
        repo
    }

    /// version 검사 없이 덮어쓴다. 시드/테스트 준비용.
    pub fn insert(&self, user: User) {
        self.users.lock().insert(user.id.clone(), user);
    }

    pub fn audit_log(&self) -> Vec<AuditEntry> {
        self.audit.lock().clone()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_user_by_id(&self, id: &str) -> ArenaResult<Option<User>> {
        Ok(self.users.lock().get(id).cloned())
    }

    async fn find_user_by_nickname(&self, nickname: &str) -> ArenaResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .values()
            .find(|u| u.nickname == nickname)
            .cloned())
    }

    async fn sample_opponents(&self, exclude: &str, limit: usize) -> ArenaResult<Vec<User>> {
        let users = self.users.lock();
        let eligible: Vec<&User> = users
            .values()
            .filter(|u| !u.banned && u.id != exclude)
            .collect();
        let picked = eligible
            .choose_multiple(&mut rand::thread_rng(), limit)
            .map(|u| (*u).clone())
            .collect();
        Ok(picked)
    }

    async fn save(&self, user: &User) -> ArenaResult<SaveOutcome> {
        let mut users = self.users.lock();
        let stored = users
            .get_mut(&user.id)
            .ok_or_else(|| ArenaError::user_not_found(&user.id))?;

        if stored.version != user.version {
            return Ok(SaveOutcome::Conflict);
        }
        *stored = User {
            version: user.version + 1,
            ..user.clone()
        };
        Ok(SaveOutcome::Committed)
    }

    async fn save_pair(&self, first: &User, second: &User) -> ArenaResult<SaveOutcome> {
        if first.id == second.id {
            return Err(ArenaError::invalid_target("cannot save the same user twice in a pair"));
        }

        let mut users = self.users.lock();
        for user in [first, second] {
            let stored = users
                .get(&user.id)
                .ok_or_else(|| ArenaError::user_not_found(&user.id))?;
            if stored.version != user.version {
                return Ok(SaveOutcome::Conflict);
            }
        }
        for user in [first, second] {
            users.insert(
                user.id.clone(),
                User {
                    version: user.version + 1,
                    ..user.clone()
                },
            );
        }
        Ok(SaveOutcome::Committed)
    }

    async fn append_log(&self, entry: &AuditEntry) -> ArenaResult<()> {
        self.audit.lock().push(entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix::test]
    async fn save_rejects_stale_version() {
        let repo = MemoryUserRepository::with_users([User::new("u1", "neo", 100)]);

        let mut first = repo.find_user_by_id("u1").await.unwrap().unwrap();
        let mut second = first.clone();

        first.balance = 80;
        assert_eq!(repo.save(&first).await.unwrap(), SaveOutcome::Committed);

        // second 는 version 0 을 들고 있으므로 충돌
        second.balance = 50;
        assert_eq!(repo.save(&second).await.unwrap(), SaveOutcome::Conflict);

        let stored = repo.find_user_by_id("u1").await.unwrap().unwrap();
        assert_eq!(stored.balance, 80);
        assert_eq!(stored.version, 1);
    }

    #[actix::test]
    async fn save_pair_is_all_or_nothing() {
        let repo = MemoryUserRepository::with_users([
            User::new("a", "alice", 100),
            User::new("b", "bob", 10),
        ]);
        let mut a = repo.find_user_by_id("a").await.unwrap().unwrap();
        let mut b = repo.find_user_by_id("b").await.unwrap().unwrap();

        // b 를 다른 곳에서 먼저 수정
        let mut concurrent = b.clone();
        concurrent.balance = 11;
        repo.save(&concurrent).await.unwrap();

        a.balance = 0;
        b.balance = 110;
        assert_eq!(repo.save_pair(&a, &b).await.unwrap(), SaveOutcome::Conflict);

        // a 도 변경되지 않아야 함
        let a_stored = repo.find_user_by_id("a").await.unwrap().unwrap();
        assert_eq!(a_stored.balance, 100);
        assert_eq!(a_stored.version, 0);
    }

    #[actix::test]
    async fn sample_skips_banned_and_self() {
        let repo = MemoryUserRepository::with_users([
            User::new("me", "me", 0),
            User::new("x", "x", 0),
            User::new("y", "y", 0).banned(),
            User::new("z", "z", 0),
        ]);

        let picked = repo.sample_opponents("me", 3).await.unwrap();
        let mut ids: Vec<_> = picked.iter().map(|u| u.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["x", "z"]);

        let one = repo.sample_opponents("me", 1).await.unwrap();
        assert_eq!(one.len(), 1);
    }

    #[actix::test]
    async fn finds_by_nickname() {
        let repo = MemoryUserRepository::with_users([User::new("u7", "trinity", 5)]);
        let found = repo.find_user_by_nickname("trinity").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some("u7".to_string()));
        assert!(repo.find_user_by_nickname("smith").await.unwrap().is_none());
    }
}
