#![allow(dead_code)]

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use actix::{Actor, Addr, Context, Handler};
use arena_server::{
    arena::{
        messages::{Connect, GetArenaStats},
        queue::ConnectionId,
        ArenaService,
    },
    env::{
        ArenaSettings, LedgerSettings, LoggingSettings, ServerSettings, Settings, StorageBackend,
        StorageSettings,
    },
    ledger::{model::{Avatar, User}, repository::MemoryUserRepository, LedgerGateway},
    protocol::ServerMessage,
    settlement::{BattleResolver, FixedDraw},
};
use parking_lot::Mutex;
use uuid::Uuid;

/// 승리가 확정되는 draw 값
pub const FORCED_WIN: f64 = 0.99;
/// 패배가 확정되는 draw 값
pub const FORCED_LOSS: f64 = 0.0;

pub fn test_settings() -> Settings {
    Settings {
        logging: LoggingSettings {
            directory: "logs".to_string(),
            filename: "arena_server_test.log".to_string(),
        },
        server: ServerSettings {
            bind_address: "127.0.0.1".to_string(),
            port: 0,
            log_level: "debug".to_string(),
            metrics_auth_token: None,
        },
        arena: ArenaSettings::default(),
        ledger: contention_tolerant_ledger(),
        storage: StorageSettings {
            backend: StorageBackend::Memory,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            audit_log_cap: 1000,
            circuit_failure_threshold: 5,
            circuit_cooldown_seconds: 10,
            seed_users: Vec::new(),
        },
    }
}

/// 동시성 테스트에서 재시도가 먼저 소진되지 않도록 넉넉하게 잡는다.
pub fn contention_tolerant_ledger() -> LedgerSettings {
    LedgerSettings {
        retry_initial_interval_ms: 1,
        retry_max_interval_ms: 20,
        retry_max_elapsed_ms: 10_000,
        gift_tax_percent: 10,
    }
}

pub fn seeded_users() -> Vec<User> {
    vec![
        User::new("u-neo", "neo", 100)
            .with_avatar(Avatar::new("Mage", "mage.png", 60, 5))
            .with_avatar(Avatar::new("Reaper", "reaper.png", 130, 10)),
        User::new("u-trinity", "trinity", 250)
            .with_avatar(Avatar::new("Knight", "knight.png", 20, 20)),
        User::new("u-morpheus", "morpheus", 20),
        User::new("u-smith", "smith", 0).banned(),
    ]
}

pub fn memory_repo(users: Vec<User>) -> Arc<MemoryUserRepository> {
    Arc::new(MemoryUserRepository::with_users(users))
}

pub fn resolver_with(repo: Arc<MemoryUserRepository>, draw: f64) -> BattleResolver {
    let ledger = LedgerGateway::new(repo, contention_tolerant_ledger());
    BattleResolver::new(ledger, Arc::new(FixedDraw(draw)))
}

pub fn start_arena(repo: Arc<MemoryUserRepository>, draw: f64, settings: ArenaSettings) -> Addr<ArenaService> {
    ArenaService::new(resolver_with(repo, draw), settings).start()
}

// ============================================================
// Probe: 세션 대신 ServerMessage 를 모아두는 액터
// ============================================================

pub struct Probe {
    events: Arc<Mutex<Vec<ServerMessage>>>,
}

impl Actor for Probe {
    type Context = Context<Self>;
}

impl Handler<ServerMessage> for Probe {
    type Result = ();

    fn handle(&mut self, msg: ServerMessage, _ctx: &mut Self::Context) {
        self.events.lock().push(msg);
    }
}

#[derive(Clone)]
pub struct ProbeHandle {
    pub connection_id: ConnectionId,
    events: Arc<Mutex<Vec<ServerMessage>>>,
}

impl ProbeHandle {
    pub fn events(&self) -> Vec<ServerMessage> {
        self.events.lock().clone()
    }

    pub fn last(&self) -> Option<ServerMessage> {
        self.events.lock().last().cloned()
    }

    pub fn count(&self) -> usize {
        self.events.lock().len()
    }

    /// 조건을 만족하는 이벤트가 올 때까지 기다린다.
    pub async fn wait_for<F>(&self, mut predicate: F) -> ServerMessage
    where
        F: FnMut(&ServerMessage) -> bool,
    {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(found) = self.events.lock().iter().find(|m| predicate(m)).cloned() {
                return found;
            }
            if Instant::now() > deadline {
                panic!("timed out waiting for event, got {:?}", self.events());
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// Probe 를 띄우고 ArenaService 에 연결한다.
pub async fn connect_probe(arena: &Addr<ArenaService>) -> ProbeHandle {
    let events = Arc::new(Mutex::new(Vec::new()));
    let probe = Probe {
        events: events.clone(),
    }
    .start();
    let connection_id = Uuid::new_v4();
    arena.do_send(Connect {
        connection_id,
        recipient: probe.recipient(),
    });
    settle(arena).await;
    ProbeHandle {
        connection_id,
        events,
    }
}

/// 앞서 보낸 메시지가 ArenaService 에서 처리되고 Probe 까지 전달될 시간을 준다.
pub async fn settle(arena: &Addr<ArenaService>) {
    let _ = arena.send(GetArenaStats).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
}
