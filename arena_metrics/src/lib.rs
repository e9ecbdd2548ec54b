use lazy_static::lazy_static;
use prometheus::{
    opts, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};

lazy_static! {
    // register_... 매크로는 기본 레지스트리에 자동 등록하므로,
    // 여기서는 Opts만 생성하고 register_custom_metrics 에서 수동으로 등록합니다.

    /// The current number of players waiting in the match queue.
    pub static ref PLAYERS_IN_QUEUE: IntGauge =
        IntGauge::with_opts(opts!("players_in_queue", "Current number of players waiting for a live opponent")).unwrap();

    /// Duel rooms currently alive (Forming or Active).
    pub static ref ACTIVE_ROOMS: IntGauge =
        IntGauge::with_opts(opts!("active_rooms", "Number of duel rooms currently alive")).unwrap();

    /// Active websocket connections.
    pub static ref ACTIVE_WS_CONNECTIONS: IntGauge =
        IntGauge::with_opts(opts!("active_ws_connections", "Number of active websocket connections")).unwrap();

    /// The total number of queue pairings.
    pub static ref MATCHES_CREATED_TOTAL: IntCounter =
        IntCounter::with_opts(opts!("matches_created_total", "Total number of queue pairings")).unwrap();

    pub static ref QUEUE_ENTRIES_EXPIRED_TOTAL: IntCounter =
        IntCounter::with_opts(opts!("queue_entries_expired_total", "Waiting entries removed by the expiry sweep")).unwrap();

    /// Histogram of queue wait time from enqueue to pairing (seconds)
    pub static ref MATCH_WAIT_DURATION_SECONDS: Histogram =
        Histogram::with_opts(HistogramOpts::new(
            "match_wait_duration_seconds",
            "Time players spent waiting in queue until paired (seconds)"
        ).buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 30.0, 45.0, 60.0, 90.0, 120.0])).unwrap();

    /// outcome = win | loss | rejected | failed
    pub static ref BOT_BATTLES_TOTAL: IntCounterVec =
        IntCounterVec::new(Opts::new("bot_battles_total", "Bot battles by outcome"), &["outcome"]).unwrap();

    /// kind = wager | credit | transfer
    pub static ref LEDGER_MUTATIONS_TOTAL: IntCounterVec =
        IntCounterVec::new(Opts::new("ledger_mutations_total", "Committed ledger mutations by kind"), &["kind"]).unwrap();

    pub static ref LEDGER_CAS_CONFLICTS_TOTAL: IntCounter =
        IntCounter::with_opts(opts!("ledger_cas_conflicts_total", "Version conflicts observed while saving user records")).unwrap();

    /// winner = attacker | defender | draw
    pub static ref PVP_ATTACKS_TOTAL: IntCounterVec =
        IntCounterVec::new(Opts::new("pvp_attacks_total", "Single-exchange attacks by winner"), &["winner"]).unwrap();

    pub static ref GIFT_TRANSFERS_TOTAL: IntCounter =
        IntCounter::with_opts(opts!("gift_transfers_total", "Committed gift transfers")).unwrap();

    /// reason = wire error reason sent to the client
    pub static ref ARENA_ERRORS_TOTAL: IntCounterVec =
        IntCounterVec::new(Opts::new("arena_errors_total", "Error events emitted to clients by reason"), &["reason"]).unwrap();

    pub static ref PERSISTENCE_CIRCUIT_OPEN_TOTAL: IntCounter =
        IntCounter::with_opts(opts!(
            "persistence_circuit_open_total",
            "Total times the persistence circuit breaker opened due to failures"
        ))
        .unwrap();
}

/// Registers all custom metrics defined in this crate to the given registry.
///
/// 서버 시작 시 한 번 호출해야 /metrics 에서 수집됩니다.
pub fn register_custom_metrics(registry: &Registry) -> Result<(), prometheus::Error> {
    registry.register(Box::new(PLAYERS_IN_QUEUE.clone()))?;
    registry.register(Box::new(ACTIVE_ROOMS.clone()))?;
    registry.register(Box::new(ACTIVE_WS_CONNECTIONS.clone()))?;
    registry.register(Box::new(MATCHES_CREATED_TOTAL.clone()))?;
    registry.register(Box::new(QUEUE_ENTRIES_EXPIRED_TOTAL.clone()))?;
    registry.register(Box::new(MATCH_WAIT_DURATION_SECONDS.clone()))?;

    // Settlement
    registry.register(Box::new(BOT_BATTLES_TOTAL.clone()))?;
    registry.register(Box::new(LEDGER_MUTATIONS_TOTAL.clone()))?;
    registry.register(Box::new(LEDGER_CAS_CONFLICTS_TOTAL.clone()))?;
    registry.register(Box::new(PVP_ATTACKS_TOTAL.clone()))?;
    registry.register(Box::new(GIFT_TRANSFERS_TOTAL.clone()))?;

    registry.register(Box::new(ARENA_ERRORS_TOTAL.clone()))?;
    registry.register(Box::new(PERSISTENCE_CIRCUIT_OPEN_TOTAL.clone()))?;

    Ok(())
}
