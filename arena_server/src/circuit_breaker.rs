use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, info, warn};

/// 영속 저장소(Redis) 연속 실패 시 일정 시간 호출을 차단한다.
///
/// 차단 중에는 정산 요청이 바로 PersistenceFailure 로 끝나므로
/// 죽은 저장소에 CAS 재시도가 몰리지 않는다.
#[derive(Debug)]
pub struct CircuitBreaker {
    consecutive_failures: AtomicU64,
    /// Circuit을 열기 위한 연속 실패 횟수
    threshold: u64,
    /// 차단 해제 시각 (Unix timestamp, 초)
    open_until: AtomicU64,
    cooldown_seconds: u64,
}

impl CircuitBreaker {
    pub fn new(threshold: u64, cooldown_seconds: u64) -> Self {
        Self {
            consecutive_failures: AtomicU64::new(0),
            threshold: threshold.max(1),
            open_until: AtomicU64::new(0),
            cooldown_seconds,
        }
    }

    /// * `Ok(())` - 호출 가능
    /// * `Err(String)` - 차단 중, 남은 시간 포함
    pub fn check(&self) -> Result<(), String> {
        let now = Utc::now().timestamp() as u64;
        let open_until = self.open_until.load(Ordering::Relaxed);

        if open_until > now {
            return Err(format!(
                "persistence circuit open for {}s",
                open_until - now
            ));
        }
        Ok(())
    }

    pub fn record_success(&self) {
        let previous = self.consecutive_failures.swap(0, Ordering::Relaxed);
        let was_open = self.open_until.swap(0, Ordering::Relaxed);

        if was_open > 0 {
            info!(
                "Persistence circuit CLOSED (recovered after {} failures)",
                previous
            );
        }
    }

    pub fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;

        if failures >= self.threshold {
            let now = Utc::now().timestamp() as u64;
            self.open_until
                .store(now + self.cooldown_seconds, Ordering::Relaxed);

            error!(
                "Persistence circuit OPEN after {} consecutive failures. Blocking for {}s",
                failures, self.cooldown_seconds
            );
            arena_metrics::PERSISTENCE_CIRCUIT_OPEN_TOTAL.inc();
        } else {
            warn!(
                "Persistence failure count: {}/{}",
                failures, self.threshold
            );
        }
    }

    pub fn failure_count(&self) -> u64 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    pub fn is_open(&self) -> bool {
        self.check().is_err()
    }
}
