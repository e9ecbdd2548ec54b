use std::sync::Arc;

use rand::{seq::SliceRandom, Rng};
use tracing::{error, info};

use crate::{
    errors::{ArenaError, ArenaResult},
    ledger::{
        model::{AuditEntry, AuditKind},
        LedgerGateway,
    },
    settlement::wager::WagerTable,
};

/// 승리 판정 기준. 균등 분포 draw 가 이 값보다 크면 승리 (p = 0.4).
pub const WIN_THRESHOLD: f64 = 0.6;

const BOT_NAMES: &[&str] = &[
    "Rusty Sentinel",
    "Iron Maw",
    "Gravel Knight",
    "Copper Wisp",
    "Hollow Brute",
    "Static Fang",
];

const BOT_AVATARS: &[&str] = &[
    "bot_golem.png",
    "bot_slime.png",
    "bot_drake.png",
    "bot_shade.png",
];

/// 승패를 정하는 난수 공급원.
pub trait OutcomeSource: Send + Sync {
    /// [0, 1) 범위의 값
    fn draw(&self) -> f64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UniformDraw;

impl OutcomeSource for UniformDraw {
    fn draw(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// 항상 같은 값을 돌려준다. 테스트에서 승패를 고정할 때 사용.
#[derive(Debug, Clone, Copy)]
pub struct FixedDraw(pub f64);

impl OutcomeSource for FixedDraw {
    fn draw(&self) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattleOutcome {
    pub is_win: bool,
    pub opponent_label: String,
    pub opponent_avatar: String,
    pub prize_awarded: u64,
    pub new_balance: u64,
}

/// 상대가 없을 때의 봇 배틀 정산기.
#[derive(Clone)]
pub struct BattleResolver {
    ledger: LedgerGateway,
    wagers: WagerTable,
    outcome: Arc<dyn OutcomeSource>,
}

impl BattleResolver {
    pub fn new(ledger: LedgerGateway, outcome: Arc<dyn OutcomeSource>) -> Self {
        Self {
            ledger,
            wagers: WagerTable,
            outcome,
        }
    }

    /// 대기열 제거는 호출하는 쪽(ArenaService)이 먼저 처리한다.
    pub async fn resolve(&self, user_id: &str, multiplier: u32) -> ArenaResult<BattleOutcome> {
        let tier = self.wagers.lookup(multiplier);

        let user = self
            .ledger
            .repository()
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| ArenaError::user_not_found(user_id))?;
        if user.balance < tier.cost {
            return Err(ArenaError::InsufficientBalance {
                balance: user.balance,
                required: tier.cost,
            });
        }

        let is_win = self.outcome.draw() > WIN_THRESHOLD;
        let receipt = self
            .ledger
            .debit_and_maybe_credit(user_id, tier.cost, tier.prize, is_win)
            .await?;

        let (opponent_label, opponent_avatar) = pick_bot_identity();
        let prize_awarded = if is_win { tier.prize } else { 0 };

        let entry = AuditEntry::new(
            user_id,
            AuditKind::BotBattle,
            format!(
                "{} vs {} x{}: cost {}, prize {}",
                if is_win { "won" } else { "lost" },
                opponent_label,
                tier.multiplier,
                tier.cost,
                prize_awarded
            ),
            receipt.new_balance,
        );
        // 잔고는 이미 커밋됨. 감사 로그 실패로 결과를 되돌리지 않는다.
        if let Err(e) = self.ledger.repository().append_log(&entry).await {
            error!("Failed to append audit log for user {}: {}", user_id, e);
        }

        arena_metrics::BOT_BATTLES_TOTAL
            .with_label_values(&[if is_win { "win" } else { "loss" }])
            .inc();
        info!(
            "Bot battle settled for {}: x{} win={} balance {} -> {}",
            user_id, tier.multiplier, is_win, receipt.previous_balance, receipt.new_balance
        );

        Ok(BattleOutcome {
            is_win,
            opponent_label,
            opponent_avatar,
            prize_awarded,
            new_balance: receipt.new_balance,
        })
    }
}

fn pick_bot_identity() -> (String, String) {
    let mut rng = rand::thread_rng();
    let name = BOT_NAMES.choose(&mut rng).copied().unwrap_or("Arena Bot");
    let avatar = BOT_AVATARS.choose(&mut rng).copied().unwrap_or("bot_golem.png");
    (name.to_string(), avatar.to_string())
}
