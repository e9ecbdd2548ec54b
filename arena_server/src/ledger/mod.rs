pub mod model;
pub mod redis_store;
pub mod repository;
mod scripts;

use std::{sync::Arc, time::Duration};

use backoff::{backoff::Backoff, ExponentialBackoff};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    env::LedgerSettings,
    errors::{ArenaError, ArenaResult},
    ledger::{
        model::User,
        repository::{SaveOutcome, UserRepository},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerReceipt {
    pub previous_balance: u64,
    pub new_balance: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReceipt {
    pub sent: u64,
    pub received: u64,
    pub tax: u64,
    pub sender_balance: u64,
    pub receiver_balance: u64,
}

/// 유저 잔고 변경의 유일한 입구.
///
/// 모든 변경은 읽기, 검증, CAS 저장 순서로 진행한다. 저장이 Conflict 이면
/// 다시 읽어서 검증부터 반복하므로 동시 정산끼리 서로의 결과를 덮어쓰지 않는다.
#[derive(Clone)]
pub struct LedgerGateway {
    repo: Arc<dyn UserRepository>,
    settings: LedgerSettings,
}

impl LedgerGateway {
    pub fn new(repo: Arc<dyn UserRepository>, settings: LedgerSettings) -> Self {
        Self { repo, settings }
    }

    pub fn repository(&self) -> &Arc<dyn UserRepository> {
        &self.repo
    }

    pub fn gift_tax(&self, amount: u64) -> u64 {
        amount.saturating_mul(self.settings.gift_tax_percent) / 100
    }

    /// 호출마다 새로 만든다. ExponentialBackoff 는 생성 시각 기준으로 max_elapsed 를 잰다.
    fn retry_policy(&self) -> ExponentialBackoff {
        let initial = Duration::from_millis(self.settings.retry_initial_interval_ms);
        ExponentialBackoff {
            initial_interval: initial,
            current_interval: initial,
            max_interval: Duration::from_millis(self.settings.retry_max_interval_ms),
            max_elapsed_time: Some(Duration::from_millis(self.settings.retry_max_elapsed_ms)),
            ..Default::default()
        }
    }

    async fn load(&self, user_id: &str) -> ArenaResult<User> {
        self.repo
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| ArenaError::user_not_found(user_id))
    }

    /// `apply` 가 Err 를 돌려주면 아무것도 쓰지 않고 그 에러로 끝난다.
    async fn mutate<F>(&self, user_id: &str, kind: &'static str, mut apply: F) -> ArenaResult<(User, User)>
    where
        F: FnMut(&mut User) -> ArenaResult<()>,
    {
        let mut backoff = self.retry_policy();
        loop {
            let current = self.load(user_id).await?;
            let mut next = current.clone();
            apply(&mut next)?;

            match self.repo.save(&next).await? {
                SaveOutcome::Committed => {
                    arena_metrics::LEDGER_MUTATIONS_TOTAL
                        .with_label_values(&[kind])
                        .inc();
                    next.version += 1;
                    return Ok((current, next));
                }
                SaveOutcome::Conflict => {
                    arena_metrics::LEDGER_CAS_CONFLICTS_TOTAL.inc();
                    match backoff.next_backoff() {
                        Some(delay) => {
                            warn!(
                                "Ledger conflict on user {} ({}), retrying in {:?}",
                                user_id, kind, delay
                            );
                            sleep(delay).await;
                        }
                        None => {
                            return Err(ArenaError::LedgerContention {
                                user_id: user_id.to_string(),
                            })
                        }
                    }
                }
            }
        }
    }

    /// 잔고 확인, 차감, 승리 시 지급, 전적 갱신을 한 번의 CAS 로 반영한다.
    pub async fn debit_and_maybe_credit(
        &self,
        user_id: &str,
        cost: u64,
        credit_if_win: u64,
        did_win: bool,
    ) -> ArenaResult<LedgerReceipt> {
        let (before, after) = self
            .mutate(user_id, "wager", |user| {
                if user.balance < cost {
                    return Err(ArenaError::InsufficientBalance {
                        balance: user.balance,
                        required: cost,
                    });
                }
                user.balance -= cost;
                if did_win {
                    user.balance = user
                        .balance
                        .checked_add(credit_if_win)
                        .ok_or_else(|| ArenaError::system("balance overflow"))?;
                    user.wins = user.wins.saturating_add(1);
                } else {
                    user.losses = user.losses.saturating_add(1);
                }
                Ok(())
            })
            .await?;

        Ok(LedgerReceipt {
            previous_balance: before.balance,
            new_balance: after.balance,
        })
    }

    pub async fn credit(&self, user_id: &str, amount: u64) -> ArenaResult<LedgerReceipt> {
        let (before, after) = self
            .mutate(user_id, "credit", |user| {
                user.balance = user
                    .balance
                    .checked_add(amount)
                    .ok_or_else(|| ArenaError::system("balance overflow"))?;
                Ok(())
            })
            .await?;

        Ok(LedgerReceipt {
            previous_balance: before.balance,
            new_balance: after.balance,
        })
    }

    /// 보내는 쪽에서 `gross` 를 빼고 받는 쪽에 `gross - tax` 를 더한다.
    /// 두 문서는 `save_pair` 하나로 함께 커밋된다.
    pub async fn transfer(
        &self,
        from_user_id: &str,
        to_user_id: &str,
        gross: u64,
        tax: u64,
    ) -> ArenaResult<TransferReceipt> {
        if gross == 0 {
            return Err(ArenaError::InvalidAmount { amount: gross });
        }
        if tax > gross {
            return Err(ArenaError::InvalidAmount { amount: tax });
        }
        if from_user_id == to_user_id {
            return Err(ArenaError::invalid_target("cannot transfer to yourself"));
        }
        let net = gross - tax;

        let mut backoff = self.retry_policy();
        loop {
            let mut sender = self.load(from_user_id).await?;
            let mut receiver = self.load(to_user_id).await?;

            if sender.balance < gross {
                return Err(ArenaError::InsufficientBalance {
                    balance: sender.balance,
                    required: gross,
                });
            }
            sender.balance -= gross;
            receiver.balance = receiver
                .balance
                .checked_add(net)
                .ok_or_else(|| ArenaError::system("balance overflow"))?;

            match self.repo.save_pair(&sender, &receiver).await? {
                SaveOutcome::Committed => {
                    arena_metrics::LEDGER_MUTATIONS_TOTAL
                        .with_label_values(&["transfer"])
                        .inc();
                    info!(
                        "Transferred {} from {} to {} (tax {})",
                        gross, from_user_id, to_user_id, tax
                    );
                    return Ok(TransferReceipt {
                        sent: gross,
                        received: net,
                        tax,
                        sender_balance: sender.balance,
                        receiver_balance: receiver.balance,
                    });
                }
                SaveOutcome::Conflict => {
                    arena_metrics::LEDGER_CAS_CONFLICTS_TOTAL.inc();
                    match backoff.next_backoff() {
                        Some(delay) => sleep(delay).await,
                        None => {
                            return Err(ArenaError::LedgerContention {
                                user_id: from_user_id.to_string(),
                            })
                        }
                    }
                }
            }
        }
    }
}
