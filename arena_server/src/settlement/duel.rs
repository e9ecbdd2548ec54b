use serde::Serialize;
use tracing::{error, info};

use crate::{
    errors::{ArenaError, ArenaResult},
    ledger::{
        model::{AuditEntry, AuditKind, User},
        LedgerGateway,
    },
    settlement::exchange::{resolve_exchange, Combatant, ExchangeWinner},
};

/// `GET /arena` 에서 보여줄 상대 수
pub const OPPONENT_SAMPLE_SIZE: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpponentView {
    pub id: String,
    pub nickname: String,
    pub avatar: Option<String>,
    pub wins: u32,
    pub losses: u32,
}

impl From<&User> for OpponentView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            nickname: user.nickname.clone(),
            avatar: user.lead_avatar().map(|a| a.image.clone()),
            wins: user.wins,
            losses: user.losses,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackReport {
    pub winner: ExchangeWinner,
    pub reward: u64,
    pub battle_msg: String,
    pub new_balance: u64,
}

/// HTTP PvP 경로. 단일 공방 결과를 계산하고 보상을 지급한다.
#[derive(Clone)]
pub struct DuelService {
    ledger: LedgerGateway,
}

impl DuelService {
    pub fn new(ledger: LedgerGateway) -> Self {
        Self { ledger }
    }

    pub async fn opponents(&self, user_id: &str) -> ArenaResult<Vec<OpponentView>> {
        let sampled = self
            .ledger
            .repository()
            .sample_opponents(user_id, OPPONENT_SAMPLE_SIZE)
            .await?;
        Ok(sampled.iter().map(OpponentView::from).collect())
    }

    pub async fn attack(
        &self,
        attacker_id: &str,
        defender_id: &str,
        avatar_name: &str,
    ) -> ArenaResult<AttackReport> {
        if attacker_id == defender_id {
            return Err(ArenaError::invalid_target("cannot attack yourself"));
        }

        let repo = self.ledger.repository();
        let attacker = repo
            .find_user_by_id(attacker_id)
            .await?
            .ok_or_else(|| ArenaError::user_not_found(attacker_id))?;
        if attacker.banned {
            return Err(ArenaError::invalid_target("attacker is banned"));
        }
        let defender = repo
            .find_user_by_id(defender_id)
            .await?
            .ok_or_else(|| ArenaError::user_not_found(defender_id))?;
        if defender.banned {
            return Err(ArenaError::invalid_target("defender is banned"));
        }

        let weapon = attacker
            .avatar(avatar_name)
            .ok_or_else(|| ArenaError::AvatarNotFound {
                user_id: attacker_id.to_string(),
                avatar: avatar_name.to_string(),
            })?;
        let guard = defender
            .lead_avatar()
            .map(Combatant::from)
            .unwrap_or_else(Combatant::unarmed);

        let result = resolve_exchange(Combatant::from(weapon), guard);
        let battle_msg = format!(
            "{} dealt {} damage with {}, {} struck back for {}",
            attacker.nickname,
            result.damage_to_defender,
            weapon.name,
            defender.nickname,
            result.damage_to_attacker
        );

        let new_balance = if result.reward > 0 {
            let receipt = self.ledger.credit(attacker_id, result.reward).await?;
            let entry = AuditEntry::new(
                attacker_id,
                AuditKind::PvpAttack,
                format!("beat {} for {}", defender.nickname, result.reward),
                receipt.new_balance,
            );
            if let Err(e) = repo.append_log(&entry).await {
                error!("Failed to append audit log for user {}: {}", attacker_id, e);
            }
            receipt.new_balance
        } else {
            attacker.balance
        };

        arena_metrics::PVP_ATTACKS_TOTAL
            .with_label_values(&[result.winner.as_str()])
            .inc();
        info!(
            "PvP attack {} -> {}: winner={} reward={}",
            attacker_id,
            defender_id,
            result.winner.as_str(),
            result.reward
        );

        Ok(AttackReport {
            winner: result.winner,
            reward: result.reward,
            battle_msg,
            new_balance,
        })
    }
}
