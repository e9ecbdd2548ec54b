use serde::Serialize;

use crate::ledger::model::Avatar;

pub const BASE_HP: i64 = 100;
pub const MIN_DAMAGE: i64 = 5;
pub const ATTACK_REWARD: u64 = 100;

/// 아바타가 없는 방어자가 쓰는 맨손 스탯.
pub const UNARMED_ATTACK: u32 = 10;
pub const UNARMED_DEFENSE: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Combatant {
    pub attack: u32,
    pub defense: u32,
}

impl Combatant {
    pub fn unarmed() -> Self {
        Self {
            attack: UNARMED_ATTACK,
            defense: UNARMED_DEFENSE,
        }
    }
}

impl From<&Avatar> for Combatant {
    fn from(avatar: &Avatar) -> Self {
        Self {
            attack: avatar.attack,
            defense: avatar.defense,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeWinner {
    Attacker,
    Defender,
    Draw,
}

impl ExchangeWinner {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeWinner::Attacker => "attacker",
            ExchangeWinner::Defender => "defender",
            ExchangeWinner::Draw => "draw",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeResult {
    pub damage_to_defender: i64,
    pub damage_to_attacker: i64,
    pub attacker_hp: i64,
    pub defender_hp: i64,
    pub winner: ExchangeWinner,
    pub reward: u64,
}

fn damage(attack: u32, defense: u32) -> i64 {
    (i64::from(attack) - i64::from(defense)).max(MIN_DAMAGE)
}

/// 한 번의 공방만 계산한다. 라운드를 반복하지 않는다.
///
/// 양쪽 모두 BASE_HP 에서 시작하고 HP 가 먼저 0 이하가 된 쪽이 진다.
/// 공격자가 먼저 때리므로 둘 다 0 이하면 방어자가 먼저 쓰러진 것이다.
/// 아무도 쓰러지지 않으면 무승부이고 보상은 공격자가 이겼을 때만 지급한다.
pub fn resolve_exchange(attacker: Combatant, defender: Combatant) -> ExchangeResult {
    let damage_to_defender = damage(attacker.attack, defender.defense);
    let damage_to_attacker = damage(defender.attack, attacker.defense);
    let attacker_hp = BASE_HP - damage_to_attacker;
    let defender_hp = BASE_HP - damage_to_defender;

    let winner = match (defender_hp <= 0, attacker_hp <= 0) {
        // 공격자의 첫 타격이 먼저 들어간다
        (true, _) => ExchangeWinner::Attacker,
        (false, true) => ExchangeWinner::Defender,
        (false, false) => ExchangeWinner::Draw,
    };
    let reward = if winner == ExchangeWinner::Attacker {
        ATTACK_REWARD
    } else {
        0
    };

    ExchangeResult {
        damage_to_defender,
        damage_to_attacker,
        attacker_hp,
        defender_hp,
        winner,
        reward,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(attack: u32, defense: u32) -> Combatant {
        Combatant { attack, defense }
    }

    #[test]
    fn no_knockout_is_a_draw() {
        let result = resolve_exchange(stats(60, 5), stats(20, 20));
        assert_eq!(result.damage_to_defender, 40);
        assert_eq!(result.damage_to_attacker, 15);
        assert_eq!((result.attacker_hp, result.defender_hp), (85, 60));
        assert_eq!(result.winner, ExchangeWinner::Draw);
        assert_eq!(result.reward, 0);
    }

    #[test]
    fn damage_never_below_minimum() {
        let result = resolve_exchange(stats(1, 90), stats(2, 80));
        assert_eq!(result.damage_to_defender, MIN_DAMAGE);
        assert_eq!(result.damage_to_attacker, MIN_DAMAGE);
        assert_eq!(result.winner, ExchangeWinner::Draw);
        assert_eq!(result.reward, 0);
    }

    #[test]
    fn knockout_at_exactly_zero_hp() {
        let result = resolve_exchange(stats(110, 0), stats(10, 10));
        assert_eq!(result.defender_hp, 0);
        assert_eq!(result.attacker_hp, 90);
        assert_eq!(result.winner, ExchangeWinner::Attacker);
        assert_eq!(result.reward, ATTACK_REWARD);

        let result = resolve_exchange(stats(10, 10), stats(110, 0));
        assert_eq!(result.attacker_hp, 0);
        assert_eq!(result.winner, ExchangeWinner::Defender);
        assert_eq!(result.reward, 0);
    }

    #[test]
    fn double_knockout_goes_to_first_striker() {
        let result = resolve_exchange(stats(150, 0), stats(160, 0));
        assert_eq!((result.attacker_hp, result.defender_hp), (-60, -50));
        assert_eq!(result.winner, ExchangeWinner::Attacker);
        assert_eq!(result.reward, ATTACK_REWARD);
    }

    #[test]
    fn defender_knockout_pays_nothing() {
        let result = resolve_exchange(stats(10, 0), stats(130, 30));
        assert_eq!(result.winner, ExchangeWinner::Defender);
        assert_eq!(result.reward, 0);
        assert_eq!(result.attacker_hp, -30);
    }

    #[test]
    fn unarmed_defender_uses_baseline() {
        let avatar = Avatar::new("Knight", "knight.png", 30, 20);
        let result = resolve_exchange(Combatant::from(&avatar), Combatant::unarmed());
        assert_eq!(result.damage_to_defender, 30);
        assert_eq!(result.damage_to_attacker, MIN_DAMAGE);
        assert_eq!(result.winner, ExchangeWinner::Draw);
    }
}
