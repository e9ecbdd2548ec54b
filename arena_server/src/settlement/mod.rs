pub mod duel;
pub mod exchange;
pub mod resolver;
pub mod wager;

pub use duel::DuelService;
pub use resolver::{BattleOutcome, BattleResolver, FixedDraw, OutcomeSource, UniformDraw};
pub use wager::{WagerTable, WagerTier};
