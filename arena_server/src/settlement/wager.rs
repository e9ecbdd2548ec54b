/// 배율 하나에 대응하는 참가비/상금.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WagerTier {
    pub multiplier: u32,
    pub cost: u64,
    pub prize: u64,
}

const TIERS: [WagerTier; 4] = [
    WagerTier {
        multiplier: 1,
        cost: 25,
        prize: 40,
    },
    WagerTier {
        multiplier: 2,
        cost: 55,
        prize: 80,
    },
    WagerTier {
        multiplier: 4,
        cost: 75,
        prize: 100,
    },
    WagerTier {
        multiplier: 6,
        cost: 85,
        prize: 150,
    },
];

/// 고정된 배율 테이블. 알 수 없는 배율은 1배로 취급한다.
#[derive(Debug, Clone, Copy, Default)]
pub struct WagerTable;

impl WagerTable {
    pub fn lookup(&self, multiplier: u32) -> WagerTier {
        TIERS
            .iter()
            .copied()
            .find(|tier| tier.multiplier == multiplier)
            .unwrap_or(TIERS[0])
    }

    pub fn tiers(&self) -> &'static [WagerTier] {
        &TIERS
    }
}
