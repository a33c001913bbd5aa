use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_HAND_LIMIT: usize = 6;
pub const DEFAULT_OPENING_HAND: usize = 4;
pub const DEFAULT_STARTING_MORALE: u32 = 15;
pub const DEFAULT_GEM_CAP: usize = 5;
pub const DEFAULT_GRAIL_TARGET: u32 = 5;
pub const DEFAULT_RESERVE_CAP: usize = 3;

/// 固定座位数：两队各两人。
pub const SEATS: usize = 4;

/// 对局规则参数。JSON 中缺省的字段取默认值。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MatchConfig {
    pub hand_limit: usize,
    pub opening_hand: usize,
    pub starting_morale: u32,
    pub gem_cap: usize,
    pub grail_target: u32,
    pub reserve_cap: usize,
    pub missile_base_damage: u32,
    pub missile_increment: u32,
    pub poison_damage: u32,
    pub weakness_draw: u32,
    pub purchase_draw: u32,
    pub synthesis_cost: usize,
    pub synthesis_draw: u32,
    pub refine_amount: usize,
    /// 固定随机种子，便于复现；`None` 时取系统熵。
    pub seed: Option<u64>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            hand_limit: DEFAULT_HAND_LIMIT,
            opening_hand: DEFAULT_OPENING_HAND,
            starting_morale: DEFAULT_STARTING_MORALE,
            gem_cap: DEFAULT_GEM_CAP,
            grail_target: DEFAULT_GRAIL_TARGET,
            reserve_cap: DEFAULT_RESERVE_CAP,
            missile_base_damage: 2,
            missile_increment: 1,
            poison_damage: 1,
            weakness_draw: 3,
            purchase_draw: 3,
            synthesis_cost: 3,
            synthesis_draw: 3,
            refine_amount: 2,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("malformed config: {0}")]
    Malformed(String),
    #[error("opening hand {opening_hand} exceeds hand limit {hand_limit}")]
    OpeningHandTooLarge {
        opening_hand: usize,
        hand_limit: usize,
    },
    #[error("`{field}` must be at least 1")]
    Zero { field: &'static str },
    #[error("`{field}` is too large ({value})")]
    TooLarge { field: &'static str, value: u32 },
}

/// 单次伤害与摸牌数的上限，防止魔弹累加溢出。
const MAX_AMOUNT: u32 = 1_000;

impl MatchConfig {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Malformed(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.opening_hand > self.hand_limit {
            return Err(ConfigError::OpeningHandTooLarge {
                opening_hand: self.opening_hand,
                hand_limit: self.hand_limit,
            });
        }
        for (field, value) in [
            ("hand_limit", self.hand_limit),
            ("gem_cap", self.gem_cap),
            ("synthesis_cost", self.synthesis_cost),
            ("refine_amount", self.refine_amount),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero { field });
            }
        }
        for (field, value) in [
            ("starting_morale", self.starting_morale),
            ("grail_target", self.grail_target),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero { field });
            }
        }
        for (field, value) in [
            ("missile_base_damage", self.missile_base_damage),
            ("missile_increment", self.missile_increment),
            ("poison_damage", self.poison_damage),
            ("weakness_draw", self.weakness_draw),
            ("purchase_draw", self.purchase_draw),
            ("synthesis_draw", self.synthesis_draw),
        ] {
            if value > MAX_AMOUNT {
                return Err(ConfigError::TooLarge { field, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = MatchConfig::from_json(r#"{"gem_cap": 3, "seed": 42}"#)
            .expect("config should parse");
        assert_eq!(config.gem_cap, 3);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.hand_limit, DEFAULT_HAND_LIMIT);
        assert_eq!(config.missile_base_damage, 2);
    }

    #[test]
    fn inconsistent_values_are_refused() {
        assert_eq!(
            MatchConfig::from_json(r#"{"hand_limit": 3}"#),
            Err(ConfigError::OpeningHandTooLarge {
                opening_hand: 4,
                hand_limit: 3
            })
        );
        assert_eq!(
            MatchConfig::from_json(r#"{"missile_increment": 4000000000}"#),
            Err(ConfigError::TooLarge {
                field: "missile_increment",
                value: 4_000_000_000
            })
        );
        assert_eq!(
            MatchConfig::from_json(r#"{"grail_target": 0}"#),
            Err(ConfigError::Zero {
                field: "grail_target"
            })
        );
        assert!(matches!(
            MatchConfig::from_json("{"),
            Err(ConfigError::Malformed(_))
        ));
        assert_eq!(MatchConfig::default().validate(), Ok(()));
    }
}
