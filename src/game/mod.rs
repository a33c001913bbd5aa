//! 对局核心逻辑（卡表、状态机、链结算、经济与整理阶段）。

pub mod catalog;
pub mod chain;
mod cleanup;
pub mod command;
pub mod config;
pub mod deck;
pub mod economy;
pub mod rules;
pub mod snapshot;
pub mod state;

pub use catalog::{CardCategory, CardDefinition, Catalog, CatalogError, Element};
pub use chain::{Chain, ChainKind};
pub use command::{Action, Command, ParseCommandError};
pub use config::{ConfigError, MatchConfig};
pub use rules::{Outcome, RuleEngine, RuleError};
pub use snapshot::MatchSnapshot;
pub use state::{
    GameEvent,
    GameState,
    GemColor,
    IntegrityError,
    Phase,
    Player,
    PlayerId,
    TeamId,
    VictoryReason,
    VictoryState,
};
