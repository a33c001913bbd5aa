use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::game::{
    Catalog, Command, GameState, MatchConfig, MatchSnapshot, Outcome, RuleEngine,
};

/// 一张桌子：单个对局状态加一把锁。每条指令都在锁内完成校验与修改。
#[derive(Debug)]
pub struct MatchServer {
    state: Mutex<GameState>,
    engine: RuleEngine,
}

impl MatchServer {
    pub fn new(config: MatchConfig, catalog: Arc<Catalog>) -> Self {
        Self {
            state: Mutex::new(GameState::new(config, catalog)),
            engine: RuleEngine::new(),
        }
    }

    pub fn standard() -> Self {
        Self::new(MatchConfig::default(), Catalog::standard())
    }

    pub fn handle(&self, command: Command) -> Outcome {
        let mut state = self.state.lock();
        self.engine.apply(&mut state, command)
    }

    /// 聊天文本入口。无法解析的文本直接忽略。
    pub fn handle_text(&self, actor: &str, text: &str) -> Outcome {
        let mut state = self.state.lock();
        match Command::parse(actor, text, &state.catalog) {
            Ok(command) => self.engine.apply(&mut state, command),
            Err(error) => {
                debug!("ignored text from {actor}: {error}");
                Outcome::Ignored
            }
        }
    }

    pub fn snapshot(&self, viewer: Option<&str>) -> MatchSnapshot {
        MatchSnapshot::for_viewer(&self.state.lock(), viewer)
    }

    /// 管理端重置：不校验发送者，也不限阶段。
    pub fn reset(&self) -> Outcome {
        let mut state = self.state.lock();
        state.pending_events.clear();
        self.engine.reset(&mut state);
        Outcome::Applied {
            events: state.take_events(),
        }
    }

    pub fn with_state<R>(&self, read: impl FnOnce(&GameState) -> R) -> R {
        read(&self.state.lock())
    }
}

impl Default for MatchServer {
    fn default() -> Self {
        Self::standard()
    }
}
