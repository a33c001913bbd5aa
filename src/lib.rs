pub mod game;
pub mod logger;
pub mod server;

use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

pub use game::{
    Action, CardCategory, CardDefinition, Catalog, CatalogError, Chain, ChainKind, Command,
    ConfigError, Element, GameEvent, GameState, GemColor, IntegrityError, MatchConfig,
    MatchSnapshot, Outcome, ParseCommandError, Phase, Player, PlayerId, RuleEngine, RuleError,
    TeamId, VictoryReason, VictoryState,
};
pub use server::MatchServer;

#[cfg(all(feature = "wee_alloc", target_arch = "wasm32"))]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
    #[cfg(target_arch = "wasm32")]
    logger::init(log::LevelFilter::Info);
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn outcome_json(outcome: &Outcome) -> Result<String, JsValue> {
    serde_json::to_string(outcome).map_err(serde_to_js_error)
}

/// 浏览器侧的对局入口。所有指令经由同一个 `MatchServer`。
#[wasm_bindgen]
pub struct GameEngine {
    server: MatchServer,
}

#[wasm_bindgen]
impl GameEngine {
    /// `config_json` 缺省字段取默认值；`catalog_json` 为空时使用内置卡表。
    #[wasm_bindgen(constructor)]
    pub fn new(
        config_json: Option<String>,
        catalog_json: Option<String>,
    ) -> Result<GameEngine, JsValue> {
        let config = match config_json {
            Some(json) => MatchConfig::from_json(&json).map_err(serde_to_js_error)?,
            None => MatchConfig::default(),
        };
        let catalog = Catalog::from_json(catalog_json.as_deref()).map_err(serde_to_js_error)?;
        Ok(GameEngine {
            server: MatchServer::new(config, catalog),
        })
    }

    /// 接收 `{"actor": .., "verb": .., ...}`，返回处理结果 JSON。
    pub fn handle_json(&self, command_json: &str) -> Result<String, JsValue> {
        let command: Command = serde_json::from_str(command_json).map_err(serde_to_js_error)?;
        outcome_json(&self.server.handle(command))
    }

    pub fn handle_text(&self, actor: &str, text: &str) -> Result<String, JsValue> {
        outcome_json(&self.server.handle_text(actor, text))
    }

    pub fn handle(&self, command: JsValue) -> Result<JsValue, JsValue> {
        let command: Command = from_value(command).map_err(JsValue::from)?;
        to_value(&self.server.handle(command)).map_err(JsValue::from)
    }

    pub fn snapshot_json(&self, viewer: Option<String>) -> Result<String, JsValue> {
        serde_json::to_string(&self.server.snapshot(viewer.as_deref())).map_err(serde_to_js_error)
    }

    pub fn snapshot(&self, viewer: Option<String>) -> Result<JsValue, JsValue> {
        to_value(&self.server.snapshot(viewer.as_deref())).map_err(JsValue::from)
    }

    pub fn reset(&self) -> Result<String, JsValue> {
        outcome_json(&self.server.reset())
    }
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}
