use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::catalog::Catalog;

/// 玩家可发出的全部动作。JSON 中以 `verb` 字段区分。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "verb", rename_all = "snake_case")]
pub enum Action {
    Join,
    Start,
    Reset,
    Attack {
        card: String,
        #[serde(default)]
        target: Option<String>,
    },
    Missile {
        card: String,
    },
    Status {
        card: String,
        #[serde(default)]
        target: Option<String>,
    },
    Endure,
    Ward {
        card: String,
    },
    /// 攻击链需要新目标；魔弹链的目标自动选取，`target` 被忽略。
    Redirect {
        card: String,
        #[serde(default)]
        target: Option<String>,
    },
    Draw,
    Discard {
        card: String,
    },
    Weakness {
        draw: bool,
    },
    Buy,
    Synthesize,
    Refine,
}

impl Action {
    pub fn card_mut(&mut self) -> Option<&mut String> {
        match self {
            Action::Attack { card, .. }
            | Action::Missile { card }
            | Action::Status { card, .. }
            | Action::Ward { card }
            | Action::Redirect { card, .. }
            | Action::Discard { card } => Some(card),
            _ => None,
        }
    }
}

/// 带发送者名字的指令。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Command {
    pub actor: String,
    #[serde(flatten)]
    pub action: Action,
}

impl Command {
    pub fn new(actor: impl Into<String>, action: Action) -> Self {
        Self {
            actor: actor.into(),
            action,
        }
    }

    /// 解析聊天文本，并把牌名规范为卡表中的写法。
    pub fn parse(actor: &str, text: &str, catalog: &Catalog) -> Result<Self, ParseCommandError> {
        let mut action: Action = text.parse()?;
        if let Some(card) = action.card_mut() {
            if let Some(canonical) = catalog.canonical_name(card) {
                *card = canonical.to_string();
            }
        }
        Ok(Self::new(actor.trim(), action))
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseCommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown verb `{0}`")]
    UnknownVerb(String),
    #[error("`{verb}` needs a card name")]
    MissingCard { verb: String },
    #[error("expected accept or skip, got `{0}`")]
    BadChoice(String),
}

/// 文本格式：`动词 [牌名...] [@目标]`，例如 `attack Fire Slash @bob`。
impl FromStr for Action {
    type Err = ParseCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let (verb, rest) = match text.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (text, ""),
        };
        if verb.is_empty() {
            return Err(ParseCommandError::Empty);
        }
        let verb = verb.to_ascii_lowercase();

        let (words, target) = match rest.split_once('@') {
            Some((card, target)) => (card.trim(), Some(target.trim().to_string())),
            None => (rest, None),
        };
        let target = target.filter(|name| !name.is_empty());
        let card = || {
            if words.is_empty() {
                Err(ParseCommandError::MissingCard { verb: verb.clone() })
            } else {
                Ok(words.split_whitespace().collect::<Vec<_>>().join(" "))
            }
        };

        let action = match verb.as_str() {
            "join" | "sit" => Action::Join,
            "start" => Action::Start,
            "reset" => Action::Reset,
            "attack" | "atk" => Action::Attack {
                card: card()?,
                target,
            },
            "missile" => Action::Missile { card: card()? },
            "status" | "play" | "cast" => Action::Status {
                card: card()?,
                target,
            },
            "endure" | "take" => Action::Endure,
            "ward" | "block" => Action::Ward { card: card()? },
            "redirect" | "counter" | "pass" => Action::Redirect {
                card: card()?,
                target,
            },
            "draw" => Action::Draw,
            "discard" => Action::Discard { card: card()? },
            "weakness" => match rest.to_ascii_lowercase().as_str() {
                "accept" | "draw" | "yes" => Action::Weakness { draw: true },
                "skip" | "decline" | "no" => Action::Weakness { draw: false },
                other => return Err(ParseCommandError::BadChoice(other.to_string())),
            },
            "accept" => Action::Weakness { draw: true },
            "skip" => Action::Weakness { draw: false },
            "buy" | "purchase" => Action::Buy,
            "synthesize" | "synth" => Action::Synthesize,
            "refine" => Action::Refine,
            _ => return Err(ParseCommandError::UnknownVerb(verb.clone())),
        };
        Ok(action)
    }
}
