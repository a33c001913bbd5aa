use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 卡牌类别。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CardCategory {
    Attack,
    Ward,
    Missile,
    Shield,
    Poison,
    Weakness,
}

impl CardCategory {
    pub fn is_status(self) -> bool {
        matches!(
            self,
            CardCategory::Shield | CardCategory::Poison | CardCategory::Weakness
        )
    }
}

/// 卡牌元素。`Neutral` 在数据中写作 `none`。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    Fire,
    Water,
    Wind,
    Earth,
    Thunder,
    Dark,
    Light,
    #[serde(rename = "none", alias = "neutral")]
    Neutral,
}

/// 静态卡牌定义，按名称查找。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardDefinition {
    pub name: String,
    pub category: CardCategory,
    #[serde(default = "default_element")]
    pub element: Element,
    #[serde(default)]
    pub base_damage: u32,
    pub supply: u32,
}

fn default_element() -> Element {
    Element::Neutral
}

impl CardDefinition {
    pub fn new(
        name: impl Into<String>,
        category: CardCategory,
        element: Element,
        base_damage: u32,
        supply: u32,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            element,
            base_damage,
            supply,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("card catalog is empty")]
    Empty,
    #[error("duplicate card name `{name}`")]
    DuplicateName { name: String },
    #[error("card `{name}` has zero supply")]
    ZeroSupply { name: String },
    #[error("card `{name}` has an empty name")]
    BlankName { name: String },
    #[error("malformed catalog: {0}")]
    Malformed(String),
}

/// 只读卡表。一局比赛重置时加载一次。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    cards: Vec<CardDefinition>,
    by_name: HashMap<String, usize>,
}

static DEFAULT_CATALOG: Lazy<Arc<Catalog>> = Lazy::new(|| {
    use CardCategory::*;
    use Element::*;

    let mut cards = Vec::new();
    for (name, element) in [
        ("Fire Slash", Fire),
        ("Water Slash", Water),
        ("Wind Slash", Wind),
        ("Earth Slash", Earth),
        ("Thunder Slash", Thunder),
    ] {
        cards.push(CardDefinition::new(name, Attack, element, 2, 10));
    }
    cards.push(CardDefinition::new("Dark Strike", Attack, Dark, 2, 6));
    cards.push(CardDefinition::new("Holy Light", Ward, Light, 0, 10));
    cards.push(CardDefinition::new("Magic Missile", Missile, Neutral, 0, 8));
    cards.push(CardDefinition::new("Holy Shield", Shield, Light, 0, 8));
    cards.push(CardDefinition::new("Poison", Poison, Neutral, 0, 6));
    cards.push(CardDefinition::new("Weakness", Weakness, Neutral, 0, 6));

    Arc::new(Catalog::indexed(cards))
});

impl Catalog {
    pub fn new(cards: Vec<CardDefinition>) -> Result<Self, CatalogError> {
        if cards.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut by_name = HashMap::with_capacity(cards.len());
        for (index, card) in cards.iter().enumerate() {
            if card.name.trim().is_empty() {
                return Err(CatalogError::BlankName {
                    name: card.name.clone(),
                });
            }
            if card.supply == 0 {
                return Err(CatalogError::ZeroSupply {
                    name: card.name.clone(),
                });
            }
            if by_name.insert(card.name.clone(), index).is_some() {
                return Err(CatalogError::DuplicateName {
                    name: card.name.clone(),
                });
            }
        }

        Ok(Self { cards, by_name })
    }

    fn indexed(cards: Vec<CardDefinition>) -> Self {
        let by_name = cards
            .iter()
            .enumerate()
            .map(|(index, card)| (card.name.clone(), index))
            .collect();
        Self { cards, by_name }
    }

    /// 内置默认卡表。
    pub fn standard() -> Arc<Catalog> {
        Arc::clone(&DEFAULT_CATALOG)
    }

    /// 从 JSON 数组加载自定义卡表；`None` 时退回内置卡表。
    pub fn from_json(json: Option<&str>) -> Result<Arc<Catalog>, CatalogError> {
        match json {
            None => Ok(Self::standard()),
            Some(text) => {
                let cards: Vec<CardDefinition> = serde_json::from_str(text)
                    .map_err(|err| CatalogError::Malformed(err.to_string()))?;
                Ok(Arc::new(Self::new(cards)?))
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&CardDefinition> {
        self.by_name.get(name).map(|&index| &self.cards[index])
    }

    pub fn cards(&self) -> &[CardDefinition] {
        &self.cards
    }

    pub fn total_supply(&self) -> usize {
        self.cards.iter().map(|card| card.supply as usize).sum()
    }

    /// 名称大小写不敏感的匹配，供文本指令解析使用。
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        let wanted = name.trim();
        self.cards
            .iter()
            .find(|card| card.name.eq_ignore_ascii_case(wanted))
            .map(|card| card.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_has_every_category() {
        let catalog = Catalog::standard();
        for category in [
            CardCategory::Attack,
            CardCategory::Ward,
            CardCategory::Missile,
            CardCategory::Shield,
            CardCategory::Poison,
            CardCategory::Weakness,
        ] {
            assert!(
                catalog.cards().iter().any(|card| card.category == category),
                "missing {category:?}"
            );
        }
        assert_eq!(catalog.total_supply(), 94);
        assert!(Catalog::new(catalog.cards().to_vec()).is_ok());
        assert_eq!(
            catalog.get("Dark Strike").map(|card| card.element),
            Some(Element::Dark)
        );
    }

    #[test]
    fn duplicate_names_are_refused() {
        let cards = vec![
            CardDefinition::new("Ember", CardCategory::Attack, Element::Fire, 2, 3),
            CardDefinition::new("Ember", CardCategory::Attack, Element::Water, 2, 3),
        ];
        assert_eq!(
            Catalog::new(cards),
            Err(CatalogError::DuplicateName {
                name: "Ember".into()
            })
        );
    }

    #[test]
    fn zero_supply_is_refused() {
        let cards = vec![CardDefinition::new(
            "Ember",
            CardCategory::Attack,
            Element::Fire,
            2,
            0,
        )];
        assert!(matches!(
            Catalog::new(cards),
            Err(CatalogError::ZeroSupply { .. })
        ));
    }

    #[test]
    fn json_catalog_defaults_element_to_none() {
        let json = r#"[
            {"name": "Ember", "category": "attack", "element": "fire", "base_damage": 3, "supply": 4},
            {"name": "Bolt", "category": "missile", "supply": 2}
        ]"#;
        let catalog = Catalog::from_json(Some(json)).expect("catalog should load");
        assert_eq!(catalog.total_supply(), 6);
        assert_eq!(catalog.get("Bolt").map(|card| card.element), Some(Element::Neutral));
        assert_eq!(catalog.canonical_name("ember"), Some("Ember"));
        assert!(matches!(
            Catalog::from_json(Some("{not json")),
            Err(CatalogError::Malformed(_))
        ));
    }
}
