use rand::seq::SliceRandom;
use rand::Rng;

use super::catalog::Catalog;

/// 一次抽牌的结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawnCard {
    pub name: String,
    /// 抽牌前弃牌堆被洗回了牌库。
    pub reshuffled: bool,
}

/// 牌库与弃牌堆。手牌之外的所有牌都在这里。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deck {
    pub draw_pile: Vec<String>,
    pub discard_pile: Vec<String>,
}

impl Deck {
    pub fn build<R: Rng + ?Sized>(catalog: &Catalog, rng: &mut R) -> Self {
        let mut draw_pile = Vec::with_capacity(catalog.total_supply());
        for card in catalog.cards() {
            for _ in 0..card.supply {
                draw_pile.push(card.name.clone());
            }
        }
        draw_pile.shuffle(rng);
        Self {
            draw_pile,
            discard_pile: Vec::new(),
        }
    }

    /// 可供抽取的牌数（含待洗回的弃牌）。
    pub fn available(&self) -> usize {
        self.draw_pile.len() + self.discard_pile.len()
    }

    /// 从牌库顶抽一张；牌库空时先洗入弃牌堆。两者皆空时返回 `None`，
    /// 不会凭空补牌。
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<DrawnCard> {
        let mut reshuffled = false;
        if self.draw_pile.is_empty() {
            if self.discard_pile.is_empty() {
                return None;
            }
            self.draw_pile.append(&mut self.discard_pile);
            self.draw_pile.shuffle(rng);
            reshuffled = true;
        }
        let name = self.draw_pile.pop()?;
        Some(DrawnCard { name, reshuffled })
    }

    pub fn discard(&mut self, name: impl Into<String>) {
        self.discard_pile.push(name.into());
    }

    /// 从牌堆中取出指定的一张（先牌库后弃牌堆），测试布局用。
    #[cfg(test)]
    pub(crate) fn take(&mut self, name: &str) -> Option<String> {
        if let Some(pos) = self.draw_pile.iter().position(|card| card == name) {
            return Some(self.draw_pile.remove(pos));
        }
        let pos = self.discard_pile.iter().position(|card| card == name)?;
        Some(self.discard_pile.remove(pos))
    }
}
