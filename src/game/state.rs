use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::catalog::{CardCategory, Catalog, Element};
use super::chain::{Chain, ChainKind};
use super::config::{MatchConfig, SEATS};
use super::deck::Deck;

/// 座位号，按加入顺序分配。
pub type PlayerId = u8;

/// 队伍。偶数座位为红队，奇数座位为蓝队。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TeamId {
    Red,
    Blue,
}

impl TeamId {
    pub fn for_seat(seat: PlayerId) -> Self {
        if seat % 2 == 0 {
            TeamId::Red
        } else {
            TeamId::Blue
        }
    }

    pub fn index(self) -> usize {
        match self {
            TeamId::Red => 0,
            TeamId::Blue => 1,
        }
    }

    pub fn opponent(self) -> Self {
        match self {
            TeamId::Red => TeamId::Blue,
            TeamId::Blue => TeamId::Red,
        }
    }
}

/// 宝石颜色：直接命中得红，经过转移后命中得蓝。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GemColor {
    Red,
    Blue,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub team: TeamId,
    #[serde(default)]
    pub hand: Vec<String>,
    #[serde(default)]
    pub shield: u8,
    #[serde(default)]
    pub poisoned: bool,
    #[serde(default)]
    pub weakened: bool,
    #[serde(default)]
    pub heal: u32,
    /// 个人能量区，由提炼获得。
    #[serde(default)]
    pub reserve: Vec<GemColor>,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            team: TeamId::for_seat(id),
            hand: Vec::new(),
            shield: 0,
            poisoned: false,
            weakened: false,
            heal: 0,
            reserve: Vec::new(),
        }
    }

    pub fn holds(&self, card: &str) -> bool {
        self.hand.iter().any(|held| held == card)
    }

    pub fn remove_card(&mut self, card: &str) -> Option<String> {
        let pos = self.hand.iter().position(|held| held == card)?;
        Some(self.hand.remove(pos))
    }

    fn clear_for_match(&mut self) {
        self.hand.clear();
        self.shield = 0;
        self.poisoned = false;
        self.weakened = false;
        self.heal = 0;
        self.reserve.clear();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Team {
    pub id: TeamId,
    pub morale: u32,
    #[serde(default)]
    pub gems: Vec<GemColor>,
    #[serde(default)]
    pub grails: u32,
}

impl Team {
    pub fn new(id: TeamId, morale: u32) -> Self {
        Self {
            id,
            morale,
            gems: Vec::new(),
            grails: 0,
        }
    }

    /// 宝石池满时静默丢弃，返回是否真的加入。
    pub fn add_gem(&mut self, color: GemColor, cap: usize) -> bool {
        if self.gems.len() >= cap {
            return false;
        }
        self.gems.push(color);
        true
    }

    /// 取出最早获得的 `count` 颗宝石。
    pub fn take_oldest(&mut self, count: usize) -> Vec<GemColor> {
        let count = count.min(self.gems.len());
        self.gems.drain(..count).collect()
    }

    pub fn lose_morale(&mut self, amount: u32) -> u32 {
        self.morale = self.morale.saturating_sub(amount);
        self.morale
    }
}

/// 对局阶段。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Waiting,
    Action,
    Resolving,
    ResolvingMissile,
    Drawing,
    Discarding,
    ChoosingWeakness,
    Finished,
}

/// 整理阶段结束后回到哪里。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ResumeTarget {
    /// 继续当前玩家自己的回合（中毒、虚弱摸牌之后）。
    OwnTurn,
    #[default]
    NextTurn,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum VictoryReason {
    GrailTarget { grails: u32 },
    MoraleDepleted { loser: TeamId },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VictoryState {
    pub winner: TeamId,
    pub reason: VictoryReason,
}

/// 游戏事件流。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    PlayerJoined {
        player_id: PlayerId,
        name: String,
        team: TeamId,
    },
    MatchStarted {
        turn_order: Vec<PlayerId>,
    },
    MatchReset,
    TurnStarted {
        player_id: PlayerId,
    },
    TurnEnded {
        player_id: PlayerId,
    },
    PoisonTriggered {
        player_id: PlayerId,
    },
    AttackDeclared {
        source: PlayerId,
        target: PlayerId,
        card: String,
        element: Element,
        damage: u32,
    },
    MissileLaunched {
        source: PlayerId,
        target: PlayerId,
        card: String,
        damage: u32,
    },
    ChainRedirected {
        kind: ChainKind,
        from: PlayerId,
        to: PlayerId,
        card: String,
        element: Element,
        damage: u32,
    },
    ChainWarded {
        player_id: PlayerId,
        card: String,
    },
    ShieldAbsorbed {
        player_id: PlayerId,
    },
    DamageResolved {
        target: PlayerId,
        raw: u32,
        healed: u32,
        amount: u32,
        redirected: bool,
    },
    GemAwarded {
        team: TeamId,
        color: GemColor,
    },
    DrawRequired {
        player_id: PlayerId,
        count: u32,
    },
    CardDrawn {
        player_id: PlayerId,
        card: String,
    },
    DeckReshuffled {
        cards: usize,
    },
    DiscardRequired {
        player_id: PlayerId,
        excess: usize,
    },
    CardDiscarded {
        player_id: PlayerId,
        card: String,
    },
    MoraleLost {
        team: TeamId,
        amount: u32,
        morale: u32,
    },
    StatusApplied {
        source: PlayerId,
        target: PlayerId,
        status: CardCategory,
    },
    WeaknessResolved {
        player_id: PlayerId,
        accepted: bool,
    },
    Purchased {
        player_id: PlayerId,
    },
    Synthesized {
        player_id: PlayerId,
        team: TeamId,
        grails: u32,
    },
    Refined {
        player_id: PlayerId,
        gems: Vec<GemColor>,
    },
    GameWon {
        winner: TeamId,
        reason: VictoryReason,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IntegrityError {
    CardCountMismatch { expected: usize, actual: usize },
    UnknownCard { card: String },
    ShieldOverflow { player_id: PlayerId, charges: u8 },
    GemOverflow { team: TeamId, gems: usize },
    ReserveOverflow { player_id: PlayerId, gems: usize },
    InvalidTurnOrder { seats: usize },
}

/// 整局比赛的唯一可变聚合。所有修改都经由 `RuleEngine` 完成。
#[derive(Debug, Clone)]
pub struct GameState {
    pub config: MatchConfig,
    pub catalog: Arc<Catalog>,
    pub players: Vec<Player>,
    pub teams: [Team; 2],
    pub deck: Deck,
    pub turn_order: Vec<PlayerId>,
    pub current_turn_index: usize,
    pub phase: Phase,
    pub attack_chain: Option<Chain>,
    pub missile_chain: Option<Chain>,
    /// 摸牌、弃牌或虚弱选择的当事人。
    pub active_player: Option<PlayerId>,
    pub pending_count: u32,
    pub resume_target: ResumeTarget,
    /// 当前指令产生、尚未取走的事件。
    pub pending_events: Vec<GameEvent>,
    pub outcome: Option<VictoryState>,
    pub(crate) rng: SmallRng,
}

impl GameState {
    pub fn new(config: MatchConfig, catalog: Arc<Catalog>) -> Self {
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let morale = config.starting_morale;
        Self {
            config,
            catalog,
            players: Vec::with_capacity(SEATS),
            teams: [Team::new(TeamId::Red, morale), Team::new(TeamId::Blue, morale)],
            deck: Deck::default(),
            turn_order: Vec::with_capacity(SEATS),
            current_turn_index: 0,
            phase: Phase::Waiting,
            attack_chain: None,
            missile_chain: None,
            active_player: None,
            pending_count: 0,
            resume_target: ResumeTarget::NextTurn,
            pending_events: Vec::new(),
            outcome: None,
            rng,
        }
    }

    pub fn record_event(&mut self, event: GameEvent) {
        self.pending_events.push(event);
    }

    /// 取走并清空待发事件。
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id as usize)
    }

    pub fn get_player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id as usize)
    }

    pub fn player_by_name(&self, name: &str) -> Option<PlayerId> {
        let wanted = name.trim();
        self.players
            .iter()
            .find(|player| player.name == wanted)
            .map(|player| player.id)
    }

    pub fn player_name(&self, id: PlayerId) -> Option<&str> {
        self.get_player(id).map(|player| player.name.as_str())
    }

    pub fn team(&self, id: TeamId) -> &Team {
        &self.teams[id.index()]
    }

    pub fn team_mut(&mut self, id: TeamId) -> &mut Team {
        &mut self.teams[id.index()]
    }

    pub fn team_of(&self, id: PlayerId) -> Option<TeamId> {
        self.get_player(id).map(|player| player.team)
    }

    pub fn are_opponents(&self, a: PlayerId, b: PlayerId) -> bool {
        match (self.team_of(a), self.team_of(b)) {
            (Some(left), Some(right)) => left != right,
            _ => false,
        }
    }

    pub fn hand_len(&self, id: PlayerId) -> usize {
        self.get_player(id).map_or(0, |player| player.hand.len())
    }

    pub fn current_player(&self) -> Option<PlayerId> {
        self.turn_order.get(self.current_turn_index).copied()
    }

    /// 当前唯一有权行动的玩家。
    pub fn entitled_actor(&self) -> Option<PlayerId> {
        match self.phase {
            Phase::Action => self.current_player(),
            Phase::Resolving | Phase::ResolvingMissile => self.open_chain().map(|chain| chain.target),
            Phase::Drawing | Phase::Discarding | Phase::ChoosingWeakness => self.active_player,
            Phase::Waiting | Phase::Finished => None,
        }
    }

    /// 与当前阶段对应的未结链。
    pub fn open_chain(&self) -> Option<&Chain> {
        match self.phase {
            Phase::Resolving => self.attack_chain.as_ref(),
            Phase::ResolvingMissile => self.missile_chain.as_ref(),
            _ => None,
        }
    }

    pub fn clear_chains(&mut self) {
        self.attack_chain = None;
        self.missile_chain = None;
    }

    /// 沿行动顺序从 `from` 之后寻找第一个敌方玩家，跳过 `exclude`。
    pub fn next_opponent_in_order(
        &self,
        from: PlayerId,
        exclude: Option<PlayerId>,
    ) -> Option<PlayerId> {
        let len = self.turn_order.len();
        let start = self.turn_order.iter().position(|&seat| seat == from)?;
        (1..len)
            .map(|offset| self.turn_order[(start + offset) % len])
            .find(|&candidate| self.are_opponents(from, candidate) && Some(candidate) != exclude)
    }

    /// 从牌库抽一张进入手牌。牌库与弃牌堆皆空时不做任何修改。
    pub fn draw_into_hand(&mut self, id: PlayerId) -> Option<String> {
        let index = id as usize;
        if index >= self.players.len() {
            return None;
        }
        let recycled = self.deck.discard_pile.len();
        let drawn = self.deck.draw(&mut self.rng)?;
        if drawn.reshuffled {
            self.record_event(GameEvent::DeckReshuffled { cards: recycled });
        }
        self.players[index].hand.push(drawn.name.clone());
        self.record_event(GameEvent::CardDrawn {
            player_id: id,
            card: drawn.name.clone(),
        });
        Some(drawn.name)
    }

    /// 从手牌移出一张放入弃牌堆。
    pub fn spend_card(&mut self, id: PlayerId, card: &str) -> Option<String> {
        let removed = self.get_player_mut(id)?.remove_card(card)?;
        self.deck.discard(removed.clone());
        Some(removed)
    }

    pub fn declare_victory(&mut self, winner: TeamId, reason: VictoryReason) -> VictoryState {
        let victory = VictoryState { winner, reason };
        if self.outcome.is_none() {
            self.record_event(GameEvent::GameWon {
                winner: victory.winner,
                reason: victory.reason.clone(),
            });
            self.outcome = Some(victory.clone());
            self.phase = Phase::Finished;
            self.active_player = None;
            self.pending_count = 0;
            self.clear_chains();
        }
        victory
    }

    /// 回到等待阶段，保留座位。
    pub fn reset_for_lobby(&mut self) {
        for player in &mut self.players {
            player.clear_for_match();
        }
        let morale = self.config.starting_morale;
        self.teams = [Team::new(TeamId::Red, morale), Team::new(TeamId::Blue, morale)];
        self.deck = Deck::default();
        self.turn_order.clear();
        self.current_turn_index = 0;
        self.phase = Phase::Waiting;
        self.clear_chains();
        self.active_player = None;
        self.pending_count = 0;
        self.resume_target = ResumeTarget::NextTurn;
        self.outcome = None;
    }

    pub fn cards_in_play(&self) -> usize {
        self.deck.available()
            + self
                .players
                .iter()
                .map(|player| player.hand.len())
                .sum::<usize>()
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        if self.phase == Phase::Waiting {
            return Ok(());
        }

        if self.turn_order.len() != SEATS || self.current_turn_index >= self.turn_order.len() {
            return Err(IntegrityError::InvalidTurnOrder {
                seats: self.turn_order.len(),
            });
        }

        let expected = self.catalog.total_supply();
        let actual = self.cards_in_play();
        if expected != actual {
            return Err(IntegrityError::CardCountMismatch { expected, actual });
        }

        let every_card = self
            .deck
            .draw_pile
            .iter()
            .chain(self.deck.discard_pile.iter())
            .chain(self.players.iter().flat_map(|player| player.hand.iter()));
        for card in every_card {
            if self.catalog.get(card).is_none() {
                return Err(IntegrityError::UnknownCard { card: card.clone() });
            }
        }

        for player in &self.players {
            if player.shield > 1 {
                return Err(IntegrityError::ShieldOverflow {
                    player_id: player.id,
                    charges: player.shield,
                });
            }
            if player.reserve.len() > self.config.reserve_cap {
                return Err(IntegrityError::ReserveOverflow {
                    player_id: player.id,
                    gems: player.reserve.len(),
                });
            }
        }

        for team in &self.teams {
            if team.gems.len() > self.config.gem_cap {
                return Err(IntegrityError::GemOverflow {
                    team: team.id,
                    gems: team.gems.len(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seated_state() -> GameState {
        let mut state = GameState::new(MatchConfig::seeded(3), Catalog::standard());
        for (seat, name) in ["alice", "bob", "carol", "dave"].iter().enumerate() {
            state.players.push(Player::new(seat as PlayerId, *name));
        }
        state
    }

    #[test]
    fn seats_alternate_teams() {
        let state = seated_state();
        assert_eq!(state.team_of(0), Some(TeamId::Red));
        assert_eq!(state.team_of(1), Some(TeamId::Blue));
        assert_eq!(state.team_of(2), Some(TeamId::Red));
        assert!(state.are_opponents(0, 3));
        assert!(!state.are_opponents(1, 3));
        assert_eq!(state.player_by_name(" carol "), Some(2));
    }

    #[test]
    fn team_gem_pool_is_capped_silently() {
        let mut team = Team::new(TeamId::Red, 15);
        for _ in 0..7 {
            team.add_gem(GemColor::Red, 5);
        }
        assert_eq!(team.gems.len(), 5);
        assert!(!team.add_gem(GemColor::Blue, 5));
        assert_eq!(team.take_oldest(3).len(), 3);
        assert_eq!(team.lose_morale(40), 0);
    }

    #[test]
    fn next_opponent_wraps_and_skips_excluded() {
        let mut state = seated_state();
        state.turn_order = vec![0, 2, 1, 3];
        assert_eq!(state.next_opponent_in_order(0, None), Some(1));
        assert_eq!(state.next_opponent_in_order(1, None), Some(0));
        assert_eq!(state.next_opponent_in_order(1, Some(0)), Some(2));
        assert_eq!(state.next_opponent_in_order(3, Some(0)), Some(2));
    }

    #[test]
    fn integrity_detects_lost_cards() {
        let mut state = seated_state();
        state.turn_order = vec![0, 1, 2, 3];
        state.phase = Phase::Action;
        state.deck = Deck::build(&state.catalog, &mut state.rng);
        assert_eq!(state.integrity_check(), Ok(()));

        state.deck.draw_pile.pop();
        assert!(matches!(
            state.integrity_check(),
            Err(IntegrityError::CardCountMismatch { .. })
        ));
    }

    #[test]
    fn exhausted_deck_leaves_hand_untouched() {
        let mut state = seated_state();
        assert!(state.draw_into_hand(0).is_none());
        assert!(state.players[0].hand.is_empty());
        assert!(state.pending_events.is_empty());
    }
}
