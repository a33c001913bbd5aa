use log::{debug, info, warn};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    catalog::{CardCategory, CardDefinition, Element},
    command::{Action, Command},
    config::SEATS,
    deck::Deck,
    economy::DamageKind,
    state::{GameEvent, GameState, IntegrityError, Phase, Player, PlayerId, ResumeTarget},
};

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RuleError {
    #[error("it is not {player}'s move")]
    NotEntitled { player: String },
    #[error("action not allowed during {phase:?}")]
    WrongPhase { phase: Phase },
    #[error("the match is over")]
    GameFinished,
    #[error("unknown player `{name}`")]
    UnknownPlayer { name: String },
    #[error("a target is required")]
    MissingTarget,
    #[error("`{name}` already has a seat")]
    AlreadySeated { name: String },
    #[error("all four seats are taken")]
    SeatsFull,
    #[error("four players are needed to start, {seated} seated")]
    NotEnoughPlayers { seated: usize },
    #[error("you do not hold `{card}`")]
    CardNotInHand { card: String },
    #[error("`{card}` cannot be used here, expected a {expected:?} card")]
    WrongCardKind {
        card: String,
        expected: CardCategory,
    },
    #[error("`{card}` is not a status card")]
    NotStatusCard { card: String },
    #[error("`{target}` is on your own team")]
    FriendlyFire { target: String },
    #[error("you cannot redirect to yourself")]
    SelfTarget,
    #[error("cannot send the attack straight back to `{target}`")]
    ReflectionForbidden { target: String },
    #[error("a dark attack can only be warded, shielded or endured")]
    DarkAttackUnblockable,
    #[error("a {response:?} card cannot redirect a {chain:?} attack")]
    ElementMismatch { chain: Element, response: Element },
    #[error("no opposing player can receive the missile")]
    NoMissileTarget,
    #[error("`{target}` already holds a shield")]
    ShieldAlreadyActive { target: String },
    #[error("`{target}` is already affected by {status:?}")]
    StatusAlreadyActive {
        target: String,
        status: CardCategory,
    },
    #[error("the deck and discard pile are exhausted")]
    DeckExhausted,
    #[error("hand would grow to {projected}, limit is {limit}")]
    HandLimitExceeded { projected: usize, limit: usize },
    #[error("{required} gems required, team holds {available}")]
    InsufficientGems { required: usize, available: usize },
    #[error("no gem can be refined")]
    NothingToRefine,
    #[error("match state is inconsistent: {error:?}")]
    IntegrityViolation { error: IntegrityError },
}

impl RuleError {
    /// 越权、越阶段或目标查找失败的指令静默丢弃，不回报给发送者。
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            RuleError::NotEntitled { .. }
                | RuleError::WrongPhase { .. }
                | RuleError::GameFinished
                | RuleError::UnknownPlayer { .. }
                | RuleError::MissingTarget
                | RuleError::AlreadySeated { .. }
        )
    }
}

/// 一条指令的处理结果。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Applied { events: Vec<GameEvent> },
    Ignored,
    Rejected { error: RuleError },
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied { .. })
    }

    pub fn events(&self) -> &[GameEvent] {
        match self {
            Outcome::Applied { events } => events,
            _ => &[],
        }
    }
}

/// 回合调度与指令分派。无内部状态，所有数据都在 `GameState` 中。
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn apply(&self, state: &mut GameState, command: Command) -> Outcome {
        let Command { actor, action } = command;
        match self.execute(state, &actor, action) {
            Ok(events) => Outcome::Applied { events },
            Err(error) if error.is_silent() => {
                debug!("ignored command from {actor}: {error}");
                Outcome::Ignored
            }
            Err(error) => {
                debug!("rejected command from {actor}: {error}");
                Outcome::Rejected { error }
            }
        }
    }

    /// 校验并执行一条指令，返回本次产生的事件。失败时状态不变。
    pub fn execute(
        &self,
        state: &mut GameState,
        actor: &str,
        action: Action,
    ) -> Result<Vec<GameEvent>, RuleError> {
        state.pending_events.clear();

        match action {
            Action::Join => self.join(state, actor)?,
            action => {
                let player = state
                    .player_by_name(actor)
                    .ok_or_else(|| RuleError::UnknownPlayer { name: actor.into() })?;
                match action {
                    Action::Start => self.start_match(state)?,
                    Action::Reset => match state.phase {
                        Phase::Waiting | Phase::Finished => self.reset(state),
                        phase => return Err(RuleError::WrongPhase { phase }),
                    },
                    action => {
                        if state.is_finished() {
                            return Err(RuleError::GameFinished);
                        }
                        Self::ensure_integrity(state)?;
                        Self::ensure_entitled(state, player)?;
                        self.dispatch(state, player, action)?;
                    }
                }
            }
        }

        Ok(state.take_events())
    }

    fn dispatch(
        &self,
        state: &mut GameState,
        player: PlayerId,
        action: Action,
    ) -> Result<(), RuleError> {
        match action {
            Action::Attack { card, target } => {
                Self::ensure_phase(state, Phase::Action)?;
                let target = Self::lookup_target(state, target.as_deref())?;
                self.open_attack(state, player, &card, target)
            }
            Action::Missile { card } => {
                Self::ensure_phase(state, Phase::Action)?;
                self.open_missile(state, player, &card)
            }
            Action::Status { card, target } => {
                Self::ensure_phase(state, Phase::Action)?;
                let target = Self::lookup_target(state, target.as_deref())?;
                self.play_status(state, player, &card, target)
            }
            Action::Endure => {
                Self::ensure_resolving(state)?;
                self.endure(state, player)
            }
            Action::Ward { card } => {
                Self::ensure_resolving(state)?;
                self.ward(state, player, &card)
            }
            Action::Redirect { card, target } => {
                Self::ensure_resolving(state)?;
                let target = match state.phase {
                    Phase::Resolving => Some(Self::lookup_target(state, target.as_deref())?),
                    _ => None,
                };
                self.redirect(state, player, &card, target)
            }
            Action::Draw => {
                Self::ensure_phase(state, Phase::Drawing)?;
                self.draw_one(state, player)
            }
            Action::Discard { card } => {
                Self::ensure_phase(state, Phase::Discarding)?;
                self.discard_one(state, player, &card)
            }
            Action::Weakness { draw } => {
                Self::ensure_phase(state, Phase::ChoosingWeakness)?;
                self.choose_weakness(state, player, draw)
            }
            Action::Buy => {
                Self::ensure_phase(state, Phase::Action)?;
                self.buy(state, player)
            }
            Action::Synthesize => {
                Self::ensure_phase(state, Phase::Action)?;
                self.synthesize(state, player)
            }
            Action::Refine => {
                Self::ensure_phase(state, Phase::Action)?;
                self.refine(state, player)
            }
            Action::Join | Action::Start | Action::Reset => Ok(()),
        }
    }

    fn ensure_phase(state: &GameState, expected: Phase) -> Result<(), RuleError> {
        if state.phase != expected {
            return Err(RuleError::WrongPhase { phase: state.phase });
        }
        Ok(())
    }

    fn ensure_resolving(state: &GameState) -> Result<(), RuleError> {
        match state.phase {
            Phase::Resolving | Phase::ResolvingMissile => Ok(()),
            phase => Err(RuleError::WrongPhase { phase }),
        }
    }

    fn ensure_entitled(state: &GameState, player: PlayerId) -> Result<(), RuleError> {
        if state.entitled_actor() != Some(player) {
            return Err(RuleError::NotEntitled {
                player: state.player_name(player).unwrap_or_default().to_string(),
            });
        }
        Ok(())
    }

    fn ensure_integrity(state: &GameState) -> Result<(), RuleError> {
        state.integrity_check().map_err(|error| {
            warn!("integrity check failed: {error:?}");
            RuleError::IntegrityViolation { error }
        })
    }

    fn lookup_target(state: &GameState, target: Option<&str>) -> Result<PlayerId, RuleError> {
        let name = target.ok_or(RuleError::MissingTarget)?;
        state
            .player_by_name(name)
            .ok_or_else(|| RuleError::UnknownPlayer { name: name.into() })
    }

    /// 确认玩家持有该牌，返回牌的定义。
    pub(crate) fn require_held(
        state: &GameState,
        player: PlayerId,
        card: &str,
    ) -> Result<CardDefinition, RuleError> {
        let held = state
            .get_player(player)
            .is_some_and(|holder| holder.holds(card));
        state
            .catalog
            .get(card)
            .filter(|_| held)
            .cloned()
            .ok_or_else(|| RuleError::CardNotInHand { card: card.into() })
    }

    pub(crate) fn require_card(
        state: &GameState,
        player: PlayerId,
        card: &str,
        expected: CardCategory,
    ) -> Result<CardDefinition, RuleError> {
        let definition = Self::require_held(state, player, card)?;
        if definition.category != expected {
            return Err(RuleError::WrongCardKind {
                card: card.into(),
                expected,
            });
        }
        Ok(definition)
    }

    pub(crate) fn ensure_deck_can_supply(state: &GameState, count: u32) -> Result<(), RuleError> {
        if state.deck.available() < count as usize {
            return Err(RuleError::DeckExhausted);
        }
        Ok(())
    }

    pub(crate) fn ensure_hand_room(
        state: &GameState,
        player: PlayerId,
        incoming: u32,
    ) -> Result<(), RuleError> {
        let projected = state.hand_len(player) + incoming as usize;
        let limit = state.config.hand_limit;
        if projected > limit {
            return Err(RuleError::HandLimitExceeded { projected, limit });
        }
        Ok(())
    }

    fn join(&self, state: &mut GameState, name: &str) -> Result<(), RuleError> {
        Self::ensure_phase(state, Phase::Waiting)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(RuleError::UnknownPlayer { name: name.into() });
        }
        if state.player_by_name(name).is_some() {
            return Err(RuleError::AlreadySeated { name: name.into() });
        }
        if state.players.len() >= SEATS {
            return Err(RuleError::SeatsFull);
        }

        let seat = state.players.len() as PlayerId;
        let player = Player::new(seat, name);
        let team = player.team;
        state.players.push(player);
        state.record_event(GameEvent::PlayerJoined {
            player_id: seat,
            name: name.into(),
            team,
        });
        info!("{name} joined seat {seat} on the {team:?} team");
        Ok(())
    }

    /// 洗出行动顺序、发起始手牌并进入第一个行动阶段。
    pub fn start_match(&self, state: &mut GameState) -> Result<(), RuleError> {
        Self::ensure_phase(state, Phase::Waiting)?;
        if state.players.len() != SEATS {
            return Err(RuleError::NotEnoughPlayers {
                seated: state.players.len(),
            });
        }
        if state.catalog.total_supply() < SEATS * state.config.opening_hand {
            return Err(RuleError::DeckExhausted);
        }

        state.reset_for_lobby();
        let mut order: Vec<PlayerId> = state.players.iter().map(|player| player.id).collect();
        order.shuffle(&mut state.rng);
        state.turn_order = order;
        state.deck = Deck::build(&state.catalog, &mut state.rng);

        for _ in 0..state.config.opening_hand {
            for seat in state.turn_order.clone() {
                if let Some(drawn) = state.deck.draw(&mut state.rng) {
                    if let Some(player) = state.get_player_mut(seat) {
                        player.hand.push(drawn.name);
                    }
                }
            }
        }

        state.record_event(GameEvent::MatchStarted {
            turn_order: state.turn_order.clone(),
        });
        info!("match started, turn order {:?}", state.turn_order);

        if let Some(first) = state.current_player() {
            state.record_event(GameEvent::TurnStarted { player_id: first });
        }
        Self::enter_action_step(state);
        Ok(())
    }

    /// 显式重置：回到等待阶段，保留座位。玩家只能在开局前或终局后发起，
    /// 进行中的比赛只能经由 `MatchServer::reset` 重置。
    pub fn reset(&self, state: &mut GameState) {
        state.reset_for_lobby();
        state.record_event(GameEvent::MatchReset);
        info!("match reset, {} seats kept", state.players.len());
    }

    /// 结束当前回合并把行动权交给下一位。
    pub(crate) fn advance_turn(state: &mut GameState) {
        if let Some(current) = state.current_player() {
            state.record_event(GameEvent::TurnEnded { player_id: current });
        }
        state.clear_chains();
        state.active_player = None;
        state.pending_count = 0;

        if state.turn_order.is_empty() {
            return;
        }
        state.current_turn_index = (state.current_turn_index + 1) % state.turn_order.len();
        let Some(next) = state.current_player() else {
            return;
        };
        state.record_event(GameEvent::TurnStarted { player_id: next });
        debug!("turn passes to seat {next}");

        let poisoned = state
            .get_player(next)
            .is_some_and(|player| player.poisoned);
        if poisoned {
            if let Some(player) = state.get_player_mut(next) {
                player.poisoned = false;
            }
            state.record_event(GameEvent::PoisonTriggered { player_id: next });
            let damage = state.config.poison_damage;
            Self::resolve_damage(
                state,
                next,
                damage,
                DamageKind::Direct,
                ResumeTarget::OwnTurn,
            );
            return;
        }

        Self::enter_action_step(state);
    }

    /// 回合开始的决策点：虚弱的玩家先做选择，否则进入行动阶段。
    pub(crate) fn enter_action_step(state: &mut GameState) {
        state.active_player = None;
        state.pending_count = 0;
        let Some(current) = state.current_player() else {
            return;
        };
        let weakened = state
            .get_player(current)
            .is_some_and(|player| player.weakened);
        if weakened {
            state.phase = Phase::ChoosingWeakness;
            state.active_player = Some(current);
        } else {
            state.phase = Phase::Action;
        }
    }
}
