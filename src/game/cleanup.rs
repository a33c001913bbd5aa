use log::debug;

use super::{
    rules::{RuleEngine, RuleError},
    state::{GameEvent, GameState, Phase, PlayerId, ResumeTarget},
};

impl RuleEngine {
    /// 进入整理阶段：先手动摸 `draws` 张，再检查手牌上限。
    pub(crate) fn begin_cleanup(
        state: &mut GameState,
        player: PlayerId,
        draws: u32,
        resume: ResumeTarget,
    ) {
        state.resume_target = resume;
        state.active_player = Some(player);
        if draws > 0 {
            state.phase = Phase::Drawing;
            state.pending_count = draws;
            state.record_event(GameEvent::DrawRequired {
                player_id: player,
                count: draws,
            });
            return;
        }
        Self::check_discard(state, player);
    }

    fn check_discard(state: &mut GameState, player: PlayerId) {
        let excess = state.hand_len(player).saturating_sub(state.config.hand_limit);
        if excess == 0 {
            Self::finish_cleanup(state);
            return;
        }
        state.phase = Phase::Discarding;
        state.active_player = Some(player);
        state.pending_count = excess as u32;
        state.record_event(GameEvent::DiscardRequired {
            player_id: player,
            excess,
        });
    }

    fn finish_cleanup(state: &mut GameState) {
        state.active_player = None;
        state.pending_count = 0;
        if Self::check_victory(state) {
            return;
        }
        match state.resume_target {
            ResumeTarget::OwnTurn => Self::enter_action_step(state),
            ResumeTarget::NextTurn => Self::advance_turn(state),
        }
    }

    /// 摸一张。牌库耗尽时拒绝并停在摸牌阶段。
    pub(crate) fn draw_one(&self, state: &mut GameState, actor: PlayerId) -> Result<(), RuleError> {
        state
            .draw_into_hand(actor)
            .ok_or(RuleError::DeckExhausted)?;
        state.pending_count = state.pending_count.saturating_sub(1);
        if state.pending_count == 0 {
            Self::check_discard(state, actor);
        }
        Ok(())
    }

    /// 弃一张超出上限的手牌，所在队伍士气减一。
    pub(crate) fn discard_one(
        &self,
        state: &mut GameState,
        actor: PlayerId,
        card: &str,
    ) -> Result<(), RuleError> {
        Self::require_held(state, actor, card)?;
        let team = state
            .team_of(actor)
            .ok_or_else(|| RuleError::UnknownPlayer {
                name: actor.to_string(),
            })?;

        state.spend_card(actor, card);
        state.record_event(GameEvent::CardDiscarded {
            player_id: actor,
            card: card.into(),
        });
        let morale = state.team_mut(team).lose_morale(1);
        state.record_event(GameEvent::MoraleLost {
            team,
            amount: 1,
            morale,
        });
        debug!("seat {actor} discarded {card}, {team:?} morale {morale}");

        let excess = state.hand_len(actor).saturating_sub(state.config.hand_limit);
        if excess == 0 {
            Self::finish_cleanup(state);
        } else {
            state.pending_count = excess as u32;
        }
        Ok(())
    }

    /// 虚弱的选择：接受则摸牌后继续本回合，放弃则跳过本回合。
    pub(crate) fn choose_weakness(
        &self,
        state: &mut GameState,
        actor: PlayerId,
        draw: bool,
    ) -> Result<(), RuleError> {
        let draws = state.config.weakness_draw;
        if draw {
            Self::ensure_deck_can_supply(state, draws)?;
        }

        if let Some(player) = state.get_player_mut(actor) {
            player.weakened = false;
        }
        state.record_event(GameEvent::WeaknessResolved {
            player_id: actor,
            accepted: draw,
        });

        if draw {
            Self::begin_cleanup(state, actor, draws, ResumeTarget::OwnTurn);
        } else {
            Self::advance_turn(state);
        }
        Ok(())
    }
}
