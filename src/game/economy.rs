use log::info;

use super::{
    rules::{RuleEngine, RuleError},
    state::{GameEvent, GameState, GemColor, PlayerId, ResumeTarget, TeamId, VictoryReason},
};

/// 伤害来源：直接命中或经过至少一次转移。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageKind {
    Direct,
    Redirected,
}

impl DamageKind {
    pub fn gem(self) -> GemColor {
        match self {
            DamageKind::Direct => GemColor::Red,
            DamageKind::Redirected => GemColor::Blue,
        }
    }
}

impl RuleEngine {
    /// 结算伤害：先用治疗抵消，再给对方队伍记一颗宝石，然后进入整理阶段。
    pub(crate) fn resolve_damage(
        state: &mut GameState,
        target: PlayerId,
        raw: u32,
        kind: DamageKind,
        resume: ResumeTarget,
    ) {
        let Some(player) = state.get_player_mut(target) else {
            return;
        };
        let healed = raw.min(player.heal);
        player.heal -= healed;
        let team = player.team;
        let amount = raw - healed;

        state.record_event(GameEvent::DamageResolved {
            target,
            raw,
            healed,
            amount,
            redirected: kind == DamageKind::Redirected,
        });

        if amount > 0 {
            Self::award_gem(state, team.opponent(), kind.gem());
        }
        Self::begin_cleanup(state, target, amount, resume);
    }

    fn award_gem(state: &mut GameState, team: TeamId, color: GemColor) {
        let cap = state.config.gem_cap;
        if state.team_mut(team).add_gem(color, cap) {
            state.record_event(GameEvent::GemAwarded { team, color });
        }
    }

    /// 购买：红蓝宝石各一颗（满则丢弃），摸牌后结束回合。
    pub(crate) fn buy(&self, state: &mut GameState, actor: PlayerId) -> Result<(), RuleError> {
        let draws = state.config.purchase_draw;
        Self::ensure_hand_room(state, actor, draws)?;
        Self::ensure_deck_can_supply(state, draws)?;
        let team = state
            .team_of(actor)
            .ok_or_else(|| RuleError::UnknownPlayer {
                name: actor.to_string(),
            })?;

        state.record_event(GameEvent::Purchased { player_id: actor });
        Self::award_gem(state, team, GemColor::Red);
        Self::award_gem(state, team, GemColor::Blue);
        Self::begin_cleanup(state, actor, draws, ResumeTarget::NextTurn);
        Ok(())
    }

    /// 合成：消耗最早的宝石换取星杯，对方士气减一。获胜时立即结束比赛。
    pub(crate) fn synthesize(
        &self,
        state: &mut GameState,
        actor: PlayerId,
    ) -> Result<(), RuleError> {
        let team = state
            .team_of(actor)
            .ok_or_else(|| RuleError::UnknownPlayer {
                name: actor.to_string(),
            })?;
        let required = state.config.synthesis_cost;
        let available = state.team(team).gems.len();
        if available < required {
            return Err(RuleError::InsufficientGems {
                required,
                available,
            });
        }
        let draws = state.config.synthesis_draw;
        Self::ensure_hand_room(state, actor, draws)?;
        Self::ensure_deck_can_supply(state, draws)?;

        let grails = {
            let own = state.team_mut(team);
            own.take_oldest(required);
            own.grails += 1;
            own.grails
        };
        state.record_event(GameEvent::Synthesized {
            player_id: actor,
            team,
            grails,
        });
        let rival = team.opponent();
        let morale = state.team_mut(rival).lose_morale(1);
        state.record_event(GameEvent::MoraleLost {
            team: rival,
            amount: 1,
            morale,
        });
        info!("{team:?} team forged grail {grails}, {rival:?} morale {morale}");

        if Self::check_victory(state) {
            return Ok(());
        }
        Self::begin_cleanup(state, actor, draws, ResumeTarget::NextTurn);
        Ok(())
    }

    /// 提炼：把队伍最早的宝石移入个人能量区，受能量区上限约束。
    pub(crate) fn refine(&self, state: &mut GameState, actor: PlayerId) -> Result<(), RuleError> {
        let Some(player) = state.get_player(actor) else {
            return Err(RuleError::UnknownPlayer {
                name: actor.to_string(),
            });
        };
        let team = player.team;
        let room = state.config.reserve_cap.saturating_sub(player.reserve.len());
        let amount = state
            .config
            .refine_amount
            .min(state.team(team).gems.len())
            .min(room);
        if amount == 0 {
            return Err(RuleError::NothingToRefine);
        }

        let gems = state.team_mut(team).take_oldest(amount);
        if let Some(player) = state.get_player_mut(actor) {
            player.reserve.extend(gems.iter().copied());
        }
        state.record_event(GameEvent::Refined {
            player_id: actor,
            gems,
        });
        Self::begin_cleanup(state, actor, 0, ResumeTarget::NextTurn);
        Ok(())
    }

    /// 星杯达标或士气归零即分出胜负。返回比赛是否已结束。
    pub(crate) fn check_victory(state: &mut GameState) -> bool {
        if state.is_finished() {
            return true;
        }

        let target = state.config.grail_target;
        for id in [TeamId::Red, TeamId::Blue] {
            let grails = state.team(id).grails;
            if grails >= target {
                let victory = state.declare_victory(id, VictoryReason::GrailTarget { grails });
                info!("{:?} team wins: {:?}", victory.winner, victory.reason);
                return true;
            }
        }
        for id in [TeamId::Red, TeamId::Blue] {
            if state.team(id).morale == 0 {
                let victory =
                    state.declare_victory(id.opponent(), VictoryReason::MoraleDepleted { loser: id });
                info!("{:?} team wins: {:?}", victory.winner, victory.reason);
                return true;
            }
        }
        false
    }
}
