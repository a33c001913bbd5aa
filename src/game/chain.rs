use log::debug;
use serde::{Deserialize, Serialize};

use super::{
    catalog::{CardCategory, CardDefinition, Element},
    economy::DamageKind,
    rules::{RuleEngine, RuleError},
    state::{GameEvent, GameState, Phase, PlayerId, ResumeTarget},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChainKind {
    Attack,
    Missile,
}

/// 飞行中的攻击或魔弹。每次转移更新来源、目标与元素。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chain {
    pub kind: ChainKind,
    pub source: PlayerId,
    pub target: PlayerId,
    pub card: String,
    pub element: Element,
    pub damage: u32,
    /// 已被转移的次数，0 表示仍是原攻击者的直接攻击。
    #[serde(default)]
    pub hops: u32,
}

impl Chain {
    pub fn attack(source: PlayerId, target: PlayerId, card: &CardDefinition) -> Self {
        Self {
            kind: ChainKind::Attack,
            source,
            target,
            card: card.name.clone(),
            element: card.element,
            damage: card.base_damage,
            hops: 0,
        }
    }

    pub fn missile(source: PlayerId, target: PlayerId, card: &str, damage: u32) -> Self {
        Self {
            kind: ChainKind::Missile,
            source,
            target,
            card: card.into(),
            element: Element::Neutral,
            damage,
            hops: 0,
        }
    }

    pub fn damage_kind(&self) -> DamageKind {
        if self.hops > 0 {
            DamageKind::Redirected
        } else {
            DamageKind::Direct
        }
    }
}

/// 应战的元素规则：同系或暗系可以转移；暗灭攻击不可转移。
/// 圣光抵挡不经过这里。
pub fn check_redirect(chain: Element, response: Element) -> Result<(), RuleError> {
    if chain == Element::Dark {
        return Err(RuleError::DarkAttackUnblockable);
    }
    if response == chain || response == Element::Dark {
        Ok(())
    } else {
        Err(RuleError::ElementMismatch { chain, response })
    }
}

impl RuleEngine {
    pub(crate) fn open_attack(
        &self,
        state: &mut GameState,
        actor: PlayerId,
        card: &str,
        target: PlayerId,
    ) -> Result<(), RuleError> {
        let definition = Self::require_card(state, actor, card, CardCategory::Attack)?;
        if !state.are_opponents(actor, target) {
            return Err(RuleError::FriendlyFire {
                target: state.player_name(target).unwrap_or_default().into(),
            });
        }

        state.spend_card(actor, card);
        let chain = Chain::attack(actor, target, &definition);
        state.record_event(GameEvent::AttackDeclared {
            source: actor,
            target,
            card: chain.card.clone(),
            element: chain.element,
            damage: chain.damage,
        });
        debug!("seat {actor} attacks seat {target} with {card}");
        state.attack_chain = Some(chain);
        state.phase = Phase::Resolving;
        Ok(())
    }

    pub(crate) fn open_missile(
        &self,
        state: &mut GameState,
        actor: PlayerId,
        card: &str,
    ) -> Result<(), RuleError> {
        Self::require_card(state, actor, card, CardCategory::Missile)?;
        let target = state
            .next_opponent_in_order(actor, None)
            .ok_or(RuleError::NoMissileTarget)?;

        state.spend_card(actor, card);
        let damage = state.config.missile_base_damage;
        let chain = Chain::missile(actor, target, card, damage);
        state.record_event(GameEvent::MissileLaunched {
            source: actor,
            target,
            card: card.into(),
            damage,
        });
        state.missile_chain = Some(chain);
        state.phase = Phase::ResolvingMissile;
        Ok(())
    }

    /// 承受：有圣盾则抵消，否则结算伤害。
    pub(crate) fn endure(&self, state: &mut GameState, actor: PlayerId) -> Result<(), RuleError> {
        let chain = state
            .open_chain()
            .cloned()
            .ok_or(RuleError::WrongPhase { phase: state.phase })?;
        state.clear_chains();

        let shielded = state
            .get_player(actor)
            .is_some_and(|player| player.shield > 0);
        if shielded {
            if let Some(player) = state.get_player_mut(actor) {
                player.shield = 0;
            }
            state.record_event(GameEvent::ShieldAbsorbed { player_id: actor });
            Self::begin_cleanup(state, actor, 0, ResumeTarget::NextTurn);
            return Ok(());
        }

        Self::resolve_damage(
            state,
            actor,
            chain.damage,
            chain.damage_kind(),
            ResumeTarget::NextTurn,
        );
        Ok(())
    }

    pub(crate) fn ward(
        &self,
        state: &mut GameState,
        actor: PlayerId,
        card: &str,
    ) -> Result<(), RuleError> {
        if state.open_chain().is_none() {
            return Err(RuleError::WrongPhase { phase: state.phase });
        }
        Self::require_card(state, actor, card, CardCategory::Ward)?;

        state.spend_card(actor, card);
        state.clear_chains();
        state.record_event(GameEvent::ChainWarded {
            player_id: actor,
            card: card.into(),
        });
        Self::begin_cleanup(state, actor, 0, ResumeTarget::NextTurn);
        Ok(())
    }

    /// 应战转移。攻击需指定新目标；魔弹自动传给下一位敌方并增加伤害。
    pub(crate) fn redirect(
        &self,
        state: &mut GameState,
        actor: PlayerId,
        card: &str,
        target: Option<PlayerId>,
    ) -> Result<(), RuleError> {
        let mut chain = state
            .open_chain()
            .cloned()
            .ok_or(RuleError::WrongPhase { phase: state.phase })?;

        match chain.kind {
            ChainKind::Attack => {
                let definition = Self::require_card(state, actor, card, CardCategory::Attack)?;
                check_redirect(chain.element, definition.element)?;
                let target = target.ok_or(RuleError::MissingTarget)?;
                if target == actor {
                    return Err(RuleError::SelfTarget);
                }
                if target == chain.source {
                    return Err(RuleError::ReflectionForbidden {
                        target: state.player_name(target).unwrap_or_default().into(),
                    });
                }
                if definition.element == Element::Dark {
                    chain.element = Element::Dark;
                }
                chain.target = target;
            }
            ChainKind::Missile => {
                Self::require_card(state, actor, card, CardCategory::Missile)?;
                chain.target = state
                    .next_opponent_in_order(actor, Some(chain.source))
                    .ok_or(RuleError::NoMissileTarget)?;
                chain.damage = chain.damage.saturating_add(state.config.missile_increment);
            }
        }

        state.spend_card(actor, card);
        chain.source = actor;
        chain.card = card.into();
        chain.hops += 1;
        state.record_event(GameEvent::ChainRedirected {
            kind: chain.kind,
            from: actor,
            to: chain.target,
            card: chain.card.clone(),
            element: chain.element,
            damage: chain.damage,
        });
        debug!("{:?} chain moves to seat {}", chain.kind, chain.target);
        match chain.kind {
            ChainKind::Attack => state.attack_chain = Some(chain),
            ChainKind::Missile => state.missile_chain = Some(chain),
        }
        Ok(())
    }

    /// 圣盾、中毒、虚弱：立即生效并结束出牌者的回合。
    pub(crate) fn play_status(
        &self,
        state: &mut GameState,
        actor: PlayerId,
        card: &str,
        target: PlayerId,
    ) -> Result<(), RuleError> {
        let definition = Self::require_held(state, actor, card)?;
        let status = definition.category;
        if !status.is_status() {
            return Err(RuleError::NotStatusCard { card: card.into() });
        }

        let target_name: String = state.player_name(target).unwrap_or_default().into();
        let Some(victim) = state.get_player(target) else {
            return Err(RuleError::UnknownPlayer { name: target_name });
        };
        match status {
            CardCategory::Shield if victim.shield > 0 => {
                return Err(RuleError::ShieldAlreadyActive {
                    target: target_name,
                });
            }
            CardCategory::Poison | CardCategory::Weakness => {
                if !state.are_opponents(actor, target) {
                    return Err(RuleError::FriendlyFire {
                        target: target_name,
                    });
                }
                let already = match status {
                    CardCategory::Poison => victim.poisoned,
                    _ => victim.weakened,
                };
                if already {
                    return Err(RuleError::StatusAlreadyActive {
                        target: target_name,
                        status,
                    });
                }
            }
            _ => {}
        }

        state.spend_card(actor, card);
        if let Some(victim) = state.get_player_mut(target) {
            match status {
                CardCategory::Shield => victim.shield = 1,
                CardCategory::Poison => victim.poisoned = true,
                _ => victim.weakened = true,
            }
        }
        state.record_event(GameEvent::StatusApplied {
            source: actor,
            target,
            status,
        });
        Self::begin_cleanup(state, actor, 0, ResumeTarget::NextTurn);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::command::Action;
    use crate::game::rules::tests::{give, run, started_match};
    use crate::game::rules::Outcome;
    use crate::game::state::{GemColor, TeamId};

    const ELEMENTS: [Element; 8] = [
        Element::Fire,
        Element::Water,
        Element::Wind,
        Element::Earth,
        Element::Thunder,
        Element::Dark,
        Element::Light,
        Element::Neutral,
    ];

    fn attack(card: &str, target: &str) -> Action {
        Action::Attack {
            card: card.into(),
            target: Some(target.into()),
        }
    }

    fn redirect(card: &str, target: &str) -> Action {
        Action::Redirect {
            card: card.into(),
            target: Some(target.into()),
        }
    }

    fn rejected(error: RuleError) -> Outcome {
        Outcome::Rejected { error }
    }

    #[test]
    fn redirect_legality_table() {
        for chain in ELEMENTS {
            for response in ELEMENTS {
                let accepted = check_redirect(chain, response).is_ok();
                let expected =
                    chain != Element::Dark && (response == chain || response == Element::Dark);
                assert_eq!(accepted, expected, "{chain:?} answered by {response:?}");
            }
        }
        assert_eq!(
            check_redirect(Element::Dark, Element::Dark),
            Err(RuleError::DarkAttackUnblockable)
        );
        assert_eq!(
            check_redirect(Element::Fire, Element::Water),
            Err(RuleError::ElementMismatch {
                chain: Element::Fire,
                response: Element::Water
            })
        );
    }

    #[test]
    fn fire_chain_turns_dark_and_lands_as_blue_gem() {
        let (_, mut state) = started_match();
        give(&mut state, 0, "Fire Slash");
        give(&mut state, 0, "Fire Slash");
        give(&mut state, 0, "Dark Strike");
        give(&mut state, 1, "Fire Slash");
        give(&mut state, 3, "Dark Strike");

        assert!(run(&mut state, "alice", attack("Fire Slash", "bob")).is_applied());
        assert_eq!(state.phase, Phase::Resolving);
        assert!(run(&mut state, "bob", redirect("Fire Slash", "dave")).is_applied());
        assert!(run(&mut state, "dave", redirect("Dark Strike", "alice")).is_applied());

        let chain = state.attack_chain.clone().expect("chain should be open");
        assert_eq!(chain.element, Element::Dark);
        assert_eq!(chain.source, 3);
        assert_eq!(chain.target, 0);
        assert_eq!(chain.hops, 2);

        assert_eq!(
            run(&mut state, "alice", redirect("Fire Slash", "bob")),
            rejected(RuleError::DarkAttackUnblockable)
        );
        assert_eq!(
            run(&mut state, "alice", redirect("Dark Strike", "bob")),
            rejected(RuleError::DarkAttackUnblockable)
        );
        assert_eq!(state.players[0].hand.len(), 2);

        assert!(run(&mut state, "alice", Action::Endure).is_applied());
        assert_eq!(state.phase, Phase::Drawing);
        assert_eq!(state.active_player, Some(0));
        assert_eq!(state.pending_count, 2);
        assert_eq!(state.team(TeamId::Blue).gems, vec![GemColor::Blue]);
        assert!(state.team(TeamId::Red).gems.is_empty());

        assert!(run(&mut state, "alice", Action::Draw).is_applied());
        assert!(run(&mut state, "alice", Action::Draw).is_applied());
        assert_eq!(state.players[0].hand.len(), 4);
        assert_eq!(state.phase, Phase::Action);
        assert_eq!(state.current_player(), Some(1));
        assert_eq!(state.cards_in_play(), state.catalog.total_supply());
    }

    #[test]
    fn ward_cancels_a_dark_attack() {
        let (_, mut state) = started_match();
        give(&mut state, 0, "Dark Strike");
        give(&mut state, 1, "Holy Light");

        assert!(run(&mut state, "alice", attack("Dark Strike", "bob")).is_applied());
        let outcome = run(
            &mut state,
            "bob",
            Action::Ward {
                card: "Holy Light".into(),
            },
        );
        assert!(outcome.is_applied());
        assert!(state.attack_chain.is_none());
        assert!(state.players[1].hand.is_empty());
        assert_eq!(state.current_player(), Some(1));
        assert_eq!(state.phase, Phase::Action);
        assert!(state.teams.iter().all(|team| team.gems.is_empty()));
    }

    #[test]
    fn direct_hit_awards_red_gem_to_attackers() {
        let (_, mut state) = started_match();
        give(&mut state, 0, "Water Slash");

        run(&mut state, "alice", attack("Water Slash", "bob"));
        run(&mut state, "bob", Action::Endure);

        assert_eq!(state.team(TeamId::Red).gems, vec![GemColor::Red]);
        assert_eq!(state.active_player, Some(1));
        assert_eq!(state.pending_count, 2);
    }

    #[test]
    fn no_reflection_but_longer_loops_are_legal() {
        let (_, mut state) = started_match();
        give(&mut state, 0, "Wind Slash");
        give(&mut state, 1, "Wind Slash");
        give(&mut state, 2, "Wind Slash");

        run(&mut state, "alice", attack("Wind Slash", "bob"));
        assert_eq!(
            run(&mut state, "bob", redirect("Wind Slash", "alice")),
            rejected(RuleError::ReflectionForbidden {
                target: "alice".into()
            })
        );
        assert_eq!(
            run(&mut state, "bob", redirect("Wind Slash", "bob")),
            rejected(RuleError::SelfTarget)
        );
        assert!(run(&mut state, "bob", redirect("Wind Slash", "carol")).is_applied());
        assert!(run(&mut state, "carol", redirect("Wind Slash", "alice")).is_applied());
        assert_eq!(state.attack_chain.as_ref().map(|chain| chain.target), Some(0));
    }

    #[test]
    fn mismatched_element_leaves_chain_untouched() {
        let (_, mut state) = started_match();
        give(&mut state, 0, "Fire Slash");
        give(&mut state, 1, "Water Slash");
        give(&mut state, 1, "Holy Light");

        run(&mut state, "alice", attack("Fire Slash", "bob"));
        let before = state.attack_chain.clone();
        assert_eq!(
            run(&mut state, "bob", redirect("Water Slash", "dave")),
            rejected(RuleError::ElementMismatch {
                chain: Element::Fire,
                response: Element::Water
            })
        );
        assert_eq!(
            run(&mut state, "bob", redirect("Holy Light", "dave")),
            rejected(RuleError::WrongCardKind {
                card: "Holy Light".into(),
                expected: CardCategory::Attack
            })
        );
        assert_eq!(state.attack_chain, before);
        assert_eq!(state.players[1].hand.len(), 2);
        assert_eq!(
            run(&mut state, "bob", Action::Redirect { card: "Water Slash".into(), target: None }),
            Outcome::Ignored
        );
    }

    #[test]
    fn friendly_fire_is_surfaced_and_card_kept() {
        let (_, mut state) = started_match();
        give(&mut state, 0, "Earth Slash");
        assert_eq!(
            run(&mut state, "alice", attack("Earth Slash", "carol")),
            rejected(RuleError::FriendlyFire {
                target: "carol".into()
            })
        );
        assert_eq!(
            run(&mut state, "alice", attack("Thunder Slash", "bob")),
            rejected(RuleError::CardNotInHand {
                card: "Thunder Slash".into()
            })
        );
        assert_eq!(
            run(&mut state, "alice", Action::Attack { card: "Earth Slash".into(), target: None }),
            Outcome::Ignored
        );
        assert_eq!(state.players[0].hand, vec!["Earth Slash".to_string()]);
        assert_eq!(state.phase, Phase::Action);
    }

    #[test]
    fn shield_blocks_attack_when_enduring() {
        let (_, mut state) = started_match();
        give(&mut state, 0, "Thunder Slash");
        state.players[1].shield = 1;

        run(&mut state, "alice", attack("Thunder Slash", "bob"));
        assert_eq!(state.players[1].shield, 1);
        run(&mut state, "bob", Action::Endure);

        assert_eq!(state.players[1].shield, 0);
        assert!(state.players[1].hand.is_empty());
        assert!(state.teams.iter().all(|team| team.gems.is_empty()));
        assert_eq!(state.current_player(), Some(1));
    }

    #[test]
    fn missile_grows_and_travels_around_the_table() {
        let (_, mut state) = started_match();
        for seat in 0..4 {
            give(&mut state, seat, "Magic Missile");
        }
        let missile = |card: &str| Action::Missile { card: card.into() };
        let pass = || Action::Redirect {
            card: "Magic Missile".into(),
            target: None,
        };

        assert!(run(&mut state, "alice", missile("Magic Missile")).is_applied());
        assert_eq!(state.phase, Phase::ResolvingMissile);
        let chain = state.missile_chain.clone().expect("missile in flight");
        assert_eq!((chain.target, chain.damage), (1, 2));

        assert!(run(&mut state, "bob", pass()).is_applied());
        assert!(run(&mut state, "carol", pass()).is_applied());
        assert!(run(&mut state, "dave", pass()).is_applied());
        let chain = state.missile_chain.clone().expect("missile in flight");
        assert_eq!((chain.source, chain.target, chain.damage), (3, 0, 5));

        assert_eq!(
            run(&mut state, "alice", pass()),
            rejected(RuleError::CardNotInHand {
                card: "Magic Missile".into()
            })
        );
        assert!(run(&mut state, "alice", Action::Endure).is_applied());
        assert_eq!(state.pending_count, 5);
        assert_eq!(state.team(TeamId::Blue).gems, vec![GemColor::Blue]);
    }

    #[test]
    fn missile_skips_the_sender_when_seats_are_grouped() {
        let (_, mut state) = started_match();
        state.turn_order = vec![0, 2, 1, 3];
        give(&mut state, 0, "Magic Missile");
        give(&mut state, 1, "Magic Missile");

        run(&mut state, "alice", Action::Missile { card: "Magic Missile".into() });
        assert_eq!(state.missile_chain.as_ref().map(|chain| chain.target), Some(1));
        run(
            &mut state,
            "bob",
            Action::Redirect {
                card: "Magic Missile".into(),
                target: Some("alice".into()),
            },
        );
        let chain = state.missile_chain.clone().expect("missile in flight");
        assert_eq!(chain.target, 2);
        assert_eq!(chain.damage, 3);
    }

    #[test]
    fn missile_damage_saturates() {
        let (_, mut state) = started_match();
        state.config.missile_increment = u32::MAX;
        give(&mut state, 0, "Magic Missile");
        give(&mut state, 1, "Magic Missile");

        run(&mut state, "alice", Action::Missile { card: "Magic Missile".into() });
        let outcome = run(
            &mut state,
            "bob",
            Action::Redirect {
                card: "Magic Missile".into(),
                target: None,
            },
        );
        assert!(outcome.is_applied());
        assert_eq!(state.missile_chain.as_ref().map(|chain| chain.damage), Some(u32::MAX));
    }

    #[test]
    fn shield_stops_missile() {
        let (_, mut state) = started_match();
        give(&mut state, 0, "Magic Missile");
        state.players[1].shield = 1;
        run(&mut state, "alice", Action::Missile { card: "Magic Missile".into() });
        run(&mut state, "bob", Action::Endure);
        assert_eq!(state.players[1].shield, 0);
        assert_eq!(state.phase, Phase::Action);
        assert_eq!(state.current_player(), Some(1));
    }

    #[test]
    fn status_cards_resolve_immediately_and_end_turn() {
        let (_, mut state) = started_match();
        give(&mut state, 0, "Poison");
        give(&mut state, 0, "Weakness");
        give(&mut state, 0, "Holy Shield");
        give(&mut state, 0, "Fire Slash");

        let status = |card: &str, target: &str| Action::Status {
            card: card.into(),
            target: Some(target.into()),
        };

        assert_eq!(
            run(&mut state, "alice", status("Poison", "carol")),
            rejected(RuleError::FriendlyFire {
                target: "carol".into()
            })
        );
        assert_eq!(
            run(&mut state, "alice", status("Fire Slash", "bob")),
            rejected(RuleError::NotStatusCard {
                card: "Fire Slash".into()
            })
        );
        state.players[2].shield = 1;
        assert_eq!(
            run(&mut state, "alice", status("Holy Shield", "carol")),
            rejected(RuleError::ShieldAlreadyActive {
                target: "carol".into()
            })
        );
        assert_eq!(state.players[0].hand.len(), 4);

        assert!(run(&mut state, "alice", status("Poison", "dave")).is_applied());
        assert!(state.players[3].poisoned);
        assert_eq!(state.players[0].hand.len(), 3);
        assert_eq!(state.current_player(), Some(1));
        assert_eq!(state.deck.discard_pile, vec!["Poison".to_string()]);
    }

    #[test]
    fn shield_may_protect_self() {
        let (_, mut state) = started_match();
        give(&mut state, 0, "Holy Shield");
        let outcome = run(
            &mut state,
            "alice",
            Action::Status {
                card: "Holy Shield".into(),
                target: Some("alice".into()),
            },
        );
        assert!(outcome.is_applied());
        assert_eq!(state.players[0].shield, 1);
    }
}
