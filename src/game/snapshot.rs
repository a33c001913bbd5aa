use serde::Serialize;

use super::{
    chain::{Chain, ChainKind},
    catalog::Element,
    state::{GameState, GemColor, Phase, PlayerId, TeamId, VictoryState},
};

/// 每位玩家都能看到的公开信息。
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SeatView {
    pub id: PlayerId,
    pub name: String,
    pub team: TeamId,
    pub hand_size: usize,
    pub shielded: bool,
    pub poisoned: bool,
    pub weakened: bool,
    pub heal: u32,
    pub reserve: Vec<GemColor>,
}

/// 观察者自己的私有信息。
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PrivateView {
    pub id: PlayerId,
    pub hand: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TeamView {
    pub id: TeamId,
    pub morale: u32,
    pub gems: Vec<GemColor>,
    pub grails: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChainView {
    pub kind: ChainKind,
    pub source: String,
    pub target: String,
    pub card: String,
    pub element: Element,
    pub damage: u32,
    pub hops: u32,
}

/// 某位观察者视角下的对局快照。只读，不修改状态。
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MatchSnapshot {
    pub phase: Phase,
    pub turn_player: Option<String>,
    /// 当前需要做出决定的玩家。
    pub awaiting: Option<String>,
    pub pending_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer: Option<PrivateView>,
    pub seats: Vec<SeatView>,
    pub teams: Vec<TeamView>,
    pub chain: Option<ChainView>,
    pub draw_pile: usize,
    pub discard_pile: usize,
    pub outcome: Option<VictoryState>,
}

impl MatchSnapshot {
    pub fn for_viewer(state: &GameState, viewer: Option<&str>) -> Self {
        let name_of = |id: PlayerId| state.player_name(id).map(str::to_string);
        let chain_view = |chain: &Chain| ChainView {
            kind: chain.kind,
            source: name_of(chain.source).unwrap_or_default(),
            target: name_of(chain.target).unwrap_or_default(),
            card: chain.card.clone(),
            element: chain.element,
            damage: chain.damage,
            hops: chain.hops,
        };

        let viewer = viewer
            .and_then(|name| state.player_by_name(name))
            .and_then(|id| state.get_player(id))
            .map(|player| PrivateView {
                id: player.id,
                hand: player.hand.clone(),
            });

        Self {
            phase: state.phase,
            turn_player: match state.phase {
                Phase::Waiting => None,
                _ => state.current_player().and_then(name_of),
            },
            awaiting: state.entitled_actor().and_then(name_of),
            pending_count: state.pending_count,
            viewer,
            seats: state
                .players
                .iter()
                .map(|player| SeatView {
                    id: player.id,
                    name: player.name.clone(),
                    team: player.team,
                    hand_size: player.hand.len(),
                    shielded: player.shield > 0,
                    poisoned: player.poisoned,
                    weakened: player.weakened,
                    heal: player.heal,
                    reserve: player.reserve.clone(),
                })
                .collect(),
            teams: state
                .teams
                .iter()
                .map(|team| TeamView {
                    id: team.id,
                    morale: team.morale,
                    gems: team.gems.clone(),
                    grails: team.grails,
                })
                .collect(),
            chain: state.open_chain().map(chain_view),
            draw_pile: state.deck.draw_pile.len(),
            discard_pile: state.deck.discard_pile.len(),
            outcome: state.outcome.clone(),
        }
    }
}
