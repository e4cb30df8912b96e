/// Events emitted during a movement tick.
/// The presentation layer consumes these for sound; the log gets them
/// verbatim at trace level.

use std::fmt;

use crate::domain::entity::EntityId;
use crate::domain::grid::GridPos;
use crate::domain::rules::MoveOutcome;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    PlayerMoved { from: GridPos, to: GridPos },
    PlayerBlocked { at: GridPos, outcome: MoveOutcome },
    BlockPushed { id: EntityId, to: GridPos },
    StickyMoved { id: EntityId, to: GridPos },
    StickyBlocked { id: EntityId, outcome: MoveOutcome },
    ClingyMoved { id: EntityId, to: GridPos },
    ClingyBlocked { id: EntityId, outcome: MoveOutcome },
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameEvent::PlayerMoved { from, to } => write!(f, "player {from} -> {to}"),
            GameEvent::PlayerBlocked { at, outcome } => write!(f, "player at {at}: {outcome}"),
            GameEvent::BlockPushed { id, to } => write!(f, "block #{} pushed to {to}", id.0),
            GameEvent::StickyMoved { id, to } => write!(f, "sticky #{} moved to {to}", id.0),
            GameEvent::StickyBlocked { id, outcome } => write!(f, "sticky #{}: {outcome}", id.0),
            GameEvent::ClingyMoved { id, to } => write!(f, "clingy #{} moved to {to}", id.0),
            GameEvent::ClingyBlocked { id, outcome } => write!(f, "clingy #{}: {outcome}", id.0),
        }
    }
}
