/// Occupancy layer: who is in a cell.
///
/// ## Architecture
///
/// The board has no terrain. Walls are entities like everything else, so
/// a single query answers both "can I enter" and "what would I hit".
/// `CellQuery` is the read-only seam between the rules (`domain::rules`)
/// and the backing store (`sim::registry::Registry`).
///
/// ## Classification
///
/// Normally a cell holds at most one entity. A tick can end with two
/// entities stacked (a dragged block moves onto the player's cell and the
/// player's own move is then rejected). `obstruction_at` therefore ranks
/// occupants and reports the most restrictive one:
///
///   wall > clingy > pushable > sticky > player > none

use super::entity::{Entity, EntityId, Kind};
use super::grid::{Bounds, GridPos};

/// What occupies a cell, from the point of view of a mover.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Obstruction {
    None,
    Wall,
    Clingy(EntityId),
    Pushable(EntityId),
    Sticky(EntityId),
    Player(EntityId),
}

impl Obstruction {
    /// Empty, or only the player (who is about to step away).
    pub fn is_clear_or_player(self) -> bool {
        matches!(self, Obstruction::None | Obstruction::Player(_))
    }

    fn rank(self) -> u8 {
        match self {
            Obstruction::None        => 0,
            Obstruction::Player(_)   => 1,
            Obstruction::Sticky(_)   => 2,
            Obstruction::Pushable(_) => 3,
            Obstruction::Clingy(_)   => 4,
            Obstruction::Wall        => 5,
        }
    }

    fn of(e: &Entity) -> Obstruction {
        match e.kind {
            Kind::Wall     => Obstruction::Wall,
            Kind::Clingy   => Obstruction::Clingy(e.id),
            Kind::Pushable => Obstruction::Pushable(e.id),
            Kind::Sticky   => Obstruction::Sticky(e.id),
            Kind::Player   => Obstruction::Player(e.id),
        }
    }
}

/// Read-only view of the board used by every movement rule.
pub trait CellQuery {
    fn bounds(&self) -> Bounds;

    /// Every entity at `pos`, in registration order.
    fn entities_at(&self, pos: GridPos) -> Vec<&Entity>;

    fn get(&self, id: EntityId) -> Option<&Entity>;

    /// First entity at `pos`, optionally restricted to one kind.
    /// Without a filter any kind matches.
    fn entity_at(&self, pos: GridPos, filter: Option<Kind>) -> Option<&Entity> {
        self.entities_at(pos)
            .into_iter()
            .find(|e| filter.map_or(true, |k| e.kind == k))
    }

    fn is_player_at(&self, pos: GridPos) -> bool {
        self.entity_at(pos, Some(Kind::Player)).is_some()
    }

    /// Most restrictive occupant of `pos` (see module docs for ranking).
    fn obstruction_at(&self, pos: GridPos) -> Obstruction {
        self.entities_at(pos)
            .into_iter()
            .map(Obstruction::of)
            .max_by_key(|o| o.rank())
            .unwrap_or(Obstruction::None)
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
