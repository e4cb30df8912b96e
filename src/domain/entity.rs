/// Grid entities. Every object on the board is one `Entity` with a
/// closed `Kind`; kind semantics are queried via methods so the rules
/// never compare free-form labels.

use super::grid::GridPos;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Kind {
    Player,
    Wall,
    Pushable, // "smooth" block: shoved one cell by an adjacent mover
    Sticky,   // dragged along by an adjacent player
    Clingy,   // follows the player, never leaves it on its trailing side
}

impl Kind {
    /// Can a push move this entity? Clingy blocks only move on their own.
    pub fn is_pushable(self) -> bool {
        matches!(self, Kind::Pushable)
    }

    /// Canonical level-file glyph.
    pub fn glyph(self) -> char {
        match self {
            Kind::Player   => '@',
            Kind::Wall     => '#',
            Kind::Pushable => 'o',
            Kind::Sticky   => 'S',
            Kind::Clingy   => 'C',
        }
    }

    /// Parse a level-file glyph. `None` for empty cells and unknown glyphs;
    /// use `is_empty_glyph` to tell them apart.
    pub fn from_glyph(ch: char) -> Option<Kind> {
        match ch {
            '@' | 'P' => Some(Kind::Player),
            '#'       => Some(Kind::Wall),
            'o' | '$' => Some(Kind::Pushable),
            'S' | 's' => Some(Kind::Sticky),
            'C' | 'c' => Some(Kind::Clingy),
            _ => None,
        }
    }

    pub fn is_empty_glyph(ch: char) -> bool {
        matches!(ch, ' ' | '.' | '_')
    }

    pub fn name(self) -> &'static str {
        match self {
            Kind::Player   => "player",
            Kind::Wall     => "wall",
            Kind::Pushable => "pushable",
            Kind::Sticky   => "sticky",
            Kind::Clingy   => "clingy",
        }
    }
}

/// Stable handle into the registry. Entities are never created or
/// destroyed by movement, so ids stay valid for the whole level.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct EntityId(pub usize);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entity {
    pub id: EntityId,
    pub kind: Kind,
    pub pos: GridPos,
}
