/// Grid position registry: the authoritative entity -> cell mapping.
///
/// Entities live in a `Vec` indexed by `EntityId`. A per-cell index
/// (`cells`) mirrors their positions so "who is at (x, y)" does not scan.
/// All position changes go through `set_position()`, which keeps the
/// index in sync.
///
/// A cell may transiently list more than one id (see
/// `domain::occupancy`). `overlapping_cells()` reports those.

use std::collections::HashMap;

use crate::domain::entity::{Entity, EntityId, Kind};
use crate::domain::grid::{Bounds, GridPos};
use crate::domain::occupancy::CellQuery;

#[derive(Clone, Debug, Default)]
pub struct Registry {
    bounds: Bounds,
    entities: Vec<Entity>,
    cells: HashMap<GridPos, Vec<EntityId>>,
    player: Option<EntityId>,
}

impl Registry {
    pub fn new(bounds: Bounds) -> Self {
        Registry {
            bounds,
            entities: Vec::new(),
            cells: HashMap::new(),
            player: None,
        }
    }

    /// Register a new entity. The first `Player` registered becomes the
    /// controlled player.
    pub fn spawn(&mut self, kind: Kind, pos: GridPos) -> EntityId {
        let id = EntityId(self.entities.len());
        self.entities.push(Entity { id, kind, pos });
        self.cells.entry(pos).or_default().push(id);
        if kind == Kind::Player && self.player.is_none() {
            self.player = Some(id);
        }
        id
    }

    pub fn position(&self, id: EntityId) -> Option<GridPos> {
        self.entities.get(id.0).map(|e| e.pos)
    }

    /// Move an entity. Returns false (no change) for an unknown id.
    pub fn set_position(&mut self, id: EntityId, pos: GridPos) -> bool {
        let Some(entity) = self.entities.get_mut(id.0) else {
            return false;
        };
        let old = entity.pos;
        if old == pos {
            return true;
        }
        entity.pos = pos;

        if let Some(ids) = self.cells.get_mut(&old) {
            ids.retain(|&other| other != id);
            if ids.is_empty() {
                self.cells.remove(&old);
            }
        }
        self.cells.entry(pos).or_default().push(id);
        true
    }

    pub fn player_id(&self) -> Option<EntityId> {
        self.player
    }

    pub fn player(&self) -> Option<&Entity> {
        self.player.and_then(|id| self.entities.get(id.0))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn of_kind(&self, kind: Kind) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.kind == kind)
    }

    /// Entities of `kind` orthogonally adjacent to `pos`, collected up
    /// front so callers can mutate the registry while walking them.
    pub fn adjacent_of_kind(&self, pos: GridPos, kind: Kind) -> Vec<EntityId> {
        pos.neighbours()
            .into_iter()
            .filter_map(|n| self.entity_at(n, Some(kind)).map(|e| e.id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Positions of every entity, indexed by id.
    #[cfg(test)]
    pub fn positions(&self) -> Vec<GridPos> {
        self.entities.iter().map(|e| e.pos).collect()
    }

    /// Cells currently shared by two or more entities, sorted row-major.
    pub fn overlapping_cells(&self) -> Vec<GridPos> {
        let mut shared: Vec<GridPos> = self.cells.iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(&pos, _)| pos)
            .collect();
        shared.sort_by_key(|p| (p.y, p.x));
        shared
    }

    /// Level-file rendering of the board. A stacked cell shows `*`.
    pub fn to_ascii(&self) -> String {
        let mut grid = vec![vec![' '; self.bounds.width.max(0) as usize]; self.bounds.height.max(0) as usize];
        for e in self.iter() {
            if !self.bounds.contains(e.pos) { continue; }
            let cell = &mut grid[(e.pos.y - 1) as usize][(e.pos.x - 1) as usize];
            *cell = if *cell == ' ' { e.kind.glyph() } else { '*' };
        }
        grid.into_iter()
            .map(|row| row.into_iter().collect::<String>().trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl CellQuery for Registry {
    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn entities_at(&self, pos: GridPos) -> Vec<&Entity> {
        match self.cells.get(&pos) {
            Some(ids) => ids.iter().filter_map(|id| self.entities.get(id.0)).collect(),
            None => Vec::new(),
        }
    }

    fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.0)
    }
}

/// Build a registry from a string diagram, one glyph per cell.
/// Legend: '@'=Player '#'=Wall 'o'=Pushable 'S'=Sticky 'C'=Clingy
///         ' ' / '.'=Empty. Top-left character is (1, 1).
#[cfg(test)]
pub fn board(rows: &[&str]) -> Registry {
    let height = rows.len() as i32;
    let width = rows.iter().map(|r| r.len()).max().unwrap_or(0) as i32;
    let mut reg = Registry::new(Bounds::new(width, height));
    for (y, row) in rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            if let Some(kind) = Kind::from_glyph(ch) {
                reg.spawn(kind, GridPos::new(x as i32 + 1, y as i32 + 1));
            }
        }
    }
    reg
}
