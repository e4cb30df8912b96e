/// Movement rules, truth-table driven.
///
/// Pure functions over a `CellQuery`: they decide what a move WOULD do
/// and never mutate. `sim::step` applies the verdicts.
///
/// ## Push (a single block, one cell)
/// ┌──────────────────────────────┬──────────────────────┐
/// │ Condition (checked in order)  │ Result               │
/// ├──────────────────────────────┼──────────────────────┤
/// │ block unknown                 │ BlockedByOccupant    │
/// │ dest out of bounds            │ BlockedByBounds      │
/// │ dest holds a wall             │ BlockedByWall        │
/// │ dest holds anything else      │ BlockedByOccupant    │
/// │ block is clingy               │ BlockedByClingy      │
/// │ block is not a pushable       │ BlockedByOccupant    │
/// │ otherwise                     │ Step                 │
/// └──────────────────────────────┴──────────────────────┘
///
/// ## Sticky (adjacent to the player before the move)
/// ┌──────────────────────────────┬──────────────────────┐
/// │ dest out of bounds            │ BlockedByBounds      │
/// │ dest empty or player          │ Step                 │
/// │ dest pushable, push ok        │ PushThenStep         │
/// │ dest pushable, push rejected  │ push's reason        │
/// │ dest wall                     │ BlockedByWall        │
/// │ dest sticky / clingy          │ BlockedByOccupant    │
/// └──────────────────────────────┴──────────────────────┘
///
/// ## Clingy (adjacent to the player before the move)
/// ┌──────────────────────────────┬──────────────────────┐
/// │ dest out of bounds            │ BlockedByBounds      │
/// │ dest wall                     │ BlockedByWall        │
/// │ dest not empty and not player │ BlockedByOccupant    │
/// │ player on the trailing side   │ BlockedByClingyRule  │
/// │ otherwise                     │ Step                 │
/// └──────────────────────────────┴──────────────────────┘
///
/// ## Player
/// ┌──────────────────────────────┬──────────────────────┐
/// │ dest out of bounds            │ BlockedByBounds      │
/// │ dest wall                     │ BlockedByWall        │
/// │ dest clingy                   │ BlockedByClingy      │
/// │ dest empty                    │ Step                 │
/// │ dest pushable, push ok        │ PushThenStep         │
/// │ dest pushable, push rejected  │ push's reason        │
/// │ dest sticky / other player    │ BlockedByOccupant    │
/// └──────────────────────────────┴──────────────────────┘

use std::fmt;

use super::entity::{EntityId, Kind};
use super::grid::Direction;
use super::occupancy::{CellQuery, Obstruction};

/// Result of one entity's attempted move within a tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveOutcome {
    Moved,
    BlockedByBounds,
    BlockedByWall,
    /// The player tried to step into (or push) a clingy block.
    BlockedByClingy,
    BlockedByOccupant,
    /// A clingy refused to leave the player on its trailing side.
    BlockedByClingyRule,
}

impl MoveOutcome {
    pub fn is_moved(self) -> bool {
        self == MoveOutcome::Moved
    }

    pub fn describe(self) -> &'static str {
        match self {
            MoveOutcome::Moved               => "moved",
            MoveOutcome::BlockedByBounds     => "target position is out of bounds",
            MoveOutcome::BlockedByWall       => "movement blocked by a wall",
            MoveOutcome::BlockedByClingy     => "movement blocked by a clingy block",
            MoveOutcome::BlockedByOccupant   => "target cell is occupied",
            MoveOutcome::BlockedByClingyRule => "clingy block will not leave the player behind",
        }
    }
}

impl fmt::Display for MoveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// What applying a move requires.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Verdict {
    /// Move straight into the target cell.
    Step,
    /// Push the given block one cell first, then move.
    PushThenStep(EntityId),
    /// No mutation. Always carries a `Blocked*` outcome.
    Reject(MoveOutcome),
}

/// Map a non-clear obstruction to the reason it blocks.
fn blocked_by(ob: Obstruction) -> MoveOutcome {
    match ob {
        Obstruction::Wall => MoveOutcome::BlockedByWall,
        Obstruction::Clingy(_) => MoveOutcome::BlockedByClingy,
        _ => MoveOutcome::BlockedByOccupant,
    }
}

// ── Push ──

/// Can `block` be shoved one cell in `dir`? See truth table above.
pub fn push_verdict(q: &impl CellQuery, block: EntityId, dir: Direction) -> Verdict {
    let Some(e) = q.get(block) else {
        return Verdict::Reject(MoveOutcome::BlockedByOccupant);
    };
    let target = e.pos.offset(dir);
    if !q.bounds().contains(target) {
        return Verdict::Reject(MoveOutcome::BlockedByBounds);
    }
    match q.obstruction_at(target) {
        Obstruction::None => {}
        Obstruction::Wall => return Verdict::Reject(MoveOutcome::BlockedByWall),
        _ => return Verdict::Reject(MoveOutcome::BlockedByOccupant),
    }
    if e.kind.is_pushable() {
        Verdict::Step
    } else if e.kind == Kind::Clingy {
        Verdict::Reject(MoveOutcome::BlockedByClingy)
    } else {
        Verdict::Reject(MoveOutcome::BlockedByOccupant)
    }
}

/// Resolve a mover that would shove whatever pushable sits at its target.
fn through_push(q: &impl CellQuery, block: EntityId, dir: Direction) -> Verdict {
    match push_verdict(q, block, dir) {
        Verdict::Step => Verdict::PushThenStep(block),
        other => other,
    }
}

// ── Sticky ──

pub fn sticky_verdict(q: &impl CellQuery, sticky: EntityId, dir: Direction) -> Verdict {
    let Some(e) = q.get(sticky) else {
        return Verdict::Reject(MoveOutcome::BlockedByOccupant);
    };
    let target = e.pos.offset(dir);
    if !q.bounds().contains(target) {
        return Verdict::Reject(MoveOutcome::BlockedByBounds);
    }
    match q.obstruction_at(target) {
        ob if ob.is_clear_or_player() => Verdict::Step,
        Obstruction::Pushable(block) => through_push(q, block, dir),
        Obstruction::Wall => Verdict::Reject(MoveOutcome::BlockedByWall),
        _ => Verdict::Reject(MoveOutcome::BlockedByOccupant),
    }
}

// ── Clingy ──

pub fn clingy_verdict(q: &impl CellQuery, clingy: EntityId, dir: Direction) -> Verdict {
    let Some(e) = q.get(clingy) else {
        return Verdict::Reject(MoveOutcome::BlockedByOccupant);
    };
    let target = e.pos.offset(dir);
    if !q.bounds().contains(target) {
        return Verdict::Reject(MoveOutcome::BlockedByBounds);
    }
    match q.obstruction_at(target) {
        ob if ob.is_clear_or_player() => {}
        Obstruction::Wall => return Verdict::Reject(MoveOutcome::BlockedByWall),
        _ => return Verdict::Reject(MoveOutcome::BlockedByOccupant),
    }
    if q.is_player_at(e.pos.behind(dir)) {
        return Verdict::Reject(MoveOutcome::BlockedByClingyRule);
    }
    Verdict::Step
}

// ── Player ──

pub fn player_verdict(q: &impl CellQuery, player: EntityId, dir: Direction) -> Verdict {
    let Some(e) = q.get(player) else {
        return Verdict::Reject(MoveOutcome::BlockedByOccupant);
    };
    let target = e.pos.offset(dir);
    if !q.bounds().contains(target) {
        return Verdict::Reject(MoveOutcome::BlockedByBounds);
    }
    match q.obstruction_at(target) {
        Obstruction::None => Verdict::Step,
        Obstruction::Pushable(block) => through_push(q, block, dir),
        other => Verdict::Reject(blocked_by(other)),
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::{Bounds, GridPos};
    use crate::sim::registry::{board, Registry};

    fn id_at(reg: &Registry, x: i32, y: i32) -> EntityId {
        reg.entity_at(GridPos::new(x, y), None).map(|e| e.id).unwrap()
    }

    // ── Push ──

    #[test]
    fn push_into_empty() {
        let r = board(&["@o ."]);
        assert_eq!(push_verdict(&r, id_at(&r, 2, 1), Direction::Right), Verdict::Step);
    }

    #[test]
    fn push_into_wall() {
        let r = board(&["@o#"]);
        assert_eq!(
            push_verdict(&r, id_at(&r, 2, 1), Direction::Right),
            Verdict::Reject(MoveOutcome::BlockedByWall),
        );
    }

    #[test]
    fn push_into_another_pushable() {
        // No chain pushing.
        let r = board(&["@oo "]);
        assert_eq!(
            push_verdict(&r, id_at(&r, 2, 1), Direction::Right),
            Verdict::Reject(MoveOutcome::BlockedByOccupant),
        );
    }

    #[test]
    fn push_out_of_bounds() {
        let r = board(&["@o"]);
        assert_eq!(
            push_verdict(&r, id_at(&r, 2, 1), Direction::Right),
            Verdict::Reject(MoveOutcome::BlockedByBounds),
        );
    }

    #[test]
    fn clingy_is_never_pushed() {
        let r = board(&["@C  "]);
        assert_eq!(
            push_verdict(&r, id_at(&r, 2, 1), Direction::Right),
            Verdict::Reject(MoveOutcome::BlockedByClingy),
        );
    }

    #[test]
    fn walls_are_not_pushable() {
        let r = board(&["@#  "]);
        assert_eq!(
            push_verdict(&r, id_at(&r, 2, 1), Direction::Right),
            Verdict::Reject(MoveOutcome::BlockedByOccupant),
        );
    }

    #[test]
    fn push_unknown_block() {
        let r = board(&["@  "]);
        assert_eq!(
            push_verdict(&r, EntityId(99), Direction::Right),
            Verdict::Reject(MoveOutcome::BlockedByOccupant),
        );
    }

    // ── Sticky ──

    #[test]
    fn sticky_follows_into_player_cell() {
        let r = board(&["S@ "]);
        assert_eq!(sticky_verdict(&r, id_at(&r, 1, 1), Direction::Right), Verdict::Step);
    }

    #[test]
    fn sticky_into_empty() {
        let r = board(&[" S", " @"]);
        assert_eq!(sticky_verdict(&r, id_at(&r, 2, 1), Direction::Left), Verdict::Step);
    }

    #[test]
    fn sticky_pushes_pushable() {
        let r = board(&["@", "S", "o", " "]);
        let sticky = id_at(&r, 1, 2);
        let block = id_at(&r, 1, 3);
        assert_eq!(sticky_verdict(&r, sticky, Direction::Down), Verdict::PushThenStep(block));
    }

    #[test]
    fn sticky_push_rejected_keeps_reason() {
        let r = board(&["@", "S", "o", "#"]);
        assert_eq!(
            sticky_verdict(&r, id_at(&r, 1, 2), Direction::Down),
            Verdict::Reject(MoveOutcome::BlockedByWall),
        );
    }

    #[test]
    fn sticky_at_edge_is_bounded() {
        let r = board(&["S@  "]);
        assert_eq!(
            sticky_verdict(&r, id_at(&r, 1, 1), Direction::Left),
            Verdict::Reject(MoveOutcome::BlockedByBounds),
        );
    }

    #[test]
    fn sticky_blocked_by_clingy() {
        let r = board(&["CS@"]);
        assert_eq!(
            sticky_verdict(&r, id_at(&r, 2, 1), Direction::Left),
            Verdict::Reject(MoveOutcome::BlockedByOccupant),
        );
    }

    // ── Clingy ──

    #[test]
    fn clingy_refuses_to_leave_player_behind() {
        // Player at (4,5), clingy at (5,5), moving right, (6,5) empty.
        let r = board(&[
            "        ",
            "        ",
            "        ",
            "        ",
            "   @C   ",
        ]);
        assert_eq!(
            clingy_verdict(&r, id_at(&r, 5, 5), Direction::Right),
            Verdict::Reject(MoveOutcome::BlockedByClingyRule),
        );
    }

    #[test]
    fn clingy_moves_toward_player() {
        let r = board(&[" @C "]);
        assert_eq!(clingy_verdict(&r, id_at(&r, 3, 1), Direction::Left), Verdict::Step);
    }

    #[test]
    fn clingy_moves_sideways_with_player() {
        let r = board(&["  ", "@C"]);
        assert_eq!(clingy_verdict(&r, id_at(&r, 2, 2), Direction::Up), Verdict::Step);
    }

    #[test]
    fn clingy_trailing_pushable_does_not_hold_it() {
        let r = board(&["o C ", "  @ "]);
        // Trailing side of a move left is (4,1): empty.
        assert_eq!(clingy_verdict(&r, id_at(&r, 3, 1), Direction::Left), Verdict::Step);
    }

    #[test]
    fn clingy_blocked_by_pushable_at_target() {
        let r = board(&["@Co"]);
        assert_eq!(
            clingy_verdict(&r, id_at(&r, 2, 1), Direction::Right),
            Verdict::Reject(MoveOutcome::BlockedByOccupant),
        );
    }

    #[test]
    fn clingy_blocked_by_wall_and_bounds() {
        let r = board(&["#C", " @"]);
        assert_eq!(
            clingy_verdict(&r, id_at(&r, 2, 1), Direction::Left),
            Verdict::Reject(MoveOutcome::BlockedByWall),
        );
        assert_eq!(
            clingy_verdict(&r, id_at(&r, 2, 1), Direction::Up),
            Verdict::Reject(MoveOutcome::BlockedByBounds),
        );
    }

    // ── Player ──

    #[test]
    fn player_steps_into_empty() {
        let r = board(&["@ "]);
        assert_eq!(player_verdict(&r, id_at(&r, 1, 1), Direction::Right), Verdict::Step);
    }

    #[test]
    fn player_blocked_by_each_obstacle() {
        let r = board(&[
            " # ",
            "C@S",
            "   ",
        ]);
        let p = id_at(&r, 2, 2);
        assert_eq!(player_verdict(&r, p, Direction::Up), Verdict::Reject(MoveOutcome::BlockedByWall));
        assert_eq!(player_verdict(&r, p, Direction::Left), Verdict::Reject(MoveOutcome::BlockedByClingy));
        assert_eq!(player_verdict(&r, p, Direction::Right), Verdict::Reject(MoveOutcome::BlockedByOccupant));
        assert_eq!(player_verdict(&r, p, Direction::Down), Verdict::Step);
    }

    #[test]
    fn player_out_of_bounds() {
        let r = board(&["@"]);
        let p = id_at(&r, 1, 1);
        for dir in Direction::ALL {
            assert_eq!(player_verdict(&r, p, dir), Verdict::Reject(MoveOutcome::BlockedByBounds));
        }
    }

    #[test]
    fn player_push_plans_block() {
        let r = board(&["@o "]);
        let block = id_at(&r, 2, 1);
        assert_eq!(player_verdict(&r, id_at(&r, 1, 1), Direction::Right), Verdict::PushThenStep(block));
    }
}
