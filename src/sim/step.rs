/// The step function: resolves one directional input.
///
/// Processing order (load-bearing):
///   1. Sticky blocks adjacent to the player's pre-move position
///   2. Clingy blocks adjacent to the player's pre-move position
///   3. The player (with at most one push)
///
/// Stages 1 and 2 commit before stage 3 is even evaluated, so a rejected
/// player move still leaves dragged blocks displaced. A dragged block may
/// therefore end the tick on the player's cell.
///
/// Rules (`domain::rules`) decide; this module applies the verdicts and
/// reports every outcome as a `log` record and a `GameEvent`.

use log::{debug, info, warn};

use crate::domain::entity::{EntityId, Kind};
use crate::domain::grid::{Direction, GridPos};
use crate::domain::rules::{self, MoveOutcome, Verdict};
use super::event::GameEvent;
use super::registry::Registry;
use super::world::{Phase, WorldState};

/// Ticks a "blocked" status message stays on screen.
const BLOCKED_MESSAGE_TICKS: u32 = 60;

/// One companion block's result within a tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CompanionMove {
    pub id: EntityId,
    pub from: GridPos,
    pub outcome: MoveOutcome,
}

/// Everything that happened during one tick.
#[derive(Clone, Debug)]
pub struct TickResult {
    pub direction: Direction,
    pub sticky: Vec<CompanionMove>,
    pub clingy: Vec<CompanionMove>,
    pub player: MoveOutcome,
    /// Blocks shoved this tick (by stickies or by the player).
    pub pushed: Vec<EntityId>,
    pub events: Vec<GameEvent>,
}

// ══════════════════════════════════════════════════════════════
// Main entry points
// ══════════════════════════════════════════════════════════════

/// Advance the world by one input. `None` input, or a world that is not
/// in play, produces no tick.
pub fn step(world: &mut WorldState, input: Option<Direction>) -> Option<TickResult> {
    if world.phase != Phase::Playing { return None; }
    let dir = input?;

    let result = process_direction(&mut world.registry, dir)?;
    world.tick += 1;

    if result.player.is_moved() {
        world.moves += 1;
    } else {
        world.set_message(result.player.describe(), BLOCKED_MESSAGE_TICKS);
    }
    Some(result)
}

/// Resolve one direction against the registry: sticky, clingy, player.
/// Returns `None` when no player is registered.
pub fn process_direction(reg: &mut Registry, dir: Direction) -> Option<TickResult> {
    let player = reg.player_id()?;
    let origin = reg.position(player)?;

    let mut events = Vec::new();
    let mut pushed = Vec::new();

    let sticky = resolve_sticky(reg, origin, dir, &mut pushed, &mut events);
    let clingy = resolve_clingy(reg, origin, dir, &mut events);
    let player_outcome = resolve_player(reg, player, dir, &mut pushed, &mut events);

    let shared = reg.overlapping_cells();
    if !shared.is_empty() {
        warn!("moving {} left stacked entities at {:?}", dir, shared);
    }

    Some(TickResult {
        direction: dir,
        sticky,
        clingy,
        player: player_outcome,
        pushed,
        events,
    })
}

// ══════════════════════════════════════════════════════════════
// Push
// ══════════════════════════════════════════════════════════════

/// Shove a single block one cell. On rejection nothing moves.
pub fn try_push(reg: &mut Registry, block: EntityId, dir: Direction) -> bool {
    match rules::push_verdict(reg, block, dir) {
        Verdict::Step => {
            let Some(from) = reg.position(block) else { return false };
            reg.set_position(block, from.offset(dir))
        }
        _ => false,
    }
}

/// Apply a verdict to `id`. Pushes happen before the mover commits.
fn apply(
    reg: &mut Registry,
    id: EntityId,
    dir: Direction,
    verdict: Verdict,
    pushed: &mut Vec<EntityId>,
    events: &mut Vec<GameEvent>,
) -> MoveOutcome {
    match verdict {
        Verdict::Step => {}
        Verdict::PushThenStep(block) => {
            if !try_push(reg, block, dir) {
                return MoveOutcome::BlockedByOccupant;
            }
            if let Some(to) = reg.position(block) {
                info!("block #{} pushed to {}", block.0, to);
                events.push(GameEvent::BlockPushed { id: block, to });
            }
            pushed.push(block);
        }
        Verdict::Reject(outcome) => return outcome,
    }
    match reg.position(id) {
        Some(from) if reg.set_position(id, from.offset(dir)) => MoveOutcome::Moved,
        _ => MoveOutcome::BlockedByOccupant,
    }
}

// ══════════════════════════════════════════════════════════════
// Companions
// ══════════════════════════════════════════════════════════════

/// Drag every sticky block adjacent to `origin`. The set is collected
/// before any of them moves.
pub fn resolve_sticky(
    reg: &mut Registry,
    origin: GridPos,
    dir: Direction,
    pushed: &mut Vec<EntityId>,
    events: &mut Vec<GameEvent>,
) -> Vec<CompanionMove> {
    let mut moves = Vec::new();
    for id in reg.adjacent_of_kind(origin, Kind::Sticky) {
        let Some(from) = reg.position(id) else { continue };
        let verdict = rules::sticky_verdict(reg, id, dir);
        let outcome = apply(reg, id, dir, verdict, pushed, events);
        if outcome.is_moved() {
            let to = from.offset(dir);
            info!("sticky moved to {}", to);
            events.push(GameEvent::StickyMoved { id, to });
        } else {
            debug!("sticky at {} blocked: {}", from, outcome);
            events.push(GameEvent::StickyBlocked { id, outcome });
        }
        moves.push(CompanionMove { id, from, outcome });
    }
    moves
}

/// Let every clingy block adjacent to `origin` follow, unless that
/// would leave the player on its trailing side.
pub fn resolve_clingy(
    reg: &mut Registry,
    origin: GridPos,
    dir: Direction,
    events: &mut Vec<GameEvent>,
) -> Vec<CompanionMove> {
    let mut moves = Vec::new();
    for id in reg.adjacent_of_kind(origin, Kind::Clingy) {
        let Some(from) = reg.position(id) else { continue };
        let verdict = rules::clingy_verdict(reg, id, dir);
        // Clingy verdicts never push.
        let outcome = apply(reg, id, dir, verdict, &mut Vec::new(), events);
        if outcome.is_moved() {
            let to = from.offset(dir);
            info!("clingy moved to {}", to);
            events.push(GameEvent::ClingyMoved { id, to });
        } else {
            debug!("clingy at {} blocked: {}", from, outcome);
            events.push(GameEvent::ClingyBlocked { id, outcome });
        }
        moves.push(CompanionMove { id, from, outcome });
    }
    moves
}

// ══════════════════════════════════════════════════════════════
// Player
// ══════════════════════════════════════════════════════════════

pub fn resolve_player(
    reg: &mut Registry,
    player: EntityId,
    dir: Direction,
    pushed: &mut Vec<EntityId>,
    events: &mut Vec<GameEvent>,
) -> MoveOutcome {
    let Some(from) = reg.position(player) else {
        return MoveOutcome::BlockedByOccupant;
    };
    let verdict = rules::player_verdict(reg, player, dir);
    let outcome = apply(reg, player, dir, verdict, pushed, events);
    if outcome.is_moved() {
        let to = from.offset(dir);
        info!("player moved {} to {}", dir, to);
        events.push(GameEvent::PlayerMoved { from, to });
    } else {
        debug!("player at {}: {}", from, outcome);
        events.push(GameEvent::PlayerBlocked { at: from, outcome });
    }
    outcome
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::Bounds;
    use crate::domain::occupancy::CellQuery;
    use crate::sim::registry::board;

    /// Empty `w` x `h` grid with the player at (px, py).
    fn open_grid(w: i32, h: i32, px: i32, py: i32) -> Registry {
        let mut reg = Registry::new(Bounds::new(w, h));
        reg.spawn(Kind::Player, GridPos::new(px, py));
        reg
    }

    fn player_pos(reg: &Registry) -> GridPos {
        reg.player().map(|e| e.pos).unwrap()
    }

    fn kind_at(reg: &Registry, x: i32, y: i32) -> Option<Kind> {
        reg.entity_at(GridPos::new(x, y), None).map(|e| e.kind)
    }

    fn assert_in_bounds(reg: &Registry) {
        let b = reg.bounds();
        for e in reg.iter() {
            assert!(b.contains(e.pos), "{:?} escaped bounds", e);
        }
    }

    fn tick(reg: &mut Registry, dir: Direction) -> TickResult {
        process_direction(reg, dir).unwrap()
    }

    // ── Scenarios ──

    #[test]
    fn simple_move() {
        let mut r = open_grid(10, 10, 2, 2);
        let t = tick(&mut r, Direction::Right);
        assert_eq!(t.player, MoveOutcome::Moved);
        assert_eq!(player_pos(&r), GridPos::new(3, 2));
        assert!(t.sticky.is_empty() && t.clingy.is_empty() && t.pushed.is_empty());
    }

    #[test]
    fn push_success() {
        let mut r = open_grid(10, 10, 2, 2);
        let block = r.spawn(Kind::Pushable, GridPos::new(3, 2));
        let t = tick(&mut r, Direction::Right);
        assert_eq!(t.player, MoveOutcome::Moved);
        assert_eq!(player_pos(&r), GridPos::new(3, 2));
        assert_eq!(r.position(block), Some(GridPos::new(4, 2)));
        assert_eq!(t.pushed, vec![block]);
        assert!(t.events.contains(&GameEvent::BlockPushed { id: block, to: GridPos::new(4, 2) }));
    }

    #[test]
    fn push_blocked_by_wall() {
        let mut r = open_grid(10, 10, 2, 2);
        let block = r.spawn(Kind::Pushable, GridPos::new(3, 2));
        let wall = r.spawn(Kind::Wall, GridPos::new(4, 2));
        let before = r.positions();
        let t = tick(&mut r, Direction::Right);
        assert!(!t.player.is_moved());
        assert_eq!(r.positions(), before);
        assert_eq!(player_pos(&r), GridPos::new(2, 2));
        assert_eq!(r.position(block), Some(GridPos::new(3, 2)));
        assert_eq!(r.position(wall), Some(GridPos::new(4, 2)));
    }

    #[test]
    fn push_blocked_by_second_pushable() {
        let mut r = board(&["@oo "]);
        let before = r.positions();
        let t = tick(&mut r, Direction::Right);
        assert_eq!(t.player, MoveOutcome::BlockedByOccupant);
        assert_eq!(r.positions(), before);
    }

    #[test]
    fn push_blocked_at_edge() {
        let mut r = board(&[" @o"]);
        let before = r.positions();
        let t = tick(&mut r, Direction::Right);
        assert_eq!(t.player, MoveOutcome::BlockedByBounds);
        assert_eq!(r.positions(), before);
    }

    #[test]
    fn sticky_drag_rejected_at_left_edge() {
        // Sticky at (1,2), player at (2,2), moving left: (0,2) is out of bounds.
        let mut r = open_grid(10, 10, 2, 2);
        let sticky = r.spawn(Kind::Sticky, GridPos::new(1, 2));
        let t = tick(&mut r, Direction::Left);
        assert_eq!(t.sticky.len(), 1);
        assert_eq!(t.sticky[0].outcome, MoveOutcome::BlockedByBounds);
        assert_eq!(r.position(sticky), Some(GridPos::new(1, 2)));
        // The player's own move is then blocked by the sticky.
        assert_eq!(t.player, MoveOutcome::BlockedByOccupant);
        assert_eq!(player_pos(&r), GridPos::new(2, 2));
    }

    #[test]
    fn sticky_trails_behind_player() {
        let mut r = board(&["S@  "]);
        let t = tick(&mut r, Direction::Right);
        assert_eq!(t.sticky[0].outcome, MoveOutcome::Moved);
        assert_eq!(t.player, MoveOutcome::Moved);
        assert_eq!(kind_at(&r, 2, 1), Some(Kind::Sticky));
        assert_eq!(kind_at(&r, 3, 1), Some(Kind::Player));
        assert!(r.overlapping_cells().is_empty());
    }

    #[test]
    fn sticky_leads_ahead_of_player() {
        let mut r = board(&[" @S "]);
        let t = tick(&mut r, Direction::Right);
        assert_eq!(t.sticky[0].outcome, MoveOutcome::Moved);
        assert_eq!(t.player, MoveOutcome::Moved);
        assert_eq!(kind_at(&r, 3, 1), Some(Kind::Player));
        assert_eq!(kind_at(&r, 4, 1), Some(Kind::Sticky));
    }

    #[test]
    fn sticky_beside_player_slides_in_parallel() {
        let mut r = board(&[
            " S  ",
            " @  ",
        ]);
        tick(&mut r, Direction::Right);
        assert_eq!(kind_at(&r, 3, 1), Some(Kind::Sticky));
        assert_eq!(kind_at(&r, 3, 2), Some(Kind::Player));
    }

    #[test]
    fn sticky_pushes_block_ahead() {
        let mut r = board(&[" @So "]);
        let t = tick(&mut r, Direction::Right);
        assert_eq!(t.pushed.len(), 1);
        assert_eq!(kind_at(&r, 5, 1), Some(Kind::Pushable));
        assert_eq!(kind_at(&r, 4, 1), Some(Kind::Sticky));
        assert_eq!(kind_at(&r, 3, 1), Some(Kind::Player));
    }

    #[test]
    fn sticky_moves_even_when_player_is_blocked() {
        let mut r = board(&["S@#"]);
        let t = tick(&mut r, Direction::Right);
        assert_eq!(t.player, MoveOutcome::BlockedByWall);
        assert_eq!(t.sticky[0].outcome, MoveOutcome::Moved);
        // The sticky now shares the player's cell.
        assert_eq!(r.overlapping_cells(), vec![GridPos::new(2, 1)]);
    }

    #[test]
    fn sticky_and_player_both_hit_walls() {
        let mut r = board(&[
            " S#",
            " @#",
        ]);
        let before = r.positions();
        let t = tick(&mut r, Direction::Right);
        assert_eq!(t.sticky[0].outcome, MoveOutcome::BlockedByWall);
        assert_eq!(t.player, MoveOutcome::BlockedByWall);
        assert_eq!(r.positions(), before);
    }

    #[test]
    fn stickies_resolve_independently() {
        // One sticky blocked by a wall, the other free.
        let mut r = board(&[
            "#S  ",
            " @  ",
            " S  ",
        ]);
        let t = tick(&mut r, Direction::Left);
        assert_eq!(t.sticky.len(), 2);
        let outcomes: Vec<_> = t.sticky.iter().map(|m| (m.from, m.outcome)).collect();
        assert!(outcomes.contains(&(GridPos::new(2, 1), MoveOutcome::BlockedByWall)));
        assert!(outcomes.contains(&(GridPos::new(2, 3), MoveOutcome::Moved)));
        assert_eq!(player_pos(&r), GridPos::new(1, 2));
    }

    // ── Clingy ──

    #[test]
    fn clingy_opposite_side_rule() {
        // Clingy at (5,5), player at (4,5), moving right: clingy stays.
        let mut r = open_grid(10, 10, 4, 5);
        let clingy = r.spawn(Kind::Clingy, GridPos::new(5, 5));
        let t = tick(&mut r, Direction::Right);
        assert_eq!(t.clingy[0].outcome, MoveOutcome::BlockedByClingyRule);
        assert_eq!(r.position(clingy), Some(GridPos::new(5, 5)));
        // And the player can never walk into a clingy.
        assert_eq!(t.player, MoveOutcome::BlockedByClingy);
        assert_eq!(player_pos(&r), GridPos::new(4, 5));
    }

    #[test]
    fn clingy_follows_player_away() {
        let mut r = board(&[" @C "]);
        let t = tick(&mut r, Direction::Left);
        assert_eq!(t.clingy[0].outcome, MoveOutcome::Moved);
        assert_eq!(t.player, MoveOutcome::Moved);
        assert_eq!(kind_at(&r, 1, 1), Some(Kind::Player));
        assert_eq!(kind_at(&r, 2, 1), Some(Kind::Clingy));
    }

    #[test]
    fn clingy_beside_player_slides_along() {
        let mut r = board(&[
            "    ",
            " @  ",
            " C  ",
        ]);
        let t = tick(&mut r, Direction::Right);
        assert_eq!(t.clingy[0].outcome, MoveOutcome::Moved);
        assert_eq!(kind_at(&r, 3, 3), Some(Kind::Clingy));
        assert_eq!(kind_at(&r, 3, 2), Some(Kind::Player));
    }

    #[test]
    fn clingy_blocked_does_not_stop_player() {
        let mut r = board(&[
            "  ",
            "@ ",
            "C#",
        ]);
        let t = tick(&mut r, Direction::Right);
        assert_eq!(t.clingy[0].outcome, MoveOutcome::BlockedByWall);
        assert_eq!(t.player, MoveOutcome::Moved);
        assert_eq!(player_pos(&r), GridPos::new(2, 2));
    }

    #[test]
    fn companions_commit_before_player_is_checked() {
        // Moving up: the sticky hits the top edge and stays, which then
        // blocks the player, but the clingy has already followed.
        let mut r = board(&[
            "  S  ",
            "  @C ",
            "     ",
        ]);
        let t = tick(&mut r, Direction::Up);
        assert_eq!(t.sticky[0].outcome, MoveOutcome::BlockedByBounds);
        assert_eq!(t.clingy[0].outcome, MoveOutcome::Moved);
        assert_eq!(t.player, MoveOutcome::BlockedByOccupant);
        assert_eq!(kind_at(&r, 4, 1), Some(Kind::Clingy));
        assert_eq!(player_pos(&r), GridPos::new(3, 2));
    }

    // ── Properties ──

    #[test]
    fn rejected_tick_without_companions_is_idempotent() {
        let mut r = board(&[
            "#####",
            "#@o##",
            "#####",
        ]);
        let before = r.positions();
        for dir in Direction::ALL {
            let t = tick(&mut r, dir);
            assert!(!t.player.is_moved());
            assert_eq!(r.positions(), before);
        }
    }

    #[test]
    fn invariants_hold_over_a_walk() {
        let mut r = board(&[
            "       ",
            " o S   ",
            "  @  C ",
            " #  o  ",
            "       ",
        ]);
        let walk = [
            Direction::Right, Direction::Right, Direction::Up, Direction::Left,
            Direction::Left, Direction::Down, Direction::Down, Direction::Right,
            Direction::Up, Direction::Up, Direction::Up, Direction::Left,
        ];
        let count = r.len();
        for dir in walk {
            tick(&mut r, dir);
            assert_in_bounds(&r);
            assert_eq!(r.len(), count);
        }
        // Walls never move.
        assert_eq!(kind_at(&r, 2, 4), Some(Kind::Wall));
    }

    #[test]
    fn each_entity_moves_at_most_one_cell_per_tick() {
        let mut r = board(&[
            "  S  ",
            " S@o ",
            "  C  ",
        ]);
        let before = r.positions();
        tick(&mut r, Direction::Right);
        for (a, b) in before.iter().zip(r.positions()) {
            assert!((a.x - b.x).abs() + (a.y - b.y).abs() <= 1);
        }
    }

    #[test]
    fn occupancy_holds_when_player_moves() {
        let mut r = board(&[
            "     ",
            " S@  ",
            "  C  ",
        ]);
        let t = tick(&mut r, Direction::Right);
        assert!(t.player.is_moved());
        assert!(r.overlapping_cells().is_empty());
    }

    #[test]
    fn no_player_means_no_tick() {
        let mut r = board(&["o S"]);
        assert!(process_direction(&mut r, Direction::Left).is_none());
    }

    #[test]
    fn try_push_directly() {
        let mut r = board(&["o  ", "C  "]);
        let block = r.entity_at(GridPos::new(1, 1), None).unwrap().id;
        let clingy = r.entity_at(GridPos::new(1, 2), None).unwrap().id;
        assert!(try_push(&mut r, block, Direction::Right));
        assert_eq!(r.position(block), Some(GridPos::new(2, 1)));
        assert!(!try_push(&mut r, clingy, Direction::Right));
        assert_eq!(r.position(clingy), Some(GridPos::new(1, 2)));
    }

    // ── World-level step ──

    fn playing_world(rows: &[&str]) -> WorldState {
        let mut w = WorldState::new(vec![], "test".into());
        w.install(0, "Test", board(rows));
        w
    }

    #[test]
    fn step_counts_moves_and_reports_blocks() {
        let mut w = playing_world(&["@ #"]);
        assert!(step(&mut w, Some(Direction::Right)).is_some());
        assert_eq!(w.moves, 1);
        let t = step(&mut w, Some(Direction::Right)).unwrap();
        assert_eq!(t.player, MoveOutcome::BlockedByWall);
        assert_eq!(w.moves, 1);
        assert_eq!(w.message, MoveOutcome::BlockedByWall.describe());
        assert_eq!(w.tick, 2);
    }

    #[test]
    fn step_without_direction_is_not_a_tick() {
        let mut w = playing_world(&["@  "]);
        assert!(step(&mut w, None).is_none());
        assert_eq!(w.tick, 0);
    }

    #[test]
    fn step_ignored_outside_play() {
        let mut w = playing_world(&["@  "]);
        w.phase = Phase::Title;
        assert!(step(&mut w, Some(Direction::Right)).is_none());
        assert_eq!(w.registry.player().map(|e| e.pos), Some(GridPos::new(1, 1)));
    }
}
