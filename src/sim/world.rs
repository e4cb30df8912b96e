/// WorldState: the complete state of a running session.
///
/// ## Registry layers
///
///   - `initial`: the level as loaded, never mutated after install.
///   - `registry`: the live board, mutated only by `sim::step`.
///
/// `restart_level` resets `registry = initial.clone()`.

use crate::sim::level::LevelDef;
use crate::sim::registry::Registry;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Title,
    LevelSelect,
    Playing,
}

pub struct WorldState {
    // ── Board ──
    pub registry: Registry,
    initial: Registry,

    // ── Levels ──
    pub levels: Vec<LevelDef>,
    pub source_name: String,
    pub current_level: usize,
    pub level_name: String,

    // ── Meta ──
    pub phase: Phase,
    pub moves: u32,
    pub tick: u64,

    // ── UI ──
    pub message: String,
    pub message_timer: u32,
    pub select_cursor: usize,
    pub select_scroll: usize,
}

impl WorldState {
    pub fn new(levels: Vec<LevelDef>, source_name: String) -> Self {
        WorldState {
            registry: Registry::default(),
            initial: Registry::default(),
            levels,
            source_name,
            current_level: 0,
            level_name: String::new(),
            phase: Phase::Title,
            moves: 0,
            tick: 0,
            message: String::new(),
            message_timer: 0,
            select_cursor: 0,
            select_scroll: 0,
        }
    }

    pub fn total_levels(&self) -> usize {
        self.levels.len()
    }

    /// Replace the board with a freshly built level.
    pub fn install(&mut self, index: usize, name: &str, registry: Registry) {
        self.initial = registry.clone();
        self.registry = registry;
        self.current_level = index;
        self.level_name = name.to_string();
        self.moves = 0;
        self.tick = 0;
        self.phase = Phase::Playing;
    }

    /// Put every entity back where the level started.
    pub fn restart_level(&mut self) {
        self.registry = self.initial.clone();
        self.moves = 0;
        self.tick = 0;
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }

    /// Count down the status message; clears it when the timer expires.
    /// A zero timer means the message stays until replaced.
    pub fn tick_message(&mut self) {
        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 {
                self.message.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Kind;
    use crate::domain::grid::{Bounds, GridPos};

    fn world_with_player() -> WorldState {
        let mut w = WorldState::new(vec![], "test".into());
        let mut reg = Registry::new(Bounds::new(5, 5));
        reg.spawn(Kind::Player, GridPos::new(2, 2));
        w.install(0, "Test", reg);
        w
    }

    #[test]
    fn install_enters_playing() {
        let w = world_with_player();
        assert_eq!(w.phase, Phase::Playing);
        assert_eq!(w.level_name, "Test");
        assert_eq!(w.moves, 0);
    }

    #[test]
    fn restart_restores_initial_positions() {
        let mut w = world_with_player();
        let id = w.registry.player_id().unwrap();
        w.registry.set_position(id, GridPos::new(4, 4));
        w.moves = 7;
        w.restart_level();
        assert_eq!(w.registry.position(id), Some(GridPos::new(2, 2)));
        assert_eq!(w.moves, 0);
    }

    #[test]
    fn message_expires() {
        let mut w = world_with_player();
        w.set_message("hi", 2);
        w.tick_message();
        assert_eq!(w.message, "hi");
        w.tick_message();
        assert!(w.message.is_empty());
    }

    #[test]
    fn sticky_message_with_zero_timer() {
        let mut w = world_with_player();
        w.set_message("paused", 0);
        w.tick_message();
        assert_eq!(w.message, "paused");
    }
}
