/// Keyboard input tracker.
///
/// Moves are edge-triggered: a key that is already held does not fire
/// again until it is released, so holding a direction moves exactly once.
///
/// Uses crossterm's keyboard enhancement for Release and Repeat events when
/// available: a key is then held from Press until Release, however slow
/// the auto-repeat. Terminals without it get timeout-based release
/// detection (their auto-repeat arrives as Press and keeps the key "held").

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::grid::Direction;

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that went from "not held" to "held" during the most recent
    /// `drain_events()` call.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for meta-key handling.
    pub raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame, before the step.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.record(key, Instant::now());
            }
        }

        // With Release events a key stays held until released.
        if !self.honor_release {
            let now = Instant::now();
            self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
        }
    }

    fn record(&mut self, key: KeyEvent, now: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            KeyEventKind::Release => {}
            // Auto-repeat only keeps the key held.
            KeyEventKind::Repeat => {
                self.last_active.insert(key.code, now);
            }
            KeyEventKind::Press => {
                let was_held = self.is_held(key.code, now);
                self.last_active.insert(key.code, now);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    fn is_held(&self, code: KeyCode, now: Instant) -> bool {
        match self.last_active.get(&code) {
            Some(_) if self.honor_release => true,
            Some(t) => now.duration_since(*t) < HOLD_TIMEOUT,
            None => false,
        }
    }

    /// Was this key freshly pressed this frame? (edge trigger)
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    /// Convenience: was any of these keys freshly pressed?
    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// Letter key, case-insensitive.
    pub fn letter_pressed(&self, ch: char) -> bool {
        self.any_pressed(&[
            KeyCode::Char(ch.to_ascii_lowercase()),
            KeyCode::Char(ch.to_ascii_uppercase()),
        ])
    }

    /// The direction for this frame. Simultaneous presses resolve in
    /// the fixed order up, down, left, right.
    pub fn sample_direction(&self) -> Option<Direction> {
        Direction::first_active(|dir| self.any_pressed(direction_keys(dir)))
    }

    /// Check if any raw event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}

/// WASD and arrow keys.
fn direction_keys(dir: Direction) -> &'static [KeyCode] {
    match dir {
        Direction::Up    => &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')],
        Direction::Down  => &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')],
        Direction::Left  => &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')],
        Direction::Right => &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')],
    }
}
