/// Entry point and game loop.

mod config;
mod domain;
mod logging;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags};
use crossterm::{execute, terminal};
use log::{debug, info, trace, warn};

use config::GameConfig;
use domain::grid::Direction;
use sim::level::{load_level, load_levels};
use sim::step;
use sim::world::{Phase, WorldState};
use ui::gamepad::GamepadState;
use ui::input::InputState;
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

const LEVEL_MESSAGE_TICKS: u32 = 80;

fn main() {
    let config = GameConfig::load();

    if let Err(e) = logging::init(&config.log) {
        eprintln!("Could not open log file: {e}");
    }
    match &config.source {
        Some(path) => info!("config loaded from {}", path.display()),
        None => info!("no config.toml found, using defaults"),
    }
    for w in &config.warnings {
        warn!("config: {w}");
    }

    let (source, levels) = load_levels(&config);
    let mut world = WorldState::new(levels, source.describe());

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    // Release events make edge-triggered input exact; without them the
    // input tracker falls back to a hold timeout.
    let enhanced = matches!(terminal::supports_keyboard_enhancement(), Ok(true))
        && execute!(
            std::io::stdout(),
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        ).is_ok();

    let sound = if config.sound_enabled { SoundEngine::new() } else { None };
    if config.sound_enabled && sound.is_none() {
        warn!("no audio output device, sound disabled");
    }

    let result = game_loop(&mut world, &mut renderer, sound.as_ref(), &config, enhanced);

    if enhanced {
        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
    }
    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        log::error!("game loop failed: {e}");
        eprintln!("Game error: {e}");
    }

    info!("exiting after {} moves on level {}", world.moves, world.current_level + 1);
    println!("Thanks for playing Sokoblock!");
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
    honor_release: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    kb.honor_release = honor_release;
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let frame = Duration::from_millis(config.frame_ms);

    loop {
        let frame_start = Instant::now();

        kb.drain_events();
        gp.update();
        renderer.gamepad_connected = gp.connected;

        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_meta(world, &kb, &gp, renderer.list_rows()) {
            break;
        }

        if world.phase == Phase::Playing {
            let input = kb.sample_direction().or_else(|| gp.sample_direction());
            if let Some(result) = step::step(world, input) {
                debug!(
                    "tick {}: {} -> {} ({} sticky, {} clingy, {} pushed)",
                    world.tick, result.direction, result.player,
                    result.sticky.len(), result.clingy.len(), result.pushed.len(),
                );
                for m in result.sticky.iter().chain(&result.clingy) {
                    trace!("companion #{} from {}: {}", m.id.0, m.from, m.outcome);
                }
                for event in &result.events {
                    trace!("{event}");
                }
                if let Some(sfx) = sound {
                    sfx.play_for_events(&result.events);
                }
            }
        }

        world.tick_message();
        renderer.render(world)?;

        if let Some(rest) = frame.checked_sub(frame_start.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    Ok(())
}

// ── Level navigation ──

fn start_level(world: &mut WorldState, idx: usize) {
    if load_level(world, idx) {
        let msg = format!("Level {}: {}", idx + 1, world.level_name);
        world.set_message(&msg, LEVEL_MESSAGE_TICKS);
    } else {
        world.set_message("That level could not be loaded", LEVEL_MESSAGE_TICKS);
    }
}

/// Step to the next/previous level, clamped to the list.
fn change_level(world: &mut WorldState, forward: bool) {
    let last = world.total_levels().saturating_sub(1);
    let target = if forward {
        (world.current_level + 1).min(last)
    } else {
        world.current_level.saturating_sub(1)
    };
    if target == world.current_level {
        let edge = if forward { "This is the last level" } else { "This is the first level" };
        world.set_message(edge, LEVEL_MESSAGE_TICKS);
        return;
    }
    start_level(world, target);
}

fn return_to_title(world: &mut WorldState) {
    world.phase = Phase::Title;
    world.message.clear();
    world.message_timer = 0;
}

fn open_level_select(world: &mut WorldState) {
    world.phase = Phase::LevelSelect;
    world.select_cursor = world.current_level.min(world.total_levels().saturating_sub(1));
    world.select_scroll = 0;
}

/// Move the level-select cursor by `delta`, keeping it inside the list
/// and the scroll window around it.
fn move_cursor(world: &mut WorldState, delta: isize, visible: usize) {
    let total = world.total_levels();
    if total == 0 {
        return;
    }
    let cursor = world.select_cursor as isize + delta;
    world.select_cursor = cursor.clamp(0, total as isize - 1) as usize;
    if world.select_cursor < world.select_scroll {
        world.select_scroll = world.select_cursor;
    } else if world.select_cursor >= world.select_scroll + visible {
        world.select_scroll = world.select_cursor + 1 - visible;
    }
}

// ── Meta keys: phase transitions, restart, quit ──

/// Returns true when the player asked to quit.
fn handle_meta(world: &mut WorldState, kb: &InputState, gp: &GamepadState, visible: usize) -> bool {
    let confirm = kb.any_pressed(&[KeyCode::Enter, KeyCode::Char(' ')]) || gp.confirm_pressed();
    let esc = kb.was_pressed(KeyCode::Esc) || gp.cancel_pressed();

    match world.phase {
        // ── Title Screen ──
        Phase::Title => {
            if confirm {
                start_level(world, world.current_level);
            } else if kb.letter_pressed('l') {
                open_level_select(world);
            } else if kb.letter_pressed('q') || esc {
                return true;
            }
        }

        // ── Level Select ──
        Phase::LevelSelect => {
            if kb.any_pressed(&[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')]) {
                move_cursor(world, -1, visible);
            } else if kb.any_pressed(&[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')]) {
                move_cursor(world, 1, visible);
            } else if kb.was_pressed(KeyCode::PageUp) {
                move_cursor(world, -(visible as isize), visible);
            } else if kb.was_pressed(KeyCode::PageDown) {
                move_cursor(world, visible as isize, visible);
            } else if let Some(dir) = gp.sample_direction() {
                match dir {
                    Direction::Up => move_cursor(world, -1, visible),
                    Direction::Down => move_cursor(world, 1, visible),
                    _ => {}
                }
            } else if confirm {
                start_level(world, world.select_cursor);
            } else if esc {
                return_to_title(world);
            } else if kb.letter_pressed('q') {
                return true;
            }
        }

        // ── Playing ──
        Phase::Playing => {
            if esc {
                info!("back to title from level {}", world.current_level + 1);
                return_to_title(world);
            } else if kb.letter_pressed('q') {
                return true;
            } else if kb.letter_pressed('r') || gp.restart_pressed() {
                info!("restarting level {}", world.current_level + 1);
                world.restart_level();
                world.set_message("Level restarted", 40);
            } else if kb.letter_pressed('n') || gp.next_level_pressed() {
                change_level(world, true);
            } else if kb.letter_pressed('p') || gp.prev_level_pressed() {
                change_level(world, false);
            } else if kb.letter_pressed('l') {
                open_level_select(world);
            }
        }
    }

    false
}
