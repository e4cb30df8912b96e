/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// This eliminates flicker caused by full-screen redraws.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::Kind;
use crate::domain::grid::{Bounds, GridPos};
use crate::domain::occupancy::CellQuery;
use crate::sim::world::{Phase, WorldState};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, so the
    /// gaps between rows match the cell color on every terminal.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    /// Normalize bg: `Color::Reset` becomes BASE_BG so every cell gets an
    /// explicit background color (never terminal-default).
    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        Cell { ch, fg, bg: Self::norm_bg(bg) }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y) with given colors. Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    /// Paint a whole row with `bg`, then write `s` on it.
    fn put_bar(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', fg, bg));
        }
        self.put_str(0, y, s, fg, bg);
    }
}

// ── Palette ──

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };
const ACCENT: Color = Color::Rgb { r: 255, g: 200, b: 50 };
const HIGHLIGHT: Color = Color::Rgb { r: 80, g: 255, b: 80 };
const FLOOR: Color = Color::Rgb { r: 60, g: 60, b: 80 };
const STACKED_BG: Color = Color::Rgb { r: 120, g: 30, b: 30 };

/// Two terminal columns per grid cell, so the board looks square.
fn glyph(kind: Kind) -> (&'static str, Color) {
    match kind {
        Kind::Player   => ("@@", Color::Rgb { r: 255, g: 220, b: 60 }),
        Kind::Wall     => ("██", Color::Rgb { r: 110, g: 110, b: 130 }),
        Kind::Pushable => ("[]", Color::Rgb { r: 200, g: 140, b: 70 }),
        Kind::Sticky   => ("{}", Color::Rgb { r: 90, g: 220, b: 120 }),
        Kind::Clingy   => ("<>", Color::Rgb { r: 220, g: 110, b: 220 }),
    }
}

// ── Renderer ──

/// Each game cell is CELL_W terminal columns wide.
const CELL_W: usize = 2;

/// Vertical offsets
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
/// HUD + gap + blank + message + blank + help.
const RESERVED_ROWS: usize = MAP_ROW + 4;

/// Top-left grid cell of a `view_w` x `view_h` window that keeps `focus`
/// visible, centered when the board is larger than the window.
fn viewport_origin(focus: GridPos, bounds: Bounds, view_w: usize, view_h: usize) -> GridPos {
    fn axis(focus: i32, len: i32, view: i32) -> i32 {
        if len <= view {
            1
        } else {
            (focus - view / 2).clamp(1, len - view + 1)
        }
    }
    GridPos::new(
        axis(focus.x, bounds.width, view_w as i32),
        axis(focus.y, bounds.height, view_h as i32),
    )
}

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    /// Shown in the help line when a pad is attached.
    pub gamepad_connected: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            gamepad_connected: false,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame.
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    /// Level-select rows that fit the current terminal.
    pub fn list_rows(&self) -> usize {
        list_visible_rows(self.term_h)
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, world: &WorldState) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Phase change: clear for a clean transition
        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        self.compose(world);
        self.flush_diff()?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(())
    }

    fn compose(&mut self, world: &WorldState) {
        self.front.clear();
        match world.phase {
            Phase::Title => self.compose_title(world),
            Phase::LevelSelect => self.compose_level_select(world),
            Phase::Playing => self.compose_game(world),
        }
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors; ResetColor would fall back to the
        // terminal default, which may differ from BASE_BG.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }

                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_game(&mut self, w: &WorldState) {
        let reg = &w.registry;
        let bounds = reg.bounds();

        // ── HUD row ──
        let hud = format!(
            " Level {}/{}  {}   Moves: {} ",
            w.current_level + 1, w.total_levels(), w.level_name, w.moves,
        );
        self.front.put_bar(HUD_ROW, &hud, Color::White, HUD_BG);

        // ── Map (viewport around the player) ──
        let view_w = (self.front.width / CELL_W).min(bounds.width.max(0) as usize);
        let view_h = self.front.height.saturating_sub(RESERVED_ROWS).max(1)
            .min(bounds.height.max(0) as usize);
        let focus = reg.player().map_or(GridPos::new(1, 1), |p| p.pos);
        let origin = viewport_origin(focus, bounds, view_w, view_h);

        for vy in 0..view_h {
            for vx in 0..view_w {
                let pos = GridPos::new(origin.x + vx as i32, origin.y + vy as i32);
                self.compose_cell(w, pos, vx * CELL_W, MAP_ROW + vy);
            }
        }

        // ── Message bar ──
        let msg_row = MAP_ROW + view_h + 1;
        if !w.message.is_empty() {
            let msg = format!(" > {} ", w.message);
            self.front.put_bar(msg_row, &msg, Color::Black, MSG_BG);
        }

        // ── Help bar ──
        let help_row = msg_row + 2;
        let pad = if self.gamepad_connected { "  |  Pad: D-pad move, Y restart, L1/R1 level" } else { "" };
        let help = format!(" WASD/Arrows: Move  R: Restart  N/P: Level  L: Select  Esc: Title  Q: Quit{pad}");
        self.front.put_str(0, help_row, &help, Color::DarkGrey, Color::Reset);
    }

    fn compose_cell(&mut self, w: &WorldState, pos: GridPos, col: usize, row: usize) {
        let occupants = w.registry.entities_at(pos);
        // The player is drawn on top; a stacked cell gets a warning tint.
        let top = occupants.iter()
            .find(|e| e.kind == Kind::Player)
            .or_else(|| occupants.first());
        let bg = if occupants.len() > 1 { STACKED_BG } else { Color::Reset };

        let (text, fg) = match top {
            Some(e) => glyph(e.kind),
            None => (" .", FLOOR),
        };
        for (i, ch) in text.chars().enumerate() {
            self.front.set(col + i, row, Cell::new(ch, fg, bg));
        }
    }

    fn compose_title(&mut self, w: &WorldState) {
        let title = [
            r"  ___       _        _     _         _    ",
            r" / __| ___ | |__ ___| |__ | | ___  __| |__",
            r" \__ \/ _ \| / // _ \ '_ \| |/ _ \/ _| / /",
            r" |___/\___/|_\_\\___/_.__/|_|\___/\__|_\_\",
        ];
        for (i, line) in title.iter().enumerate() {
            self.front.put_str(2, 2 + i, line, ACCENT, Color::Reset);
        }

        let tagline = "push, drag and coax the blocks";
        let tx = 2 + title[1].len().saturating_sub(tagline.len()) / 2;
        self.front.put_str(tx, 7, tagline, HIGHLIGHT, Color::Reset);

        let menu_base = 10;
        self.front.put_str(8, menu_base,     "ENTER   Start", HIGHLIGHT, Color::Reset);
        self.front.put_str(8, menu_base + 1, "  L     Level Select", Color::White, Color::Reset);
        self.front.put_str(8, menu_base + 2, "  Q     Quit", Color::White, Color::Reset);

        let source = format!("{}  ({} levels)", w.source_name, w.total_levels());
        self.front.put_str(8, menu_base + 4, &source, Color::DarkGrey, Color::Reset);

        let legend: [(Kind, &str); 5] = [
            (Kind::Player,   "you"),
            (Kind::Wall,     "wall"),
            (Kind::Pushable, "block: push it"),
            (Kind::Sticky,   "sticky: slides along when you move beside it"),
            (Kind::Clingy,   "clingy: follows you, never pushed"),
        ];
        let legend_base = menu_base + 6;
        self.front.put_str(8, legend_base, "Legend", ACCENT, Color::Reset);
        for (i, (kind, text)) in legend.iter().enumerate() {
            let (g, fg) = glyph(*kind);
            self.front.put_str(10, legend_base + 1 + i, g, fg, Color::Reset);
            self.front.put_str(14, legend_base + 1 + i, text, Color::White, Color::Reset);
        }

        if !w.message.is_empty() {
            let msg_row = self.front.height.saturating_sub(1);
            if msg_row > legend_base + legend.len() {
                let msg = format!(" > {} ", w.message);
                self.front.put_bar(msg_row, &msg, Color::Black, MSG_BG);
            }
        }
    }

    fn compose_level_select(&mut self, w: &WorldState) {
        let cursor_bg = Color::Rgb { r: 30, g: 60, b: 30 };

        self.front.put_str(2, 1, "LEVEL SELECT", ACCENT, Color::Reset);
        self.front.put_str(2, 2, &w.source_name, Color::DarkGrey, Color::Reset);

        let list_top = 4;
        let visible = list_visible_rows(self.front.height);
        let total = w.total_levels();
        let scroll = w.select_scroll;

        if scroll > 0 {
            self.front.put_str(4, list_top - 1, "^ ^ ^", Color::DarkGrey, Color::Reset);
        }

        for (i, def) in w.levels.iter().enumerate().skip(scroll).take(visible) {
            let row = list_top + (i - scroll);
            let label = format!("{:>3}. {}", i + 1, def.name);
            let label: String = label.chars().take(44).collect();
            if i == w.select_cursor {
                for x in 0..48.min(self.front.width) {
                    self.front.set(x, row, Cell::new(' ', Color::White, cursor_bg));
                }
                self.front.put_str(2, row, ">", HIGHLIGHT, cursor_bg);
                self.front.put_str(3, row, &label, HIGHLIGHT, cursor_bg);
            } else {
                self.front.put_str(3, row, &label, Color::White, Color::Reset);
            }
        }

        if scroll + visible < total {
            self.front.put_str(4, list_top + visible, "v v v", Color::DarkGrey, Color::Reset);
        }

        let footer_row = list_top + visible + 2;
        self.front.put_str(2, footer_row, "ENTER: Play   Up/Down: Select   PgUp/PgDn   Esc: Back", Color::DarkGrey, Color::Reset);
        let count = format!("{}/{} levels", (w.select_cursor + 1).min(total), total);
        self.front.put_str(2, footer_row + 1, &count, Color::DarkGrey, Color::Reset);
    }
}

/// Level-select rows that fit on a terminal of `term_h` rows.
fn list_visible_rows(term_h: usize) -> usize {
    16_usize.min(term_h.saturating_sub(8)).max(1)
}
