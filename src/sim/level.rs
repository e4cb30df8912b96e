/// Level loader with pack support.
///
/// ## Sources (priority order):
///   1. Configured pack file (`.slp` format)
///   2. `levels/` directory (individual `.txt` files, sorted by filename)
///   3. Built-in embedded levels
///
/// ## Pack format (`.slp`: Sokoblock Level Pack):
///   ```text
///   ## Pack Name
///   ## Author: name
///   ---
///   # Level 1 - Name
///   <map rows>
///   ---
///   # Level 2 - Name
///   <map rows>
///   ```
///
/// Levels are separated by a line containing only `---`.
/// Pack metadata lines start with `##`.
///
/// ## Single-level format (`.txt`):
///   Line 1 (optional): `# Level Name`
///   Lines: map rows
///
/// ## Glyph legend:
///   '#' = Wall        '@' / 'P' = Player
///   'o' / '$' = Pushable   'S' = Sticky   'C' = Clingy
///   ' ' / '.' / '_' = Empty
///
/// Row `r` of the map is `y = r + 1`, column `c` is `x = c + 1`.

use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::config::GameConfig;
use crate::domain::entity::Kind;
use crate::domain::grid::{Bounds, GridPos};
use crate::domain::occupancy::CellQuery;
use crate::sim::registry::Registry;
use crate::sim::world::WorldState;

/// Runtime level data (owned strings, loaded from file or embedded).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelDef {
    pub name: String,
    pub rows: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LevelError {
    Empty,
    NoPlayer,
    MultiplePlayers(usize),
    /// 1-based row and column of the offending character.
    UnknownGlyph { row: usize, col: usize, glyph: char },
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelError::Empty => write!(f, "level has no map rows"),
            LevelError::NoPlayer => write!(f, "level has no player"),
            LevelError::MultiplePlayers(n) => write!(f, "level has {n} players, expected one"),
            LevelError::UnknownGlyph { row, col, glyph } => {
                write!(f, "unknown glyph {glyph:?} at row {row}, column {col}")
            }
        }
    }
}

impl std::error::Error for LevelError {}

/// Where the current level list came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LevelSource {
    Embedded,
    Directory(PathBuf),
    Pack { path: PathBuf, name: String, author: String },
}

impl LevelSource {
    pub fn describe(&self) -> String {
        match self {
            LevelSource::Embedded => "Built-in Levels".to_string(),
            LevelSource::Directory(dir) => format!("{}/", dir.display()),
            LevelSource::Pack { name, author, .. } if !author.is_empty() => {
                format!("{name} by {author}")
            }
            LevelSource::Pack { name, path, .. } => {
                let file = path.file_name().unwrap_or_default().to_string_lossy();
                format!("{name} ({file})")
            }
        }
    }
}

impl LevelDef {
    /// Build a fresh registry for this level. Validates every glyph and
    /// requires exactly one player.
    pub fn build(&self) -> Result<Registry, LevelError> {
        let height = self.rows.len();
        let width = self.rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(LevelError::Empty);
        }

        let mut reg = Registry::new(Bounds::new(width as i32, height as i32));
        let mut players = 0;
        for (r, row) in self.rows.iter().enumerate() {
            for (c, ch) in row.chars().enumerate() {
                if Kind::is_empty_glyph(ch) { continue; }
                let Some(kind) = Kind::from_glyph(ch) else {
                    return Err(LevelError::UnknownGlyph { row: r + 1, col: c + 1, glyph: ch });
                };
                if kind == Kind::Player { players += 1; }
                reg.spawn(kind, GridPos::new(c as i32 + 1, r as i32 + 1));
            }
        }

        match players {
            0 => Err(LevelError::NoPlayer),
            1 => Ok(reg),
            n => Err(LevelError::MultiplePlayers(n)),
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Parse and validate a single level from text.
pub fn parse_level(text: &str) -> Result<LevelDef, LevelError> {
    let mut name = String::new();
    let mut rows: Vec<String> = vec![];

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if rows.is_empty() && name.is_empty() && is_name_line(line) {
            name = line[1..].trim().to_string();
        } else if rows.is_empty() && line.trim().is_empty() {
            // leading blank lines
        } else {
            rows.push(line.to_string());
        }
    }

    while rows.last().map_or(false, |r| r.trim().is_empty()) {
        rows.pop();
    }

    if name.is_empty() {
        name = "Unnamed Level".to_string();
    }

    let def = LevelDef { name, rows };
    def.build()?;
    Ok(def)
}

/// Load the level list, trying the configured pack, then the levels
/// directory, then the embedded set.
pub fn load_levels(config: &GameConfig) -> (LevelSource, Vec<LevelDef>) {
    if let Some(path) = &config.pack {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let (name, author) = parse_pack_info(&content, path);
                let levels = parse_pack_levels(&content, path);
                if levels.is_empty() {
                    warn!("pack {} holds no valid levels", path.display());
                } else {
                    info!("loaded {} levels from pack {}", levels.len(), path.display());
                    return (LevelSource::Pack { path: path.clone(), name, author }, levels);
                }
            }
            Err(e) => warn!("could not read pack {}: {e}", path.display()),
        }
    }

    let dir = &config.levels_dir;
    if dir.is_dir() {
        let levels = load_from_directory(dir);
        if !levels.is_empty() {
            info!("loaded {} levels from {}", levels.len(), dir.display());
            return (LevelSource::Directory(dir.clone()), levels);
        }
    }

    let levels = embedded_levels();
    info!("using {} built-in levels", levels.len());
    (LevelSource::Embedded, levels)
}

/// Install level `idx` into the world. Returns false if there is no such
/// level or it fails to build; the world is left untouched in that case.
pub fn load_level(world: &mut WorldState, idx: usize) -> bool {
    let Some(def) = world.levels.get(idx) else {
        return false;
    };
    let name = def.name.clone();
    let registry = match def.build() {
        Ok(r) => r,
        Err(e) => {
            warn!("level {} ({}) failed to build: {e}", idx + 1, name);
            return false;
        }
    };

    let bounds = registry.bounds();
    let counts: Vec<String> = [Kind::Pushable, Kind::Sticky, Kind::Clingy]
        .into_iter()
        .map(|k| format!("{} {}", registry.of_kind(k).count(), k.name()))
        .collect();
    info!(
        "level {} \"{}\": {}x{}, {} entities ({})",
        idx + 1, name, bounds.width, bounds.height, registry.len(), counts.join(", "),
    );
    debug!("level {} layout:\n{}", idx + 1, registry.to_ascii());

    world.install(idx, &name, registry);
    true
}

// ══════════════════════════════════════════════════════════════
// Pack parsing
// ══════════════════════════════════════════════════════════════

/// Pack name and author from the leading `##` lines.
fn parse_pack_info(content: &str, path: &Path) -> (String, String) {
    let mut name = String::new();
    let mut author = String::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("## Author:") {
            author = rest.trim().to_string();
        } else if let Some(rest) = trimmed.strip_prefix("##") {
            if name.is_empty() {
                name = rest.trim().to_string();
            }
        } else if trimmed == "---" || trimmed.starts_with('#') {
            break;
        }
    }

    if name.is_empty() {
        name = path.file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
    }
    (name, author)
}

/// Parse all levels from a `.slp` pack. Invalid sections are skipped.
fn parse_pack_levels(content: &str, path: &Path) -> Vec<LevelDef> {
    let mut sections: Vec<String> = vec![];
    let mut current = String::new();
    let mut in_levels = false;

    for line in content.lines() {
        if line.trim() == "---" {
            if in_levels && !current.trim().is_empty() {
                sections.push(std::mem::take(&mut current));
            }
            current.clear();
            in_levels = true;
            continue;
        }
        if in_levels {
            current.push_str(line);
            current.push('\n');
        }
    }
    if in_levels && !current.trim().is_empty() {
        sections.push(current);
    }

    sections.iter()
        .enumerate()
        .filter_map(|(i, text)| match parse_level(text) {
            Ok(def) => Some(def),
            Err(e) => {
                warn!("{}: skipping level {}: {e}", path.display(), i + 1);
                None
            }
        })
        .collect()
}

/// Distinguish `# Level Name` from a map row that starts with a wall.
/// A name line holds at least one character that is not a map glyph.
fn is_name_line(line: &str) -> bool {
    match line.strip_prefix('#') {
        Some(rest) => rest.chars().any(|c| Kind::from_glyph(c).is_none() && !Kind::is_empty_glyph(c)),
        None => false,
    }
}

// ══════════════════════════════════════════════════════════════
// Directory loading (individual .txt files)
// ══════════════════════════════════════════════════════════════

fn load_from_directory(dir: &Path) -> Vec<LevelDef> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!("could not read {}: {e}", dir.display());
            return vec![];
        }
    };

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| p.extension().map_or(false, |e| e == "txt"))
        .collect();
    files.sort();

    files.iter()
        .filter_map(|path| {
            let content = match std::fs::read_to_string(path) {
                Ok(c) => c,
                Err(e) => {
                    warn!("could not read {}: {e}", path.display());
                    return None;
                }
            };
            match parse_level(&content) {
                Ok(def) => Some(def),
                Err(e) => {
                    warn!("skipping {}: {e}", path.display());
                    None
                }
            }
        })
        .collect()
}

// ══════════════════════════════════════════════════════════════
// Embedded fallback levels
// ══════════════════════════════════════════════════════════════

pub fn embedded_levels() -> Vec<LevelDef> {
    vec![
        make_embedded("1 - First Push", &[
            "##########",
            "#        #",
            "#  o  o  #",
            "#   @    #",
            "#  o  o  #",
            "#        #",
            "##########",
        ]),
        make_embedded("2 - Sticky Fingers", &[
            "############",
            "#          #",
            "#  S    o  #",
            "#  @       #",
            "#     ##   #",
            "#  S    o  #",
            "#          #",
            "############",
        ]),
        make_embedded("3 - Clingy Friend", &[
            "############",
            "#          #",
            "#   C      #",
            "#   @   #  #",
            "#       #  #",
            "#  o    C  #",
            "#          #",
            "############",
        ]),
        make_embedded("4 - Entourage", &[
            "##############",
            "#            #",
            "#  S   #   o #",
            "# S@C  #     #",
            "#  C   ###   #",
            "#   o        #",
            "#        o   #",
            "##############",
        ]),
        make_embedded("5 - Tight Corridors", &[
            "##############",
            "#     #      #",
            "# S o # C  o #",
            "# @   #   ## #",
            "#   ###   S  #",
            "#  o     C   #",
            "#     #      #",
            "##############",
        ]),
    ]
}

fn make_embedded(name: &str, map: &[&str]) -> LevelDef {
    LevelDef {
        name: name.to_string(),
        rows: map.iter().map(|s| s.to_string()).collect(),
    }
}
