/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
/// Problems are collected in `warnings` and logged once the logger is up.

use serde::Deserialize;
use std::path::{Path, PathBuf};

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub frame_ms: u64,
    pub levels_dir: PathBuf,
    /// Resolved `.slp` pack path, if one was configured.
    pub pack: Option<PathBuf>,
    pub log: LogConfig,
    pub gamepad: GamepadConfig,
    pub sound_enabled: bool,
    /// Where the config came from; `None` means built-in defaults.
    pub source: Option<PathBuf>,
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct LogConfig {
    pub level: String,
    /// `None` writes to stderr.
    pub file: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub restart: Vec<String>,
    pub next_level: Vec<String>,
    pub prev_level: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    log: TomlLog,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    sound: TomlSound,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default = "default_frame_ms")]
    frame_ms: u64,
    #[serde(default)]
    pack: String,
}

#[derive(Deserialize, Debug)]
struct TomlLog {
    #[serde(default = "default_log_level")]
    level: String,
    #[serde(default = "default_log_file")]
    file: String,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
    #[serde(default = "default_restart")]
    restart: Vec<String>,
    #[serde(default = "default_next_level")]
    next_level: Vec<String>,
    #[serde(default = "default_prev_level")]
    prev_level: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlSound {
    #[serde(default = "default_true")]
    enabled: bool,
}

// ── Defaults ──

fn default_levels_dir() -> String { "levels".into() }
fn default_frame_ms() -> u64 { 16 }
fn default_log_level() -> String { "info".into() }
fn default_log_file() -> String { "sokoblock.log".into() }
fn default_true() -> bool { true }

fn default_confirm() -> Vec<String> { vec!["A".into(), "Start".into()] }
fn default_cancel() -> Vec<String> { vec!["B".into(), "Select".into()] }
fn default_restart() -> Vec<String> { vec!["Y".into()] }
fn default_next_level() -> Vec<String> { vec!["R1".into()] }
fn default_prev_level() -> Vec<String> { vec!["L1".into()] }

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
            frame_ms: default_frame_ms(),
            pack: String::new(),
        }
    }
}

impl Default for TomlLog {
    fn default() -> Self {
        TomlLog { level: default_log_level(), file: default_log_file() }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            confirm: default_confirm(),
            cancel: default_cancel(),
            restart: default_restart(),
            next_level: default_next_level(),
            prev_level: default_prev_level(),
        }
    }
}

impl Default for TomlSound {
    fn default() -> Self {
        TomlSound { enabled: true }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let mut warnings = vec![];
        let (toml_cfg, source) = load_toml(&search_dirs, &mut warnings);
        Self::resolve(toml_cfg, source, &search_dirs, warnings)
    }

    /// Build a config from TOML text, resolving relative paths against `base`.
    #[cfg(test)]
    pub fn from_toml_str(text: &str, base: &Path) -> Self {
        let mut warnings = vec![];
        let toml_cfg = parse_toml(text, "config.toml", &mut warnings);
        Self::resolve(toml_cfg, None, &[base.to_path_buf()], warnings)
    }

    fn resolve(
        toml_cfg: TomlConfig,
        source: Option<PathBuf>,
        search_dirs: &[PathBuf],
        mut warnings: Vec<String>,
    ) -> Self {
        let levels_dir = resolve_path(&toml_cfg.general.levels_dir, search_dirs, |p| p.is_dir());

        let pack = match toml_cfg.general.pack.trim() {
            "" => None,
            name => {
                let path = resolve_path(name, search_dirs, |p| p.is_file());
                if !path.is_file() {
                    warnings.push(format!("pack file {} not found", path.display()));
                }
                Some(path)
            }
        };

        let frame_ms = if toml_cfg.general.frame_ms == 0 {
            warnings.push("frame_ms must be positive; using 16".into());
            default_frame_ms()
        } else {
            toml_cfg.general.frame_ms
        };

        let file = match toml_cfg.log.file.trim() {
            "" => None,
            f => Some(PathBuf::from(f)),
        };

        GameConfig {
            frame_ms,
            levels_dir,
            pack,
            log: LogConfig { level: toml_cfg.log.level, file },
            gamepad: GamepadConfig {
                confirm: toml_cfg.gamepad.confirm,
                cancel: toml_cfg.gamepad.cancel,
                restart: toml_cfg.gamepad.restart,
                next_level: toml_cfg.gamepad.next_level,
                prev_level: toml_cfg.gamepad.prev_level,
            },
            sound_enabled: toml_cfg.sound.enabled,
            source,
            warnings,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::resolve(TomlConfig::default(), None, &[PathBuf::from(".")], vec![])
    }
}

/// Absolute paths are taken as-is; relative ones are looked up in each
/// search dir and fall back to relative-to-CWD.
fn resolve_path(raw: &str, search_dirs: &[PathBuf], exists: impl Fn(&Path) -> bool) -> PathBuf {
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        return path;
    }
    search_dirs.iter()
        .map(|d| d.join(raw))
        .find(|p| exists(p))
        .unwrap_or(path)
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf], warnings: &mut Vec<String>) -> (TomlConfig, Option<PathBuf>) {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() { continue; }
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                let cfg = parse_toml(&text, &path.display().to_string(), warnings);
                return (cfg, Some(path));
            }
            Err(e) => warnings.push(format!("could not read {}: {e}", path.display())),
        }
    }
    (TomlConfig::default(), None)
}

fn parse_toml(text: &str, origin: &str, warnings: &mut Vec<String>) -> TomlConfig {
    match toml::from_str::<TomlConfig>(text) {
        Ok(cfg) => cfg,
        Err(e) => {
            warnings.push(format!("{origin} parse error, using defaults: {e}"));
            TomlConfig::default()
        }
    }
}
