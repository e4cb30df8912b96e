/// Logger setup.
///
/// The terminal is in raw mode on the alternate screen while the game
/// runs, so log records go to a file by default. `RUST_LOG` overrides the
/// level from config.toml.

use std::fs::OpenOptions;
use std::io;

use env_logger::{Builder, Env, Target};

use crate::config::LogConfig;

pub fn init(cfg: &LogConfig) -> io::Result<()> {
    let mut builder = Builder::from_env(Env::default().default_filter_or(cfg.level.as_str()));
    builder.format_timestamp_millis();

    if let Some(path) = &cfg.file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    // A second init (tests, embedding) keeps the first logger.
    let _ = builder.try_init();
    Ok(())
}
