//! Command-line arguments for the headless streaming demo.

use std::path::PathBuf;

use clap::Parser;
use cubeworld_world::WorldSeed;

use crate::config::EngineConfig;

/// Walks a viewer through a generated world and reports streaming statistics.
///
/// CLI values override settings loaded from `--config`.
#[derive(Parser, Debug)]
#[command(name = "cubeworld", about = "Voxel world streaming demo")]
pub struct CliArgs {
    /// Engine config file (TOML).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// World seed; numbers are used as-is, anything else is hashed.
    #[arg(long)]
    pub seed: Option<String>,

    /// Render distance in chunks.
    #[arg(long)]
    pub render_distance: Option<i32>,

    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 600)]
    pub ticks: u32,

    /// Viewer speed in blocks per second along +X.
    #[arg(long, default_value_t = 8.0)]
    pub speed: f32,

    /// Directory for chunk storage; in-memory when absent.
    #[arg(long)]
    pub save_dir: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace). Falls back to `RUST_LOG`.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Also write logs to this file.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

pub fn parse_seed(text: &str) -> WorldSeed {
    match text.trim().parse::<i64>() {
        Ok(n) => WorldSeed::Number(n),
        Err(_) => WorldSeed::Text(text.to_string()),
    }
}

impl EngineConfig {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref seed) = args.seed {
            self.world.seed = parse_seed(seed);
        }
        if let Some(rd) = args.render_distance {
            self.stream.render_distance = rd;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_loaded_values() {
        let args = CliArgs::parse_from(["cubeworld", "--seed", "alpha", "--render-distance", "2"]);
        let mut cfg = EngineConfig::default();
        cfg.apply_cli_overrides(&args);
        assert_eq!(cfg.world.seed, WorldSeed::Text("alpha".into()));
        assert_eq!(cfg.stream.render_distance, 2);
        assert_eq!(args.ticks, 600);
    }

    #[test]
    fn numeric_seeds_stay_numbers() {
        assert_eq!(parse_seed("-12"), WorldSeed::Number(-12));
        assert_eq!(parse_seed("12a"), WorldSeed::Text("12a".into()));
    }
}
