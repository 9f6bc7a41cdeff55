use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

use crate::engine::Backend;

#[derive(Parser, Debug)]
#[command(name = "turobridge", version, about = "xboard and UCI front end for PyTuroChamp style engines")]
pub struct Config {
    /// Move generator: `ptc` scores in pawns, `bare` in centipawns
    #[arg(default_value = "ptc")]
    pub backend: Backend,

    /// Verbatim copy of the session [default: <engine>-log.txt]
    #[arg(long)]
    pub transcript: Option<PathBuf>,

    /// Game record, rewritten after every move [default: <engine>-game.pgn]
    #[arg(long)]
    pub pgn: Option<PathBuf>,

    /// Name recorded for the side the engine is not playing
    #[arg(long, default_value = "Human")]
    pub opponent: String,

    /// Diagnostic log file; stderr when absent
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[arg(long, default_value = "warn", value_parser = ["off", "error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Seed for move and blunder noise
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Config {
    pub fn transcript_path(&self) -> PathBuf {
        self.transcript
            .clone()
            .unwrap_or_else(|| format!("{}-log.txt", self.backend.engine_name()).into())
    }

    pub fn pgn_path(&self) -> PathBuf {
        self.pgn
            .clone()
            .unwrap_or_else(|| format!("{}-game.pgn", self.backend.engine_name()).into())
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Warn)
    }
}

#[test]
fn defaults_follow_the_backend() {
    let config = Config::try_parse_from(["turobridge"]).unwrap();
    assert_eq!(config.backend, Backend::TuroChamp);
    assert_eq!(config.transcript_path(), PathBuf::from("PyTuroChamp-log.txt"));
    assert_eq!(config.pgn_path(), PathBuf::from("PyTuroChamp-game.pgn"));
    assert_eq!(config.log_level(), LevelFilter::Warn);

    let config = Config::try_parse_from(["turobridge", "bare"]).unwrap();
    assert_eq!(config.backend, Backend::Bare);
    assert_eq!(config.transcript_path(), PathBuf::from("Bare-log.txt"));
}

#[test]
fn flags_override_defaults() {
    let config = Config::try_parse_from([
        "turobridge",
        "ptc",
        "--transcript",
        "t.txt",
        "--pgn",
        "g.pgn",
        "--seed",
        "42",
        "--log-level",
        "debug",
    ])
    .unwrap();

    assert_eq!(config.transcript_path(), PathBuf::from("t.txt"));
    assert_eq!(config.pgn_path(), PathBuf::from("g.pgn"));
    assert_eq!(config.seed, Some(42));
    assert_eq!(config.log_level(), LevelFilter::Debug);

    assert!(Config::try_parse_from(["turobridge", "stockfish"]).is_err());
}
