use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use shakmaty::{Chess, Move};

use crate::error::EngineError;
use crate::options::EngineOptions;

pub mod bare;
pub mod search;
pub mod turochamp;

pub use bare::Bare;
pub use turochamp::TuroChamp;

/// The scale a backend reports its scores on, which decides how the `pstab`
/// option is normalised before it reaches the backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScoreUnit {
    Pawns,
    Centipawns,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    /// From the side to move's point of view.
    pub score_cp: i32,
    pub depth: usize,
    pub nodes: u64,
    pub elapsed: Duration,
}

impl Metrics {
    pub fn score_pawns(&self) -> f64 {
        self.score_cp as f64 / 100.0
    }
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub metrics: Metrics,
    pub best_move: Option<Move>,
}

/// A move generating backend.
///
/// Calls block until the search finishes. `best_move` is `None` when the
/// side to move has no legal move or the backend declines to answer.
pub trait Engine {
    fn name(&self) -> &str;
    fn author(&self) -> &str;
    fn score_unit(&self) -> ScoreUnit;
    fn compute_reply(&mut self, position: &Chess, options: &EngineOptions) -> Reply;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Backend {
    TuroChamp,
    Bare,
}

impl FromStr for Backend {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ptc" | "turochamp" => Ok(Backend::TuroChamp),
            "bare" => Ok(Backend::Bare),
            _ => Err(EngineError::UnknownBackend(s.into())),
        }
    }
}

impl Display for Backend {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Backend::TuroChamp => write!(f, "ptc"),
            Backend::Bare => write!(f, "bare"),
        }
    }
}

impl Backend {
    pub fn engine_name(&self) -> &'static str {
        match self {
            Backend::TuroChamp => turochamp::NAME,
            Backend::Bare => bare::NAME,
        }
    }

    pub fn build(&self, seed: Option<u64>) -> Box<dyn Engine> {
        match self {
            Backend::TuroChamp => Box::new(TuroChamp::new(seed)),
            Backend::Bare => Box::new(Bare::new(seed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backends_parse_from_cli_names() {
        assert_eq!("ptc".parse::<Backend>().unwrap(), Backend::TuroChamp);
        assert_eq!("turochamp".parse::<Backend>().unwrap(), Backend::TuroChamp);
        assert_eq!("bare".parse::<Backend>().unwrap(), Backend::Bare);
        assert!("stockfish".parse::<Backend>().is_err());
    }

    #[test]
    fn backends_declare_their_units() {
        assert_eq!(Backend::TuroChamp.build(Some(1)).score_unit(), ScoreUnit::Pawns);
        assert_eq!(Backend::Bare.build(Some(1)).score_unit(), ScoreUnit::Centipawns);
    }
}
