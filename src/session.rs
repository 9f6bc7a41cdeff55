use log::{debug, warn};
use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, Move, Position};

use crate::engine::{Metrics, ScoreUnit};
use crate::error::{InvalidFenError, InvalidOptionError, MoveError};
use crate::notation::normalize_coordinate_move;
use crate::options::{EngineOptions, OptionName};

/// The protocol the GUI negotiated. Set at most once.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Undetermined,
    LegacyScreen,
    Engine,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LastReply {
    pub uci: String,
    pub metrics: Metrics,
}

/// A game from its starting position, with every ply applied since.
#[derive(Debug, Clone)]
pub struct Game {
    initial: Chess,
    initial_fen: Option<String>,
    position: Chess,
    moves: Vec<Move>,
}

impl Default for Game {
    fn default() -> Self {
        Game::from_position(Chess::default(), None)
    }
}

impl Game {
    fn from_position(pos: Chess, fen: Option<String>) -> Game {
        Game {
            initial: pos.clone(),
            initial_fen: fen,
            position: pos,
            moves: Vec::new(),
        }
    }

    pub fn from_fen(fen: &str) -> Result<Game, InvalidFenError> {
        let fen = fen.trim();
        let fields = fen.split_whitespace().count();
        if fields != 6 {
            return Err(InvalidFenError::FieldCount(fields));
        }

        let parsed: Fen = fen
            .parse()
            .map_err(|e| InvalidFenError::Syntax(format!("{e}")))?;
        let pos: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| InvalidFenError::IllegalPosition(format!("{e}")))?;

        Ok(Game::from_position(pos, Some(fen.to_string())))
    }

    pub fn position(&self) -> &Chess {
        &self.position
    }

    pub fn initial(&self) -> &Chess {
        &self.initial
    }

    pub fn initial_fen(&self) -> Option<&str> {
        self.initial_fen.as_deref()
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    /// Filters `text` to coordinate notation and plays it if the rules allow.
    /// Nothing changes on error.
    pub fn play_coordinate(&mut self, text: &str) -> Result<Move, MoveError> {
        let normalized = normalize_coordinate_move(text)?;

        let m = normalized
            .parse::<UciMove>()
            .map_err(|_| MoveError::NotCoordinate(normalized.clone()))?
            .to_move(&self.position)
            .map_err(|_| MoveError::Illegal(normalized.clone()))?;

        self.play(m.clone());
        Ok(m)
    }

    /// `m` must be legal in the current position.
    pub fn play(&mut self, m: Move) {
        self.position.play_unchecked(&m);
        self.moves.push(m);
    }
}

#[derive(Default)]
pub struct Session {
    game: Option<Game>,
    dialect: Dialect,
    options: EngineOptions,
    last_reply: Option<LastReply>,
    engine_side: Option<Color>,
    result: Option<String>,
}

impl Session {
    pub fn new() -> Session {
        Session::default()
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Only the first negotiation sticks.
    pub fn negotiate(&mut self, dialect: Dialect) -> bool {
        if self.dialect != Dialect::Undetermined || dialect == Dialect::Undetermined {
            debug!("ignoring switch from {:?} to {:?}", self.dialect, dialect);
            return false;
        }

        self.dialect = dialect;
        true
    }

    pub fn game(&self) -> Option<&Game> {
        self.game.as_ref()
    }

    pub fn ensure_game(&mut self) -> &mut Game {
        self.game.get_or_insert_with(Game::default)
    }

    pub fn new_game(&mut self) {
        self.replace_game(Game::default());
    }

    fn replace_game(&mut self, game: Game) {
        self.game = Some(game);
        self.engine_side = None;
        self.result = None;
    }

    /// Replaces the game with one from `fen`. The old game survives a bad fen.
    pub fn set_fen(&mut self, fen: &str) -> Result<(), InvalidFenError> {
        let game = Game::from_fen(fen)?;
        self.replace_game(game);
        Ok(())
    }

    /// Sets up `fen` (or the start position) and plays `moves` on it.
    ///
    /// A bad fen leaves everything untouched. Moves are played in order until
    /// one is rejected, and the game keeps the moves played before it.
    pub fn set_position(&mut self, fen: Option<&str>, moves: &[&str]) -> Result<usize, InvalidFenError> {
        let mut game = match fen {
            Some(fen) => Game::from_fen(fen)?,
            None => Game::default(),
        };

        let mut played = 0;
        for text in moves {
            if let Err(err) = game.play_coordinate(text) {
                warn!("position: {err}, ignoring the rest of the move list");
                break;
            }
            played += 1;
        }

        self.replace_game(game);
        Ok(played)
    }

    /// Plays a move typed by the opponent, creating a game if needed.
    /// Text that is not coordinate notation leaves the session alone.
    pub fn apply_move(&mut self, text: &str) -> Result<Move, MoveError> {
        let normalized = normalize_coordinate_move(text)?;
        self.ensure_game().play_coordinate(&normalized)
    }

    /// Plays the backend's move and remembers which side the backend has.
    /// Returns the move in coordinate notation.
    pub fn apply_reply(&mut self, m: Move, metrics: Metrics) -> String {
        let game = self.ensure_game();
        let side = game.position().turn();
        let uci = m.to_uci(CastlingMode::Standard).to_string();

        game.play(m);

        self.engine_side = Some(side);
        self.last_reply = Some(LastReply {
            uci: uci.clone(),
            metrics,
        });
        uci
    }

    pub fn last_reply(&self) -> Option<&LastReply> {
        self.last_reply.as_ref()
    }

    pub fn engine_side(&self) -> Option<Color> {
        self.engine_side
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn set_option(
        &mut self,
        name: &str,
        value: &str,
        unit: ScoreUnit,
    ) -> Result<(OptionName, i64), InvalidOptionError> {
        self.options.set_from_str(name, value, unit)
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn set_result(&mut self, result: &str) {
        self.result = Some(result.to_string());
    }
}
