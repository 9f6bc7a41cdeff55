use std::fs::{self, File};
use std::io::{self, LineWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use log::info;
use shakmaty::san::SanPlus;
use shakmaty::{Color, Position};

use crate::error::RecorderError;
use crate::session::Session;

const PGN_LINE_WIDTH: usize = 80;

/// Verbatim mirror of every line read and written, flushed per line.
pub struct Transcript {
    path: String,
    file: Option<LineWriter<File>>,
}

impl Transcript {
    /// Truncates whatever was at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Transcript, RecorderError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| RecorderError::Transcript {
            path: path.display().to_string(),
            source,
        })?;

        Ok(Transcript {
            path: path.display().to_string(),
            file: Some(LineWriter::new(file)),
        })
    }

    pub fn disabled() -> Transcript {
        Transcript {
            path: String::new(),
            file: None,
        }
    }

    pub fn record(&mut self, line: &str) -> Result<(), RecorderError> {
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };

        writeln!(file, "{line}")
            .and_then(|_| file.flush())
            .map_err(|source| RecorderError::Transcript {
                path: self.path.clone(),
                source,
            })
    }
}

pub struct PlayerNames {
    pub engine: String,
    pub opponent: String,
}

/// A replayable record of the current game.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub headers: Vec<(String, String)>,
    pub san: Vec<String>,
    pub result: String,
    first_move_number: u32,
    black_starts: bool,
}

impl GameRecord {
    /// Rebuilds the record from the live game, or `None` without one.
    pub fn from_session(session: &Session, names: &PlayerNames) -> Option<GameRecord> {
        let game = session.game()?;

        let mut pos = game.initial().clone();
        let first_move_number = pos.fullmoves().get();
        let black_starts = pos.turn() == Color::Black;

        let san = game
            .moves()
            .iter()
            .map(|m| SanPlus::from_move_and_play_unchecked(&mut pos, m).to_string())
            .collect();

        let result = session
            .result()
            .map(str::to_string)
            .or_else(|| game.position().outcome().map(|o| o.to_string()))
            .unwrap_or_else(|| "*".to_string());

        // the backend is black until it has moved
        let (white, black) = match session.engine_side() {
            Some(Color::White) => (&names.engine, &names.opponent),
            _ => (&names.opponent, &names.engine),
        };

        let mut headers = vec![
            ("Event".to_string(), "Computer chess game".to_string()),
            ("Site".to_string(), "?".to_string()),
            ("Date".to_string(), Local::now().format("%Y.%m.%d").to_string()),
            ("Round".to_string(), "?".to_string()),
            ("White".to_string(), white.clone()),
            ("Black".to_string(), black.clone()),
            ("Result".to_string(), result.clone()),
        ];
        if let Some(fen) = game.initial_fen() {
            headers.push(("SetUp".to_string(), "1".to_string()));
            headers.push(("FEN".to_string(), fen.to_string()));
        }

        Some(GameRecord {
            headers,
            san,
            result,
            first_move_number,
            black_starts,
        })
    }

    pub fn to_pgn(&self) -> String {
        let mut pgn: String = self
            .headers
            .iter()
            .map(|(k, v)| format!("[{k} \"{}\"]\n", v.replace('\\', "\\\\").replace('"', "\\\"")))
            .collect();
        pgn.push('\n');

        let mut tokens = Vec::with_capacity(self.san.len() * 3 / 2 + 1);
        let mut number = self.first_move_number;
        let mut white_to_move = !self.black_starts;

        for (i, san) in self.san.iter().enumerate() {
            if white_to_move {
                tokens.push(format!("{number}."));
            } else if i == 0 {
                tokens.push(format!("{number}..."));
            }
            tokens.push(san.clone());

            if !white_to_move {
                number += 1;
            }
            white_to_move = !white_to_move;
        }
        tokens.push(self.result.clone());

        let mut line = String::new();
        for token in tokens {
            if !line.is_empty() && line.len() + 1 + token.len() > PGN_LINE_WIDTH {
                pgn.push_str(&line);
                pgn.push('\n');
                line.clear();
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&token);
        }
        pgn.push_str(&line);
        pgn.push('\n');

        pgn
    }
}

/// The game record file, rewritten whole after every ply.
pub struct GameRecordFile {
    path: Option<PathBuf>,
}

impl GameRecordFile {
    /// Truncates whatever was at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<GameRecordFile, RecorderError> {
        let path = path.as_ref().to_path_buf();
        File::create(&path).map_err(|source| RecorderError::GameRecord {
            path: path.display().to_string(),
            source,
        })?;

        Ok(GameRecordFile { path: Some(path) })
    }

    pub fn disabled() -> GameRecordFile {
        GameRecordFile { path: None }
    }

    /// Writes a sibling temp file and renames it over the record, so readers
    /// never see a half written game.
    pub fn rewrite(&self, record: &GameRecord) -> Result<(), RecorderError> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let write = |pgn: &str| -> io::Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(pgn.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, path)
        };

        write(&record.to_pgn()).map_err(|source| RecorderError::GameRecord {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Owns both recorder files. Failures are returned for the caller to report;
/// none of them are fatal.
pub struct Recorder {
    transcript: Transcript,
    record_file: GameRecordFile,
    names: PlayerNames,
}

impl Recorder {
    pub fn new(transcript: Transcript, record_file: GameRecordFile, names: PlayerNames) -> Recorder {
        Recorder {
            transcript,
            record_file,
            names,
        }
    }

    pub fn disabled(names: PlayerNames) -> Recorder {
        Recorder::new(Transcript::disabled(), GameRecordFile::disabled(), names)
    }

    pub fn log_input(&mut self, line: &str) -> Result<(), RecorderError> {
        info!(target: "input", "{line}");
        self.transcript.record(line)
    }

    pub fn log_output(&mut self, line: &str) -> Result<(), RecorderError> {
        info!(target: "output", "{line}");
        self.transcript.record(line)
    }

    pub fn snapshot(&self, session: &Session) -> Result<(), RecorderError> {
        match GameRecord::from_session(session, &self.names) {
            Some(record) => self.record_file.rewrite(&record),
            None => Ok(()),
        }
    }
}
