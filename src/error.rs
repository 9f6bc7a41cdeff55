use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InvalidFenError {
    #[error("Expected 6 fen fields, got {0}")]
    FieldCount(usize),
    #[error("Unparsable fen: {0}")]
    Syntax(String),
    #[error("Illegal position: {0}")]
    IllegalPosition(String),
}

#[derive(Error, Debug)]
pub enum MoveError {
    #[error("Not coordinate notation: {0}")]
    NotCoordinate(String),
    #[error("Illegal move: {0}")]
    Illegal(String),
}

#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("Could not write transcript {path}: {source}")]
    Transcript { path: String, source: io::Error },
    #[error("Could not write game record {path}: {source}")]
    GameRecord { path: String, source: io::Error },
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unknown backend: {0}")]
    UnknownBackend(String),
}

#[derive(Error, Debug)]
pub enum InvalidOptionError {
    #[error("Unknown option: {0}")]
    UnknownOption(String),
    #[error("Missing value for option {0}")]
    MissingValue(String),
    #[error("Invalid value for option {name}: {value}")]
    InvalidValue { name: String, value: String },
}
