pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod notation;
pub mod options;
pub mod protocol;
pub mod recorder;
pub mod session;
