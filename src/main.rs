use std::error::Error;
use std::fs::File;
use std::io;

use clap::Parser;
use log::{debug, info, warn};
use simplelog::{ColorChoice, TermLogger, TerminalMode, WriteLogger};

use turobridge::config::Config;
use turobridge::dispatcher::Dispatcher;
use turobridge::recorder::{GameRecordFile, PlayerNames, Recorder, Transcript};

// Start with:
// xboard -fcp "turobridge ptc"

fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::parse();
    init_logging(&config)?;

    // xboard sends SIGINT while the engine thinks
    if let Err(err) = ctrlc::set_handler(|| debug!("ignoring interrupt")) {
        warn!("could not install interrupt handler: {err}");
    }

    let engine = config.backend.build(config.seed);
    info!("using {} ({})", engine.name(), config.backend);

    let transcript = Transcript::create(config.transcript_path()).unwrap_or_else(|err| {
        warn!("{err}");
        Transcript::disabled()
    });
    let record_file = GameRecordFile::create(config.pgn_path()).unwrap_or_else(|err| {
        warn!("{err}");
        GameRecordFile::disabled()
    });
    let names = PlayerNames {
        engine: engine.name().to_string(),
        opponent: config.opponent.clone(),
    };

    let stdin = io::stdin().lock();
    let stdout = io::stdout().lock();

    Dispatcher::new(stdin, stdout, engine, Recorder::new(transcript, record_file, names)).run();

    Ok(())
}

fn init_logging(config: &Config) -> Result<(), Box<dyn Error>> {
    // stdout belongs to the gui
    match &config.log_file {
        Some(path) => WriteLogger::init(
            config.log_level(),
            simplelog::Config::default(),
            File::create(path)?,
        )?,
        None => TermLogger::init(
            config.log_level(),
            simplelog::Config::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        )?,
    }

    Ok(())
}
