use std::io::Write;

use log::{debug, info, warn};

use crate::engine::Engine;
use crate::error::RecorderError;
use crate::options::parse_set_option;
use crate::recorder::Recorder;
use crate::session::{Dialect, Session};

pub mod uci;
pub mod xboard;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    /// The pattern followed by whitespace or the end of the line.
    Prefix,
    Contains,
}

pub type Handler = fn(&mut Context<'_>, &str) -> Flow;

#[derive(Copy, Clone)]
pub struct Command {
    pub pattern: &'static str,
    pub kind: MatchKind,
    pub handler: Handler,
}

impl Command {
    pub const fn new(pattern: &'static str, kind: MatchKind, handler: Handler) -> Command {
        Command {
            pattern,
            kind,
            handler,
        }
    }

    /// Returns the arguments after the pattern if `line` matches.
    fn matches<'l>(&self, line: &'l str, kind: MatchKind) -> Option<&'l str> {
        if self.kind != kind {
            return None;
        }

        match kind {
            MatchKind::Exact => (line == self.pattern).then_some(""),
            MatchKind::Prefix => {
                let rest = line.strip_prefix(self.pattern)?;
                (rest.is_empty() || rest.starts_with(' ')).then(|| rest.trim())
            }
            MatchKind::Contains => line
                .find(self.pattern)
                .map(|at| line[at + self.pattern.len()..].trim()),
        }
    }
}

/// The ordered commands understood in one dialect.
pub struct CommandTable {
    dialect: Dialect,
    commands: Vec<Command>,
}

impl CommandTable {
    pub fn for_dialect(dialect: Dialect) -> CommandTable {
        let mut commands = common_commands();
        match dialect {
            Dialect::Undetermined => {}
            Dialect::LegacyScreen => commands.extend(xboard::commands()),
            Dialect::Engine => commands.extend(uci::commands()),
        }

        CommandTable { dialect, commands }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Exact matches win over prefix matches, which win over substring
    /// matches. Within a kind the first entry wins.
    pub fn lookup<'l>(&self, line: &'l str) -> Option<(&Command, &'l str)> {
        [MatchKind::Exact, MatchKind::Prefix, MatchKind::Contains]
            .into_iter()
            .find_map(|kind| {
                self.commands
                    .iter()
                    .find_map(|c| c.matches(line, kind).map(|args| (c, args)))
            })
    }
}

fn common_commands() -> Vec<Command> {
    vec![
        Command::new("xboard", MatchKind::Exact, xboard::xboard),
        Command::new("uci", MatchKind::Exact, uci::uci),
        Command::new("ucinewgame", MatchKind::Exact, new_game),
        Command::new("new", MatchKind::Exact, new_game),
        Command::new("position", MatchKind::Prefix, position),
        Command::new("go", MatchKind::Prefix, go),
        Command::new("force", MatchKind::Exact, go),
        Command::new("?", MatchKind::Exact, move_now),
        Command::new("quit", MatchKind::Exact, quit),
        Command::new("setoption", MatchKind::Contains, set_option),
    ]
}

/// Everything a handler may touch while one command is in flight.
pub struct Context<'a> {
    pub session: &'a mut Session,
    pub engine: &'a mut dyn Engine,
    pub recorder: &'a mut Recorder,
    pub out: &'a mut dyn Write,
}

impl<'a> Context<'a> {
    /// Writes one protocol line and mirrors it to the transcript.
    pub fn emit(&mut self, line: &str) {
        self.write_line(line);

        if let Err(err) = self.recorder.log_output(line) {
            self.report(err);
        }
    }

    /// A line the GUI will treat as a comment.
    pub fn comment(&mut self, text: &str) {
        let line = comment_line(self.session.dialect(), text);
        self.emit(&line);
    }

    /// Recorder failures are shown to the GUI and otherwise ignored.
    pub fn report(&mut self, err: RecorderError) {
        warn!("{err}");
        let line = comment_line(self.session.dialect(), &err.to_string());
        self.write_line(&line);
    }

    fn write_line(&mut self, line: &str) {
        if let Err(err) = writeln!(self.out, "{line}").and_then(|_| self.out.flush()) {
            warn!("could not write to the gui: {err}");
        }
    }

    pub fn snapshot(&mut self) {
        if let Err(err) = self.recorder.snapshot(self.session) {
            self.report(err);
        }
    }

    /// Asks the backend for a move in the current position, plays it and
    /// frames it for the active dialect. Silent when there is no move.
    pub fn compute_reply(&mut self) {
        self.session.ensure_game();
        let Some(game) = self.session.game() else {
            return;
        };
        let reply = self
            .engine
            .compute_reply(game.position(), self.session.options());

        let Some(m) = reply.best_move else {
            info!("no move to play");
            return;
        };

        let metrics = reply.metrics;
        let uci = self.session.apply_reply(m, metrics.clone());

        match self.session.dialect() {
            Dialect::Engine => {
                self.emit(&format!(
                    "info depth {} score cp {} nodes {} time {}",
                    metrics.depth,
                    metrics.score_cp,
                    metrics.nodes,
                    metrics.elapsed.as_millis()
                ));
                self.emit(&format!("bestmove {uci}"));
            }
            Dialect::LegacyScreen | Dialect::Undetermined => {
                self.emit(&format!("move {uci}"));
                self.emit(&format!("# {:.2}", metrics.score_pawns()));
            }
        }

        self.snapshot();
    }

    /// The default path: a coordinate move from the GUI, answered at once.
    /// Anything that is not a legal move is dropped without a word.
    pub fn play_move(&mut self, text: &str) -> Flow {
        match self.session.apply_move(text) {
            Ok(m) => {
                debug!("played {m}");
                self.snapshot();
                self.compute_reply();
            }
            Err(err) => debug!("dropped {text:?}: {err}"),
        }

        Flow::Continue
    }
}

fn comment_line(dialect: Dialect, text: &str) -> String {
    match dialect {
        Dialect::Engine => format!("info string {text}"),
        Dialect::LegacyScreen | Dialect::Undetermined => format!("# {text}"),
    }
}

fn new_game(ctx: &mut Context<'_>, _args: &str) -> Flow {
    ctx.session.new_game();
    ctx.snapshot();
    Flow::Continue
}

fn go(ctx: &mut Context<'_>, _args: &str) -> Flow {
    ctx.compute_reply();
    Flow::Continue
}

fn move_now(ctx: &mut Context<'_>, _args: &str) -> Flow {
    let Some(uci) = ctx.session.last_reply().map(|r| r.uci.clone()) else {
        return Flow::Continue;
    };

    match ctx.session.dialect() {
        Dialect::Engine => ctx.emit(&format!("bestmove {uci}")),
        Dialect::LegacyScreen | Dialect::Undetermined => ctx.emit(&format!("move {uci}")),
    }

    Flow::Continue
}

fn quit(_ctx: &mut Context<'_>, _args: &str) -> Flow {
    Flow::Quit
}

/// `position startpos [moves ...]` or `position fen <6 fields> [moves ...]`
fn position(ctx: &mut Context<'_>, args: &str) -> Flow {
    let (setup, moves) = match args.split_once("moves") {
        Some((setup, moves)) => (setup.trim(), moves.split_whitespace().collect()),
        None => (args.trim(), Vec::new()),
    };

    let fen = if setup == "startpos" {
        None
    } else if let Some(fen) = setup.strip_prefix("fen") {
        Some(fen.trim())
    } else {
        debug!("unknown position setup {setup:?}");
        return Flow::Continue;
    };

    match ctx.session.set_position(fen, &moves) {
        Ok(played) => {
            debug!("position set with {played}/{} moves", moves.len());
            ctx.snapshot();
        }
        Err(err) => {
            warn!("{err}");
            ctx.emit("Bad FEN");
        }
    }

    Flow::Continue
}

/// `setoption name <name> value <value>`
fn set_option(ctx: &mut Context<'_>, args: &str) -> Flow {
    let unit = ctx.engine.score_unit();
    let stored = parse_set_option(args)
        .and_then(|(name, value)| ctx.session.set_option(name, value, unit));

    match stored {
        Ok((option, stored)) => ctx.comment(&format!("{option} = {stored}")),
        Err(err) => debug!("{err}"),
    }

    Flow::Continue
}
