use log::warn;

use crate::protocol::{Command, Context, Flow, MatchKind};
use crate::session::Dialect;

// commands xboard sends that need no answer from us
const IGNORED: [&str; 11] = [
    "accepted", "rejected", "random", "post", "nopost", "hard", "easy", "computer", "level",
    "time", "otim",
];

pub fn commands() -> Vec<Command> {
    let mut commands = vec![
        Command::new("protover", MatchKind::Prefix, protover),
        Command::new("setboard", MatchKind::Prefix, setboard),
        Command::new("usermove", MatchKind::Prefix, usermove),
        Command::new("result", MatchKind::Prefix, result),
    ];
    commands.extend(
        IGNORED
            .iter()
            .map(|pattern| Command::new(*pattern, MatchKind::Prefix, ignore)),
    );
    commands
}

fn feature_line(ctx: &Context<'_>) -> String {
    format!(
        "feature myname=\"{}\" setboard=1 usermove=1 sigint=0 done=1",
        ctx.engine.name()
    )
}

pub(crate) fn xboard(ctx: &mut Context<'_>, _args: &str) -> Flow {
    ctx.session.negotiate(Dialect::LegacyScreen);
    let line = feature_line(ctx);
    ctx.emit(&line);
    Flow::Continue
}

fn protover(ctx: &mut Context<'_>, _args: &str) -> Flow {
    let line = feature_line(ctx);
    ctx.emit(&line);
    Flow::Continue
}

fn setboard(ctx: &mut Context<'_>, args: &str) -> Flow {
    match ctx.session.set_fen(args) {
        Ok(()) => ctx.snapshot(),
        Err(err) => {
            warn!("{err}");
            ctx.emit("Bad FEN");
        }
    }
    Flow::Continue
}

fn usermove(ctx: &mut Context<'_>, args: &str) -> Flow {
    ctx.play_move(args)
}

/// `result 1-0 {White mates}`
fn result(ctx: &mut Context<'_>, args: &str) -> Flow {
    if let Some(result) = args.split_whitespace().next() {
        ctx.session.set_result(result);
        ctx.snapshot();
    }
    Flow::Continue
}

fn ignore(_ctx: &mut Context<'_>, _args: &str) -> Flow {
    Flow::Continue
}
