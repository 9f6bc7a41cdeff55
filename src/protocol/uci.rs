use crate::options::EngineOptions;
use crate::protocol::{Command, Context, Flow, MatchKind};
use crate::session::Dialect;

pub fn commands() -> Vec<Command> {
    vec![
        Command::new("isready", MatchKind::Exact, is_ready),
        // searches finish before the next line is read
        Command::new("stop", MatchKind::Exact, ignore),
        Command::new("debug", MatchKind::Prefix, ignore),
        Command::new("ponderhit", MatchKind::Exact, ignore),
    ]
}

pub(crate) fn uci(ctx: &mut Context<'_>, _args: &str) -> Flow {
    ctx.session.negotiate(Dialect::Engine);

    let name = format!("id name {}", ctx.engine.name());
    let author = format!("id author {}", ctx.engine.author());
    ctx.emit(&name);
    ctx.emit(&author);

    for declaration in EngineOptions::declarations() {
        ctx.emit(&declaration);
    }

    ctx.emit("uciok");
    Flow::Continue
}

fn is_ready(ctx: &mut Context<'_>, _args: &str) -> Flow {
    ctx.session.ensure_game();

    let name = format!("id name {}", ctx.engine.name());
    ctx.emit(&name);
    ctx.emit("readyok");
    Flow::Continue
}

fn ignore(_ctx: &mut Context<'_>, _args: &str) -> Flow {
    Flow::Continue
}
