use std::io::{BufRead, ErrorKind, Write};

use log::{debug, error, info};

use crate::engine::Engine;
use crate::protocol::{CommandTable, Context, Flow};
use crate::recorder::Recorder;
use crate::session::Session;

/// Reads one command at a time and runs it to completion before reading the
/// next, so at most one search is ever in flight.
pub struct Dispatcher<R: BufRead, W: Write> {
    input: R,
    output: W,
    session: Session,
    engine: Box<dyn Engine>,
    recorder: Recorder,
    table: CommandTable,
}

impl<R: BufRead, W: Write> Dispatcher<R, W> {
    pub fn new(input: R, output: W, engine: Box<dyn Engine>, recorder: Recorder) -> Dispatcher<R, W> {
        let session = Session::new();
        let table = CommandTable::for_dialect(session.dialect());

        Dispatcher {
            input,
            output,
            session,
            engine,
            recorder,
            table,
        }
    }

    /// Runs until `quit` or the end of input.
    pub fn run(&mut self) {
        while let Some(line) = self.next_line() {
            if self.handle_line(&line) == Flow::Quit {
                info!("quit");
                return;
            }
        }

        info!("end of input");
    }

    /// Blocks for the next line. An interrupted read is retried, keeping
    /// whatever was already buffered.
    fn next_line(&mut self) -> Option<String> {
        let mut buffer = String::new();

        loop {
            match self.input.read_line(&mut buffer) {
                Ok(0) if buffer.is_empty() => return None,
                Ok(_) => return Some(buffer),
                Err(err) if err.kind() == ErrorKind::Interrupted => {
                    debug!("read interrupted, retrying");
                }
                Err(err) => {
                    error!("could not read input: {err}");
                    return None;
                }
            }
        }
    }

    pub fn handle_line(&mut self, raw: &str) -> Flow {
        let raw = raw.trim_end_matches(['\r', '\n']);
        if raw.is_empty() {
            return Flow::Continue;
        }

        let mut ctx = Context {
            session: &mut self.session,
            engine: self.engine.as_mut(),
            recorder: &mut self.recorder,
            out: &mut self.output,
        };

        // logged verbatim, before anything can go wrong with it
        if let Err(err) = ctx.recorder.log_input(raw) {
            ctx.report(err);
        }

        let line = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            return Flow::Continue;
        }

        let flow = match self.table.lookup(&line) {
            Some((command, args)) => (command.handler)(&mut ctx, args),
            None => ctx.play_move(&line),
        };

        // the table is swapped once, when the handshake picks a dialect
        if self.table.dialect() != self.session.dialect() {
            debug!("switching to {:?} commands", self.session.dialect());
            self.table = CommandTable::for_dialect(self.session.dialect());
        }

        flow
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn output(&self) -> &W {
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::{self, BufReader, Cursor, Read};

    use shakmaty::{CastlingMode, Position};

    use super::*;
    use crate::engine::{Backend, Metrics, Reply, ScoreUnit};
    use crate::options::{EngineOptions, OptionName};
    use crate::recorder::{GameRecordFile, PlayerNames, Transcript};
    use crate::session::Dialect;

    /// Plays the first legal move; lets the protocol tests run without a search.
    struct FirstMove {
        unit: ScoreUnit,
    }

    impl Engine for FirstMove {
        fn name(&self) -> &str {
            "FirstMove"
        }

        fn author(&self) -> &str {
            "tests"
        }

        fn score_unit(&self) -> ScoreUnit {
            self.unit
        }

        fn compute_reply(&mut self, position: &shakmaty::Chess, _options: &EngineOptions) -> Reply {
            Reply {
                metrics: Metrics {
                    score_cp: 25,
                    depth: 1,
                    ..Metrics::default()
                },
                best_move: position.legal_moves().first().cloned(),
            }
        }
    }

    fn names() -> PlayerNames {
        PlayerNames {
            engine: "FirstMove".into(),
            opponent: "Human".into(),
        }
    }

    fn dispatcher(input: &str, unit: ScoreUnit) -> Dispatcher<Cursor<String>, Vec<u8>> {
        Dispatcher::new(
            Cursor::new(input.to_string()),
            Vec::new(),
            Box::new(FirstMove { unit }),
            Recorder::disabled(names()),
        )
    }

    fn run(input: &str) -> (Dispatcher<Cursor<String>, Vec<u8>>, Vec<String>) {
        let mut d = dispatcher(input, ScoreUnit::Pawns);
        d.run();
        let out = String::from_utf8(d.output().clone()).unwrap();
        let lines = out.lines().map(str::to_string).collect();
        (d, lines)
    }

    fn plies<R: BufRead>(d: &Dispatcher<R, Vec<u8>>) -> Vec<String> {
        d.session()
            .game()
            .map(|g| {
                g.moves()
                    .iter()
                    .map(|m| m.to_uci(CastlingMode::Standard).to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn xboard_handshake_announces_features() {
        let (d, out) = run("xboard\nquit\n");
        assert_eq!(d.session().dialect(), Dialect::LegacyScreen);
        assert_eq!(
            out,
            ["feature myname=\"FirstMove\" setboard=1 usermove=1 sigint=0 done=1"]
        );
    }

    #[test]
    fn uci_handshake_declares_options() {
        let (d, out) = run("uci\nisready\nquit\n");
        assert_eq!(d.session().dialect(), Dialect::Engine);
        assert_eq!(out[0], "id name FirstMove");
        assert_eq!(out[1], "id author tests");
        assert_eq!(out.iter().filter(|l| l.starts_with("option name")).count(), 7);
        assert_eq!(out[9], "uciok");
        assert_eq!(out[10], "id name FirstMove");
        assert_eq!(out[11], "readyok");
        assert!(d.session().game().is_some());
    }

    #[test]
    fn uci_go_frames_bestmove() {
        let (d, out) = run("uci\nucinewgame\nisready\ngo\nquit\n");
        let best = out.last().unwrap();
        assert!(best.starts_with("bestmove "), "{best}");
        assert!(out.iter().any(|l| l.starts_with("info depth 1 score cp 25")));
        assert_eq!(plies(&d), [best.trim_start_matches("bestmove ").to_string()]);
    }

    #[test]
    fn xboard_move_provokes_a_reply() {
        let (d, out) = run("xboard\nnew\ne2e4\nquit\n");
        let played = plies(&d);
        assert_eq!(played.len(), 2);
        assert_eq!(played[0], "e2e4");
        assert_eq!(out[1], format!("move {}", played[1]));
        assert_eq!(out[2], "# 0.25");
    }

    #[test]
    fn xboard_move_then_go_records_plies_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let pgn = dir.path().join("game.pgn");

        let recorder = Recorder::new(
            Transcript::disabled(),
            GameRecordFile::create(&pgn).unwrap(),
            names(),
        );
        let mut d = Dispatcher::new(
            Cursor::new("xboard\nnew\ne2e4\ngo\nquit\n".to_string()),
            Vec::new(),
            Box::new(FirstMove {
                unit: ScoreUnit::Pawns,
            }),
            recorder,
        );
        d.run();

        // e2e4, the automatic reply, then the move asked for by go
        let played = plies(&d);
        assert_eq!(played.len(), 3);
        assert_eq!(played[0], "e2e4");

        let record = fs::read_to_string(&pgn).unwrap();
        let movetext = record.split("\n\n").nth(1).unwrap();
        let tokens: Vec<_> = movetext.split_whitespace().collect();
        assert_eq!(tokens[0], "1.");
        assert_eq!(tokens[1], "e4");
        assert_eq!(tokens.len(), 6);
    }

    #[test]
    fn move_now_repeats_without_recomputing() {
        let (d, out) = run("xboard\nnew\ngo\n?\n?\nquit\n");
        assert_eq!(plies(&d).len(), 1);
        let moves: Vec<_> = out.iter().filter(|l| l.starts_with("move ")).collect();
        assert_eq!(moves.len(), 3);
        assert_eq!(moves[1], moves[2]);
        assert_eq!(moves[0], moves[1]);
    }

    #[test]
    fn move_now_before_any_reply_is_silent() {
        let (_, out) = run("xboard\n?\nquit\n");
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn pstab_is_normalised_per_backend() {
        let (d, out) = run("uci\nsetoption name pstab value 20\nquit\n");
        assert_eq!(d.session().options().get(OptionName::PStab), 2);
        assert_eq!(out.last().unwrap(), "info string pstab = 2");

        let mut d = dispatcher("uci\nsetoption name pstab value 20\nquit\n", ScoreUnit::Centipawns);
        d.run();
        assert_eq!(d.session().options().get(OptionName::PStab), 20);
    }

    #[test]
    fn six_char_promotion_is_queened() {
        let (d, _) = run("xboard\nsetboard 8/4P3/8/8/8/8/k7/7K w - - 0 1\ne7e8qq\nquit\n");
        assert_eq!(plies(&d)[0], "e7e8q");
    }

    #[test]
    fn bad_fen_is_reported_and_recoverable() {
        let input = "uci\nposition startpos moves d2d4\nposition fen 8/8/8 w - - moves e2e4\nquit\n";
        let (d, out) = run(input);
        assert_eq!(out.last().unwrap(), "Bad FEN");
        assert_eq!(plies(&d), ["d2d4"]);

        let input = "xboard\nnew\nd2d4\nsetboard rnbqkbnr/pppppppp/8/8/8 w KQkq - 0 1\nsetboard 4k3/8/8/8/8/8/8/4K2R w K - 0 1\nquit\n";
        let (d, out) = run(input);
        assert!(out.iter().any(|l| l == "Bad FEN"));
        assert!(plies(&d).is_empty());
        assert_eq!(d.session().game().unwrap().initial_fen(), Some("4k3/8/8/8/8/8/8/4K2R w K - 0 1"));
    }

    #[test]
    fn position_route_matches_move_route() {
        let (batched, _) = run("uci\nposition startpos moves e2e4 e7e5 g1f3\nquit\n");
        let mut manual = Session::new();
        for m in ["e2e4", "e7e5", "g1f3"] {
            manual.apply_move(m).unwrap();
        }

        let a = batched.session().game().unwrap().position();
        let b = manual.game().unwrap().position();
        assert_eq!(a.board(), b.board());
        assert_eq!(a.turn(), b.turn());
    }

    #[test]
    fn garbage_is_dropped_silently() {
        let (d, out) = run("xboard\nhello there\ne2e9\na1a8\n\n   \nquit\n");
        assert_eq!(out.len(), 1);
        assert!(plies(&d).is_empty());
    }

    #[test]
    fn no_reply_in_a_finished_game() {
        let input = "xboard\nsetboard R5k1/5ppp/8/8/8/8/8/6K1 b - - 0 1\ngo\nquit\n";
        let (d, out) = run(input);
        assert_eq!(out.len(), 1);
        assert!(plies(&d).is_empty());
    }

    #[test]
    fn dialect_is_not_renegotiated() {
        let (d, _) = run("xboard\nuci\nquit\n");
        assert_eq!(d.session().dialect(), Dialect::LegacyScreen);
    }

    #[test]
    fn lines_after_quit_are_not_read() {
        let (d, _) = run("xboard\nquit\ne2e4\n");
        assert!(d.session().game().is_none());
    }

    #[test]
    fn end_of_input_stops_the_loop() {
        let (d, _) = run("xboard\nnew\ne2e4");
        assert_eq!(plies(&d).len(), 2);
    }

    /// Replays scripted `read_line` results. A chunk followed by an error kind
    /// is appended before the error is returned, as std does when a signal
    /// lands mid-line.
    struct ScriptedLines {
        script: Vec<(&'static str, Option<ErrorKind>)>,
    }

    impl Read for ScriptedLines {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
    }

    impl BufRead for ScriptedLines {
        fn fill_buf(&mut self) -> io::Result<&[u8]> {
            Ok(&[])
        }

        fn consume(&mut self, _amt: usize) {}

        fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
            if self.script.is_empty() {
                return Ok(0);
            }

            let (chunk, err) = self.script.remove(0);
            buf.push_str(chunk);
            match err {
                Some(kind) => Err(io::Error::from(kind)),
                None => Ok(chunk.len()),
            }
        }
    }

    #[test]
    fn interrupted_read_line_keeps_the_partial_line() {
        let input = ScriptedLines {
            script: vec![
                ("xb", Some(ErrorKind::Interrupted)),
                ("oard\n", None),
                ("ne", Some(ErrorKind::Interrupted)),
                ("w\n", None),
                ("", Some(ErrorKind::Interrupted)),
                ("e2e4\n", None),
                ("quit\n", None),
            ],
        };
        let mut d = Dispatcher::new(
            input,
            Vec::new(),
            Box::new(FirstMove {
                unit: ScoreUnit::Pawns,
            }),
            Recorder::disabled(names()),
        );
        d.run();

        let out = String::from_utf8(d.output().clone()).unwrap();
        assert_eq!(
            out.lines().next(),
            Some("feature myname=\"FirstMove\" setboard=1 usermove=1 sigint=0 done=1")
        );
        assert_eq!(plies(&d).len(), 2);
        assert_eq!(plies(&d)[0], "e2e4");
    }

    /// Fails its first read with `Interrupted`.
    struct InterruptOnce {
        data: Cursor<&'static [u8]>,
        interrupted: bool,
    }

    impl Read for InterruptOnce {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(ErrorKind::Interrupted.into());
            }
            self.data.read(buf)
        }
    }

    #[test]
    fn interrupted_fill_is_retried_by_buffered_reader() {
        // BufRead::read_line retries this itself; next_line never sees it
        let input = BufReader::new(InterruptOnce {
            data: Cursor::new(&b"xboard\nquit\n"[..]),
            interrupted: false,
        });
        let mut d = Dispatcher::new(
            input,
            Vec::new(),
            Box::new(FirstMove {
                unit: ScoreUnit::Pawns,
            }),
            Recorder::disabled(names()),
        );
        d.run();

        assert_eq!(d.session().dialect(), Dialect::LegacyScreen);
        let out = String::from_utf8(d.output().clone()).unwrap();
        assert!(out.starts_with("feature myname="));
    }

    #[test]
    fn transcript_keeps_input_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log.txt");

        let recorder = Recorder::new(
            Transcript::create(&log).unwrap(),
            GameRecordFile::disabled(),
            names(),
        );
        let mut d = Dispatcher::new(
            Cursor::new("uci\nposition   startpos  moves e2e4\n   \n\nquit\r\n".to_string()),
            Vec::new(),
            Box::new(FirstMove {
                unit: ScoreUnit::Pawns,
            }),
            recorder,
        );
        d.run();

        assert_eq!(plies(&d), ["e2e4"]);

        let transcript = fs::read_to_string(&log).unwrap();
        assert!(transcript.contains("\nposition   startpos  moves e2e4\n"));
        assert!(transcript.lines().any(|l| l == "   "));
        assert!(!transcript.lines().any(|l| l.is_empty()));
        assert!(transcript.ends_with("\nquit\n"));
    }

    #[test]
    fn record_failure_is_reported_and_play_continues() {
        let dir = tempfile::tempdir().unwrap();
        let record_file = GameRecordFile::create(dir.path().join("game.pgn")).unwrap();
        fs::remove_dir_all(dir.path()).unwrap();

        let mut d = Dispatcher::new(
            Cursor::new("xboard\nnew\ne2e4\nquit\n".to_string()),
            Vec::new(),
            Box::new(FirstMove {
                unit: ScoreUnit::Pawns,
            }),
            Recorder::new(Transcript::disabled(), record_file, names()),
        );
        d.run();

        let out = String::from_utf8(d.output().clone()).unwrap();
        let lines: Vec<_> = out.lines().collect();

        let reported = lines
            .iter()
            .position(|l| l.starts_with("# Could not write game record"))
            .expect("record failure should be reported");
        let replied = lines
            .iter()
            .position(|l| l.starts_with("move "))
            .expect("the reply should still be sent");
        assert!(reported < replied);
        assert_eq!(plies(&d).len(), 2);
    }

    #[test]
    fn usermove_goes_through_the_move_path() {
        let (d, out) = run("xboard\nnew\nusermove e2e4\nquit\n");
        let played = plies(&d);
        assert_eq!(played.len(), 2);
        assert_eq!(played[0], "e2e4");
        assert_eq!(out[1], format!("move {}", played[1]));
    }

    #[test]
    fn files_mirror_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log.txt");
        let pgn = dir.path().join("game.pgn");

        let recorder = Recorder::new(
            Transcript::create(&log).unwrap(),
            GameRecordFile::create(&pgn).unwrap(),
            names(),
        );
        let mut d = Dispatcher::new(
            Cursor::new("uci\nucinewgame\nisready\ngo\nquit\n".to_string()),
            Vec::new(),
            Box::new(FirstMove {
                unit: ScoreUnit::Pawns,
            }),
            recorder,
        );
        d.run();

        let out = String::from_utf8(d.output().clone()).unwrap();
        let transcript = fs::read_to_string(&log).unwrap();
        for line in out.lines() {
            assert!(transcript.contains(line), "{line} missing from transcript");
        }
        assert!(transcript.starts_with("uci\n"));
        assert!(transcript.ends_with("quit\n"));

        let record = fs::read_to_string(&pgn).unwrap();
        assert!(record.contains("[White \"FirstMove\"]"));
        let movetext = record.split("\n\n").nth(1).unwrap();
        assert_eq!(movetext.split_whitespace().collect::<Vec<_>>().len(), 3);
    }

    #[test]
    fn real_backend_plays_two_plies_over_xboard() {
        let mut d = Dispatcher::new(
            Cursor::new("xboard\nnew\ne2e4\nquit\n".to_string()),
            Vec::new(),
            Backend::Bare.build(Some(11)),
            Recorder::disabled(names()),
        );
        d.run();

        let game = d.session().game().unwrap();
        assert_eq!(game.moves().len(), 2);
        assert_eq!(game.position().turn(), shakmaty::Color::White);
    }
}
