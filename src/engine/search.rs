use std::time::Instant;

use log::debug;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use shakmaty::{Chess, Move, MoveList, Position, Role};

use crate::engine::{Metrics, Reply};
use crate::options::{EngineOptions, OptionName};

pub const CHECKMATE: i32 = (i16::MIN as i32) / 2;
pub const MIN_SCORE: i32 = CHECKMATE * 2;
const MAX_SCORE: i32 = -MIN_SCORE;

/// Static evaluation used at the leaves of the search.
pub trait Evaluator {
    /// Centipawns from the point of view of the side to move.
    fn evaluate(&self, pos: &Chess, opts: &EngineOptions) -> i32;
}

pub struct Searcher<'a, E: Evaluator> {
    eval: &'a E,
    opts: &'a EngineOptions,
    nodes: u64,
}

impl<'a, E: Evaluator> Searcher<'a, E> {
    pub fn new(eval: &'a E, opts: &'a EngineOptions) -> Searcher<'a, E> {
        Searcher {
            eval,
            opts,
            nodes: 0,
        }
    }

    /// Scores every root move to `1 + maxplies` plies, adds the configured
    /// move/blunder noise and picks the best.
    pub fn search(&mut self, pos: &Chess, rng: &mut ChaCha8Rng) -> Reply {
        let start = Instant::now();
        let depth = 1 + self.opts.max_plies();
        self.nodes = 0;

        let mut best: Option<(i32, Move)> = None;

        for m in ordered_moves(pos) {
            let mut child = pos.clone();
            child.play_unchecked(&m);

            let score = -self.pvs(&child, depth - 1, MIN_SCORE, MAX_SCORE, 1);
            let noisy = score + self.noise(rng);
            debug!(target: "search", "{} {} ({})", m, score, noisy);

            if best.as_ref().map_or(true, |(s, _)| noisy > *s) {
                best = Some((noisy, m));
            }
        }

        let metrics = Metrics {
            score_cp: best.as_ref().map_or(0, |(s, _)| *s),
            depth,
            nodes: self.nodes,
            elapsed: start.elapsed(),
        };

        Reply {
            metrics,
            best_move: best.map(|(_, m)| m),
        }
    }

    fn noise(&self, rng: &mut ChaCha8Rng) -> i32 {
        let move_error = self.opts.get(OptionName::MoveError) as i32;
        let blunder_error = self.opts.get(OptionName::BlunderError) as i32;
        let blunder_percent = self.opts.get(OptionName::BlunderPercent) as u32;

        let mut noise = 0;
        if move_error > 0 {
            noise += rng.gen_range(-move_error..=move_error);
        }
        if blunder_error > 0 && rng.gen_range(0..100) < blunder_percent {
            noise += rng.gen_range(-blunder_error..=blunder_error);
        }

        noise
    }

    fn pvs(&mut self, pos: &Chess, depth: usize, mut alpha: i32, beta: i32, ply: i32) -> i32 {
        self.nodes += 1;

        let moves = ordered_moves(pos);
        if moves.is_empty() {
            // mated sooner is worse
            return if pos.is_check() { CHECKMATE + ply } else { 0 };
        }
        if pos.is_insufficient_material() {
            return 0;
        }

        if depth == 0 {
            return self.quiesce(pos, self.opts.q_plies(), alpha, beta);
        }

        let mut pv = true;

        for m in moves {
            let mut child = pos.clone();
            child.play_unchecked(&m);

            let mut score;
            if pv {
                score = -self.pvs(&child, depth - 1, -beta, -alpha, ply + 1);
                pv = false;
            } else {
                score = -self.pvs(&child, depth - 1, -alpha - 1, -alpha, ply + 1);
                if score > alpha && score < beta {
                    score = -self.pvs(&child, depth - 1, -beta, -alpha, ply + 1);
                }
            }

            if score >= beta {
                return beta;
            }
            if score > alpha {
                alpha = score;
            }
        }

        alpha
    }

    fn quiesce(&mut self, pos: &Chess, qplies: usize, mut alpha: i32, beta: i32) -> i32 {
        self.nodes += 1;

        let stand_pat = self.eval.evaluate(pos, self.opts);
        if qplies == 0 || stand_pat >= beta {
            return stand_pat.min(beta);
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }

        for m in ordered_moves(pos).into_iter().filter(is_tactical) {
            let mut child = pos.clone();
            child.play_unchecked(&m);

            let score = -self.quiesce(&child, qplies - 1, -beta, -alpha);

            if score >= beta {
                return beta;
            }
            if score > alpha {
                alpha = score;
            }
        }

        alpha
    }
}

fn is_tactical(m: &Move) -> bool {
    m.is_capture() || m.is_promotion()
}

/// Legal moves, most valuable victim first.
fn ordered_moves(pos: &Chess) -> MoveList {
    let mut moves = pos.legal_moves();
    moves.sort_by_key(|m| -victim_value(m));
    moves
}

fn victim_value(m: &Move) -> i32 {
    let capture = m.capture().map_or(0, role_value);
    let promotion = m.promotion().map_or(0, role_value);
    capture + promotion
}

pub fn role_value(role: Role) -> i32 {
    match role {
        Role::Pawn => 100,
        Role::Knight => 320,
        Role::Bishop => 350,
        Role::Rook => 500,
        Role::Queen => 900,
        Role::King => 20000,
    }
}
