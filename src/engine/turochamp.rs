use log::debug;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use shakmaty::attacks::attacks;
use shakmaty::{Bitboard, Board, CastlingSide, Chess, Color, Piece, Position, Role, Square};

use crate::engine::search::{Evaluator, Searcher};
use crate::engine::{Engine, Reply, ScoreUnit};
use crate::options::{EngineOptions, OptionName};

pub const NAME: &str = "PyTuroChamp";
const AUTHOR: &str = "Martin C. Doege";

// Turing's piece values, in pawns
fn turing_value(role: Role) -> f64 {
    match role {
        Role::Pawn => 1.0,
        Role::Knight => 3.0,
        Role::Bishop => 3.5,
        Role::Rook => 5.0,
        Role::Queen => 10.0,
        Role::King => 0.0,
    }
}

/// Scores in pawns: material plus Turing's positional terms.
pub struct TuroChamp {
    rng: ChaCha8Rng,
}

impl TuroChamp {
    pub fn new(seed: Option<u64>) -> TuroChamp {
        TuroChamp {
            rng: ChaCha8Rng::seed_from_u64(seed.unwrap_or_else(rand::random)),
        }
    }
}

impl Engine for TuroChamp {
    fn name(&self) -> &str {
        NAME
    }

    fn author(&self) -> &str {
        AUTHOR
    }

    fn score_unit(&self) -> ScoreUnit {
        ScoreUnit::Pawns
    }

    fn compute_reply(&mut self, position: &Chess, options: &EngineOptions) -> Reply {
        let reply = Searcher::new(&TuringEval, options).search(position, &mut self.rng);
        debug!(
            "{NAME}: {} nodes in {}ms",
            reply.metrics.nodes,
            reply.metrics.elapsed.as_millis()
        );
        reply
    }
}

pub struct TuringEval;

impl Evaluator for TuringEval {
    fn evaluate(&self, pos: &Chess, opts: &EngineOptions) -> i32 {
        let us = pos.turn();
        let them = !us;

        let material = material(pos.board(), us) - material(pos.board(), them);
        let positional = positional(pos, us) - positional(pos, them);
        let hanging = (hanging_pieces(pos.board(), us) as f64
            - hanging_pieces(pos.board(), them) as f64)
            * opts.get(OptionName::PDead) as f64
            * 0.5;

        let pawns =
            material + positional * opts.get(OptionName::PStab) as f64 * 0.05 - hanging;

        (pawns * 100.0).round() as i32
    }
}

fn material(board: &Board, color: Color) -> f64 {
    board
        .by_color(color)
        .into_iter()
        .filter_map(|sq| board.piece_at(sq))
        .map(|p| turing_value(p.role))
        .sum()
}

fn attacks_from(board: &Board, sq: Square) -> Bitboard {
    match board.piece_at(sq) {
        Some(piece) => attacks(sq, piece, board.occupied()),
        None => Bitboard::EMPTY,
    }
}

fn defenders(board: &Board, sq: Square, color: Color) -> usize {
    board
        .by_color(color)
        .into_iter()
        .filter(|from| *from != sq && attacks_from(board, *from).contains(sq))
        .count()
}

fn positional(pos: &Chess, color: Color) -> f64 {
    let board = pos.board();
    let own = board.by_color(color);
    let mut score = 0.0;

    for sq in own {
        let Some(piece) = board.piece_at(sq) else {
            continue;
        };

        match piece.role {
            Role::Pawn => {
                let rank = usize::from(sq) / 8;
                let advanced = if color == Color::White {
                    rank.saturating_sub(1)
                } else {
                    6usize.saturating_sub(rank)
                };
                score += 0.2 * advanced as f64;

                let piece_defended = own.into_iter().any(|from| {
                    board.piece_at(from).map_or(false, |p| p.role != Role::Pawn)
                        && attacks_from(board, from).contains(sq)
                });
                if piece_defended {
                    score += 0.3;
                }
            }
            Role::King => {
                let as_queen = Piece {
                    color,
                    role: Role::Queen,
                };
                let exposure = (attacks(sq, as_queen, board.occupied()) & !own).count();
                score -= (exposure as f64).sqrt();
            }
            _ => {
                let mobility = (attacks_from(board, sq) & !own).count();
                score += (mobility as f64).sqrt();

                score += match defenders(board, sq, color) {
                    0 => 0.0,
                    1 => 1.0,
                    _ => 1.5,
                };
            }
        }
    }

    let castles = pos.castles();
    if castles.has(color, CastlingSide::KingSide) || castles.has(color, CastlingSide::QueenSide) {
        score += 1.0;
    }

    score
}

fn hanging_pieces(board: &Board, color: Color) -> usize {
    (board.by_color(color) & !board.kings())
        .into_iter()
        .filter(|sq| defenders(board, *sq, !color) > 0 && defenders(board, *sq, color) == 0)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::fen::Fen;
    use shakmaty::CastlingMode;

    fn position(fen: &str) -> Chess {
        fen.parse::<Fen>()
            .unwrap()
            .into_position(CastlingMode::Standard)
            .unwrap()
    }

    #[test]
    fn start_position_is_balanced() {
        let opts = EngineOptions::default();
        assert_eq!(TuringEval.evaluate(&Chess::default(), &opts), 0);
    }

    #[test]
    fn extra_queen_is_worth_ten_pawns() {
        let opts = EngineOptions::default();
        let pos = position("4k3/8/8/8/8/8/8/Q3K3 w - - 0 1");
        let score = TuringEval.evaluate(&pos, &opts);
        assert!(score > 900, "{score}");
    }

    #[test]
    fn replies_with_a_legal_move() {
        let mut engine = TuroChamp::new(Some(3));
        let pos = Chess::default();
        let reply = engine.compute_reply(&pos, &EngineOptions::default());
        let m = reply.best_move.unwrap();
        assert!(pos.is_legal(&m));
    }
}
