use log::debug;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use shakmaty::{Board, Chess, Color, Position, Role, Square};

use crate::engine::search::{role_value, Evaluator, Searcher};
use crate::engine::{Engine, Reply, ScoreUnit};
use crate::options::{EngineOptions, OptionName};

pub const NAME: &str = "Bare";
const AUTHOR: &str = "Martin C. Doege";

/// Scores in centipawns: material plus middle game piece-square tables.
pub struct Bare {
    rng: ChaCha8Rng,
}

impl Bare {
    pub fn new(seed: Option<u64>) -> Bare {
        Bare {
            rng: ChaCha8Rng::seed_from_u64(seed.unwrap_or_else(rand::random)),
        }
    }
}

impl Engine for Bare {
    fn name(&self) -> &str {
        NAME
    }

    fn author(&self) -> &str {
        AUTHOR
    }

    fn score_unit(&self) -> ScoreUnit {
        ScoreUnit::Centipawns
    }

    fn compute_reply(&mut self, position: &Chess, options: &EngineOptions) -> Reply {
        let reply = Searcher::new(&PstEval, options).search(position, &mut self.rng);
        debug!(
            "{NAME}: {} nodes in {}ms",
            reply.metrics.nodes,
            reply.metrics.elapsed.as_millis()
        );
        reply
    }
}

pub struct PstEval;

impl Evaluator for PstEval {
    // pstab 20 weighs the tables at full strength
    fn evaluate(&self, pos: &Chess, opts: &EngineOptions) -> i32 {
        let board = pos.board();
        let (white_mat, white_pst) = side_value(board, Color::White);
        let (black_mat, black_pst) = side_value(board, Color::Black);

        let pstab = opts.get(OptionName::PStab) as i32;
        let score = white_mat - black_mat + (white_pst - black_pst) * pstab / 20;

        match pos.turn() {
            Color::White => score,
            Color::Black => -score,
        }
    }
}

// (material, pst)
fn side_value(board: &Board, color: Color) -> (i32, i32) {
    let mut material = 0;
    let mut pst = 0;

    for sq in board.by_color(color) {
        let Some(piece) = board.piece_at(sq) else {
            continue;
        };
        if piece.role != Role::King {
            material += role_value(piece.role);
        }
        pst += pst_value(piece.role, color, sq) as i32;
    }

    (material, pst)
}

// all PST are from whites perspective, a1 first
fn pst_value(role: Role, color: Color, sq: Square) -> i16 {
    let idx = match color {
        Color::White => usize::from(sq),
        Color::Black => usize::from(sq.flip_vertical()),
    };

    let table = match role {
        Role::Pawn => &PAWN_MID_PST,
        Role::Knight => &KNIGHT_MID_PST,
        Role::Bishop => &BISHOP_MID_PST,
        Role::Rook => &ROOK_MID_PST,
        Role::Queen => &QUEEN_MID_PST,
        Role::King => &KING_MID_PST,
    };

    table[idx]
}

const PAWN_MID_PST: [i16; 64] = [
    0, 0, 0, 0, 0, 0, 0, 0, -35, -1, -20, -23, -15, 24, 38, -22, -26, -4, -4, -10, 3, 3, 33, -12,
    -27, -2, -5, 12, 17, 6, 10, -25, -14, 13, 6, 21, 23, 12, 17, -23, -6, 7, 26, 31, 65, 56, 25,
    -20, 98, 134, 61, 95, 68, 126, 34, -11, 0, 0, 0, 0, 0, 0, 0, 0,
];

const KNIGHT_MID_PST: [i16; 64] = [
    -105, -21, -58, -33, -17, -28, -19, -23, -29, -53, -12, -3, -1, 18, -14, -19, -23, -9, 12, 10,
    19, 17, 25, -16, -13, 4, 16, 13, 28, 19, 21, -8, -9, 17, 19, 53, 37, 69, 18, 22, -47, 60, 37,
    65, 84, 129, 73, 44, -73, -41, 72, 36, 23, 62, 7, -17, -167, -89, -34, -49, 61, -97, -15, -107,
];

const BISHOP_MID_PST: [i16; 64] = [
    -33, -3, -14, -21, -13, -12, -39, -21, 4, 15, 16, 0, 7, 21, 33, 1, 0, 15, 15, 15, 14, 27, 18,
    10, -6, 13, 13, 26, 34, 12, 10, 4, -4, 5, 19, 50, 37, 37, 7, -2, -16, 37, 43, 40, 35, 50, 37,
    -2, -26, 16, -18, -13, 30, 59, 18, -47, -29, 4, -82, -37, -25, -42, 7, -8,
];

const ROOK_MID_PST: [i16; 64] = [
    -19, -13, 1, 17, 16, 7, -37, -26, -44, -16, -20, -9, -1, 11, -6, -71, -45, -25, -16, -17, 3, 0,
    -5, -33, -36, -26, -12, -1, 9, -7, 6, -23, -24, -11, 7, 26, 24, 35, -8, -20, -5, 19, 26, 36,
    17, 45, 61, 16, 27, 32, 58, 62, 80, 67, 26, 44, 32, 42, 32, 51, 63, 9, 31, 43,
];

const QUEEN_MID_PST: [i16; 64] = [
    -1, -18, -9, 10, -15, -25, -31, -50, -35, -8, 11, 2, 8, 15, -3, 1, -14, 2, -11, -2, -5, 2, 14,
    5, -9, -26, -9, -10, -2, -4, 3, -3, -27, -27, -16, -16, -1, 17, -2, 1, -13, -17, 7, 8, 29, 56,
    47, 57, -24, -39, -5, 1, -16, 57, 28, 54, -28, 0, 29, 12, 59, 44, 43, 45,
];

const KING_MID_PST: [i16; 64] = [
    -15, 36, 12, -54, 8, -28, 24, 14, 1, 7, -8, -64, -43, -16, 9, 8, -14, -14, -22, -46, -44, -30,
    -15, -27, -49, -1, -27, -39, -46, -44, -33, -51, -17, -20, -12, -27, -30, -25, -14, -36, -9,
    24, 2, -16, -20, 6, 22, -22, 29, -1, -20, -7, -8, -4, -38, -29, -65, 23, 16, -15, -56, -34, 2,
    13,
];
