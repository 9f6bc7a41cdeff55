use crate::error::MoveError;

const FILES: &str = "abcdefgh";
const RANKS: &str = "12345678";
const DEFAULT_PROMOTION: char = 'q';

/// Filters a line down to coordinate move notation.
///
/// Accepts `from-file from-rank to-file to-rank` with an optional promotion
/// character. Some clients send promotions as 6 characters (e.g. `e7e8qq`);
/// those are cut back to the base squares and promoted to a queen.
pub fn normalize_coordinate_move(text: &str) -> Result<String, MoveError> {
    let chars: Vec<char> = text.chars().collect();

    if !(4..=6).contains(&chars.len()) {
        return Err(MoveError::NotCoordinate(text.into()));
    }

    let is_square = |file: char, rank: char| FILES.contains(file) && RANKS.contains(rank);
    if !is_square(chars[0], chars[1]) || !is_square(chars[2], chars[3]) {
        return Err(MoveError::NotCoordinate(text.into()));
    }

    let base: String = chars[..4].iter().collect();

    Ok(match chars.len() {
        6 => format!("{base}{DEFAULT_PROMOTION}"),
        5 => format!("{base}{}", chars[4]),
        _ => base,
    })
}

#[test]
fn plain_moves_pass_through() {
    assert_eq!(normalize_coordinate_move("e2e4").unwrap(), "e2e4");
    assert_eq!(normalize_coordinate_move("a7a8n").unwrap(), "a7a8n");
}

#[test]
fn six_char_promotions_become_queens() {
    assert_eq!(normalize_coordinate_move("e7e8qq").unwrap(), "e7e8q");
    assert_eq!(normalize_coordinate_move("b2b1=n").unwrap(), "b2b1q");
}

#[test]
fn non_moves_are_filtered() {
    for text in ["", "go", "e2e", "E2E4", "e9e4", "i2i4", "e2e4e5e6", "ucinewgame", "4e2e"] {
        assert!(
            normalize_coordinate_move(text).is_err(),
            "{text} should not be a move"
        );
    }
}
