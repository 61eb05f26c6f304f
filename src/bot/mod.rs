//! Heuristic opponent.
//!
//! A greedy one-ply policy, not a search: it takes an immediate win, blocks an
//! immediate loss, then prefers center, corners, anything. It can be beaten by
//! a fork set up two moves ahead (e.g. opposite corners), which is the
//! intended difficulty level.

use rand::Rng;
use smallvec::SmallVec;

use crate::core::{winner, Board, CellIndex, GridIndex, Mark};

type Candidates = SmallVec<[CellIndex; 9]>;

/// Picks a move for `bot_mark` on `board`, or [`None`] if the board is full.
///
/// Rules are evaluated in fixed priority order, first satisfied rule wins:
/// win now, block the opponent, center, random empty corner, random empty
/// cell. The random source is supplied by the caller so play can be seeded.
pub fn choose_move<R: Rng>(board: &Board, bot_mark: Mark, rng: &mut R) -> Option<CellIndex> {
    let empty: Candidates = CellIndex::ALL
        .into_iter()
        .filter(|&index| board[GridIndex::from(index)].is_none())
        .collect();
    if empty.is_empty() {
        return None;
    }

    // win now, then block the opponent's win
    for mark in [bot_mark, bot_mark.other()] {
        for &index in &empty {
            if wins_at(board, mark, index) {
                return Some(index);
            }
        }
    }

    if empty.contains(&CellIndex::CENTER) {
        return Some(CellIndex::CENTER);
    }

    let corners: Candidates = empty
        .iter()
        .copied()
        .filter(|index| CellIndex::CORNERS.contains(index))
        .collect();
    if !corners.is_empty() {
        return Some(corners[rng.gen_range(0..corners.len())]);
    }

    Some(empty[rng.gen_range(0..empty.len())])
}

/// One-ply lookahead: would placing `mark` at `index` finish the game for it?
fn wins_at(board: &Board, mark: Mark, index: CellIndex) -> bool {
    let mut probe = board.clone();
    *probe[GridIndex::from(index)] = Some(mark);
    matches!(winner(&probe), Some((winning, _)) if winning == mark)
}

#[cfg(test)]
mod test {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn cell(index: usize) -> CellIndex {
        CellIndex::try_from(index).unwrap()
    }

    fn board_from(marks: [Option<Mark>; 9]) -> Board {
        let mut board = Board::default();
        for (index, mark) in marks.into_iter().enumerate() {
            *board[GridIndex::from(cell(index))] = mark;
        }
        board
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn takes_center_on_empty_board() {
        let board = Board::default();
        assert_eq!(
            choose_move(&board, Mark::O, &mut rng()),
            Some(CellIndex::CENTER)
        );
    }

    #[test]
    fn blocks_immediate_loss() {
        // X X _ on the top row, block rule fires before center/corner
        let board = board_from([
            Some(Mark::X),
            Some(Mark::X),
            None,
            None,
            None,
            None,
            None,
            None,
            None,
        ]);
        assert_eq!(choose_move(&board, Mark::O, &mut rng()), Some(cell(2)));
    }

    #[test]
    fn winning_beats_blocking() {
        // O can win at 5, X threatens at 2; winning has priority
        let board = board_from([
            Some(Mark::X),
            Some(Mark::X),
            None,
            Some(Mark::O),
            Some(Mark::O),
            None,
            None,
            None,
            None,
        ]);
        assert_eq!(choose_move(&board, Mark::O, &mut rng()), Some(cell(5)));
    }

    #[test]
    fn prefers_a_corner_when_center_is_taken() {
        let board = board_from([
            None,
            None,
            None,
            None,
            Some(Mark::X),
            None,
            None,
            None,
            None,
        ]);
        let choice = choose_move(&board, Mark::O, &mut rng()).unwrap();
        assert!(CellIndex::CORNERS.contains(&choice));
    }

    #[test]
    fn falls_back_to_any_empty_cell() {
        // center and all corners taken, only edges remain
        let board = board_from([
            Some(Mark::X),
            None,
            Some(Mark::O),
            None,
            Some(Mark::X),
            None,
            Some(Mark::O),
            None,
            Some(Mark::X),
        ]);
        let choice = choose_move(&board, Mark::O, &mut rng()).unwrap();
        assert!([cell(1), cell(3), cell(5), cell(7)].contains(&choice));
    }

    #[test]
    fn full_board_has_no_move() {
        let board = board_from([
            Some(Mark::X),
            Some(Mark::O),
            Some(Mark::X),
            Some(Mark::O),
            Some(Mark::O),
            Some(Mark::X),
            Some(Mark::O),
            Some(Mark::X),
            Some(Mark::O),
        ]);
        assert_eq!(choose_move(&board, Mark::O, &mut rng()), None);
    }

    #[test]
    fn seeded_choice_is_reproducible() {
        let board = board_from([
            None,
            None,
            None,
            None,
            Some(Mark::X),
            None,
            None,
            None,
            None,
        ]);
        let first = choose_move(&board, Mark::O, &mut ChaCha8Rng::seed_from_u64(7));
        let second = choose_move(&board, Mark::O, &mut ChaCha8Rng::seed_from_u64(7));
        assert_eq!(first, second);
    }
}
