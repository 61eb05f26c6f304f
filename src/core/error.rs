use super::{CellIndex, Mark};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum GameError {
    #[error("invalid cell index (expected: 0-8, found: {found})")]
    InvalidCellIndex { found: usize },
    #[error("cell {index} is occupied")]
    CellIsOccupied { index: CellIndex },
    #[error("can't make turn on a finished game")]
    GameIsFinished,
    #[error("other player's turn (expected: {expected}, found: {found})")]
    NotYourTurn { expected: Mark, found: Mark },
}

impl GameError {
    pub fn invalid_cell_index(found: usize) -> Self {
        Self::InvalidCellIndex { found }
    }

    pub fn cell_is_occupied(index: CellIndex) -> Self {
        Self::CellIsOccupied { index }
    }

    pub fn not_your_turn(expected: Mark, found: Mark) -> Self {
        Self::NotYourTurn { expected, found }
    }
}
