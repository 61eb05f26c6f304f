mod error;
mod grid;
mod tic_tac_toe;

use std::fmt::{Display, Formatter};
use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

pub use error::GameError;
pub use grid::{Grid, GridIndex};
pub use tic_tac_toe::{win_lines, winner, Board, TicTacToe, WinLine};

pub type GameResult<T> = Result<T, GameError>;

/// Player marker. A game always starts with [`Mark::X`] on turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    /// Returns the opposing marker.
    pub fn other(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }
}

impl Display for Mark {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::X => f.write_str("X"),
            Self::O => f.write_str("O"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoardCell<T>(pub Option<T>);

impl<T> Default for BoardCell<T> {
    fn default() -> Self {
        Self(Option::default())
    }
}

impl<T: Display> Display for BoardCell<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(val) => write!(f, "[{}]", val),
            None => f.write_str("[ ]"),
        }
    }
}

impl<T> From<T> for BoardCell<T> {
    fn from(value: T) -> Self {
        Self(Option::from(value))
    }
}

impl<T> Deref for BoardCell<T> {
    type Target = Option<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for BoardCell<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Flat board address in `0..9`, counted row by row from the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellIndex(u8);

impl CellIndex {
    pub const ALL: [CellIndex; 9] = [
        CellIndex(0),
        CellIndex(1),
        CellIndex(2),
        CellIndex(3),
        CellIndex(4),
        CellIndex(5),
        CellIndex(6),
        CellIndex(7),
        CellIndex(8),
    ];
    pub const CENTER: CellIndex = CellIndex(4);
    pub const CORNERS: [CellIndex; 4] = [CellIndex(0), CellIndex(2), CellIndex(6), CellIndex(8)];

    pub fn row(self) -> usize {
        usize::from(self.0) / 3
    }

    pub fn col(self) -> usize {
        usize::from(self.0) % 3
    }

    pub fn as_usize(self) -> usize {
        usize::from(self.0)
    }
}

impl TryFrom<usize> for CellIndex {
    type Error = GameError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        if value < 9 {
            Ok(Self(value as u8))
        } else {
            Err(GameError::invalid_cell_index(value))
        }
    }
}

impl TryFrom<u8> for CellIndex {
    type Error = GameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from(usize::from(value))
    }
}

impl From<CellIndex> for GridIndex {
    fn from(value: CellIndex) -> Self {
        GridIndex::new(value.row(), value.col())
    }
}

impl Display for CellIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishedState {
    Win(Mark),
    Draw,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameState {
    Turn(Mark),
    Finished(FinishedState),
}
