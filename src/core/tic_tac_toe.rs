use generic_array::typenum::U3;

use super::error::GameError;
use super::grid::{Grid, GridIndex};
use super::{BoardCell, CellIndex, FinishedState, GameResult, GameState, Mark};

pub type Board = Grid<BoardCell<Mark>, U3, U3>;

/// Three cells that finish a game when filled with the same marker.
pub type WinLine = [CellIndex; 3];

/// All 8 winning patterns in priority order: rows, then columns, then diagonals.
/// At most one pattern can match in a reachable game, so the order is cosmetic.
pub fn win_lines() -> [WinLine; 8] {
    const C: [CellIndex; 9] = CellIndex::ALL;
    [
        [C[0], C[1], C[2]],
        [C[3], C[4], C[5]],
        [C[6], C[7], C[8]],
        [C[0], C[3], C[6]],
        [C[1], C[4], C[7]],
        [C[2], C[5], C[8]],
        [C[0], C[4], C[8]],
        [C[2], C[4], C[6]],
    ]
}

/// Scans the winning patterns and returns the winning marker with its line, if any.
pub fn winner(board: &Board) -> Option<(Mark, WinLine)> {
    for line in win_lines() {
        let [a, b, c] = line;
        if let (Some(m1), Some(m2), Some(m3)) = (
            *board[GridIndex::from(a)],
            *board[GridIndex::from(b)],
            *board[GridIndex::from(c)],
        ) {
            if m1 == m2 && m2 == m3 {
                return Some((m1, line));
            }
        }
    }
    None
}

/// Tic-tac-toe state machine.
///
/// Created in `Turn(X)`; [`TicTacToe::apply`] is the only mutation path during
/// play. Cells never revert to empty until the machine is replaced for a new
/// game.
#[derive(Clone, Debug)]
pub struct TicTacToe {
    board: Board,
    state: GameState,
    winning_line: Option<WinLine>,
    move_count: u32,
}

impl Default for TicTacToe {
    fn default() -> Self {
        Self::new()
    }
}

impl TicTacToe {
    pub fn new() -> Self {
        Self {
            board: Board::default(),
            state: GameState::Turn(Mark::X),
            winning_line: None,
            move_count: 0,
        }
    }

    /// Validates and applies a move for `mark` at `cell`.
    ///
    /// Rejects without touching the board when the game is finished, when the
    /// cell is occupied or when `mark` is not on turn. On acceptance writes
    /// the marker, re-runs terminal detection and either finishes the game or
    /// flips the turn.
    pub fn apply(&mut self, mark: Mark, cell: CellIndex) -> GameResult<GameState> {
        let expected = match self.state {
            GameState::Turn(expected) => expected,
            GameState::Finished(_) => return Err(GameError::GameIsFinished),
        };
        if mark != expected {
            return Err(GameError::not_your_turn(expected, mark));
        }

        let slot = &mut self.board[GridIndex::from(cell)];
        if slot.is_some() {
            return Err(GameError::cell_is_occupied(cell));
        }
        **slot = Some(mark);
        self.move_count += 1;

        Ok(self.update_state(mark))
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn winning_line(&self) -> Option<WinLine> {
        self.winning_line
    }

    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, GameState::Finished(_))
    }

    pub fn cell(&self, index: CellIndex) -> Option<Mark> {
        *self.board[GridIndex::from(index)]
    }

    pub fn empty_cells(&self) -> impl Iterator<Item = CellIndex> + '_ {
        CellIndex::ALL
            .into_iter()
            .filter(|&index| self.cell(index).is_none())
    }

    fn update_state(&mut self, last_mark: Mark) -> GameState {
        if let Some((mark, line)) = winner(&self.board) {
            self.winning_line = Some(line);
            self.state = GameState::Finished(FinishedState::Win(mark));
        } else if self.board.iter().flatten().all(|cell| cell.is_some()) {
            self.state = GameState::Finished(FinishedState::Draw);
        } else {
            self.state = GameState::Turn(last_mark.other());
        }
        self.state
    }
}
