//! Pure move engine for the 3×3 board.
//!
//! Stateless functions over a [`Board`]: legality, win detection, draw
//! detection. Nothing here mutates its input or reports errors — callers
//! are responsible for checking legality before applying a move, and for
//! checking win before draw.

use crate::events::ConnectionId;

/// A 9-cell board; a cell holds the identity of the participant who
/// claimed it.
pub type Board = [Option<ConnectionId>; 9];

/// The 8 winning triples: 3 columns, 3 rows, 2 diagonals.
const WINNING_LINES: [[usize; 3]; 8] = [
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// An empty board.
#[must_use]
pub fn empty_board() -> Board {
    [None; 9]
}

/// Whether `position` names an empty cell on the board.
#[must_use]
pub fn is_legal(board: &Board, position: usize) -> bool {
    matches!(board.get(position), Some(None))
}

/// The board after `player` claims `position`.
///
/// Callers must have checked [`is_legal`] first; an out-of-range position
/// returns the board unchanged.
#[must_use]
pub fn apply_move(board: &Board, position: usize, player: ConnectionId) -> Board {
    let mut next = *board;
    if let Some(cell) = next.get_mut(position) {
        *cell = Some(player);
    }
    next
}

/// Whether `player` owns all three cells of any winning line.
#[must_use]
pub fn check_win(board: &Board, player: ConnectionId) -> bool {
    WINNING_LINES.iter().any(|line| {
        line.iter()
            .all(|&cell| board.get(cell).copied().flatten() == Some(player))
    })
}

/// Whether every cell is claimed. Callers must check [`check_win`] for
/// both players first; a full board with a winning line is a win, not a
/// draw.
#[must_use]
pub fn check_draw(board: &Board) -> bool {
    board.iter().all(Option::is_some)
}
