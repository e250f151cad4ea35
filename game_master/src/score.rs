use msgs::geometry::TeamId;
use serde::Serialize;

use crate::board::Board;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GameResult {
    None,
    BlueWin,
    RedWin,
}

impl GameResult {
    pub fn winner(&self) -> Option<TeamId> {
        match self {
            GameResult::None => None,
            GameResult::BlueWin => Some(TeamId::Blue),
            GameResult::RedWin => Some(TeamId::Red),
        }
    }
}

/// Blue is checked first when both teams cross the threshold in one tick.
pub fn game_result(board: &Board, win_threshold: u32) -> GameResult {
    if board.completed_goals(TeamId::Blue) >= win_threshold {
        GameResult::BlueWin
    } else if board.completed_goals(TeamId::Red) >= win_threshold {
        GameResult::RedWin
    } else {
        GameResult::None
    }
}
