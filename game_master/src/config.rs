use std::{collections::BTreeMap, time::Duration};

use msgs::payload::ActionType;
use serde::{Deserialize, Serialize};

use crate::error::GameMasterError;

/// Per-action cooldowns in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Penalties {
    #[serde(rename = "move")]
    pub move_: u32,
    pub pick_up: u32,
    pub discovery: u32,
    pub destroy_piece: u32,
    pub check_for_sham: u32,
    pub put_piece: u32,
    pub information_exchange: u32,
    pub information_response: u32,
}

impl Default for Penalties {
    fn default() -> Self {
        Penalties {
            move_: 100,
            pick_up: 100,
            discovery: 500,
            destroy_piece: 100,
            check_for_sham: 300,
            put_piece: 100,
            information_exchange: 1000,
            information_response: 1000,
        }
    }
}

impl Penalties {
    pub fn millis(&self, action: ActionType) -> u32 {
        match action {
            ActionType::Move => self.move_,
            ActionType::PickUp => self.pick_up,
            ActionType::CheckForSham => self.check_for_sham,
            ActionType::DestroyPiece => self.destroy_piece,
            ActionType::Discovery => self.discovery,
            ActionType::PutPiece => self.put_piece,
            ActionType::InformationExchange => self.information_exchange,
            ActionType::InformationResponse => self.information_response,
        }
    }

    pub fn duration(&self, action: ActionType) -> Duration {
        Duration::from_millis(self.millis(action) as u64)
    }

    /// The table announced to agents at game start.
    pub fn as_table(&self) -> BTreeMap<ActionType, u32> {
        [
            ActionType::Move,
            ActionType::PickUp,
            ActionType::CheckForSham,
            ActionType::DestroyPiece,
            ActionType::Discovery,
            ActionType::PutPiece,
            ActionType::InformationExchange,
            ActionType::InformationResponse,
        ]
        .into_iter()
        .map(|action| (action, self.millis(action)))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameMasterConfig {
    pub cs_address: String,
    pub board_width: u32,
    pub board_height: u32,
    pub goal_area_height: u32,
    pub team_size: u32,
    /// Pieces in circulation, on the board or carried.
    pub number_of_pieces: u32,
    pub number_of_goals: u32,
    pub sham_probability: f64,
    pub win_threshold: u32,
    /// Zero disables periodic spawning.
    pub piece_spawn_interval_ms: u64,
    pub tick_ms: u64,
    pub penalties: Penalties,
    pub seed: Option<u64>,
    /// End the match instead of answering `UndefinedError` to a message
    /// that is not an in-game request from a joined agent.
    pub end_if_unexpected_message: bool,
}

impl Default for GameMasterConfig {
    fn default() -> Self {
        GameMasterConfig {
            cs_address: "127.0.0.1:1302".to_string(),
            board_width: 8,
            board_height: 12,
            goal_area_height: 3,
            team_size: 4,
            number_of_pieces: 6,
            number_of_goals: 4,
            sham_probability: 0.3,
            win_threshold: 4,
            piece_spawn_interval_ms: 2000,
            tick_ms: 50,
            penalties: Penalties::default(),
            seed: None,
            end_if_unexpected_message: false,
        }
    }
}

impl GameMasterConfig {
    pub fn validate(&self) -> Result<(), GameMasterError> {
        let invalid = |reason: String| Err(GameMasterError::InvalidConfiguration(reason));

        if self.board_width == 0 || self.goal_area_height == 0 {
            return invalid("board width and goal area height must be positive".to_string());
        }
        if self.board_height <= 2 * self.goal_area_height {
            return invalid(format!(
                "board height {} leaves no task area between two goal areas of height {}",
                self.board_height, self.goal_area_height
            ));
        }
        let goal_area_fields = self.board_width * self.goal_area_height;
        if self.number_of_goals == 0 || self.number_of_goals > goal_area_fields {
            return invalid(format!("{} goals do not fit in a goal area of {goal_area_fields} fields", self.number_of_goals));
        }
        if self.team_size == 0 || self.team_size > goal_area_fields {
            return invalid(format!("team size {} does not fit in a goal area of {goal_area_fields} fields", self.team_size));
        }
        if !(0.0..=1.0).contains(&self.sham_probability) {
            return invalid(format!("sham probability {} is outside [0, 1]", self.sham_probability));
        }
        if self.win_threshold == 0 || self.win_threshold > self.number_of_goals {
            return invalid(format!("win threshold {} must be between 1 and the goal count {}", self.win_threshold, self.number_of_goals));
        }
        Ok(())
    }
}
