use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    geometry::{BoardSize, Direction, Position, TeamId},
    matrix::Matrix,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoalInformation {
    NoInformation,
    Goal,
    NoGoal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PutDownPieceResult {
    NormalOnGoalField,
    NormalOnNonGoalField,
    ShamOnGoalArea,
    TaskField,
}

/// Keys of the penalty table announced in [`StartGame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActionType {
    Move,
    PickUp,
    CheckForSham,
    DestroyPiece,
    Discovery,
    PutPiece,
    InformationExchange,
    InformationResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub team_id: TeamId,
    pub wants_to_be_leader: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub accepted: bool,
    pub agent_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveResponse {
    pub made_move: bool,
    pub current_position: Position,
    #[serde(default)]
    pub closest_piece: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutDownPieceResponse {
    pub result: PutDownPieceResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckShamResponse {
    pub sham: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverResponse {
    pub distances: Matrix<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeInformationRequest {
    pub asked_agent_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeInformationRequestForward {
    pub asking_agent_id: u32,
    pub leader: bool,
    pub team_id: TeamId,
}

/// Snapshot of what one agent knows, sent to a teammate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeInformationResponse {
    pub respond_to_id: u32,
    pub distances: Matrix<i32>,
    #[serde(rename = "redTeamGoalAreaInformations")]
    pub red_team_goal_area: Matrix<GoalInformation>,
    #[serde(rename = "blueTeamGoalAreaInformations")]
    pub blue_team_goal_area: Matrix<GoalInformation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeInformationResponseForward {
    pub responding_id: u32,
    pub distances: Matrix<i32>,
    #[serde(rename = "redTeamGoalAreaInformations")]
    pub red_team_goal_area: Matrix<GoalInformation>,
    #[serde(rename = "blueTeamGoalAreaInformations")]
    pub blue_team_goal_area: Matrix<GoalInformation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberOfPlayers {
    pub allies: u32,
    pub enemies: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGame {
    pub agent_id: u32,
    pub allies_ids: Vec<u32>,
    pub leader_id: u32,
    pub enemies_ids: Vec<u32>,
    pub team_id: TeamId,
    pub board_size: BoardSize,
    pub goal_area_size: u32,
    pub number_of_players: NumberOfPlayers,
    pub number_of_pieces: u32,
    pub number_of_goals: u32,
    /// Milliseconds per action.
    pub penalties: BTreeMap<ActionType, u32>,
    pub sham_piece_probability: f64,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndGame {
    pub winner: TeamId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndefinedError {
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub holding_piece: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveError {
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickUpPieceErrorSubtype {
    NothingThere,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickUpPieceError {
    pub error_subtype: PickUpPieceErrorSubtype,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PutDownPieceErrorSubtype {
    AgentNotHolding,
    CannotPutThere,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutDownPieceError {
    pub error_subtype: PutDownPieceErrorSubtype,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IgnoredDelayError {
    /// Remaining penalty in milliseconds.
    pub delay: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_are_camel_case() {
        let json = serde_json::to_value(JoinRequest { team_id: TeamId::Blue, wants_to_be_leader: true }).unwrap();
        assert_eq!(json, serde_json::json!({ "teamId": "Blue", "wantsToBeLeader": true }));
    }

    #[test]
    fn rejected_move_has_null_distance() {
        let response = MoveResponse { made_move: false, current_position: Position::new(1, 1), closest_piece: None };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["closestPiece"], serde_json::Value::Null);
        let missing: MoveResponse = serde_json::from_str(r#"{"madeMove":false,"currentPosition":{"x":1,"y":1}}"#).unwrap();
        assert_eq!(missing, response);
    }

    #[test]
    fn penalty_table_uses_action_names_as_keys() {
        let mut penalties = BTreeMap::new();
        penalties.insert(ActionType::Move, 100);
        penalties.insert(ActionType::Discovery, 500);
        let json = serde_json::to_value(&penalties).unwrap();
        assert_eq!(json, serde_json::json!({ "Move": 100, "Discovery": 500 }));
    }

    #[test]
    fn exchange_response_keeps_legacy_field_names() {
        let response = ExchangeInformationResponse {
            respond_to_id: 3,
            distances: Matrix::new(1, 1, -1),
            red_team_goal_area: Matrix::new(1, 1, GoalInformation::Goal),
            blue_team_goal_area: Matrix::new(1, 1, GoalInformation::NoInformation),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["redTeamGoalAreaInformations"], serde_json::json!([["Goal"]]));
        assert_eq!(json["respondToId"], 3);
    }
}
