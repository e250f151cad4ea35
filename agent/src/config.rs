use msgs::geometry::TeamId;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum StrategyKind {
    Simple,
    DoNothing,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub cs_address: String,
    pub team_id: TeamId,
    pub wants_to_be_leader: bool,
    /// Finish instead of ignoring a message that does not fit the current state.
    pub end_if_unexpected_message: bool,
    /// Finish instead of ignoring an action requested outside the game.
    pub end_if_unexpected_action: bool,
    pub tick_ms: u64,
    pub strategy: StrategyKind,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            cs_address: "127.0.0.1:1302".to_string(),
            team_id: TeamId::Red,
            wants_to_be_leader: false,
            end_if_unexpected_message: false,
            end_if_unexpected_action: false,
            tick_ms: 50,
            strategy: StrategyKind::Simple,
        }
    }
}
