use chrono::{DateTime, Utc};
use msgs::{
    geometry::{Position, TeamId},
    matrix::Matrix,
    payload::GoalInformation,
    MsgError,
};

/// What one agent believes about a single field.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentField {
    pub distance_to_piece: Option<u32>,
    pub distance_learned_at: Option<DateTime<Utc>>,
    pub denied_move_at: Option<DateTime<Utc>>,
    pub goal_info: GoalInformation,
}

impl Default for AgentField {
    fn default() -> Self {
        AgentField {
            distance_to_piece: None,
            distance_learned_at: None,
            denied_move_at: None,
            goal_info: GoalInformation::NoInformation,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentBoard {
    goal_area_height: u32,
    fields: Matrix<AgentField>,
}

impl Default for AgentBoard {
    fn default() -> Self {
        AgentBoard::new(0, 0, 0)
    }
}

impl AgentBoard {
    pub fn new(width: u32, height: u32, goal_area_height: u32) -> AgentBoard {
        AgentBoard {
            goal_area_height,
            fields: Matrix::new(height as usize, width as usize, AgentField::default()),
        }
    }

    pub fn width(&self) -> u32 {
        self.fields.width() as u32
    }

    pub fn height(&self) -> u32 {
        self.fields.height() as u32
    }

    pub fn goal_area_height(&self) -> u32 {
        self.goal_area_height
    }

    pub fn is_on_board(&self, position: Position) -> bool {
        position.x >= 0 && position.y >= 0 && (position.x as u32) < self.width() && (position.y as u32) < self.height()
    }

    pub fn field(&self, position: Position) -> Option<&AgentField> {
        if !self.is_on_board(position) {
            return None;
        }
        self.fields.get(position.y as usize, position.x as usize)
    }

    fn field_mut(&mut self, position: Position) -> Option<&mut AgentField> {
        if !self.is_on_board(position) {
            return None;
        }
        self.fields.get_mut(position.y as usize, position.x as usize)
    }

    pub fn goal_area_owner(&self, position: Position) -> Option<TeamId> {
        if !self.is_on_board(position) {
            return None;
        }
        let y = position.y as u32;
        if y < self.goal_area_height {
            Some(TeamId::Blue)
        } else if y >= self.height().saturating_sub(self.goal_area_height) {
            Some(TeamId::Red)
        } else {
            None
        }
    }

    pub fn is_in_goal_area(&self, team: TeamId, position: Position) -> bool {
        self.goal_area_owner(position) == Some(team)
    }

    pub fn record_distance(&mut self, position: Position, distance: Option<u32>, now: DateTime<Utc>) {
        if let Some(field) = self.field_mut(position) {
            field.distance_to_piece = distance;
            field.distance_learned_at = Some(now);
        }
    }

    pub fn record_denied_move(&mut self, position: Position, now: DateTime<Utc>) {
        if let Some(field) = self.field_mut(position) {
            field.denied_move_at = Some(now);
        }
    }

    /// Goal information lives only in goal areas and is never downgraded to
    /// `NoInformation`.
    pub fn record_goal_info(&mut self, position: Position, info: GoalInformation) {
        if info == GoalInformation::NoInformation || self.goal_area_owner(position).is_none() {
            return;
        }
        if let Some(field) = self.field_mut(position) {
            field.goal_info = info;
        }
    }

    /// Merges a 3x3 neighbourhood centred on `center`; row 0 is `y - 1`.
    pub fn apply_discovery(&mut self, center: Position, distances: &Matrix<i32>, now: DateTime<Utc>) {
        for (dy, row) in distances.rows().enumerate() {
            for (dx, &value) in row.iter().enumerate() {
                let position = Position::new(center.x + dx as i32 - 1, center.y + dy as i32 - 1);
                if !self.is_on_board(position) {
                    continue;
                }
                let distance = u32::try_from(value).ok();
                self.record_distance(position, distance, now);
            }
        }
    }

    /// Merges a teammate's snapshot. Every matrix must match the local
    /// geometry exactly.
    pub fn merge_exchange(
        &mut self,
        distances: &Matrix<i32>,
        red_team_goal_area: &Matrix<GoalInformation>,
        blue_team_goal_area: &Matrix<GoalInformation>,
        now: DateTime<Utc>,
    ) -> Result<(), MsgError> {
        let (width, height, goal) = (self.fields.width(), self.fields.height(), self.goal_area_height as usize);
        if distances.width() != width || distances.height() != height {
            return Err(MsgError::malformed(format!(
                "distances are {}x{}, expected {height}x{width}",
                distances.height(),
                distances.width()
            )));
        }
        for area in [red_team_goal_area, blue_team_goal_area] {
            if area.width() != width || area.height() != goal {
                return Err(MsgError::malformed(format!(
                    "goal area is {}x{}, expected {goal}x{width}",
                    area.height(),
                    area.width()
                )));
            }
        }

        for (y, row) in distances.rows().enumerate() {
            for (x, &value) in row.iter().enumerate() {
                if let Ok(distance) = u32::try_from(value) {
                    self.record_distance(Position::new(x as i32, y as i32), Some(distance), now);
                }
            }
        }
        let red_base = height.saturating_sub(goal);
        for (row_index, row) in red_team_goal_area.rows().enumerate() {
            for (x, &info) in row.iter().enumerate() {
                self.fill_goal_info(Position::new(x as i32, (red_base + row_index) as i32), info);
            }
        }
        for (y, row) in blue_team_goal_area.rows().enumerate() {
            for (x, &info) in row.iter().enumerate() {
                self.fill_goal_info(Position::new(x as i32, y as i32), info);
            }
        }
        Ok(())
    }

    fn fill_goal_info(&mut self, position: Position, info: GoalInformation) {
        let known = self.field(position).map(|field| field.goal_info != GoalInformation::NoInformation);
        if known == Some(false) {
            self.record_goal_info(position, info);
        }
    }

    /// Local distances as sent to teammates; unknown is `-1`.
    pub fn distances(&self) -> Matrix<i32> {
        let mut distances = Matrix::new(self.fields.height(), self.fields.width(), -1);
        for (y, row) in self.fields.rows().enumerate() {
            for (x, field) in row.iter().enumerate() {
                if let Some(distance) = field.distance_to_piece {
                    distances.set(y, x, distance.min(i32::MAX as u32) as i32);
                }
            }
        }
        distances
    }

    pub fn goal_area(&self, team: TeamId) -> Matrix<GoalInformation> {
        let goal = self.goal_area_height as usize;
        let base = match team {
            TeamId::Blue => 0,
            TeamId::Red => self.fields.height().saturating_sub(goal),
        };
        let mut area = Matrix::new(goal, self.fields.width(), GoalInformation::NoInformation);
        for row_index in 0..goal {
            let Some(row) = self.fields.row(base + row_index) else {
                break;
            };
            for (x, field) in row.iter().enumerate() {
                area.set(row_index, x, field.goal_info);
            }
        }
        area
    }
}
