use std::{ops::Range, time::Duration};

use msgs::{
    geometry::{Direction, Position, TeamId},
    matrix::Matrix,
};
use rand::{rngs::StdRng, Rng};
use serde::Serialize;

use crate::{config::GameMasterConfig, error::BoardError};

const PLACEMENT_ATTEMPTS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldState {
    Empty,
    Goal,
    CompletedGoal,
    NoGoal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Piece {
    pub is_sham: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    /// Last element is the top of the stack.
    pub pieces: Vec<Piece>,
    pub agent: Option<u32>,
    pub state: FieldState,
}

impl Default for Field {
    fn default() -> Self {
        Field { pieces: Vec::new(), agent: None, state: FieldState::Empty }
    }
}

/// Authoritative grid. Blue owns goal rows `[0, g)`, Red owns `[H - g, H)`.
pub struct Board {
    width: u32,
    height: u32,
    goal_area_height: u32,
    fields: Matrix<Field>,
    pieces_in_circulation: u32,
    max_pieces: u32,
    sham_probability: f64,
    spawn_interval: Duration,
    since_last_spawn: Duration,
    rng: StdRng,
}

impl Board {
    pub fn new(config: &GameMasterConfig, rng: StdRng) -> Board {
        Board {
            width: config.board_width,
            height: config.board_height,
            goal_area_height: config.goal_area_height,
            fields: Matrix::new(config.board_height as usize, config.board_width as usize, Field::default()),
            pieces_in_circulation: 0,
            max_pieces: config.number_of_pieces,
            sham_probability: config.sham_probability,
            spawn_interval: Duration::from_millis(config.piece_spawn_interval_ms),
            since_last_spawn: Duration::ZERO,
            rng,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn goal_area_height(&self) -> u32 {
        self.goal_area_height
    }

    pub fn pieces_in_circulation(&self) -> u32 {
        self.pieces_in_circulation
    }

    pub fn fields(&self) -> &Matrix<Field> {
        &self.fields
    }

    pub fn field(&self, position: Position) -> Option<&Field> {
        if position.x < 0 || position.y < 0 {
            return None;
        }
        self.fields.get(position.y as usize, position.x as usize)
    }

    fn field_mut(&mut self, position: Position) -> Result<&mut Field, BoardError> {
        if position.x < 0 || position.y < 0 {
            return Err(BoardError::OffBoard(position));
        }
        self.fields
            .get_mut(position.y as usize, position.x as usize)
            .ok_or(BoardError::OffBoard(position))
    }

    pub fn is_on_board(&self, position: Position) -> bool {
        self.field(position).is_some()
    }

    fn goal_rows(&self, team: TeamId) -> Range<i32> {
        let (height, goal) = (self.height as i32, self.goal_area_height as i32);
        match team {
            TeamId::Blue => 0..goal,
            TeamId::Red => height - goal..height,
        }
    }

    fn task_rows(&self) -> Range<i32> {
        let (height, goal) = (self.height as i32, self.goal_area_height as i32);
        goal..height - goal
    }

    /// Team whose goal area contains `position`, if any.
    pub fn goal_area_owner(&self, position: Position) -> Option<TeamId> {
        if !self.is_on_board(position) {
            return None;
        }
        [TeamId::Blue, TeamId::Red]
            .into_iter()
            .find(|team| self.goal_rows(*team).contains(&position.y))
    }

    pub fn is_in_task_area(&self, position: Position) -> bool {
        self.is_on_board(position) && self.task_rows().contains(&position.y)
    }

    fn random_point(&mut self, rows: Range<i32>) -> Position {
        let x = self.rng.random_range(0..self.width as i32);
        let y = self.rng.random_range(rows);
        Position::new(x, y)
    }

    /// Places `count` goals in the Blue area and mirrors them onto Red.
    pub fn generate_goals(&mut self, count: u32) -> Result<(), BoardError> {
        tracing::info!(count, "generating goals");
        let rows = self.goal_rows(TeamId::Blue);

        for goal in 0..count {
            let mut placed = false;
            for _ in 0..PLACEMENT_ATTEMPTS {
                let point = self.random_point(rows.clone());
                let field = self.field_mut(point)?;
                if field.state == FieldState::Empty {
                    field.state = FieldState::Goal;
                    placed = true;
                    break;
                }
            }
            if !placed {
                return Err(BoardError::GoalPlacement { goal, attempts: PLACEMENT_ATTEMPTS });
            }
        }

        self.mirror_blue_goal_area()
    }

    fn mirror_blue_goal_area(&mut self) -> Result<(), BoardError> {
        let (width, height) = (self.width as i32, self.height as i32);
        for y in self.goal_rows(TeamId::Blue) {
            for x in 0..width {
                let state = self.field_mut(Position::new(x, y))?.state;
                self.field_mut(Position::new(width - x - 1, height - y - 1))?.state = state;
            }
        }
        Ok(())
    }

    /// Adds one piece on a random agent-free task field unless the
    /// circulation limit is reached. Returns whether a piece was added.
    pub fn drop_piece(&mut self) -> Result<bool, BoardError> {
        if self.pieces_in_circulation >= self.max_pieces {
            return Ok(false);
        }

        let rows = self.task_rows();
        for _ in 0..PLACEMENT_ATTEMPTS {
            let point = self.random_point(rows.clone());
            let is_sham = self.rng.random::<f64>() < self.sham_probability;
            let field = self.field_mut(point)?;
            if field.agent.is_some() {
                continue;
            }
            field.pieces.push(Piece { is_sham });
            self.pieces_in_circulation += 1;
            tracing::debug!(number = self.pieces_in_circulation, %point, is_sham, "piece dropped");
            return Ok(true);
        }

        Err(BoardError::PiecePlacement { attempts: PLACEMENT_ATTEMPTS })
    }

    pub fn drop_pieces(&mut self) -> Result<(), BoardError> {
        tracing::info!(count = self.max_pieces, "dropping pieces");
        while self.drop_piece()? {}
        Ok(())
    }

    /// Retires one piece from circulation and immediately tries to replace it.
    pub fn remove_piece_and_drop_new(&mut self) {
        self.pieces_in_circulation = self.pieces_in_circulation.saturating_sub(1);
        if let Err(e) = self.drop_piece() {
            tracing::warn!("replacement piece not dropped: {e}");
        }
    }

    /// Periodic spawning. Lost pieces are topped up here as well.
    pub fn update(&mut self, dt: Duration) {
        if self.spawn_interval.is_zero() {
            return;
        }
        self.since_last_spawn += dt;
        while self.since_last_spawn >= self.spawn_interval {
            self.since_last_spawn -= self.spawn_interval;
            if let Err(e) = self.drop_piece() {
                tracing::warn!("periodic spawn failed: {e}");
            }
        }
    }

    pub fn distance_to_nearest_piece(&self, from: Position) -> Option<u32> {
        let mut nearest = None;
        for (y, row) in self.fields.rows().enumerate() {
            for (x, field) in row.iter().enumerate() {
                if field.pieces.is_empty() {
                    continue;
                }
                let distance = from.manhattan(&Position::new(x as i32, y as i32));
                nearest = Some(nearest.map_or(distance, |best: u32| best.min(distance)));
            }
        }
        nearest
    }

    /// Distances around `center`, row 0 being `center.y - 1`.
    /// Off-board and unknown cells hold `-1`.
    pub fn discover_array(&self, center: Position) -> Matrix<i32> {
        let mut distances = Matrix::new(3, 3, -1);
        for dy in 0..3 {
            for dx in 0..3 {
                let point = Position::new(center.x + dx as i32 - 1, center.y + dy as i32 - 1);
                if !self.is_on_board(point) {
                    continue;
                }
                if let Some(distance) = self.distance_to_nearest_piece(point) {
                    distances.set(dy, dx, distance as i32);
                }
            }
        }
        distances
    }

    pub fn can_move(&self, team: TeamId, from: Position, direction: Direction) -> bool {
        let target = from.step(direction);
        match self.field(target) {
            Some(field) => field.agent.is_none() && self.goal_area_owner(target) != Some(team.opposite()),
            None => false,
        }
    }

    pub fn random_position_for_agent(&mut self, team: TeamId) -> Result<Position, BoardError> {
        let rows = self.goal_rows(team);
        for _ in 0..PLACEMENT_ATTEMPTS {
            let point = self.random_point(rows.clone());
            if self.field(point).is_some_and(|field| field.agent.is_none()) {
                return Ok(point);
            }
        }
        Err(BoardError::AgentPlacement { team, attempts: PLACEMENT_ATTEMPTS })
    }

    pub fn place_agent(&mut self, agent_id: u32, position: Position) -> Result<(), BoardError> {
        let field = self.field_mut(position)?;
        if field.agent.is_some() {
            return Err(BoardError::Occupied(position));
        }
        field.agent = Some(agent_id);
        Ok(())
    }

    /// Moves the occupant of `from` one step. Returns the new position, or
    /// `None` when the move is not allowed.
    pub fn move_agent(&mut self, team: TeamId, from: Position, direction: Direction) -> Option<Position> {
        if !self.can_move(team, from, direction) {
            return None;
        }
        let target = from.step(direction);
        let agent = self.field_mut(from).ok()?.agent.take()?;
        if let Ok(field) = self.field_mut(target) {
            field.agent = Some(agent);
        }
        tracing::debug!(agent_id = agent, %from, to = %target, "agent moved");
        Some(target)
    }

    pub fn remove_agent(&mut self, position: Position) -> Option<u32> {
        self.field_mut(position).ok()?.agent.take()
    }

    pub fn take_piece(&mut self, position: Position) -> Option<Piece> {
        self.field_mut(position).ok()?.pieces.pop()
    }

    pub fn push_piece(&mut self, position: Position, piece: Piece) -> Result<(), BoardError> {
        self.field_mut(position)?.pieces.push(piece);
        Ok(())
    }

    pub fn set_state(&mut self, position: Position, state: FieldState) -> Result<(), BoardError> {
        self.field_mut(position)?.state = state;
        Ok(())
    }

    pub fn completed_goals(&self, team: TeamId) -> u32 {
        self.goal_rows(team)
            .map(|y| {
                self.fields
                    .row(y as usize)
                    .unwrap_or_default()
                    .iter()
                    .filter(|field| field.state == FieldState::CompletedGoal)
                    .count() as u32
            })
            .sum()
    }

    /// Copy of the goal-area states, rows ordered by `y`.
    pub fn goal_states(&self, team: TeamId) -> Vec<Vec<FieldState>> {
        self.goal_rows(team)
            .filter_map(|y| self.fields.row(y as usize))
            .map(|row| row.iter().map(|field| field.state).collect())
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use rand::SeedableRng;

    use super::*;

    pub(crate) fn small_config() -> GameMasterConfig {
        GameMasterConfig {
            board_width: 5,
            board_height: 5,
            goal_area_height: 1,
            team_size: 2,
            number_of_pieces: 3,
            number_of_goals: 2,
            win_threshold: 2,
            sham_probability: 0.0,
            seed: Some(7),
            ..Default::default()
        }
    }

    fn board(config: &GameMasterConfig) -> Board {
        Board::new(config, StdRng::seed_from_u64(config.seed.unwrap_or(0)))
    }

    #[test]
    fn red_goals_are_a_point_reflection_of_blue() {
        for seed in 0..20 {
            let config = GameMasterConfig { board_width: 7, board_height: 9, goal_area_height: 2, number_of_goals: 5, seed: Some(seed), ..small_config() };
            let mut board = board(&config);
            board.generate_goals(5).unwrap();

            let (w, h) = (7, 9);
            for y in 0..h {
                for x in 0..w {
                    let here = board.field(Position::new(x, y)).unwrap().state;
                    let mirrored = board.field(Position::new(w - 1 - x, h - 1 - y)).unwrap().state;
                    assert_eq!(here, mirrored);
                }
            }
            let goals = board.goal_states(TeamId::Blue).into_iter().flatten().filter(|s| *s == FieldState::Goal).count();
            assert_eq!(goals, 5);
        }
    }

    #[test]
    fn goal_generation_reports_exhaustion() {
        let config = small_config();
        let mut board = board(&config);
        assert_eq!(board.generate_goals(6), Err(BoardError::GoalPlacement { goal: 5, attempts: PLACEMENT_ATTEMPTS }));
    }

    #[test]
    fn pieces_never_exceed_the_limit_and_stay_in_the_task_area() {
        let config = small_config();
        let mut board = board(&config);
        board.drop_pieces().unwrap();
        assert_eq!(board.pieces_in_circulation(), 3);
        assert!(!board.drop_piece().unwrap());
        assert_eq!(board.pieces_in_circulation(), 3);

        board.remove_piece_and_drop_new();
        board.drop_piece().unwrap();
        assert_eq!(board.pieces_in_circulation(), 3);

        for (y, row) in board.fields().rows().enumerate() {
            if !row.iter().any(|field| !field.pieces.is_empty()) {
                continue;
            }
            assert!(board.is_in_task_area(Position::new(0, y as i32)));
        }
    }

    #[test]
    fn distance_is_unknown_without_pieces() {
        let config = small_config();
        let mut board = board(&config);
        assert_eq!(board.distance_to_nearest_piece(Position::new(0, 0)), None);

        board.push_piece(Position::new(3, 2), Piece { is_sham: false }).unwrap();
        board.push_piece(Position::new(0, 3), Piece { is_sham: true }).unwrap();
        assert_eq!(board.distance_to_nearest_piece(Position::new(0, 0)), Some(3));
        assert_eq!(board.distance_to_nearest_piece(Position::new(3, 2)), Some(0));
    }

    #[test]
    fn discover_array_marks_off_board_cells() {
        let config = small_config();
        let mut board = board(&config);
        board.push_piece(Position::new(1, 1), Piece { is_sham: false }).unwrap();

        let distances = board.discover_array(Position::new(0, 0));
        assert_eq!(distances.row(0), Some(&[-1, -1, -1][..]));
        assert_eq!(distances.row(1), Some(&[-1, 2, 1][..]));
        assert_eq!(distances.row(2), Some(&[-1, 1, 0][..]));
    }

    #[test]
    fn can_move_exhaustively_on_a_small_board() {
        let config = small_config();
        let mut board = board(&config);
        board.place_agent(9, Position::new(2, 2)).unwrap();

        for team in [TeamId::Blue, TeamId::Red] {
            for y in 0..5 {
                for x in 0..5 {
                    let from = Position::new(x, y);
                    for direction in Direction::ALL {
                        let target = from.step(direction);
                        let expected = (0..5).contains(&target.x)
                            && (0..5).contains(&target.y)
                            && target != Position::new(2, 2)
                            && !(team == TeamId::Blue && target.y == 4)
                            && !(team == TeamId::Red && target.y == 0);
                        assert_eq!(board.can_move(team, from, direction), expected, "{team} {from} {direction:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn moving_keeps_a_single_occupant() {
        let config = small_config();
        let mut board = board(&config);
        board.place_agent(1, Position::new(2, 1)).unwrap();
        board.place_agent(2, Position::new(2, 2)).unwrap();

        assert_eq!(board.move_agent(TeamId::Blue, Position::new(2, 1), Direction::North), None);
        assert_eq!(board.move_agent(TeamId::Blue, Position::new(2, 1), Direction::East), Some(Position::new(3, 1)));
        assert_eq!(board.field(Position::new(2, 1)).unwrap().agent, None);
        assert_eq!(board.field(Position::new(3, 1)).unwrap().agent, Some(1));
        assert_eq!(board.place_agent(3, Position::new(2, 2)), Err(BoardError::Occupied(Position::new(2, 2))));
    }

    #[test]
    fn agents_spawn_inside_their_goal_area() {
        let config = small_config();
        let mut board = board(&config);
        for _ in 0..20 {
            assert_eq!(board.random_position_for_agent(TeamId::Red).unwrap().y, 4);
            assert_eq!(board.random_position_for_agent(TeamId::Blue).unwrap().y, 0);
        }
    }

    #[test]
    fn periodic_spawn_tops_up_circulation() {
        let config = GameMasterConfig { piece_spawn_interval_ms: 100, ..small_config() };
        let mut board = board(&config);
        board.update(Duration::from_millis(250));
        assert_eq!(board.pieces_in_circulation(), 2);
        board.update(Duration::from_millis(1000));
        assert_eq!(board.pieces_in_circulation(), 3);
    }
}
