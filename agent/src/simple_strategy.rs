use chrono::{DateTime, Duration as TimeDelta, Utc};
use msgs::{
    geometry::{Direction, Position, TeamId},
    payload::{ActionType, GoalInformation},
};

use crate::{
    agent::Knowledge,
    strategy::{Action, Strategy},
};

/// Pieces further away than this are not chased.
const CLOSE_PIECE_DISTANCE: u32 = 4;
/// Knowledge older than this many move penalties is stale.
const STALENESS_MULTIPLIER: i32 = 4;
/// Discover once more than this many nearby fields are stale.
const UNDISCOVERED_LIMIT: usize = 4;

/// Greedy heuristic: carry pieces home, chase the closest known piece,
/// discover stale surroundings and fall back to asking teammates.
#[derive(Debug, Default)]
pub struct SimpleStrategy {
    stay_in_line_count: u32,
}

impl SimpleStrategy {
    pub fn new() -> SimpleStrategy {
        SimpleStrategy::default()
    }

    fn stale_after(knowledge: &Knowledge) -> TimeDelta {
        let penalty = knowledge.penalty(ActionType::Move).max(std::time::Duration::from_millis(1));
        let window = TimeDelta::from_std(penalty).unwrap_or_else(|_| TimeDelta::milliseconds(1));
        window * STALENESS_MULTIPLIER
    }

    fn is_fresh(learned_at: Option<DateTime<Utc>>, now: DateTime<Utc>, window: TimeDelta) -> bool {
        learned_at.is_some_and(|at| now - at <= window)
    }

    fn could_move(knowledge: &Knowledge, direction: Direction, now: DateTime<Utc>) -> bool {
        let target = knowledge.position.step(direction);
        let Some(field) = knowledge.board.field(target) else {
            return false;
        };
        if knowledge.board.is_in_goal_area(knowledge.team.opposite(), target) {
            return false;
        }
        !Self::is_fresh(field.denied_move_at, now, Self::stale_after(knowledge))
    }

    fn goal_direction(knowledge: &Knowledge, now: DateTime<Utc>) -> Direction {
        let home = match knowledge.team {
            TeamId::Blue => Direction::South,
            TeamId::Red => Direction::North,
        };
        [home, Direction::East, Direction::West]
            .into_iter()
            .find(|direction| Self::could_move(knowledge, *direction, now))
            .unwrap_or(home)
    }

    /// Walks along the goal rows, stepping deeper once a row has been swept.
    fn stay_in_goal_area(&mut self, knowledge: &Knowledge, now: DateTime<Utc>) -> Direction {
        let direction = if self.stay_in_line_count > knowledge.board.width() {
            Self::goal_direction(knowledge, now)
        } else if Self::could_move(knowledge, Direction::East, now) {
            Direction::East
        } else if Self::could_move(knowledge, Direction::West, now) {
            Direction::West
        } else {
            Self::goal_direction(knowledge, now)
        };
        if matches!(direction, Direction::East | Direction::West) {
            self.stay_in_line_count += 1;
        } else {
            self.stay_in_line_count = 0;
        }
        direction
    }

    /// Direction of the freshest neighbour that is closer to a piece than
    /// the current field, with its distance.
    fn find_closest(knowledge: &Knowledge, now: DateTime<Utc>) -> Option<(Direction, u32)> {
        let window = Self::stale_after(knowledge);
        let here = knowledge.current_field().and_then(|field| field.distance_to_piece).unwrap_or(u32::MAX);
        let mut best: Option<(Direction, u32)> = None;

        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let position = Position::new(knowledge.position.x + dx, knowledge.position.y + dy);
                let Some(field) = knowledge.board.field(position) else {
                    continue;
                };
                let Some(distance) = field.distance_to_piece else {
                    continue;
                };
                if !Self::is_fresh(field.distance_learned_at, now, window) {
                    continue;
                }
                if distance >= here || best.is_some_and(|(_, shortest)| distance >= shortest) {
                    continue;
                }
                let direction = if dy > 0 {
                    Direction::North
                } else if dy < 0 {
                    Direction::South
                } else if dx < 0 {
                    Direction::West
                } else {
                    Direction::East
                };
                if Self::could_move(knowledge, direction, now) {
                    best = Some((direction, distance));
                }
            }
        }
        best
    }

    fn count_undiscovered(knowledge: &Knowledge, now: DateTime<Utc>) -> usize {
        let window = Self::stale_after(knowledge);
        let mut count = 0;
        for dy in -1..=1 {
            for dx in -1..=1 {
                let position = Position::new(knowledge.position.x + dx, knowledge.position.y + dy);
                if let Some(field) = knowledge.board.field(position) {
                    if !Self::is_fresh(field.distance_learned_at, now, window) {
                        count += 1;
                    }
                }
            }
        }
        count
    }
}

impl Strategy for SimpleStrategy {
    fn decide(&mut self, knowledge: &Knowledge, now: DateTime<Utc>) -> Action {
        let in_goal_area = knowledge.in_own_goal_area();
        if !in_goal_area {
            self.stay_in_line_count = 0;
        }

        if !knowledge.waiting_players.is_empty() {
            return Action::GiveInfo;
        }

        if let Some(piece) = knowledge.piece {
            if !piece.is_discovered {
                return Action::CheckSham;
            }
            let unexplored = knowledge
                .current_field()
                .is_some_and(|field| field.goal_info == GoalInformation::NoInformation);
            if in_goal_area && unexplored {
                self.stay_in_line_count = 0;
                return Action::Put;
            }
            if in_goal_area {
                return Action::Move (self.stay_in_goal_area(knowledge, now));
            }
            return Action::Move (Self::goal_direction(knowledge, now));
        }

        if knowledge.current_field().and_then(|field| field.distance_to_piece) == Some(0) {
            return Action::PickUp;
        }
        if let Some((direction, distance)) = Self::find_closest(knowledge, now) {
            if distance <= CLOSE_PIECE_DISTANCE {
                return Action::Move (direction);
            }
        }
        if Self::count_undiscovered(knowledge, now) > UNDISCOVERED_LIMIT || knowledge.teammates.is_empty() {
            return Action::Discover;
        }
        Action::BegForInfo
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, time::Duration};

    use msgs::matrix::Matrix;

    use super::*;
    use crate::{agent::HeldPiece, board::AgentBoard};

    fn knowledge(team: TeamId, position: Position) -> Knowledge {
        let mut penalties = BTreeMap::new();
        penalties.insert(ActionType::Move, Duration::from_millis(100));
        Knowledge {
            agent_id: 1,
            team,
            is_leader: false,
            leader_id: 2,
            position,
            board: AgentBoard::new(5, 7, 2),
            teammates: vec![2],
            waiting_players: Default::default(),
            piece: None,
            penalties,
            sham_probability: 0.0,
        }
    }

    #[test]
    fn answers_waiting_teammates_first() {
        let mut knowledge = knowledge(TeamId::Blue, Position::new(2, 3));
        knowledge.waiting_players.push_back(2);
        knowledge.piece = Some(HeldPiece { is_discovered: false });
        assert_eq!(SimpleStrategy::new().decide(&knowledge, Utc::now()), Action::GiveInfo);
    }

    #[test]
    fn checks_undiscovered_piece() {
        let mut knowledge = knowledge(TeamId::Blue, Position::new(2, 3));
        knowledge.piece = Some(HeldPiece { is_discovered: false });
        assert_eq!(SimpleStrategy::new().decide(&knowledge, Utc::now()), Action::CheckSham);
    }

    #[test]
    fn carries_piece_home() {
        let mut blue = knowledge(TeamId::Blue, Position::new(2, 3));
        blue.piece = Some(HeldPiece { is_discovered: true });
        assert_eq!(SimpleStrategy::new().decide(&blue, Utc::now()), Action::Move (Direction::South));

        let mut red = knowledge(TeamId::Red, Position::new(2, 3));
        red.piece = Some(HeldPiece { is_discovered: true });
        assert_eq!(SimpleStrategy::new().decide(&red, Utc::now()), Action::Move (Direction::North));
    }

    #[test]
    fn puts_on_unexplored_goal_field_then_patrols() {
        let mut knowledge = knowledge(TeamId::Blue, Position::new(2, 1));
        knowledge.piece = Some(HeldPiece { is_discovered: true });
        let mut strategy = SimpleStrategy::new();
        assert_eq!(strategy.decide(&knowledge, Utc::now()), Action::Put);

        knowledge.board.record_goal_info(Position::new(2, 1), GoalInformation::NoGoal);
        assert_eq!(strategy.decide(&knowledge, Utc::now()), Action::Move (Direction::East));
    }

    #[test]
    fn picks_up_where_piece_is_known() {
        let mut knowledge = knowledge(TeamId::Blue, Position::new(2, 3));
        knowledge.board.record_distance(Position::new(2, 3), Some(0), Utc::now());
        assert_eq!(SimpleStrategy::new().decide(&knowledge, Utc::now()), Action::PickUp);
    }

    #[test]
    fn chases_closer_fresh_neighbour() {
        let mut knowledge = knowledge(TeamId::Blue, Position::new(2, 3));
        let now = Utc::now();
        let distances = Matrix::from_rows(vec![vec![3, 3, 3], vec![3, 2, 3], vec![3, 1, 3]]).unwrap();
        knowledge.board.apply_discovery(Position::new(2, 3), &distances, now);
        assert_eq!(SimpleStrategy::new().decide(&knowledge, now), Action::Move (Direction::North));
    }

    #[test]
    fn discovers_stale_surroundings() {
        let knowledge = knowledge(TeamId::Blue, Position::new(2, 3));
        assert_eq!(SimpleStrategy::new().decide(&knowledge, Utc::now()), Action::Discover);
    }

    #[test]
    fn begs_for_info_when_neighbourhood_is_fresh_but_empty() {
        let mut knowledge = knowledge(TeamId::Blue, Position::new(2, 3));
        let now = Utc::now();
        knowledge.board.apply_discovery(Position::new(2, 3), &Matrix::new(3, 3, 9), now);
        assert_eq!(SimpleStrategy::new().decide(&knowledge, now), Action::BegForInfo);

        knowledge.teammates.clear();
        assert_eq!(SimpleStrategy::new().decide(&knowledge, now), Action::Discover);
    }

    #[test]
    fn never_steps_into_opposing_goal_area() {
        let knowledge = knowledge(TeamId::Blue, Position::new(2, 4));
        assert!(!SimpleStrategy::could_move(&knowledge, Direction::North, Utc::now()));
        assert!(SimpleStrategy::could_move(&knowledge, Direction::South, Utc::now()));
    }
}
