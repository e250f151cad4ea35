use std::io::Cursor;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{de::DeserializeOwned, Deserialize};

use crate::{error::MsgError, message_id::MessageId, payload::*};

/// Typed body of a game message. The variant decides the [`MessageId`].
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    JoinRequest (JoinRequest),
    MoveRequest (MoveRequest),
    PickUpPieceRequest,
    PutDownPieceRequest,
    CheckShamRequest,
    DiscoverRequest,
    DestroyPieceRequest,
    ExchangeInformationRequest (ExchangeInformationRequest),
    ExchangeInformationResponse (ExchangeInformationResponse),
    JoinResponse (JoinResponse),
    MoveResponse (MoveResponse),
    PickUpPieceResponse,
    PutDownPieceResponse (PutDownPieceResponse),
    CheckShamResponse (CheckShamResponse),
    DiscoverResponse (DiscoverResponse),
    DestroyPieceResponse,
    ExchangeInformationRequestForward (ExchangeInformationRequestForward),
    ExchangeInformationResponseForward (ExchangeInformationResponseForward),
    StartGame (StartGame),
    PauseGame,
    ResumeGame,
    EndGame (EndGame),
    UndefinedError (UndefinedError),
    MoveError (MoveError),
    PickUpPieceError (PickUpPieceError),
    PutDownPieceError (PutDownPieceError),
    IgnoredDelayError (IgnoredDelayError),
}

impl Payload {
    pub fn message_id(&self) -> MessageId {
        match self {
            Payload::JoinRequest (_) => MessageId::JoinRequest,
            Payload::MoveRequest (_) => MessageId::MoveRequest,
            Payload::PickUpPieceRequest => MessageId::PickUpPieceRequest,
            Payload::PutDownPieceRequest => MessageId::PutDownPieceRequest,
            Payload::CheckShamRequest => MessageId::CheckShamRequest,
            Payload::DiscoverRequest => MessageId::DiscoverRequest,
            Payload::DestroyPieceRequest => MessageId::DestroyPieceRequest,
            Payload::ExchangeInformationRequest (_) => MessageId::ExchangeInformationRequest,
            Payload::ExchangeInformationResponse (_) => MessageId::ExchangeInformationResponse,
            Payload::JoinResponse (_) => MessageId::JoinResponse,
            Payload::MoveResponse (_) => MessageId::MoveResponse,
            Payload::PickUpPieceResponse => MessageId::PickUpPieceResponse,
            Payload::PutDownPieceResponse (_) => MessageId::PutDownPieceResponse,
            Payload::CheckShamResponse (_) => MessageId::CheckShamResponse,
            Payload::DiscoverResponse (_) => MessageId::DiscoverResponse,
            Payload::DestroyPieceResponse => MessageId::DestroyPieceResponse,
            Payload::ExchangeInformationRequestForward (_) => MessageId::ExchangeInformationRequestForward,
            Payload::ExchangeInformationResponseForward (_) => MessageId::ExchangeInformationResponseForward,
            Payload::StartGame (_) => MessageId::StartGame,
            Payload::PauseGame => MessageId::PauseGame,
            Payload::ResumeGame => MessageId::ResumeGame,
            Payload::EndGame (_) => MessageId::EndGame,
            Payload::UndefinedError (_) => MessageId::UndefinedError,
            Payload::MoveError (_) => MessageId::MoveError,
            Payload::PickUpPieceError (_) => MessageId::PickUpPieceError,
            Payload::PutDownPieceError (_) => MessageId::PutDownPieceError,
            Payload::IgnoredDelayError (_) => MessageId::IgnoredDelayError,
        }
    }

    fn write_json(&self, wtr: &mut Vec<u8>) -> Result<(), MsgError> {
        match self {
            Payload::JoinRequest (p) => serde_json::to_writer(wtr, p)?,
            Payload::MoveRequest (p) => serde_json::to_writer(wtr, p)?,
            Payload::ExchangeInformationRequest (p) => serde_json::to_writer(wtr, p)?,
            Payload::ExchangeInformationResponse (p) => serde_json::to_writer(wtr, p)?,
            Payload::JoinResponse (p) => serde_json::to_writer(wtr, p)?,
            Payload::MoveResponse (p) => serde_json::to_writer(wtr, p)?,
            Payload::PutDownPieceResponse (p) => serde_json::to_writer(wtr, p)?,
            Payload::CheckShamResponse (p) => serde_json::to_writer(wtr, p)?,
            Payload::DiscoverResponse (p) => serde_json::to_writer(wtr, p)?,
            Payload::ExchangeInformationRequestForward (p) => serde_json::to_writer(wtr, p)?,
            Payload::ExchangeInformationResponseForward (p) => serde_json::to_writer(wtr, p)?,
            Payload::StartGame (p) => serde_json::to_writer(wtr, p)?,
            Payload::EndGame (p) => serde_json::to_writer(wtr, p)?,
            Payload::UndefinedError (p) => serde_json::to_writer(wtr, p)?,
            Payload::MoveError (p) => serde_json::to_writer(wtr, p)?,
            Payload::PickUpPieceError (p) => serde_json::to_writer(wtr, p)?,
            Payload::PutDownPieceError (p) => serde_json::to_writer(wtr, p)?,
            Payload::IgnoredDelayError (p) => serde_json::to_writer(wtr, p)?,
            Payload::PickUpPieceRequest
            | Payload::PutDownPieceRequest
            | Payload::CheckShamRequest
            | Payload::DiscoverRequest
            | Payload::DestroyPieceRequest
            | Payload::PickUpPieceResponse
            | Payload::DestroyPieceResponse
            | Payload::PauseGame
            | Payload::ResumeGame => wtr.extend_from_slice(b"{}"),
        }
        Ok(())
    }

    fn read_json(message_id: MessageId, body: &[u8]) -> Result<Payload, MsgError> {
        let payload = match message_id {
            MessageId::JoinRequest => Payload::JoinRequest (parse(body)?),
            MessageId::MoveRequest => Payload::MoveRequest (parse(body)?),
            MessageId::PickUpPieceRequest => empty(body, Payload::PickUpPieceRequest)?,
            MessageId::PutDownPieceRequest => empty(body, Payload::PutDownPieceRequest)?,
            MessageId::CheckShamRequest => empty(body, Payload::CheckShamRequest)?,
            MessageId::DiscoverRequest => empty(body, Payload::DiscoverRequest)?,
            MessageId::DestroyPieceRequest => empty(body, Payload::DestroyPieceRequest)?,
            MessageId::ExchangeInformationRequest => Payload::ExchangeInformationRequest (parse(body)?),
            MessageId::ExchangeInformationResponse => Payload::ExchangeInformationResponse (parse(body)?),
            MessageId::JoinResponse => Payload::JoinResponse (parse(body)?),
            MessageId::MoveResponse => Payload::MoveResponse (parse(body)?),
            MessageId::PickUpPieceResponse => empty(body, Payload::PickUpPieceResponse)?,
            MessageId::PutDownPieceResponse => Payload::PutDownPieceResponse (parse(body)?),
            MessageId::CheckShamResponse => Payload::CheckShamResponse (parse(body)?),
            MessageId::DiscoverResponse => {
                let response: DiscoverResponse = parse(body)?;
                if response.distances.height() != 3 || response.distances.width() != 3 {
                    return Err(MsgError::malformed(format!(
                        "discovery grid must be 3x3, got {}x{}",
                        response.distances.height(),
                        response.distances.width()
                    )));
                }
                Payload::DiscoverResponse (response)
            }
            MessageId::DestroyPieceResponse => empty(body, Payload::DestroyPieceResponse)?,
            MessageId::ExchangeInformationRequestForward => Payload::ExchangeInformationRequestForward (parse(body)?),
            MessageId::ExchangeInformationResponseForward => Payload::ExchangeInformationResponseForward (parse(body)?),
            MessageId::StartGame => Payload::StartGame (parse(body)?),
            MessageId::PauseGame => empty(body, Payload::PauseGame)?,
            MessageId::ResumeGame => empty(body, Payload::ResumeGame)?,
            MessageId::EndGame => Payload::EndGame (parse(body)?),
            MessageId::UndefinedError => Payload::UndefinedError (parse(body)?),
            MessageId::MoveError => Payload::MoveError (parse(body)?),
            MessageId::PickUpPieceError => Payload::PickUpPieceError (parse(body)?),
            MessageId::PutDownPieceError => Payload::PutDownPieceError (parse(body)?),
            MessageId::IgnoredDelayError => Payload::IgnoredDelayError (parse(body)?),
        };
        Ok(payload)
    }
}

fn parse<T: DeserializeOwned>(body: &[u8]) -> Result<T, MsgError> {
    serde_json::from_slice(body).map_err(MsgError::malformed)
}

#[derive(Deserialize)]
struct Empty {}

fn empty(body: &[u8], payload: Payload) -> Result<Payload, MsgError> {
    if !body.is_empty() {
        parse::<Empty>(body)?;
    }
    Ok(payload)
}

/// Header of a game envelope, readable without touching the JSON body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    pub message_id: MessageId,
    pub agent_id: u32,
}

impl Envelope {
    pub const HEADER_LEN: usize = 8;

    pub fn peek(bytes: &[u8]) -> Result<Envelope, MsgError> {
        let mut rdr = Cursor::new(bytes);
        let id_index = rdr.read_u32::<LittleEndian>().map_err(MsgError::malformed)?;
        let agent_id = rdr.read_u32::<LittleEndian>().map_err(MsgError::malformed)?;
        let message_id = MessageId::from_u32(id_index)
            .ok_or_else(|| MsgError::malformed(format!("unknown message id: {id_index}")))?;
        Ok(Envelope { message_id, agent_id })
    }

    /// Overwrites the agent id in place. Used by the relay to stamp the sender.
    pub fn restamp(bytes: &mut [u8], agent_id: u32) -> Result<(), MsgError> {
        if bytes.len() < Envelope::HEADER_LEN {
            return Err(MsgError::malformed("envelope shorter than its header"));
        }
        LittleEndian::write_u32(&mut bytes[4..8], agent_id);
        Ok(())
    }
}

/// A decoded game message. `agent_id` is the sender for agent requests and
/// the recipient for game master messages.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub agent_id: u32,
    pub payload: Payload,
}

impl Message {
    pub fn new(agent_id: u32, payload: Payload) -> Message {
        Message { agent_id, payload }
    }

    pub fn message_id(&self) -> MessageId {
        self.payload.message_id()
    }

    pub fn encode(&self) -> Result<Vec<u8>, MsgError> {
        let mut bytes = Vec::with_capacity(64);
        bytes.write_u32::<LittleEndian>(self.message_id().as_u32())?;
        bytes.write_u32::<LittleEndian>(self.agent_id)?;
        self.payload.write_json(&mut bytes)?;
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<Message, MsgError> {
        let envelope = Envelope::peek(bytes)?;
        let payload = Payload::read_json(envelope.message_id, &bytes[Envelope::HEADER_LEN..])?;
        Ok(Message { agent_id: envelope.agent_id, payload })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashSet};

    use super::*;
    use crate::{
        geometry::{BoardSize, Direction, Position, TeamId},
        matrix::Matrix,
    };

    fn sample_payloads() -> Vec<Payload> {
        let goals = Matrix::new(1, 3, GoalInformation::NoInformation);
        let mut penalties = BTreeMap::new();
        penalties.insert(ActionType::Move, 100);
        penalties.insert(ActionType::PutPiece, 50);
        vec![
            Payload::JoinRequest (JoinRequest { team_id: TeamId::Red, wants_to_be_leader: false }),
            Payload::MoveRequest (MoveRequest { direction: Direction::North }),
            Payload::PickUpPieceRequest,
            Payload::PutDownPieceRequest,
            Payload::CheckShamRequest,
            Payload::DiscoverRequest,
            Payload::DestroyPieceRequest,
            Payload::ExchangeInformationRequest (ExchangeInformationRequest { asked_agent_id: 3 }),
            Payload::ExchangeInformationResponse (ExchangeInformationResponse {
                respond_to_id: 4,
                distances: Matrix::new(5, 3, 2),
                red_team_goal_area: goals.clone(),
                blue_team_goal_area: goals.clone(),
            }),
            Payload::JoinResponse (JoinResponse { accepted: true, agent_id: 6 }),
            Payload::MoveResponse (MoveResponse { made_move: true, current_position: Position::new(0, 1), closest_piece: Some(3) }),
            Payload::PickUpPieceResponse,
            Payload::PutDownPieceResponse (PutDownPieceResponse { result: PutDownPieceResult::ShamOnGoalArea }),
            Payload::CheckShamResponse (CheckShamResponse { sham: true }),
            Payload::DiscoverResponse (DiscoverResponse { distances: Matrix::new(3, 3, -1) }),
            Payload::DestroyPieceResponse,
            Payload::ExchangeInformationRequestForward (ExchangeInformationRequestForward {
                asking_agent_id: 2,
                leader: true,
                team_id: TeamId::Blue,
            }),
            Payload::ExchangeInformationResponseForward (ExchangeInformationResponseForward {
                responding_id: 3,
                distances: Matrix::new(5, 3, -1),
                red_team_goal_area: Matrix::new(1, 3, GoalInformation::Goal),
                blue_team_goal_area: goals.clone(),
            }),
            Payload::StartGame (StartGame {
                agent_id: 2,
                allies_ids: vec![2, 3],
                leader_id: 2,
                enemies_ids: vec![1, 4],
                team_id: TeamId::Blue,
                board_size: BoardSize { x: 3, y: 5 },
                goal_area_size: 1,
                number_of_players: NumberOfPlayers { allies: 2, enemies: 2 },
                number_of_pieces: 2,
                number_of_goals: 1,
                penalties,
                sham_piece_probability: 0.25,
                position: Position::new(1, 0),
            }),
            Payload::PauseGame,
            Payload::ResumeGame,
            Payload::EndGame (EndGame { winner: TeamId::Red }),
            Payload::UndefinedError (UndefinedError { position: None, holding_piece: Some(false) }),
            Payload::MoveError (MoveError { position: Position::new(2, 4) }),
            Payload::PickUpPieceError (PickUpPieceError { error_subtype: PickUpPieceErrorSubtype::NothingThere }),
            Payload::PutDownPieceError (PutDownPieceError { error_subtype: PutDownPieceErrorSubtype::CannotPutThere }),
            Payload::IgnoredDelayError (IgnoredDelayError { delay: 250 }),
        ]
    }

    #[test]
    fn decoded_messages_match_what_was_sent() {
        for payload in sample_payloads() {
            let message = Message::new(7, payload);
            let bytes = message.encode().unwrap();
            assert_eq!(Message::decode(&bytes).unwrap(), message);
        }
    }

    #[test]
    fn samples_cover_every_message_id() {
        let sampled: HashSet<MessageId> = sample_payloads().iter().map(Payload::message_id).collect();
        let all: HashSet<MessageId> = (0..=8).chain(100..=112).chain(900..=904).filter_map(MessageId::from_u32).collect();
        assert_eq!(all.len(), 27);
        assert_eq!(sampled, all);
    }

    #[test]
    fn unknown_message_id_is_malformed() {
        let mut bytes = Message::new(1, Payload::DiscoverRequest).encode().unwrap();
        LittleEndian::write_u32(&mut bytes[0..4], 555);
        assert!(matches!(Message::decode(&bytes), Err(MsgError::MalformedMessage(_))));
    }

    #[test]
    fn missing_required_field_is_malformed() {
        let mut bytes = Vec::new();
        bytes.write_u32::<LittleEndian>(MessageId::JoinRequest.as_u32()).unwrap();
        bytes.write_u32::<LittleEndian>(3).unwrap();
        bytes.extend_from_slice(br#"{"teamId":"Red"}"#);
        assert!(matches!(Message::decode(&bytes), Err(MsgError::MalformedMessage(_))));
    }

    #[test]
    fn discovery_grid_must_be_three_by_three() {
        let message = Message::new(1, Payload::DiscoverResponse (DiscoverResponse { distances: Matrix::new(2, 3, 0) }));
        let bytes = message.encode().unwrap();
        assert!(matches!(Message::decode(&bytes), Err(MsgError::MalformedMessage(_))));
    }

    #[test]
    fn restamp_only_touches_the_agent_id() {
        let mut bytes = Message::new(99, Payload::MoveRequest (MoveRequest { direction: Direction::West })).encode().unwrap();
        Envelope::restamp(&mut bytes, 5).unwrap();
        let envelope = Envelope::peek(&bytes).unwrap();
        assert_eq!(envelope, Envelope { message_id: MessageId::MoveRequest, agent_id: 5 });
        let decoded = Message::decode(&bytes).unwrap();
        assert_eq!(decoded.payload, Payload::MoveRequest (MoveRequest { direction: Direction::West }));
    }

    #[test]
    fn empty_payloads_accept_a_bare_header() {
        let mut bytes = Vec::new();
        bytes.write_u32::<LittleEndian>(MessageId::ResumeGame.as_u32()).unwrap();
        bytes.write_u32::<LittleEndian>(0).unwrap();
        assert_eq!(Message::decode(&bytes).unwrap().payload, Payload::ResumeGame);
    }
}
