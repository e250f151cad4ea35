/// Stable discriminant carried in the first word of every game envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    JoinRequest,
    MoveRequest,
    PickUpPieceRequest,
    PutDownPieceRequest,
    CheckShamRequest,
    DiscoverRequest,
    DestroyPieceRequest,
    ExchangeInformationRequest,
    ExchangeInformationResponse,
    JoinResponse,
    MoveResponse,
    PickUpPieceResponse,
    PutDownPieceResponse,
    CheckShamResponse,
    DiscoverResponse,
    DestroyPieceResponse,
    ExchangeInformationRequestForward,
    ExchangeInformationResponseForward,
    StartGame,
    PauseGame,
    ResumeGame,
    EndGame,
    UndefinedError,
    MoveError,
    PickUpPieceError,
    PutDownPieceError,
    IgnoredDelayError,
}

impl MessageId {
    pub fn from_u32(index: u32) -> Option<MessageId> {
        let id = match index {
            0 => MessageId::JoinRequest,
            1 => MessageId::MoveRequest,
            2 => MessageId::PickUpPieceRequest,
            3 => MessageId::PutDownPieceRequest,
            4 => MessageId::CheckShamRequest,
            5 => MessageId::DiscoverRequest,
            6 => MessageId::DestroyPieceRequest,
            7 => MessageId::ExchangeInformationRequest,
            8 => MessageId::ExchangeInformationResponse,
            100 => MessageId::JoinResponse,
            101 => MessageId::MoveResponse,
            102 => MessageId::PickUpPieceResponse,
            103 => MessageId::PutDownPieceResponse,
            104 => MessageId::CheckShamResponse,
            105 => MessageId::DiscoverResponse,
            106 => MessageId::DestroyPieceResponse,
            107 => MessageId::ExchangeInformationRequestForward,
            108 => MessageId::ExchangeInformationResponseForward,
            109 => MessageId::StartGame,
            110 => MessageId::PauseGame,
            111 => MessageId::ResumeGame,
            112 => MessageId::EndGame,
            900 => MessageId::UndefinedError,
            901 => MessageId::MoveError,
            902 => MessageId::PickUpPieceError,
            903 => MessageId::PutDownPieceError,
            904 => MessageId::IgnoredDelayError,
            _ => return None,
        };
        Some(id)
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            MessageId::JoinRequest => 0,
            MessageId::MoveRequest => 1,
            MessageId::PickUpPieceRequest => 2,
            MessageId::PutDownPieceRequest => 3,
            MessageId::CheckShamRequest => 4,
            MessageId::DiscoverRequest => 5,
            MessageId::DestroyPieceRequest => 6,
            MessageId::ExchangeInformationRequest => 7,
            MessageId::ExchangeInformationResponse => 8,
            MessageId::JoinResponse => 100,
            MessageId::MoveResponse => 101,
            MessageId::PickUpPieceResponse => 102,
            MessageId::PutDownPieceResponse => 103,
            MessageId::CheckShamResponse => 104,
            MessageId::DiscoverResponse => 105,
            MessageId::DestroyPieceResponse => 106,
            MessageId::ExchangeInformationRequestForward => 107,
            MessageId::ExchangeInformationResponseForward => 108,
            MessageId::StartGame => 109,
            MessageId::PauseGame => 110,
            MessageId::ResumeGame => 111,
            MessageId::EndGame => 112,
            MessageId::UndefinedError => 900,
            MessageId::MoveError => 901,
            MessageId::PickUpPieceError => 902,
            MessageId::PutDownPieceError => 903,
            MessageId::IgnoredDelayError => 904,
        }
    }

    /// Ids sent by agents. Everything else originates at the game master.
    pub fn is_agent_request(&self) -> bool {
        self.as_u32() < 100
    }

    pub fn is_error(&self) -> bool {
        self.as_u32() >= 900
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}
