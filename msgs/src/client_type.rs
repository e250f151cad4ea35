/// Host id reserved for the game master.
pub const GAME_MASTER_HOST_ID: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientType {
    Agent,
    GameMaster,
}

impl ClientType {
    pub fn from_u32(index: u32) -> Option<ClientType> {
        match index {
            0 => Some(ClientType::Agent),
            1 => Some(ClientType::GameMaster),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            ClientType::Agent => 0,
            ClientType::GameMaster => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_index_is_rejected() {
        assert_eq!(ClientType::from_u32(1), Some(ClientType::GameMaster));
        assert_eq!(ClientType::from_u32(2), None);
    }
}
