use std::io::{Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{dequeue::dequeue_msg, error::MsgError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    DuplicateRegistration,
    GameMasterAlreadyRegistered,
    Other,
}

impl RejectReason {
    pub fn from_u32(index: u32) -> RejectReason {
        match index {
            0 => RejectReason::DuplicateRegistration,
            1 => RejectReason::GameMasterAlreadyRegistered,
            _ => RejectReason::Other,
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            RejectReason::DuplicateRegistration => 0,
            RejectReason::GameMasterAlreadyRegistered => 1,
            RejectReason::Other => 2,
        }
    }
}

/// Frames the communication server sends to a client.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerClientMsg<'a> {
    AssignHostId (u32),
    HostDisconnected (u32),
    Game (&'a [u8]),
    RegistrationRejected (RejectReason),
}

impl<'a> ServerClientMsg<'a> {
    pub fn dequeue_and_decode(input_buffer: &[u8]) -> Result<Option<(usize, Result<ServerClientMsg<'_>, MsgError>)>, MsgError> {
        let Some((begin, end)) = dequeue_msg(input_buffer)? else { return Ok(None) };
        let msg = ServerClientMsg::decode(&input_buffer[begin..end]);
        Ok(Some((end, msg)))
    }

    pub fn decode(input_buffer: &[u8]) -> Result<ServerClientMsg<'_>, MsgError> {
        let mut rdr = Cursor::new(input_buffer);
        let msg_type_index = rdr.read_u32::<LittleEndian>().map_err(MsgError::malformed)?;

        let begin = 4;

        let msg = match msg_type_index {
            0 => {
                let host_id = rdr.read_u32::<LittleEndian>().map_err(MsgError::malformed)?;
                ServerClientMsg::AssignHostId (host_id)
            }
            1 => {
                let host_id = rdr.read_u32::<LittleEndian>().map_err(MsgError::malformed)?;
                ServerClientMsg::HostDisconnected (host_id)
            }
            2 => ServerClientMsg::Game (&input_buffer[begin..]),
            3 => {
                let reason = rdr.read_u32::<LittleEndian>().map_err(MsgError::malformed)?;
                ServerClientMsg::RegistrationRejected (RejectReason::from_u32(reason))
            }
            type_index => {
                return Err(MsgError::malformed(format!("unsupported server client frame type: {type_index}")));
            }
        };

        Ok(msg)
    }

    pub fn pack(&self, wtr: &mut impl Write) -> std::io::Result<()> {
        match self {
            ServerClientMsg::AssignHostId (id) => {
                wtr.write_u32::<LittleEndian>(8)?;
                wtr.write_u32::<LittleEndian>(0)?;
                wtr.write_u32::<LittleEndian>(*id)?;
            }
            ServerClientMsg::HostDisconnected (id) => {
                wtr.write_u32::<LittleEndian>(8)?;
                wtr.write_u32::<LittleEndian>(1)?;
                wtr.write_u32::<LittleEndian>(*id)?;
            }
            ServerClientMsg::Game (bytes) => {
                wtr.write_u32::<LittleEndian>(4 + bytes.len() as u32)?;
                wtr.write_u32::<LittleEndian>(2)?;
                wtr.write_all(bytes)?;
            }
            ServerClientMsg::RegistrationRejected (reason) => {
                wtr.write_u32::<LittleEndian>(8)?;
                wtr.write_u32::<LittleEndian>(3)?;
                wtr.write_u32::<LittleEndian>(reason.as_u32())?;
            }
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> std::io::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.pack(&mut bytes)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_excludes_the_length_prefix() {
        let bytes = ServerClientMsg::HostDisconnected (17).to_bytes().unwrap();
        let (begin, end) = dequeue_msg(&bytes).unwrap().unwrap();
        assert_eq!(ServerClientMsg::decode(&bytes[begin..end]).unwrap(), ServerClientMsg::HostDisconnected (17));
    }

    #[test]
    fn rejection_reason_is_preserved() {
        let bytes = ServerClientMsg::RegistrationRejected (RejectReason::GameMasterAlreadyRegistered).to_bytes().unwrap();
        let (_, msg) = ServerClientMsg::dequeue_and_decode(&bytes).unwrap().unwrap();
        assert_eq!(msg.unwrap(), ServerClientMsg::RegistrationRejected (RejectReason::GameMasterAlreadyRegistered));
    }

    #[test]
    fn truncated_body_is_malformed() {
        let mut bytes = Vec::new();
        bytes.write_u32::<LittleEndian>(4).unwrap();
        bytes.write_u32::<LittleEndian>(0).unwrap();
        let (_, msg) = ServerClientMsg::dequeue_and_decode(&bytes).unwrap().unwrap();
        assert!(matches!(msg, Err(MsgError::MalformedMessage(_))));
    }
}
