use std::io::{Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{client_type::ClientType, dequeue::dequeue_msg, error::MsgError};

/// Frames a client sends to the communication server.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientServerMsg<'a> {
    Disconnect,
    Register (ClientType),
    Game (&'a [u8]),
}

impl<'a> ClientServerMsg<'a> {
    /// Outer error: the stream is unusable. Inner error: only this frame is bad,
    /// the caller drains `end` bytes and carries on.
    pub fn dequeue_and_decode(input_buffer: &[u8]) -> Result<Option<(usize, Result<ClientServerMsg<'_>, MsgError>)>, MsgError> {
        let Some((begin, end)) = dequeue_msg(input_buffer)? else { return Ok(None) };
        let msg = ClientServerMsg::decode(&input_buffer[begin..end]);
        Ok(Some((end, msg)))
    }

    pub fn decode(input_buffer: &[u8]) -> Result<ClientServerMsg<'_>, MsgError> {
        let mut rdr = Cursor::new(input_buffer);
        let msg_type_index = rdr.read_u32::<LittleEndian>().map_err(MsgError::malformed)?;

        let begin = 4;

        let msg = match msg_type_index {
            0 => ClientServerMsg::Disconnect,
            1 => {
                let client_type_index = rdr.read_u32::<LittleEndian>().map_err(MsgError::malformed)?;
                let client_type = ClientType::from_u32(client_type_index)
                    .ok_or_else(|| MsgError::malformed(format!("unsupported client type: {client_type_index}")))?;
                ClientServerMsg::Register (client_type)
            }
            2 => ClientServerMsg::Game (&input_buffer[begin..]),
            type_index => {
                return Err(MsgError::malformed(format!("unsupported client server frame type: {type_index}")));
            }
        };

        Ok(msg)
    }

    pub fn pack(&self, wtr: &mut impl Write) -> std::io::Result<()> {
        match self {
            ClientServerMsg::Disconnect => {
                wtr.write_u32::<LittleEndian>(4)?;
                wtr.write_u32::<LittleEndian>(0)?;
            }
            ClientServerMsg::Register (client_type) => {
                wtr.write_u32::<LittleEndian>(8)?;
                wtr.write_u32::<LittleEndian>(1)?;
                wtr.write_u32::<LittleEndian>(client_type.as_u32())?;
            }
            ClientServerMsg::Game (bytes) => {
                wtr.write_u32::<LittleEndian>(4 + bytes.len() as u32)?;
                wtr.write_u32::<LittleEndian>(2)?;
                wtr.write_all(bytes)?;
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
    fn register_frame_survives_the_relay_framing() {
        let bytes = ClientServerMsg::Register (ClientType::GameMaster).to_bytes().unwrap();
        let (end, msg) = ClientServerMsg::dequeue_and_decode(&bytes).unwrap().unwrap();
        assert_eq!(end, bytes.len());
        assert_eq!(msg.unwrap(), ClientServerMsg::Register (ClientType::GameMaster));
    }

    #[test]
    fn two_frames_in_one_read_are_split() {
        let mut bytes = ClientServerMsg::Game (&[9, 9, 9]).to_bytes().unwrap();
        bytes.extend(ClientServerMsg::Disconnect.to_bytes().unwrap());

        let (end, first) = ClientServerMsg::dequeue_and_decode(&bytes).unwrap().unwrap();
        assert_eq!(first.unwrap(), ClientServerMsg::Game (&[9, 9, 9]));
        let rest = &bytes[end..];
        let (_, second) = ClientServerMsg::dequeue_and_decode(rest).unwrap().unwrap();
        assert_eq!(second.unwrap(), ClientServerMsg::Disconnect);
    }

    #[test]
    fn unknown_client_type_is_malformed_but_consumed() {
        let mut bytes = Vec::new();
        bytes.write_u32::<LittleEndian>(8).unwrap();
        bytes.write_u32::<LittleEndian>(1).unwrap();
        bytes.write_u32::<LittleEndian>(7).unwrap();
        let (end, msg) = ClientServerMsg::dequeue_and_decode(&bytes).unwrap().unwrap();
        assert_eq!(end, 12);
        assert!(matches!(msg, Err(MsgError::MalformedMessage(_))));
    }
}
