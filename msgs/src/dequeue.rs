use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::MsgError;

pub const MAX_FRAME_LEN: usize = 1 << 20;

/// Locates the first complete frame in `input_buffer`.
///
/// Returns the body range (`begin..end`, after the length prefix) or `None`
/// while the frame is still incomplete. A declared length above
/// [`MAX_FRAME_LEN`] poisons the stream and is reported as an error.
pub fn dequeue_msg(input_buffer: &[u8]) -> Result<Option<(usize, usize)>, MsgError> {
    if input_buffer.len() < 4 {
        return Ok(None)
    }

    let mut rdr = Cursor::new(input_buffer);
    let msg_ln = rdr.read_u32::<LittleEndian>()? as usize;

    if msg_ln > MAX_FRAME_LEN {
        return Err(MsgError::malformed(format!("frame of {msg_ln} bytes exceeds limit")));
    }

    let end = msg_ln + 4;

    if input_buffer.len() < end {
        return Ok(None)
    }

    Ok(Some((4, end)))
}

#[cfg(test)]
mod tests {
    use byteorder::WriteBytesExt;

    use super::*;

    #[test]
    fn waits_for_the_whole_frame() {
        let mut buffer = Vec::new();
        buffer.write_u32::<LittleEndian>(6).unwrap();
        buffer.extend_from_slice(&[1, 2, 3]);
        assert_eq!(dequeue_msg(&buffer).unwrap(), None);
        buffer.extend_from_slice(&[4, 5, 6, 7]);
        assert_eq!(dequeue_msg(&buffer).unwrap(), Some((4, 10)));
    }

    #[test]
    fn oversized_frames_are_rejected() {
        let mut buffer = Vec::new();
        buffer.write_u32::<LittleEndian>(MAX_FRAME_LEN as u32 + 1).unwrap();
        assert!(matches!(dequeue_msg(&buffer), Err(MsgError::MalformedMessage(_))));
    }
}
