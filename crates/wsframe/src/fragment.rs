//! Splitting outbound messages into frame-sized fragments (RFC 6455 §5.4).

use crate::error::WsError;
use crate::opcode::Opcode;

/// Splits `data` into chunks of `max_frame_size` bytes; the last may be
/// shorter.
///
/// Yields `ceil(data.len() / max_frame_size)` chunks, so empty input gives no
/// chunks at all.
pub fn fragment(data: &[u8], max_frame_size: usize) -> Result<Vec<&[u8]>, WsError> {
    if max_frame_size == 0 {
        return Err(WsError::InvalidFragmentSize);
    }
    Ok(data.chunks(max_frame_size).collect())
}

/// One frame of a fragmented message, ready to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment<'a> {
    pub opcode: Opcode,
    pub fin: bool,
    pub payload: &'a [u8],
}

/// Turns a message into its frame sequence.
///
/// The first frame carries `opcode`, every later frame carries
/// [`Opcode::Continuation`], and only the last frame has `fin` set. An empty
/// message becomes a single final frame. Reserved opcodes are accepted only
/// from the data range (3-7).
pub fn fragment_frames(
    opcode: Opcode,
    data: &[u8],
    max_frame_size: usize,
) -> Result<Vec<Fragment<'_>>, WsError> {
    match opcode {
        Opcode::Text | Opcode::Binary => {}
        Opcode::Unrecognized(bits) if bits < Opcode::MIN_CONTROL_OPCODE => {}
        Opcode::Continuation => return Err(WsError::UnexpectedContinuation),
        Opcode::Close | Opcode::Ping | Opcode::Pong | Opcode::Unrecognized(_) => {
            return Err(WsError::FragmentedControlFrame)
        }
    }
    let chunks = fragment(data, max_frame_size)?;
    if chunks.is_empty() {
        return Ok(vec![Fragment {
            opcode,
            fin: true,
            payload: data,
        }]);
    }
    let last = chunks.len() - 1;
    Ok(chunks
        .into_iter()
        .enumerate()
        .map(|(i, payload)| Fragment {
            opcode: if i == 0 { opcode } else { Opcode::Continuation },
            fin: i == last,
            payload,
        })
        .collect())
}
