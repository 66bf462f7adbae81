// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Wire framing.
//!
//! The link layer only talks to a [`Framing`], so the byte layout can change without touching the
//! state machines. [`FixedLengthFraming`] is the wire format both controllers speak: id byte, then
//! the fixed payload for that id, nothing else. It has no checksum, so a flipped id byte
//! desynchronises the stream until an unknown id is discarded. [`ChecksumParser`] is the hardened
//! alternative with a sync byte and checksum.
//!
//! [`ChecksumParser`]: crate::protocol::parser::ChecksumParser

use heapless::Vec;

use crate::protocol::messages::{MsgId, MAX_PAYLOAD};

/// Largest encoded frame across all framings (sync + id + payload + checksum).
pub const MAX_FRAME: usize = MAX_PAYLOAD + 3;

/// Encoded frame bytes.
pub type FrameBuf = Vec<u8, MAX_FRAME>;

/// Payload bytes of a received frame.
pub type Payload = Vec<u8, MAX_PAYLOAD>;

/// A complete frame lifted off the wire, not yet decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFrame {
    pub id: u8,
    pub payload: Payload,
}

/// Outcome of feeding one byte to a framing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameEvent {
    /// A complete frame.
    Frame(RawFrame),
    /// A frame for this id was delimited but failed its integrity check.
    Corrupt(u8),
    /// The byte could not start a frame and was dropped to resynchronise.
    Discarded(u8),
}

/// Frame encoder/decoder.
pub trait Framing {
    /// Encode `id` and `payload` into `out`. `out` is cleared first.
    fn encode(&self, id: MsgId, payload: &[u8], out: &mut FrameBuf);

    /// Feed one received byte.
    fn push(&mut self, byte: u8) -> Option<FrameEvent>;

    /// Drop any partially received frame.
    fn reset(&mut self);
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    WaitId,
    WaitPayload { id: MsgId },
}

/// Id byte followed by the fixed payload for that id.
pub struct FixedLengthFraming {
    state: State,
    payload: Payload,
}

impl FixedLengthFraming {
    pub const fn new() -> Self {
        Self {
            state: State::WaitId,
            payload: Vec::new(),
        }
    }

    fn complete(&mut self, id: MsgId) -> FrameEvent {
        self.state = State::WaitId;
        let payload = core::mem::take(&mut self.payload);
        FrameEvent::Frame(RawFrame {
            id: id.as_u8(),
            payload,
        })
    }
}

impl Default for FixedLengthFraming {
    fn default() -> Self {
        Self::new()
    }
}

impl Framing for FixedLengthFraming {
    fn encode(&self, id: MsgId, payload: &[u8], out: &mut FrameBuf) {
        out.clear();
        // Capacity is MAX_FRAME, which always fits id + payload.
        let _ = out.push(id.as_u8());
        let _ = out.extend_from_slice(payload);
    }

    fn push(&mut self, byte: u8) -> Option<FrameEvent> {
        match self.state {
            State::WaitId => {
                let Some(id) = MsgId::from_u8(byte) else {
                    return Some(FrameEvent::Discarded(byte));
                };
                self.payload.clear();
                if id.payload_len() == 0 {
                    return Some(self.complete(id));
                }
                self.state = State::WaitPayload { id };
                None
            }
            State::WaitPayload { id } => {
                let _ = self.payload.push(byte);
                if self.payload.len() >= id.payload_len() {
                    return Some(self.complete(id));
                }
                None
            }
        }
    }

    fn reset(&mut self) {
        self.state = State::WaitId;
        self.payload.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(framing: &mut impl Framing, bytes: &[u8]) -> std::vec::Vec<FrameEvent> {
        bytes.iter().filter_map(|&b| framing.push(b)).collect()
    }

    #[test]
    fn encodes_id_then_payload() {
        let framing = FixedLengthFraming::new();
        let mut out = FrameBuf::new();
        framing.encode(MsgId::RaceState, &[3], &mut out);
        assert_eq!(&out[..], &[4, 3]);
    }

    #[test]
    fn delimits_by_payload_table() {
        let mut framing = FixedLengthFraming::new();
        let events = feed(&mut framing, &[13, 7, 1, 2, 3, 4]);
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], FrameEvent::Frame(f) if f.id == 13 && f.payload.is_empty()));
        assert!(matches!(&events[1], FrameEvent::Frame(f) if f.id == 7 && f.payload[..] == [1, 2, 3, 4]));
    }

    #[test]
    fn unknown_ids_are_discarded_one_byte_at_a_time() {
        let mut framing = FixedLengthFraming::new();
        let events = feed(&mut framing, &[0xEE, 0x40, 4, 1]);
        assert_eq!(events[0], FrameEvent::Discarded(0xEE));
        assert_eq!(events[1], FrameEvent::Discarded(0x40));
        assert!(matches!(&events[2], FrameEvent::Frame(f) if f.id == 4 && f.payload[..] == [1]));
    }

    #[test]
    fn reset_drops_partial_frame() {
        let mut framing = FixedLengthFraming::new();
        assert_eq!(framing.push(7), None);
        assert_eq!(framing.push(1), None);
        framing.reset();
        let events = feed(&mut framing, &[4, 2]);
        assert!(matches!(&events[0], FrameEvent::Frame(f) if f.id == 4));
    }
}
