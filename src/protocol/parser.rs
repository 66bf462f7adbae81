// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Checksummed frame parser.
//!
//! Frames are `START_BYTE, id, payload.., checksum` where the checksum is the wrapping sum of the id
//! and payload bytes. Bytes outside a frame are skipped until the next sync byte, and a frame whose
//! checksum does not match is reported as [`FrameEvent::Corrupt`] so the link can negative-acknowledge
//! it. Not wire compatible with [`FixedLengthFraming`](crate::protocol::FixedLengthFraming).

use heapless::Vec;

use crate::protocol::framing::{FrameBuf, FrameEvent, Framing, Payload, RawFrame};
use crate::protocol::messages::*;

enum State {
    WaitStart,
    WaitId,
    WaitPayload { id: MsgId },
    WaitChecksum { id: MsgId },
}

pub struct ChecksumParser {
    state: State,
    checksum: u8,
    payload: Payload,
}

impl ChecksumParser {
    pub const fn new() -> Self {
        Self {
            state: State::WaitStart,
            checksum: 0,
            payload: Vec::new(),
        }
    }

    fn after_id(&mut self, id: MsgId) {
        self.state = if id.payload_len() == 0 {
            State::WaitChecksum { id }
        } else {
            State::WaitPayload { id }
        };
    }
}

impl Default for ChecksumParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Framing for ChecksumParser {
    fn encode(&self, id: MsgId, payload: &[u8], out: &mut FrameBuf) {
        out.clear();
        let checksum = payload
            .iter()
            .fold(id.as_u8(), |acc, &b| acc.wrapping_add(b));
        let _ = out.push(START_BYTE);
        let _ = out.push(id.as_u8());
        let _ = out.extend_from_slice(payload);
        let _ = out.push(checksum);
    }

    /// Process a single incoming byte. Returns an event when a frame completes or a byte is dropped.
    fn push(&mut self, byte: u8) -> Option<FrameEvent> {
        match self.state {
            State::WaitStart => {
                if byte == START_BYTE {
                    self.state = State::WaitId;
                    self.checksum = 0;
                    self.payload.clear();
                    return None;
                }
                Some(FrameEvent::Discarded(byte))
            }
            State::WaitId => {
                self.checksum = self.checksum.wrapping_add(byte);

                match MsgId::from_u8(byte) {
                    Some(id) => {
                        self.after_id(id);
                        None
                    }
                    None => {
                        // Not a catalog id; hunt for the next sync byte.
                        self.state = State::WaitStart;
                        Some(FrameEvent::Discarded(byte))
                    }
                }
            }
            State::WaitPayload { id } => {
                self.checksum = self.checksum.wrapping_add(byte);
                let _ = self.payload.push(byte);
                if self.payload.len() >= id.payload_len() {
                    self.state = State::WaitChecksum { id };
                }
                None
            }
            State::WaitChecksum { id } => {
                let valid = byte == self.checksum;
                self.state = State::WaitStart;

                if valid {
                    return Some(FrameEvent::Frame(RawFrame {
                        id: id.as_u8(),
                        payload: core::mem::take(&mut self.payload),
                    }));
                }
                self.payload.clear();
                Some(FrameEvent::Corrupt(id.as_u8()))
            }
        }
    }

    fn reset(&mut self) {
        self.state = State::WaitStart;
        self.checksum = 0;
        self.payload.clear();
    }
}
