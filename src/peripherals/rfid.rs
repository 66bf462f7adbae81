// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Car identification while staging.

use crate::config::RFID_READ_THROTTLE_MS;
use crate::peripherals::TagReader;
use crate::protocol::Uid;
use crate::race::{Lane, Lanes};
use crate::time::elapsed_ms;

/// One reader poll.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TagPoll {
    NewUid(Uid),
    NoTag,
    /// Communication failure or a UID of the wrong length.
    Error,
}

/// Throttles reads and suppresses repeats, so each car is forwarded once per staging.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RfidForwarder {
    last_read_ms: Lanes<Option<u32>>,
    last_sent: Lanes<Option<Uid>>,
    throttle_ms: u32,
}

impl RfidForwarder {
    pub const fn new() -> Self {
        Self {
            last_read_ms: Lanes::splat(None),
            last_sent: Lanes::splat(None),
            throttle_ms: RFID_READ_THROTTLE_MS,
        }
    }

    /// Forget what was forwarded. Call on staging entry.
    pub fn reset(&mut self) {
        *self = Self {
            throttle_ms: self.throttle_ms,
            ..Self::new()
        };
    }

    /// Poll `lane`'s reader. Returns a UID that should be sent to the peer.
    pub fn poll<R: TagReader>(&mut self, reader: &mut R, lane: Lane, now_ms: u32) -> Option<Uid> {
        if let Some(last) = *self.last_read_ms.get(lane) {
            if elapsed_ms(last, now_ms) < self.throttle_ms {
                return None;
            }
        }

        let TagPoll::NewUid(uid) = reader.poll_tag(lane) else {
            return None;
        };
        *self.last_read_ms.get_mut(lane) = Some(now_ms);

        if *self.last_sent.get(lane) == Some(uid) {
            return None;
        }
        *self.last_sent.get_mut(lane) = Some(uid);
        Some(uid)
    }
}

impl Default for RfidForwarder {
    fn default() -> Self {
        Self::new()
    }
}
