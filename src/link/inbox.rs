// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

use crate::error::ErrorCode;
use crate::protocol::{FoulMask, Message, StartMask, Uid, WinnerMask};
use crate::race::{Lane, Lanes, RaceMode, RaceState};

/// Application messages received from the peer.
///
/// [`Link::poll`](crate::link::Link::poll) returns what arrived during one call. Nodes [`merge`] that
/// into a long-lived mailbox and `take()` each field when the current state is ready for it, so a
/// message that arrives early waits instead of being lost, and is applied exactly once.
///
/// [`merge`]: Inbox::merge
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Inbox {
    pub mode: Option<RaceMode>,
    pub state: Option<RaceState>,
    pub race_start: Option<StartMask>,
    pub car_id: Lanes<Option<Uid>>,
    /// Reaction time in microseconds. The "none pending" sentinel never lands here.
    pub reaction: Lanes<Option<u32>>,
    pub foul: Option<FoulMask>,
    pub winner: Option<WinnerMask>,
    pub error: Option<ErrorCode>,
    pub display_advance: bool,
}

impl Inbox {
    pub const fn new() -> Self {
        Self {
            mode: None,
            state: None,
            race_start: None,
            car_id: Lanes::splat(None),
            reaction: Lanes::splat(None),
            foul: None,
            winner: None,
            error: None,
            display_advance: false,
        }
    }

    /// Store one decoded message. Acknowledges carry nothing for the application.
    pub fn apply(&mut self, msg: Message) {
        match msg {
            Message::RaceMode(mode) => self.mode = Some(mode),
            Message::RaceState(state) => self.state = Some(state),
            Message::RaceStart(mask) => self.race_start = Some(mask),
            Message::Error(code) => self.error = Some(code),
            Message::Reaction { lane, micros } => {
                *self.reaction.get_mut(lane) = u32::try_from(micros).ok();
            }
            Message::CarId { lane, uid } => *self.car_id.get_mut(lane) = Some(uid),
            Message::Foul(mask) => self.foul = Some(mask),
            Message::Winner(mask) => self.winner = Some(mask),
            Message::DisplayAdvance => self.display_advance = true,
            Message::Ack(_) | Message::Nack(_) => {}
        }
    }

    /// Fold newer values from `newer` into `self`. Fields `newer` does not carry are kept.
    pub fn merge(&mut self, newer: Inbox) {
        fn keep<T>(slot: &mut Option<T>, newer: Option<T>) {
            if newer.is_some() {
                *slot = newer;
            }
        }

        keep(&mut self.mode, newer.mode);
        keep(&mut self.state, newer.state);
        keep(&mut self.race_start, newer.race_start);
        for lane in Lane::ALL {
            keep(self.car_id.get_mut(lane), *newer.car_id.get(lane));
            keep(self.reaction.get_mut(lane), *newer.reaction.get(lane));
        }
        keep(&mut self.foul, newer.foul);
        keep(&mut self.winner, newer.winner);
        keep(&mut self.error, newer.error);
        self.display_advance |= newer.display_advance;
    }

    /// Take and clear the display-advance request.
    #[inline]
    pub fn take_display_advance(&mut self) -> bool {
        core::mem::replace(&mut self.display_advance, false)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::new()
    }
}
