// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Race formats.

use crate::error::ErrorCode;
use crate::peripherals::lights::{Blink, LIGHT_GO, LIGHT_OFF, LIGHT_Y1, LIGHT_Y2, LIGHT_Y3};
use crate::protocol::{Message, MsgId};
use crate::race::state::Announce;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum RaceMode {
    /// Both gates drop at Go; no reaction times.
    #[default]
    GateDrop = 0,
    /// Each driver drops their own gate after Go.
    Reaction = 1,
    /// Reaction race with a single combined amber stage.
    Pro = 2,
    /// Bracket racing. Only reachable when set by the peer.
    DialIn = 3,
}

impl RaceMode {
    pub const fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::GateDrop,
            1 => Self::Reaction,
            2 => Self::Pro,
            3 => Self::DialIn,
            _ => return None,
        })
    }

    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Drivers release their own gates in this mode.
    #[inline]
    pub const fn uses_triggers(self) -> bool {
        !matches!(self, RaceMode::GateDrop)
    }
}

/// Local round-robin order for the mode button.
pub const fn next_mode(mode: RaceMode) -> RaceMode {
    match mode {
        RaceMode::GateDrop => RaceMode::Reaction,
        RaceMode::Reaction => RaceMode::Pro,
        RaceMode::Pro | RaceMode::DialIn => RaceMode::GateDrop,
    }
}

/// Confirmation blink shown when a mode is committed.
pub const fn mode_cue(mode: RaceMode) -> Blink {
    let pattern = match mode {
        RaceMode::GateDrop => LIGHT_Y1,
        RaceMode::Reaction => LIGHT_Y2,
        RaceMode::Pro => LIGHT_Y3,
        RaceMode::DialIn => LIGHT_GO,
    };
    Blink::cue(pattern, LIGHT_OFF, LIGHT_OFF)
}

impl Announce for RaceMode {
    const MSG_ID: MsgId = MsgId::RaceMode;
    const TIMEOUT_CODE: ErrorCode = ErrorCode::ModeTxTimeout;

    fn message(self) -> Message {
        Message::RaceMode(self)
    }

    fn allows(self, next: Self) -> bool {
        self != next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::TxStatus;
    use crate::race::state::{StateMachine, Step};
    use crate::test_support::ScriptedTx;

    #[test]
    fn button_cycles_three_modes() {
        let mut mode = RaceMode::GateDrop;
        let mut seen = std::vec::Vec::new();
        for _ in 0..4 {
            mode = next_mode(mode);
            seen.push(mode);
        }
        assert_eq!(
            seen,
            [RaceMode::Reaction, RaceMode::Pro, RaceMode::GateDrop, RaceMode::Reaction]
        );
        assert_eq!(next_mode(RaceMode::DialIn), RaceMode::GateDrop);
    }

    #[test]
    fn any_mode_change_commits_on_ack() {
        let mut sm = StateMachine::new(RaceMode::Pro);
        let mut tx = ScriptedTx::new(&[TxStatus::Acked]);
        assert_eq!(sm.self_transition(RaceMode::DialIn, &mut tx, 0), Step::Committed);
        assert_eq!(tx.sent(), &[Message::RaceMode(RaceMode::DialIn)]);
        assert_eq!(tx.resets(), &[MsgId::RaceMode]);
    }

    #[test]
    fn cues_differ_per_mode() {
        assert_eq!(mode_cue(RaceMode::GateDrop).first, LIGHT_Y1);
        assert_eq!(mode_cue(RaceMode::DialIn).first, LIGHT_GO);
        assert_eq!(mode_cue(RaceMode::Pro).last, LIGHT_OFF);
    }
}
