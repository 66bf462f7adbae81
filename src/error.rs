// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Error codes shared by both nodes.
//!
//! Nothing in the control loop panics or unwinds. Transient link problems are retried by the
//! [`link`](crate::link) layer; anything that exhausts its retries is abandoned and recorded here
//! as an [`ErrorCode`], which is also the payload of the `Error` wire message.

use core::fmt;

/// Wire-level error code.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ErrorCode {
    None = 0,
    /// A race state change was not acknowledged.
    StateTxTimeout = 1,
    /// A race mode change was not acknowledged.
    ModeTxTimeout = 2,
    /// The race start signal was not acknowledged.
    StartTxTimeout = 3,
    /// The serial receiver overran.
    SerialOverflow = 4,
    /// A corrupted or unrecognised message was received.
    InvalidMsg = 5,
    /// The peer announced a state that conflicted with a local transition.
    StateMismatch = 6,
}

impl ErrorCode {
    pub const fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::None,
            1 => Self::StateTxTimeout,
            2 => Self::ModeTxTimeout,
            3 => Self::StartTxTimeout,
            4 => Self::SerialOverflow,
            5 => Self::InvalidMsg,
            6 => Self::StateMismatch,
            _ => return None,
        })
    }

    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "no error",
            Self::StateTxTimeout => "state transition not acknowledged",
            Self::ModeTxTimeout => "mode change not acknowledged",
            Self::StartTxTimeout => "race start not acknowledged",
            Self::SerialOverflow => "serial receiver overrun",
            Self::InvalidMsg => "invalid message received",
            Self::StateMismatch => "peer state conflicted with local transition",
        };
        f.write_str(s)
    }
}

/// Last recorded error plus a running count.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorLog {
    last: Option<ErrorCode>,
    count: u16,
}

impl ErrorLog {
    pub const fn new() -> Self {
        Self {
            last: None,
            count: 0,
        }
    }

    pub fn record(&mut self, code: ErrorCode) {
        if code == ErrorCode::None {
            return;
        }
        self.last = Some(code);
        self.count = self.count.saturating_add(1);
    }

    #[inline]
    pub fn last(&self) -> Option<ErrorCode> {
        self.last
    }

    #[inline]
    pub fn count(&self) -> u16 {
        self.count
    }
}
