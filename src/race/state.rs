// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Two-phase state machine.
//!
//! A node that originates a change proposes it, announces it over the link and only commits once the
//! peer acknowledges. A node that receives an announcement commits immediately, since the sender
//! already validated it. The same machine drives both [`RaceState`] and
//! [`RaceMode`](crate::race::RaceMode); the [`Announce`] impl decides which transitions are legal and
//! which message carries them.

use crate::error::ErrorCode;
use crate::link::{Transmit, TxStatus};
use crate::protocol::{Message, MsgId};

/// Race phase, shared by both nodes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum RaceState {
    Idle = 0,
    Staging = 1,
    Countdown = 2,
    Racing = 3,
    Complete = 4,
    Test = 5,
}

impl RaceState {
    pub const ALL: [RaceState; 6] = [
        RaceState::Idle,
        RaceState::Staging,
        RaceState::Countdown,
        RaceState::Racing,
        RaceState::Complete,
        RaceState::Test,
    ];

    pub const fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::Idle,
            1 => Self::Staging,
            2 => Self::Countdown,
            3 => Self::Racing,
            4 => Self::Complete,
            5 => Self::Test,
            _ => return None,
        })
    }

    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Adjacency table for locally originated transitions.
    pub const fn can_transition(self, next: Self) -> bool {
        use RaceState::*;
        matches!(
            (self, next),
            (Idle, Staging)
                | (Idle, Test)
                | (Staging, Countdown)
                | (Countdown, Racing)
                | (Racing, Complete)
                | (Complete, Idle)
                | (Test, Idle)
        )
    }
}

/// A value that is announced to the peer with an acknowledged message.
pub trait Announce: Copy + Eq {
    /// Message type carrying the value.
    const MSG_ID: MsgId;

    /// Error recorded when an announcement is abandoned.
    const TIMEOUT_CODE: ErrorCode;

    fn message(self) -> Message;

    /// Whether this node may move from `self` to `next` on its own initiative.
    fn allows(self, next: Self) -> bool;
}

impl Announce for RaceState {
    const MSG_ID: MsgId = MsgId::RaceState;
    const TIMEOUT_CODE: ErrorCode = ErrorCode::StateTxTimeout;

    fn message(self) -> Message {
        Message::RaceState(self)
    }

    fn allows(self, next: Self) -> bool {
        self.can_transition(next)
    }
}

/// Outcome of one transition call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    /// Illegal, same as current, or another transition is in flight.
    Rejected,
    /// Received value equals the committed one.
    Unchanged,
    /// Announcement sent, waiting for the acknowledge.
    Pending,
    /// New value committed.
    Committed,
    /// Received value committed over a different local intent, which was dropped.
    Overridden,
    /// Announcement timed out or failed; the intent was reverted.
    Abandoned,
}

/// Committed value, intended value and the one-shot entry/exit flags.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StateMachine<S> {
    current: S,
    target: S,
    entry: bool,
    exited: Option<S>,
}

impl<S: Announce> StateMachine<S> {
    /// Start in `initial` with its entry actions pending.
    pub const fn new(initial: S) -> Self {
        Self {
            current: initial,
            target: initial,
            entry: true,
            exited: None,
        }
    }

    #[inline]
    pub fn current(&self) -> S {
        self.current
    }

    #[inline]
    pub fn target(&self) -> S {
        self.target
    }

    /// A local transition is waiting for its acknowledge.
    #[inline]
    pub fn in_flight(&self) -> bool {
        self.target != self.current
    }

    /// Propose `next` and drive its announcement. Call every tick with the same value until the
    /// result is no longer [`Step::Pending`].
    pub fn self_transition<T: Transmit>(&mut self, next: S, tx: &mut T, now_ms: u32) -> Step {
        if self.in_flight() {
            if next != self.target {
                return Step::Rejected;
            }
        } else if next == self.current || !self.current.allows(next) {
            return Step::Rejected;
        }

        self.target = next;
        match tx.send(&next.message(), now_ms) {
            TxStatus::Acked => {
                tx.reset(S::MSG_ID);
                self.commit(next);
                Step::Committed
            }
            TxStatus::Timeout | TxStatus::Failed => {
                tx.reset(S::MSG_ID);
                self.target = self.current;
                Step::Abandoned
            }
            TxStatus::None | TxStatus::Sent | TxStatus::Nacked => Step::Pending,
        }
    }

    /// Keep driving an in-flight transition. Returns `None` when nothing is in flight.
    pub fn poll<T: Transmit>(&mut self, tx: &mut T, now_ms: u32) -> Option<Step> {
        if !self.in_flight() {
            return None;
        }
        Some(self.self_transition(self.target, tx, now_ms))
    }

    /// Apply a value announced by the peer. No adjacency check: the peer validated it.
    pub fn rx_transition<T: Transmit>(&mut self, next: S, tx: &mut T) -> Step {
        if next == self.current {
            return Step::Unchanged;
        }

        let step = if self.in_flight() {
            tx.reset(S::MSG_ID);
            if self.target == next {
                Step::Committed
            } else {
                Step::Overridden
            }
        } else {
            Step::Committed
        };
        self.commit(next);
        step
    }

    /// Consume the entry flag.
    #[inline]
    pub fn take_entry(&mut self) -> bool {
        core::mem::replace(&mut self.entry, false)
    }

    /// Consume the exit flag, yielding the state that was left.
    #[inline]
    pub fn take_exit(&mut self) -> Option<S> {
        self.exited.take()
    }

    fn commit(&mut self, next: S) {
        self.exited = Some(self.current);
        self.current = next;
        self.target = next;
        self.entry = true;
    }
}
