// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Per-node control loops.
//!
//! Each node is a struct that owns its link and peripherals and exposes one non-blocking `tick`.
//! A tick drains the link into the node's mailbox, advances the race state machine, then runs
//! the current state's handler: exit actions of the state just left, entry actions once, then the
//! per-tick body.

pub mod finish;
pub mod start;

pub use finish::FinishNode;
pub use start::{StartIo, StartNode};

use embedded_hal::serial;

use crate::error::ErrorCode;
use crate::link::{Inbox, Link, LinkError, Transmit};
use crate::protocol::Framing;
use crate::time::Clock;

/// The link as seen by a node.
pub trait Port: Transmit {
    /// Read at most one frame.
    fn poll(&mut self) -> Inbox;

    /// Record a local error.
    fn record(&mut self, code: ErrorCode);
}

impl<S, F> Port for Link<S, F>
where
    S: serial::Read<u8, Error = LinkError> + serial::Write<u8, Error = LinkError>,
    F: Framing,
{
    fn poll(&mut self) -> Inbox {
        Link::poll(self)
    }

    fn record(&mut self, code: ErrorCode) {
        Link::record(self, code)
    }
}

/// Both clocks sampled once at the top of a tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Now {
    pub us: u32,
    pub ms: u32,
}

impl Now {
    pub fn sample<C: Clock>(clock: &C) -> Self {
        Self {
            us: clock.now_us(),
            ms: clock.now_ms(),
        }
    }
}
