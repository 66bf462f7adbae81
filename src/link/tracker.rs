// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Per-message-type transmit trackers.
//!
//! Each outbound message type has exactly one tracker, so at most one message of a type is in flight.
//! A tracker walks `None -> Sent -> Acked | Timeout`, re-sending after a `Nacked` until the retry
//! ceiling is hit and it reports `Failed`. Terminal statuses stick until [`TxTable::reset`].

use crate::config::LinkConfig;
use crate::protocol::{MsgId, MSG_COUNT};
use crate::time::elapsed_ms;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxStatus {
    #[default]
    None,
    Sent,
    Acked,
    Timeout,
    Nacked,
    Failed,
}

impl TxStatus {
    /// Acked, Timeout and Failed do not change until reset.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, TxStatus::Acked | TxStatus::Timeout | TxStatus::Failed)
    }
}

/// What the caller must do after polling a tracker.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SendAction {
    /// Put the frame on the wire now. The tracker already counts it as sent.
    Transmit,
    /// Nothing to send; report this status.
    Wait(TxStatus),
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TxTracker {
    status: TxStatus,
    sent_at_ms: u32,
    retries: u8,
}

impl TxTracker {
    pub const fn new() -> Self {
        Self {
            status: TxStatus::None,
            sent_at_ms: 0,
            retries: 0,
        }
    }

    #[inline]
    pub fn status(&self) -> TxStatus {
        self.status
    }

    #[inline]
    pub fn retries(&self) -> u8 {
        self.retries
    }

    /// Advance the tracker for one send attempt at `now_ms`.
    pub fn poll(&mut self, now_ms: u32, config: &LinkConfig) -> SendAction {
        match self.status {
            TxStatus::None | TxStatus::Nacked => {
                if self.retries > config.max_retries {
                    self.status = TxStatus::Failed;
                    return SendAction::Wait(TxStatus::Failed);
                }
                self.status = TxStatus::Sent;
                self.sent_at_ms = now_ms;
                self.retries = self.retries.saturating_add(1);
                SendAction::Transmit
            }
            TxStatus::Sent => {
                if elapsed_ms(self.sent_at_ms, now_ms) >= config.timeout_ms {
                    self.status = TxStatus::Timeout;
                }
                SendAction::Wait(self.status)
            }
            TxStatus::Acked | TxStatus::Timeout | TxStatus::Failed => SendAction::Wait(self.status),
        }
    }

    /// Apply an acknowledge. Only a tracker waiting in `Sent` reacts.
    pub fn ack(&mut self) -> bool {
        self.settle(TxStatus::Acked)
    }

    /// Apply a negative acknowledge. Only a tracker waiting in `Sent` reacts.
    pub fn nack(&mut self) -> bool {
        self.settle(TxStatus::Nacked)
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn settle(&mut self, status: TxStatus) -> bool {
        if self.status != TxStatus::Sent {
            return false;
        }
        self.status = status;
        true
    }
}

/// One tracker per message id.
#[derive(Clone, Debug)]
pub struct TxTable {
    trackers: [TxTracker; MSG_COUNT],
}

impl TxTable {
    pub const fn new() -> Self {
        Self {
            trackers: [TxTracker::new(); MSG_COUNT],
        }
    }

    #[inline]
    pub fn get(&self, id: MsgId) -> &TxTracker {
        &self.trackers[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: MsgId) -> &mut TxTracker {
        &mut self.trackers[id.index()]
    }

    #[inline]
    pub fn reset(&mut self, id: MsgId) {
        self.get_mut(id).reset();
    }
}

impl Default for TxTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CFG: LinkConfig = LinkConfig::new();

    #[test]
    fn ack_is_terminal_until_reset() {
        let mut t = TxTracker::new();
        assert_eq!(t.poll(0, &CFG), SendAction::Transmit);
        assert_eq!(t.poll(10, &CFG), SendAction::Wait(TxStatus::Sent));
        assert!(t.ack());
        assert_eq!(t.poll(1_000, &CFG), SendAction::Wait(TxStatus::Acked));
        assert!(!t.ack());
        t.reset();
        assert_eq!(t.status(), TxStatus::None);
        assert_eq!(t.retries(), 0);
    }

    #[test]
    fn times_out_at_the_window() {
        let mut t = TxTracker::new();
        t.poll(100, &CFG);
        assert_eq!(t.poll(149, &CFG), SendAction::Wait(TxStatus::Sent));
        assert_eq!(t.poll(150, &CFG), SendAction::Wait(TxStatus::Timeout));
        assert_eq!(t.poll(151, &CFG), SendAction::Wait(TxStatus::Timeout));
        assert!(!t.nack());
    }

    #[test]
    fn fails_after_retry_ceiling() {
        let mut t = TxTracker::new();
        let mut transmits = 0;
        for now in 0..20 {
            match t.poll(now, &CFG) {
                SendAction::Transmit => {
                    transmits += 1;
                    t.nack();
                }
                SendAction::Wait(status) => {
                    assert_eq!(status, TxStatus::Failed);
                }
            }
        }
        assert_eq!(transmits, CFG.max_retries as usize + 1);
        assert_eq!(t.status(), TxStatus::Failed);
    }

    #[test]
    fn stale_nack_is_ignored() {
        let mut t = TxTracker::new();
        assert!(!t.nack());
        assert_eq!(t.status(), TxStatus::None);
    }

    #[test]
    fn table_resets_one_type() {
        let mut table = TxTable::new();
        table.get_mut(MsgId::Foul).poll(0, &CFG);
        table.get_mut(MsgId::Winner).poll(0, &CFG);
        table.reset(MsgId::Foul);
        assert_eq!(table.get(MsgId::Foul).status(), TxStatus::None);
        assert_eq!(table.get(MsgId::Winner).status(), TxStatus::Sent);
    }
}
