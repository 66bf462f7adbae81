// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

use heapless::Deque;

use crate::link::{Transmit, TxStatus};
use crate::protocol::Message;

/// Outbound messages sent strictly one at a time.
///
/// The front message is driven through its tracker every [`poll`](Outbox::poll) until it reaches a
/// terminal status. Its tracker is then reset and the next message starts on the following poll.
pub struct Outbox<const N: usize> {
    queue: Deque<Message, N>,
}

impl<const N: usize> Outbox<N> {
    pub const fn new() -> Self {
        Self {
            queue: Deque::new(),
        }
    }

    /// Queue `msg` behind anything already pending. Hands it back if the queue is full.
    pub fn push(&mut self, msg: Message) -> Result<(), Message> {
        self.queue.push_back(msg)
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drive the front message once. Returns it with its terminal status when it finishes.
    pub fn poll<T: Transmit>(&mut self, tx: &mut T, now_ms: u32) -> Option<(Message, TxStatus)> {
        let msg = *self.queue.front()?;
        let status = tx.send(&msg, now_ms);
        if !status.is_terminal() {
            return None;
        }
        tx.reset(msg.id());
        self.queue.pop_front();
        Some((msg, status))
    }
}

impl<const N: usize> Default for Outbox<N> {
    fn default() -> Self {
        Self::new()
    }
}
