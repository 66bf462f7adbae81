// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Acknowledged message link between the two nodes.
//!
//! [`Link`] owns the serial transport, a [`Framing`], and one [`TxTracker`] per message type.
//!
//! - **Receive**: [`Link::poll`] reads bytes until one frame completes. Every decoded application
//!   message is acknowledged immediately and handed back in an [`Inbox`]. Frames that fail to
//!   decode are negative-acknowledged.
//! - **Send**: [`Transmit::send`] is non-blocking. Call it every tick with the same message until it
//!   reports a terminal status, then [`Transmit::reset`] the type before sending it again.
//!
//! The link never blocks waiting for the peer and never panics on bad input.

pub mod inbox;
pub mod outbox;
pub mod tracker;

pub use inbox::Inbox;
pub use outbox::Outbox;
pub use tracker::{SendAction, TxStatus, TxTable, TxTracker};

use core::fmt;

use embedded_hal::serial;

use crate::config::LinkConfig;
use crate::error::{ErrorCode, ErrorLog};
use crate::protocol::messages::MAX_PAYLOAD;
use crate::protocol::{FixedLengthFraming, FrameBuf, FrameEvent, Framing, Message, MsgId};

/// Outbound side of the link as seen by the state machines.
pub trait Transmit {
    /// Advance the tracker for `msg`'s type, transmitting if it is due.
    fn send(&mut self, msg: &Message, now_ms: u32) -> TxStatus;

    /// Return the tracker for `id` to `None` so the type can be sent again.
    fn reset(&mut self, id: MsgId);
}

/// Serial transport failure.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// Receiver overran and dropped bytes.
    Overrun,
    /// Framing, noise or parity error on a received byte.
    Read,
    /// The transmitter rejected a byte.
    Write,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Overrun => "serial receiver overrun",
            Self::Read => "serial receive error",
            Self::Write => "serial transmit error",
        };
        f.write_str(s)
    }
}

/// Traffic counters.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStats {
    pub frames_sent: u32,
    pub frames_received: u32,
    pub acks_received: u32,
    pub nacks_received: u32,
    /// Acknowledges that referenced a type with nothing in flight.
    pub stale_acks: u32,
    pub nacks_sent: u32,
    pub bytes_discarded: u32,
    pub timeouts: u32,
    pub failures: u32,
}

pub struct Link<S, F = FixedLengthFraming> {
    serial: S,
    framing: F,
    config: LinkConfig,
    trackers: TxTable,
    stats: LinkStats,
    errors: ErrorLog,
    peer_errors: ErrorLog,
}

impl<S> Link<S, FixedLengthFraming>
where
    S: serial::Read<u8, Error = LinkError> + serial::Write<u8, Error = LinkError>,
{
    /// Link speaking the fixed-length wire format.
    pub fn new(serial: S, config: LinkConfig) -> Self {
        Self::with_framing(serial, FixedLengthFraming::new(), config)
    }
}

impl<S, F> Link<S, F>
where
    S: serial::Read<u8, Error = LinkError> + serial::Write<u8, Error = LinkError>,
    F: Framing,
{
    pub fn with_framing(serial: S, framing: F, config: LinkConfig) -> Self {
        Self {
            serial,
            framing,
            config,
            trackers: TxTable::new(),
            stats: LinkStats::default(),
            errors: ErrorLog::new(),
            peer_errors: ErrorLog::new(),
        }
    }

    /// Read until one frame completes or the receiver is empty.
    pub fn poll(&mut self) -> Inbox {
        let mut inbox = Inbox::new();
        loop {
            let byte = match self.serial.read() {
                Ok(byte) => byte,
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(e)) => {
                    self.on_read_error(e);
                    break;
                }
            };

            match self.framing.push(byte) {
                None => {}
                Some(FrameEvent::Discarded(b)) => {
                    self.stats.bytes_discarded = self.stats.bytes_discarded.wrapping_add(1);
                    debug!("link: discarded byte {=u8:#x}", b);
                }
                Some(FrameEvent::Corrupt(id)) => {
                    warn!("link: corrupt frame for id {=u8}", id);
                    self.reject(id);
                    break;
                }
                Some(FrameEvent::Frame(frame)) => {
                    self.stats.frames_received = self.stats.frames_received.wrapping_add(1);
                    match Message::decode(frame.id, &frame.payload) {
                        Ok(msg) => self.accept(msg, &mut inbox),
                        Err(e) => {
                            warn!("link: {}", e);
                            self.reject(e.id());
                        }
                    }
                    break;
                }
            }
        }
        inbox
    }

    /// Current tracker status for `id`.
    #[inline]
    pub fn status(&self, id: MsgId) -> TxStatus {
        self.trackers.get(id).status()
    }

    #[inline]
    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    /// Errors raised on this node.
    #[inline]
    pub fn errors(&self) -> &ErrorLog {
        &self.errors
    }

    /// Errors reported by the peer.
    #[inline]
    pub fn peer_errors(&self) -> &ErrorLog {
        &self.peer_errors
    }

    /// Record a local error, e.g. an abandoned transition.
    pub fn record(&mut self, code: ErrorCode) {
        warn!("link: recorded error {}", code);
        self.errors.record(code);
    }

    #[inline]
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Release the transport.
    pub fn free(self) -> S {
        self.serial
    }

    fn accept(&mut self, msg: Message, inbox: &mut Inbox) {
        match msg {
            Message::Ack(raw) => self.settle(raw, true),
            Message::Nack(raw) => self.settle(raw, false),
            _ => {
                trace!("link: rx {}", msg);
                self.write_message(&Message::Ack(msg.id().as_u8()));
                if let Message::Error(code) = msg {
                    self.peer_errors.record(code);
                }
                inbox.apply(msg);
            }
        }
    }

    fn reject(&mut self, raw_id: u8) {
        self.stats.nacks_sent = self.stats.nacks_sent.wrapping_add(1);
        self.errors.record(ErrorCode::InvalidMsg);
        self.write_message(&Message::Nack(raw_id));
    }

    fn settle(&mut self, raw_id: u8, ack: bool) {
        let Some(id) = MsgId::from_u8(raw_id) else {
            self.stats.stale_acks = self.stats.stale_acks.wrapping_add(1);
            return;
        };
        let tracker = self.trackers.get_mut(id);
        let applied = if ack { tracker.ack() } else { tracker.nack() };

        if !applied {
            self.stats.stale_acks = self.stats.stale_acks.wrapping_add(1);
        } else if ack {
            self.stats.acks_received = self.stats.acks_received.wrapping_add(1);
        } else {
            self.stats.nacks_received = self.stats.nacks_received.wrapping_add(1);
            debug!("link: peer nacked {}", id);
        }
    }

    fn on_read_error(&mut self, e: LinkError) {
        self.framing.reset();
        if e == LinkError::Overrun {
            error!("link: {}", e);
            self.errors.record(ErrorCode::SerialOverflow);
        } else {
            warn!("link: {}", e);
        }
    }

    fn write_message(&mut self, msg: &Message) {
        let mut payload = [0u8; MAX_PAYLOAD];
        let len = msg.write_payload(&mut payload);
        let mut frame = FrameBuf::new();
        self.framing.encode(msg.id(), &payload[..len], &mut frame);

        for &b in frame.iter() {
            if nb::block!(self.serial.write(b)).is_err() {
                warn!("link: {}", LinkError::Write);
                return;
            }
        }
        self.stats.frames_sent = self.stats.frames_sent.wrapping_add(1);
    }
}

impl<S, F> Transmit for Link<S, F>
where
    S: serial::Read<u8, Error = LinkError> + serial::Write<u8, Error = LinkError>,
    F: Framing,
{
    fn send(&mut self, msg: &Message, now_ms: u32) -> TxStatus {
        let id = msg.id();
        let before = self.trackers.get(id).status();
        match self.trackers.get_mut(id).poll(now_ms, &self.config) {
            SendAction::Transmit => {
                trace!("link: tx {}", msg);
                self.write_message(msg);
                TxStatus::Sent
            }
            SendAction::Wait(status) => {
                if status != before {
                    match status {
                        TxStatus::Timeout => {
                            self.stats.timeouts = self.stats.timeouts.wrapping_add(1);
                            warn!("link: {} timed out", id);
                        }
                        TxStatus::Failed => {
                            self.stats.failures = self.stats.failures.wrapping_add(1);
                            warn!("link: {} failed after retries", id);
                        }
                        _ => {}
                    }
                }
                status
            }
        }
    }

    fn reset(&mut self, id: MsgId) {
        self.trackers.reset(id);
    }
}
