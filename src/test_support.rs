// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Host-side doubles for the unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::digital::v2::{InputPin, OutputPin};
use embedded_hal::serial;

use crate::config::TX_TIMEOUT_MS;
use crate::error::ErrorCode;
use crate::link::{Inbox, LinkError, Transmit, TxStatus};
use crate::node::Port;
use crate::peripherals::{Button, Buttons, LightOutput, TagPoll, TagReader, TimeDisplay};
use crate::protocol::{Message, MsgId, MSG_COUNT};
use crate::race::Lane;
use crate::time::{elapsed_ms, Clock};

/// Transmitter that replays a fixed list of statuses, then reports `Sent` forever.
pub struct ScriptedTx {
    script: VecDeque<TxStatus>,
    sent: Vec<Message>,
    resets: Vec<MsgId>,
}

impl ScriptedTx {
    pub fn new(script: &[TxStatus]) -> Self {
        Self {
            script: script.iter().copied().collect(),
            sent: Vec::new(),
            resets: Vec::new(),
        }
    }

    pub fn sent(&self) -> &[Message] {
        &self.sent
    }

    pub fn resets(&self) -> &[MsgId] {
        &self.resets
    }
}

impl Transmit for ScriptedTx {
    fn send(&mut self, msg: &Message, _now_ms: u32) -> TxStatus {
        self.sent.push(*msg);
        self.script.pop_front().unwrap_or(TxStatus::Sent)
    }

    fn reset(&mut self, id: MsgId) {
        self.resets.push(id);
    }
}

/// Peer that acknowledges every message on the tick after it was first sent, and feeds one queued
/// message per poll.
pub struct AckPort {
    pub sent: Vec<Message>,
    pub recorded: Vec<ErrorCode>,
    /// Never acknowledge; sends time out after the link timeout.
    pub drop_acks: bool,
    /// Leave this message type waiting in `Sent` until cleared.
    pub withhold: Option<MsgId>,
    rx: VecDeque<Message>,
    sent_at: [Option<u32>; MSG_COUNT],
    done: [TxStatus; MSG_COUNT],
}

impl AckPort {
    pub fn new() -> Self {
        Self {
            sent: Vec::new(),
            recorded: Vec::new(),
            drop_acks: false,
            withhold: None,
            rx: VecDeque::new(),
            sent_at: [None; MSG_COUNT],
            done: [TxStatus::None; MSG_COUNT],
        }
    }

    pub fn push_rx(&mut self, msg: Message) {
        self.rx.push_back(msg);
    }
}

impl Transmit for AckPort {
    fn send(&mut self, msg: &Message, now_ms: u32) -> TxStatus {
        let idx = msg.id().index();
        if self.done[idx].is_terminal() {
            return self.done[idx];
        }
        let Some(at) = self.sent_at[idx] else {
            self.sent_at[idx] = Some(now_ms);
            self.sent.push(*msg);
            return TxStatus::Sent;
        };
        if self.withhold == Some(msg.id()) {
            return TxStatus::Sent;
        }
        if !self.drop_acks {
            self.done[idx] = TxStatus::Acked;
        } else if elapsed_ms(at, now_ms) >= TX_TIMEOUT_MS {
            self.done[idx] = TxStatus::Timeout;
        } else {
            return TxStatus::Sent;
        }
        self.done[idx]
    }

    fn reset(&mut self, id: MsgId) {
        self.sent_at[id.index()] = None;
        self.done[id.index()] = TxStatus::None;
    }
}

impl Port for AckPort {
    fn poll(&mut self) -> Inbox {
        let mut inbox = Inbox::new();
        if let Some(msg) = self.rx.pop_front() {
            inbox.apply(msg);
        }
        inbox
    }

    fn record(&mut self, code: ErrorCode) {
        self.recorded.push(code);
    }
}

/// Byte pipe standing in for a UART.
pub struct MockSerial {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    fail: Option<LinkError>,
}

impl MockSerial {
    pub fn new() -> Self {
        Self {
            rx: VecDeque::new(),
            tx: Vec::new(),
            fail: None,
        }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    pub fn take_written(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.tx)
    }

    pub fn fail_next_read(&mut self, err: LinkError) {
        self.fail = Some(err);
    }
}

impl serial::Read<u8> for MockSerial {
    type Error = LinkError;

    fn read(&mut self) -> nb::Result<u8, LinkError> {
        if let Some(err) = self.fail.take() {
            return Err(nb::Error::Other(err));
        }
        self.rx.pop_front().ok_or(nb::Error::WouldBlock)
    }
}

impl serial::Write<u8> for MockSerial {
    type Error = LinkError;

    fn write(&mut self, byte: u8) -> nb::Result<(), LinkError> {
        self.tx.push(byte);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), LinkError> {
        Ok(())
    }
}

/// Millisecond-stepped clock. The microsecond counter is `ms * 1000 + us_offset`, wrapping.
#[derive(Copy, Clone, Debug, Default)]
pub struct SimClock {
    pub ms: u32,
    pub us_offset: u32,
}

impl SimClock {
    pub fn advance_ms(&mut self, ms: u32) {
        self.ms = self.ms.wrapping_add(ms);
    }
}

impl Clock for SimClock {
    fn now_us(&self) -> u32 {
        self.ms.wrapping_mul(1_000).wrapping_add(self.us_offset)
    }

    fn now_ms(&self) -> u32 {
        self.ms
    }
}

#[derive(Default)]
pub struct RecordingOutput {
    pub writes: Vec<u8>,
}

impl LightOutput for RecordingOutput {
    fn write(&mut self, pattern: u8) {
        self.writes.push(pattern);
    }
}

#[derive(Default)]
pub struct MockPin {
    pub high: bool,
}

impl OutputPin for MockPin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Infallible> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.high = true;
        Ok(())
    }
}

pub struct MockInput {
    pub low: bool,
}

impl InputPin for MockInput {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Infallible> {
        Ok(!self.low)
    }

    fn is_low(&self) -> Result<bool, Infallible> {
        Ok(self.low)
    }
}

#[derive(Default)]
pub struct MockButtons {
    pressed: [bool; 4],
}

impl MockButtons {
    pub fn set(&mut self, button: Button, pressed: bool) {
        self.pressed[button.index()] = pressed;
    }
}

impl Buttons for MockButtons {
    fn is_pressed(&mut self, button: Button) -> bool {
        self.pressed[button.index()]
    }
}

pub struct MockTags {
    pub left: TagPoll,
    pub right: TagPoll,
    pub polls: usize,
}

impl Default for MockTags {
    fn default() -> Self {
        Self {
            left: TagPoll::NoTag,
            right: TagPoll::NoTag,
            polls: 0,
        }
    }
}

impl TagReader for MockTags {
    fn poll_tag(&mut self, lane: Lane) -> TagPoll {
        self.polls += 1;
        match lane {
            Lane::Left => self.left,
            Lane::Right => self.right,
        }
    }
}

#[derive(Default)]
pub struct RecordingDisplay {
    pub shown: Vec<(Lane, u32)>,
    pub cleared: usize,
}

impl TimeDisplay for RecordingDisplay {
    fn show_time(&mut self, lane: Lane, micros: u32) {
        self.shown.push((lane, micros));
    }

    fn clear(&mut self, _lane: Lane) {
        self.cleared += 1;
    }
}

#[derive(Default)]
struct PinLogState {
    levels: [bool; 16],
    events: Vec<(usize, bool, [bool; 16])>,
    latched: Vec<[bool; 16]>,
}

/// Shared record of every write to a group of pins.
#[derive(Clone, Default)]
pub struct PinLog {
    state: Rc<RefCell<PinLogState>>,
}

impl PinLog {
    pub fn pin(&self, id: usize) -> LogPin {
        LogPin {
            id,
            log: self.clone(),
        }
    }

    /// Delay that snapshots every pin level when called.
    pub fn delay(&self) -> LogDelay {
        LogDelay { log: self.clone() }
    }

    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.events.clear();
        state.latched.clear();
    }

    /// All pin levels right after each write of `level` to pin `id`.
    pub fn levels_when(&self, id: usize, level: bool) -> Vec<[bool; 16]> {
        self.state
            .borrow()
            .events
            .iter()
            .filter(|(pin, high, _)| *pin == id && *high == level)
            .map(|(_, _, levels)| *levels)
            .collect()
    }

    /// Level last written to pin `id`.
    pub fn last(&self, id: usize) -> Option<bool> {
        self.state
            .borrow()
            .events
            .iter()
            .rev()
            .find(|(pin, _, _)| *pin == id)
            .map(|(_, high, _)| *high)
    }

    pub fn latched(&self) -> Vec<[bool; 16]> {
        self.state.borrow().latched.clone()
    }

    fn set(&self, id: usize, high: bool) {
        let mut state = self.state.borrow_mut();
        state.levels[id] = high;
        let levels = state.levels;
        state.events.push((id, high, levels));
    }
}

pub struct LogPin {
    id: usize,
    log: PinLog,
}

impl OutputPin for LogPin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Infallible> {
        self.log.set(self.id, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.log.set(self.id, true);
        Ok(())
    }
}

pub struct LogDelay {
    log: PinLog,
}

impl DelayUs<u16> for LogDelay {
    fn delay_us(&mut self, _us: u16) {
        let mut state = self.log.state.borrow_mut();
        let levels = state.levels;
        state.latched.push(levels);
    }
}
