// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::v2::OutputPin;
use embedded_hal::serial;

use derbytrack::link::LinkError;
use derbytrack::peripherals::{Button, Buttons, LightOutput, TagPoll, TagReader, TimeDisplay};
use derbytrack::race::Lane;
use derbytrack::time::Clock;

type Wire = Rc<RefCell<VecDeque<u8>>>;

#[derive(Copy, Clone, Default)]
struct FaultPlan {
    drop: usize,
    corrupt: Option<(usize, u8)>,
}

/// Line faults applied to the bytes one end transmits.
#[derive(Clone, Default)]
pub struct Faults {
    plan: Rc<Cell<FaultPlan>>,
}

impl Faults {
    /// Lose the next `bytes` transmitted bytes.
    pub fn drop_next(&self, bytes: usize) {
        let mut plan = self.plan.get();
        plan.drop = bytes;
        self.plan.set(plan);
    }

    /// XOR `mask` into the byte transmitted `offset` bytes from now.
    pub fn corrupt(&self, offset: usize, mask: u8) {
        let mut plan = self.plan.get();
        plan.corrupt = Some((offset, mask));
        self.plan.set(plan);
    }

    fn apply(&self, byte: u8) -> Option<u8> {
        let mut plan = self.plan.get();
        let out = if plan.drop > 0 {
            plan.drop -= 1;
            None
        } else {
            match plan.corrupt {
                Some((0, mask)) => {
                    plan.corrupt = None;
                    Some(byte ^ mask)
                }
                Some((offset, mask)) => {
                    plan.corrupt = Some((offset - 1, mask));
                    Some(byte)
                }
                None => Some(byte),
            }
        };
        self.plan.set(plan);
        out
    }
}

/// One end of an in-memory UART pair.
pub struct WireEnd {
    rx: Wire,
    tx: Wire,
    faults: Faults,
}

impl WireEnd {
    /// Handle for injecting faults into this end's transmissions.
    pub fn faults(&self) -> Faults {
        self.faults.clone()
    }
}

/// Two cross-connected serial ports.
pub fn wire_pair() -> (WireEnd, WireEnd) {
    let a: Wire = Rc::default();
    let b: Wire = Rc::default();
    (
        WireEnd {
            rx: a.clone(),
            tx: b.clone(),
            faults: Faults::default(),
        },
        WireEnd {
            rx: b,
            tx: a,
            faults: Faults::default(),
        },
    )
}

impl serial::Read<u8> for WireEnd {
    type Error = LinkError;

    fn read(&mut self) -> nb::Result<u8, LinkError> {
        self.rx.borrow_mut().pop_front().ok_or(nb::Error::WouldBlock)
    }
}

impl serial::Write<u8> for WireEnd {
    type Error = LinkError;

    fn write(&mut self, byte: u8) -> nb::Result<(), LinkError> {
        if let Some(byte) = self.faults.apply(byte) {
            self.tx.borrow_mut().push_back(byte);
        }
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), LinkError> {
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct SimClock {
    pub ms: u32,
}

impl Clock for SimClock {
    fn now_us(&self) -> u32 {
        self.ms.wrapping_mul(1_000)
    }

    fn now_ms(&self) -> u32 {
        self.ms
    }
}

#[derive(Default)]
pub struct Pin {
    pub high: bool,
}

impl OutputPin for Pin {
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

#[derive(Default)]
pub struct Tree {
    pub writes: Vec<u8>,
}

impl LightOutput for Tree {
    fn write(&mut self, pattern: u8) {
        self.writes.push(pattern);
    }
}

#[derive(Default)]
pub struct Panel {
    pressed: [bool; 4],
}

impl Panel {
    pub fn set(&mut self, button: Button, pressed: bool) {
        self.pressed[button.index()] = pressed;
    }
}

impl Buttons for Panel {
    fn is_pressed(&mut self, button: Button) -> bool {
        self.pressed[button.index()]
    }
}

#[derive(Default)]
pub struct Tags {
    pub left: Option<[u8; 4]>,
    pub right: Option<[u8; 4]>,
}

impl TagReader for Tags {
    fn poll_tag(&mut self, lane: Lane) -> TagPoll {
        let uid = match lane {
            Lane::Left => self.left,
            Lane::Right => self.right,
        };
        uid.map_or(TagPoll::NoTag, TagPoll::NewUid)
    }
}

/// Lane readouts as the operator would see them.
#[derive(Default)]
pub struct Readout {
    pub shown: [Option<u32>; 2],
}

impl TimeDisplay for Readout {
    fn show_time(&mut self, lane: Lane, micros: u32) {
        self.shown[lane.index()] = Some(micros);
    }

    fn clear(&mut self, lane: Lane) {
        self.shown[lane.index()] = None;
    }
}
