// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Start gates: one holding electromagnet per lane and a shared return solenoid.

use embedded_hal::digital::v2::OutputPin;

use crate::config::GATE_RETURN_HOLD_MS;
use crate::peripherals::Gates;
use crate::race::{Lane, Lanes};
use crate::time::elapsed_ms;

pub struct GateBank<L, R, S> {
    left: L,
    right: R,
    solenoid: S,
    up: Lanes<bool>,
    return_started_ms: Option<u32>,
    hold_ms: u32,
}

impl<L, R, S> GateBank<L, R, S>
where
    L: OutputPin,
    R: OutputPin,
    S: OutputPin,
{
    /// Take the three outputs with every coil de-energised, so both gates start down.
    pub fn new(mut left: L, mut right: R, mut solenoid: S) -> Self {
        left.set_low().ok();
        right.set_low().ok();
        solenoid.set_low().ok();
        Self {
            left,
            right,
            solenoid,
            up: Lanes::splat(false),
            return_started_ms: None,
            hold_ms: GATE_RETURN_HOLD_MS,
        }
    }

    /// Set how long the solenoid pushes after a return.
    pub fn with_hold_ms(mut self, hold_ms: u32) -> Self {
        self.hold_ms = hold_ms;
        self
    }

    pub fn free(self) -> (L, R, S) {
        (self.left, self.right, self.solenoid)
    }
}

impl<L, R, S> Gates for GateBank<L, R, S>
where
    L: OutputPin,
    R: OutputPin,
    S: OutputPin,
{
    fn drop_gate(&mut self, lane: Lane) {
        match lane {
            Lane::Left => self.left.set_low().ok(),
            Lane::Right => self.right.set_low().ok(),
        };
        *self.up.get_mut(lane) = false;
    }

    fn return_all(&mut self, now_ms: u32) {
        if self.return_started_ms.is_some() || (self.up.left && self.up.right) {
            return;
        }
        self.left.set_high().ok();
        self.right.set_high().ok();
        self.solenoid.set_high().ok();
        self.up = Lanes::splat(true);
        self.return_started_ms = Some(now_ms);
    }

    fn is_returning(&self) -> bool {
        self.return_started_ms.is_some()
    }

    fn is_up(&self, lane: Lane) -> bool {
        *self.up.get(lane)
    }

    fn tick(&mut self, now_ms: u32) {
        let Some(started) = self.return_started_ms else {
            return;
        };
        if elapsed_ms(started, now_ms) >= self.hold_ms {
            self.solenoid.set_low().ok();
            self.return_started_ms = None;
        }
    }
}
