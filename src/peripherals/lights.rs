// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Light tree patterns and the blink engine.
//!
//! The tree is one byte shifted into a 74HC595; each bit drives one lamp.

use embedded_hal::digital::v2::OutputPin;

use crate::config::{BLINK_CYCLES, BLINK_RATE_MS};
use crate::peripherals::Lights;
use crate::protocol::WinnerMask;
use crate::time::elapsed_ms;

pub const LIGHT_OFF: u8 = 0x00;
/// Blue, right lane.
pub const LIGHT_BR: u8 = 1 << 0;
/// Blue, left lane.
pub const LIGHT_BL: u8 = 1 << 1;
pub const LIGHT_Y1: u8 = 1 << 2;
pub const LIGHT_Y2: u8 = 1 << 3;
pub const LIGHT_Y3: u8 = 1 << 4;
/// Green, both lanes.
pub const LIGHT_GO: u8 = 1 << 5;
/// Red, left lane.
pub const LIGHT_FL: u8 = 1 << 6;
/// Red, right lane.
pub const LIGHT_FR: u8 = 1 << 7;

/// Sink for a full tree pattern.
pub trait LightOutput {
    fn write(&mut self, pattern: u8);
}

/// 74HC595 driven by three GPIOs, bit 7 shifted first.
pub struct ShiftRegister<D, C, L> {
    data: D,
    clock: C,
    latch: L,
}

impl<D, C, L> ShiftRegister<D, C, L>
where
    D: OutputPin,
    C: OutputPin,
    L: OutputPin,
{
    pub fn new(mut data: D, mut clock: C, mut latch: L) -> Self {
        data.set_low().ok();
        clock.set_low().ok();
        latch.set_low().ok();
        Self { data, clock, latch }
    }

    pub fn free(self) -> (D, C, L) {
        (self.data, self.clock, self.latch)
    }
}

impl<D, C, L> LightOutput for ShiftRegister<D, C, L>
where
    D: OutputPin,
    C: OutputPin,
    L: OutputPin,
{
    fn write(&mut self, pattern: u8) {
        self.latch.set_low().ok();
        for bit in (0..8).rev() {
            if pattern & (1 << bit) != 0 {
                self.data.set_high().ok();
            } else {
                self.data.set_low().ok();
            }
            self.clock.set_high().ok();
            self.clock.set_low().ok();
        }
        self.latch.set_high().ok();
    }
}

/// Alternate between two patterns, then settle on a final one.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Blink {
    pub first: u8,
    pub second: u8,
    /// On/off cycles; each cycle is two toggles.
    pub cycles: u8,
    pub rate_ms: u16,
    pub last: u8,
}

impl Blink {
    /// Standard cue: [`BLINK_CYCLES`] cycles at [`BLINK_RATE_MS`].
    pub const fn cue(first: u8, second: u8, last: u8) -> Self {
        Self {
            first,
            second,
            cycles: BLINK_CYCLES,
            rate_ms: BLINK_RATE_MS,
            last,
        }
    }
}

/// Cue shown on the tree when the winner is announced.
pub const fn winner_cue(mask: WinnerMask) -> Option<Blink> {
    if mask.left() {
        Some(Blink::cue(LIGHT_GO | LIGHT_FR, LIGHT_FR, LIGHT_GO | LIGHT_FR))
    } else if mask.right() {
        Some(Blink::cue(LIGHT_GO | LIGHT_FL, LIGHT_FL, LIGHT_GO | LIGHT_FL))
    } else if mask.tie() {
        Some(Blink::cue(LIGHT_GO, LIGHT_OFF, LIGHT_GO))
    } else {
        None
    }
}

#[derive(Copy, Clone, Debug)]
struct BlinkState {
    blink: Blink,
    remaining: u16,
    showing_second: bool,
    last_toggle_ms: u32,
}

/// Light tree with a non-blocking blink engine.
pub struct TreeLights<O> {
    output: O,
    pattern: u8,
    blink: Option<BlinkState>,
}

impl<O: LightOutput> TreeLights<O> {
    /// Take the output and turn every lamp off.
    pub fn new(mut output: O) -> Self {
        output.write(LIGHT_OFF);
        Self {
            output,
            pattern: LIGHT_OFF,
            blink: None,
        }
    }

    /// Pattern currently on the tree.
    #[inline]
    pub fn pattern(&self) -> u8 {
        self.pattern
    }

    pub fn free(self) -> O {
        self.output
    }

    fn show(&mut self, pattern: u8) {
        self.pattern = pattern;
        self.output.write(pattern);
    }
}

impl<O: LightOutput> Lights for TreeLights<O> {
    fn set_pattern(&mut self, pattern: u8) {
        self.show(pattern);
    }

    fn start_blink(&mut self, blink: Blink, now_ms: u32) {
        self.blink = Some(BlinkState {
            blink,
            remaining: u16::from(blink.cycles) * 2,
            showing_second: false,
            last_toggle_ms: now_ms,
        });
        self.show(blink.first);
    }

    fn cancel_blink(&mut self) {
        self.blink = None;
    }

    fn is_blinking(&self) -> bool {
        self.blink.is_some()
    }

    fn tick(&mut self, now_ms: u32) -> bool {
        let Some(mut state) = self.blink else {
            return false;
        };
        if elapsed_ms(state.last_toggle_ms, now_ms) < u32::from(state.blink.rate_ms) {
            return true;
        }

        state.last_toggle_ms = now_ms;
        state.showing_second = !state.showing_second;
        let pattern = if state.showing_second {
            state.blink.second
        } else {
            state.blink.first
        };
        self.show(pattern);

        state.remaining = state.remaining.saturating_sub(1);
        if state.remaining == 0 {
            self.blink = None;
            self.show(state.blink.last);
            return false;
        }
        self.blink = Some(state);
        true
    }
}
