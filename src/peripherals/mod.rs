// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Interfaces to the track hardware.
//!
//! The node control loops only see these traits. The submodules hold the drivers, written against
//! `embedded-hal` pins so they run on the host under test; `hw` supplies the STM32 clocks, serial
//! port and pin setup underneath.

pub mod buttons;
pub mod display;
pub mod gates;
pub mod lights;
pub mod rfid;

pub use buttons::{Button, ButtonEdge, PinButtons};
pub use display::{display_digits, BcdDisplay, DISPLAY_DIGITS};
pub use gates::GateBank;
pub use lights::{winner_cue, Blink, LightOutput, ShiftRegister, TreeLights};
pub use rfid::{RfidForwarder, TagPoll};

use crate::race::Lane;

/// Lane time readouts on the Finish node.
pub trait TimeDisplay {
    /// Show a time given in microseconds.
    fn show_time(&mut self, lane: Lane, micros: u32);

    /// Blank the readout.
    fn clear(&mut self, lane: Lane);
}

/// Start light tree.
pub trait Lights {
    /// Show a fixed pattern. Does not cancel a running blink.
    fn set_pattern(&mut self, pattern: u8);

    fn start_blink(&mut self, blink: Blink, now_ms: u32);

    fn cancel_blink(&mut self);

    fn is_blinking(&self) -> bool;

    /// Advance any running blink. Returns `true` while still blinking.
    fn tick(&mut self, now_ms: u32) -> bool;
}

/// Start gates.
pub trait Gates {
    /// Release a lane's gate.
    fn drop_gate(&mut self, lane: Lane);

    /// Push both gates back up. Completes asynchronously through [`Gates::tick`].
    fn return_all(&mut self, now_ms: u32);

    fn is_returning(&self) -> bool;

    /// Gate is being held up.
    fn is_up(&self, lane: Lane) -> bool;

    fn tick(&mut self, now_ms: u32);
}

/// Operator and driver inputs.
pub trait Buttons {
    fn is_pressed(&mut self, button: Button) -> bool;
}

/// Per-lane RFID reader.
pub trait TagReader {
    fn poll_tag(&mut self, lane: Lane) -> TagPoll;
}
