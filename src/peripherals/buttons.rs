// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

use embedded_hal::digital::v2::InputPin;

use crate::peripherals::Buttons;
use crate::race::Lane;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    Start,
    Mode,
    /// Driver trigger for the left gate.
    LeftTrigger,
    /// Driver trigger for the right gate.
    RightTrigger,
}

impl Button {
    pub const fn trigger(lane: Lane) -> Self {
        match lane {
            Lane::Left => Button::LeftTrigger,
            Lane::Right => Button::RightTrigger,
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Buttons wired to ground with pull-ups, so pressed reads low.
pub struct PinButtons<P> {
    pins: [P; 4],
}

impl<P: InputPin> PinButtons<P> {
    pub fn new(start: P, mode: P, left_trigger: P, right_trigger: P) -> Self {
        Self {
            pins: [start, mode, left_trigger, right_trigger],
        }
    }
}

impl<P: InputPin> Buttons for PinButtons<P> {
    fn is_pressed(&mut self, button: Button) -> bool {
        self.pins[button.index()].is_low().unwrap_or(false)
    }
}

/// Press-edge detector for a level-polled button.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ButtonEdge {
    last: bool,
}

impl ButtonEdge {
    pub const fn new() -> Self {
        Self { last: false }
    }

    /// Feed the current level. Returns `true` on a released-to-pressed edge.
    pub fn update(&mut self, pressed: bool) -> bool {
        let edge = pressed && !self.last;
        self.last = pressed;
        edge
    }

    /// Adopt the current level without reporting an edge, so a button already held when a state is
    /// entered has to be released first.
    pub fn sync(&mut self, pressed: bool) {
        self.last = pressed;
    }
}
