// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Lane time formatting.
//!
//! Each lane readout is five BCD digits with the decimal point after the second, showing seconds to
//! the millisecond: `SS.mmm`.
//!
//! On the board each digit is an MC14543 latch addressed through a 74HC238. A lane's latches are
//! written by selecting the lane (active low), putting the digit index on the address lines and the
//! value on the BCD lines, then waiting for the latch to settle.

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::digital::v2::OutputPin;

use crate::peripherals::TimeDisplay;
use crate::race::{Lane, Lanes};

/// Digits per lane readout.
pub const DISPLAY_DIGITS: usize = 5;

/// Index of the digit that carries the decimal point.
pub const DECIMAL_DIGIT: usize = 1;

/// Largest value the readout can show, in milliseconds.
pub const DISPLAY_MAX_MS: u32 = 99_999;

/// Split a time into display digits, most significant first.
///
/// Rounds to the nearest millisecond and clamps at 99.999 s.
pub const fn display_digits(micros: u32) -> [u8; DISPLAY_DIGITS] {
    let mut ms = micros / 1_000 + (micros % 1_000 >= 500) as u32;
    if ms > DISPLAY_MAX_MS {
        ms = DISPLAY_MAX_MS;
    }
    [
        ((ms / 10_000) % 10) as u8,
        ((ms / 1_000) % 10) as u8,
        ((ms / 100) % 10) as u8,
        ((ms / 10) % 10) as u8,
        (ms % 10) as u8,
    ]
}

/// BCD value the MC14543 shows as a blank digit.
const BLANK: u8 = 0x0F;

/// Latch settle time per digit.
const LATCH_SETTLE_US: u16 = 30;

/// Two five-digit readouts sharing address, data and decimal-point lines.
pub struct BcdDisplay<P, D> {
    address: [P; 3],
    bcd: [P; 4],
    decimal: P,
    enable: Lanes<P>,
    delay: D,
}

impl<P, D> BcdDisplay<P, D>
where
    P: OutputPin,
    D: DelayUs<u16>,
{
    pub fn new(address: [P; 3], bcd: [P; 4], decimal: P, enable: Lanes<P>, delay: D) -> Self {
        let mut display = Self {
            address,
            bcd,
            decimal,
            enable,
            delay,
        };
        display.decimal.set_low().ok();
        display.deselect();
        display
    }

    fn deselect(&mut self) {
        self.enable.left.set_high().ok();
        self.enable.right.set_high().ok();
    }

    fn select(&mut self, lane: Lane) {
        self.enable.get_mut(lane.other()).set_high().ok();
        self.enable.get_mut(lane).set_low().ok();
    }

    fn write_digit(&mut self, index: usize, value: u8, point: bool) {
        set_level(&mut self.decimal, point);
        for (bit, pin) in self.address.iter_mut().enumerate() {
            set_level(pin, index & (1 << bit) != 0);
        }
        for (bit, pin) in self.bcd.iter_mut().enumerate() {
            set_level(pin, value & (1 << bit) != 0);
        }
        self.delay.delay_us(LATCH_SETTLE_US);
    }

    fn write_lane(&mut self, lane: Lane, digits: Option<[u8; DISPLAY_DIGITS]>) {
        self.select(lane);
        for index in 0..DISPLAY_DIGITS {
            match digits {
                Some(digits) => self.write_digit(index, digits[index], index == DECIMAL_DIGIT),
                None => self.write_digit(index, BLANK, false),
            }
        }
        self.deselect();
    }
}

fn set_level<P: OutputPin>(pin: &mut P, high: bool) {
    if high {
        pin.set_high().ok();
    } else {
        pin.set_low().ok();
    }
}

impl<P, D> TimeDisplay for BcdDisplay<P, D>
where
    P: OutputPin,
    D: DelayUs<u16>,
{
    fn show_time(&mut self, lane: Lane, micros: u32) {
        self.write_lane(lane, Some(display_digits(micros)));
    }

    fn clear(&mut self, lane: Lane) {
        self.write_lane(lane, None);
    }
}
