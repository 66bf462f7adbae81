// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

use embedded_hal::digital::v2::OutputPin;

/// Whether an output is driven active-high or active-low on the board wiring.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ActiveLevel {
    High,
    Low,
}

/// Output that remembers its active level and last logical state.
///
/// Also an [`OutputPin`] in logical terms, so gate coil drivers wired active-low can be handed to
/// [`GateBank`](crate::peripherals::GateBank) unchanged.
pub struct Output<PIN: OutputPin> {
    pin: PIN,
    active: ActiveLevel,
    is_on: bool,
}

impl<PIN: OutputPin> Output<PIN> {
    /// Wrap `pin`, initializing it to OFF.
    pub fn new(pin: PIN, active: ActiveLevel) -> Self {
        let mut out = Self {
            pin,
            active,
            is_on: true,
        };
        out.set(false).ok();
        out
    }

    pub fn active_high(pin: PIN) -> Self {
        Self::new(pin, ActiveLevel::High)
    }

    pub fn active_low(pin: PIN) -> Self {
        Self::new(pin, ActiveLevel::Low)
    }

    /// Drive the output logically ON (true) or OFF (false).
    pub fn set(&mut self, on: bool) -> Result<(), PIN::Error> {
        match (self.active, on) {
            (ActiveLevel::High, true) | (ActiveLevel::Low, false) => self.pin.set_high()?,
            (ActiveLevel::High, false) | (ActiveLevel::Low, true) => self.pin.set_low()?,
        }
        self.is_on = on;
        Ok(())
    }

    pub fn toggle(&mut self) -> Result<(), PIN::Error> {
        self.set(!self.is_on)
    }

    #[inline]
    pub fn is_on(&self) -> bool {
        self.is_on
    }

    pub fn free(self) -> PIN {
        self.pin
    }
}

impl<PIN: OutputPin> OutputPin for Output<PIN> {
    type Error = PIN::Error;

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set(true)
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set(false)
    }
}
