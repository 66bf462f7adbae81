// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Node clocks.
//!
//! TIM2 runs free at 1 MHz over its full 32-bit range and is the microsecond clock. SysTick fires
//! every millisecond and advances a counter that is the millisecond clock. Both wrap silently.

use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m::peripheral::{syst::SystClkSource, SYST};
use embedded_hal::blocking::delay::DelayUs;
use stm32f7xx_hal::{pac, rcc::Clocks};

use crate::time::{elapsed_us, Clock};

static MILLIS: AtomicU32 = AtomicU32::new(0);

/// Advance the millisecond clock. Call from the `SysTick` exception handler.
#[inline]
pub fn on_systick() {
    MILLIS.fetch_add(1, Ordering::Relaxed);
}

/// Current microsecond count. Safe to call from interrupt handlers once a [`BoardClock`] exists.
#[inline]
pub fn micros() -> u32 {
    // SAFETY: read-only access to the counter of a timer owned by `BoardClock`.
    unsafe { (*pac::TIM2::ptr()).cnt.read().bits() }
}

pub struct BoardClock {
    tim: pac::TIM2,
}

impl BoardClock {
    /// Start TIM2 as the microsecond counter and SysTick as the millisecond tick.
    pub fn start(tim2: pac::TIM2, mut syst: SYST, clocks: &Clocks) -> Self {
        // SAFETY: only the TIM2 enable bit is touched.
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb1enr.modify(|_, w| w.tim2en().set_bit());

        let tim = tim2;

        // Disable counter while configuring
        tim.cr1.modify(|_, w| w.cen().clear_bit());

        // 1 MHz tick
        let prescaler = clocks.timclk1().to_Hz() / 1_000_000 - 1;
        tim.psc.write(|w| w.psc().bits(prescaler as u16));

        // Auto-reload: max 32-bit
        tim.arr.write(|w| w.bits(0xFFFF_FFFF));

        // Load the prescaler now instead of at the first overflow
        tim.egr.write(|w| w.ug().set_bit());
        tim.cnt.write(|w| w.bits(0));

        tim.cr1.modify(|_, w| w.cen().set_bit());

        syst.set_clock_source(SystClkSource::Core);
        syst.set_reload(clocks.sysclk().to_Hz() / 1_000 - 1);
        syst.clear_current();
        syst.enable_counter();
        syst.enable_interrupt();

        Self { tim }
    }

    /// Consume the wrapper and return the underlying timer peripheral.
    #[inline]
    pub fn free(self) -> pac::TIM2 {
        self.tim
    }
}

impl Clock for BoardClock {
    #[inline]
    fn now_us(&self) -> u32 {
        self.tim.cnt.read().bits()
    }

    #[inline]
    fn now_ms(&self) -> u32 {
        MILLIS.load(Ordering::Relaxed)
    }
}

/// Busy-wait on the microsecond counter. Only valid once a [`BoardClock`] is running.
#[derive(Copy, Clone, Debug, Default)]
pub struct MicrosDelay;

impl DelayUs<u16> for MicrosDelay {
    fn delay_us(&mut self, us: u16) {
        let start = micros();
        while elapsed_us(start, micros()) < u32::from(us) {}
    }
}
