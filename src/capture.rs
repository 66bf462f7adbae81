// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Finish-line latch shared between the sensor interrupt and the control loop.
//!
//! The interrupt handler is the only writer of the latched times; the control loop is the only writer
//! of the armed flag. Every access, from either side, goes through a `critical_section::Mutex` so the
//! 32-bit times are never read half-updated. [`FinishSensors::new`] is `const`, so the latch can live
//! in a `static` that both contexts reach.

use core::cell::Cell;

use critical_section::Mutex;

use crate::config::SensorConfig;
use crate::race::{Lane, Lanes};
use crate::time::elapsed_us;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct LatchState {
    armed: bool,
    start_us: u32,
    finish_us: Lanes<Option<u32>>,
}

impl LatchState {
    const IDLE: Self = Self {
        armed: false,
        start_us: 0,
        finish_us: Lanes::splat(None),
    };
}

/// Result of one sensor edge.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdgeOutcome {
    /// Not armed, or the lane already finished.
    Ignored,
    /// Inside the minimum race time; this edge is dropped.
    TooEarly,
    /// Lane latched at this race-relative time.
    Latched(u32),
}

pub struct FinishSensors {
    state: Mutex<Cell<LatchState>>,
    config: SensorConfig,
}

impl FinishSensors {
    pub const fn new(config: SensorConfig) -> Self {
        Self {
            state: Mutex::new(Cell::new(LatchState::IDLE)),
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Clear both lanes and start accepting edges relative to `start_us`.
    pub fn arm(&self, start_us: u32) {
        critical_section::with(|cs| {
            self.state.borrow(cs).set(LatchState {
                armed: true,
                start_us,
                finish_us: Lanes::splat(None),
            });
        });
    }

    /// Stop accepting edges and clear both lanes.
    pub fn disarm(&self) {
        critical_section::with(|cs| self.state.borrow(cs).set(LatchState::IDLE));
    }

    pub fn is_armed(&self) -> bool {
        critical_section::with(|cs| self.state.borrow(cs).get().armed)
    }

    /// Sensor edge on `lane` at `now_us`. Called from the interrupt handler.
    pub fn on_edge(&self, lane: Lane, now_us: u32) -> EdgeOutcome {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut state = cell.get();
            if !state.armed || state.finish_us.get(lane).is_some() {
                return EdgeOutcome::Ignored;
            }

            let elapsed = elapsed_us(state.start_us, now_us);
            if elapsed <= self.config.min_race_time_us {
                return EdgeOutcome::TooEarly;
            }
            *state.finish_us.get_mut(lane) = Some(elapsed);
            cell.set(state);
            EdgeOutcome::Latched(elapsed)
        })
    }

    pub fn is_finished(&self, lane: Lane) -> bool {
        self.finish_time(lane).is_some()
    }

    /// Latched race-relative time for `lane`, or 0 if it has not finished.
    pub fn elapsed_us(&self, lane: Lane) -> u32 {
        self.finish_time(lane).unwrap_or(0)
    }

    pub fn finish_time(&self, lane: Lane) -> Option<u32> {
        critical_section::with(|cs| *self.state.borrow(cs).get().finish_us.get(lane))
    }

    /// Latch every unfinished lane at the maximum race time once it has passed. Returns the lanes
    /// latched by this call.
    pub fn enforce_max(&self, now_us: u32) -> Lanes<bool> {
        let max = self.config.max_race_time_us;
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut state = cell.get();
            let mut forced = Lanes::splat(false);
            if !state.armed || elapsed_us(state.start_us, now_us) <= max {
                return forced;
            }
            for lane in Lane::ALL {
                let slot = state.finish_us.get_mut(lane);
                if slot.is_none() {
                    *slot = Some(max);
                    *forced.get_mut(lane) = true;
                }
            }
            cell.set(state);
            forced
        })
    }
}
