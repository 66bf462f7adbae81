// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Race results.
//!
//! A lane's **car time** is its raw race time corrected by its reaction time. A clean lane left after
//! Go, so its reaction delay is subtracted. A fouled lane left before Go, so the head start is added
//! back. A fouled lane can never win; if both foul, or the car times are equal, the race is a tie.

use crate::protocol::{Uid, WinnerMask};
use crate::race::{Lane, Lanes};
use crate::time::elapsed_us;

/// Reaction time for a lane released at `trigger_us`.
///
/// A fouled lane triggered before Go, so the result is `race_start_us - trigger_us` by plain
/// subtraction. A clean lane uses the wrapping interval from Go to the trigger.
#[inline]
pub const fn reaction_time_us(race_start_us: u32, trigger_us: u32, fouled: bool) -> u32 {
    if fouled {
        race_start_us.wrapping_sub(trigger_us)
    } else {
        elapsed_us(race_start_us, trigger_us)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LaneResult {
    pub lane: Lane,
    pub car_id: Option<Uid>,
    pub foul: bool,
    pub winner: bool,
    pub car_time_us: u32,
    pub race_time_us: u32,
    pub reaction_time_us: u32,
}

impl LaneResult {
    pub const fn new(lane: Lane) -> Self {
        Self {
            lane,
            car_id: None,
            foul: false,
            winner: false,
            car_time_us: 0,
            race_time_us: 0,
            reaction_time_us: 0,
        }
    }

    fn apply_race_time(&mut self, race_time_us: u32) {
        self.race_time_us = race_time_us;
        self.car_time_us = if self.foul {
            race_time_us.saturating_add(self.reaction_time_us)
        } else {
            race_time_us.saturating_sub(self.reaction_time_us)
        };
    }
}

/// Results for both lanes of one race.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RaceResults {
    lanes: Lanes<LaneResult>,
}

impl RaceResults {
    pub const fn new() -> Self {
        Self {
            lanes: Lanes::new(LaneResult::new(Lane::Left), LaneResult::new(Lane::Right)),
        }
    }

    #[inline]
    pub fn lane(&self, lane: Lane) -> &LaneResult {
        self.lanes.get(lane)
    }

    #[inline]
    pub fn lane_mut(&mut self, lane: Lane) -> &mut LaneResult {
        self.lanes.get_mut(lane)
    }

    /// Fill in race and car times from the raw finish times, then pick the winner. Foul flags and
    /// reaction times must already be set.
    pub fn compute(&mut self, race_times_us: Lanes<u32>) {
        for lane in Lane::ALL {
            self.lanes.get_mut(lane).apply_race_time(*race_times_us.get(lane));
        }

        let (left, right) = (self.lanes.left, self.lanes.right);
        self.lanes.left.winner = !left.foul && (right.foul || left.car_time_us < right.car_time_us);
        self.lanes.right.winner =
            !right.foul && (left.foul || right.car_time_us < left.car_time_us);
    }

    /// Winner message payload. Neither lane winning reports a tie.
    pub fn winner_mask(&self) -> WinnerMask {
        WinnerMask::from_winners(self.lanes.left.winner, self.lanes.right.winner)
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for RaceResults {
    fn default() -> Self {
        Self::new()
    }
}
