// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

use crate::race::{Lane, Lanes};

/// Raw instants captured during one race, on the node's microsecond clock.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RaceTimingData {
    /// Instant of Go (Start node) or of the race start signal (Finish node).
    pub race_start_us: u32,
    /// Per-lane instant: gate release on the Start node, finish latch on the Finish node.
    pub lane_us: Lanes<u32>,
    /// Per-lane flag set once `lane_us` holds a value for this race.
    pub recorded: Lanes<bool>,
}

impl RaceTimingData {
    pub const fn new() -> Self {
        Self {
            race_start_us: 0,
            lane_us: Lanes::splat(0),
            recorded: Lanes::splat(false),
        }
    }

    /// Start a fresh race at `race_start_us`.
    pub fn begin(&mut self, race_start_us: u32) {
        *self = Self::new();
        self.race_start_us = race_start_us;
    }

    /// Record `lane` at `at_us`. Later records for the same lane are ignored.
    pub fn record(&mut self, lane: Lane, at_us: u32) -> bool {
        if *self.recorded.get(lane) {
            return false;
        }
        *self.lane_us.get_mut(lane) = at_us;
        *self.recorded.get_mut(lane) = true;
        true
    }

    #[inline]
    pub fn is_recorded(&self, lane: Lane) -> bool {
        *self.recorded.get(lane)
    }

    #[inline]
    pub fn all_recorded(&self) -> bool {
        self.recorded.left && self.recorded.right
    }

    #[inline]
    pub fn lane_us(&self, lane: Lane) -> u32 {
        *self.lane_us.get(lane)
    }
}
