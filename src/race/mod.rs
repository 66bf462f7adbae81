// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Race logic shared by both nodes.
//!
//! Nothing in here touches hardware. The state and mode machines talk to the link through the
//! [`Transmit`](crate::link::Transmit) trait, and the countdown and results are plain values driven
//! by timestamps the caller passes in.

pub mod countdown;
pub mod mode;
pub mod results;
pub mod state;
pub mod timing;

pub use countdown::{light_config, Countdown, CountdownState};
pub use mode::{mode_cue, next_mode, RaceMode};
pub use results::{reaction_time_us, LaneResult, RaceResults};
pub use state::{Announce, RaceState, StateMachine, Step};
pub use timing::RaceTimingData;

/// One of the two parallel tracks.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Lane {
    Left,
    Right,
}

impl Lane {
    pub const ALL: [Lane; 2] = [Lane::Left, Lane::Right];

    #[inline]
    pub const fn other(self) -> Self {
        match self {
            Lane::Left => Lane::Right,
            Lane::Right => Lane::Left,
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Lane::Left => 0,
            Lane::Right => 1,
        }
    }
}

/// A value kept per lane.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Lanes<T> {
    pub left: T,
    pub right: T,
}

impl<T> Lanes<T> {
    pub const fn new(left: T, right: T) -> Self {
        Self { left, right }
    }

    #[inline]
    pub fn get(&self, lane: Lane) -> &T {
        match lane {
            Lane::Left => &self.left,
            Lane::Right => &self.right,
        }
    }

    #[inline]
    pub fn get_mut(&mut self, lane: Lane) -> &mut T {
        match lane {
            Lane::Left => &mut self.left,
            Lane::Right => &mut self.right,
        }
    }
}

impl<T: Copy> Lanes<T> {
    pub const fn splat(value: T) -> Self {
        Self {
            left: value,
            right: value,
        }
    }
}
