// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Staged countdown to Go.
//!
//! Gate-drop, reaction and dial-in run three amber stages (Y3, Y2, Y1) of [`CountdownConfig::stage_ms`]
//! each. Pro skips straight to Y1, lit as all three ambers, for [`CountdownConfig::pro_stage_ms`].

use crate::config::CountdownConfig;
use crate::peripherals::lights::{
    LIGHT_BL, LIGHT_BR, LIGHT_FL, LIGHT_FR, LIGHT_GO, LIGHT_Y1, LIGHT_Y2, LIGHT_Y3,
};
use crate::protocol::FoulMask;
use crate::race::{Lane, RaceMode};
use crate::time::elapsed_ms;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CountdownState {
    #[default]
    Idle,
    Staged,
    Y3,
    Y2,
    Y1,
    Go,
}

/// Countdown sub-state, only meaningful while the race is in `Countdown`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Countdown {
    state: CountdownState,
    stage_started_ms: u32,
    stage_ms: u32,
    config: CountdownConfig,
}

impl Countdown {
    pub const fn new(config: CountdownConfig) -> Self {
        Self {
            state: CountdownState::Idle,
            stage_started_ms: 0,
            stage_ms: config.stage_ms,
            config,
        }
    }

    #[inline]
    pub fn state(&self) -> CountdownState {
        self.state
    }

    /// Go has been reached.
    #[inline]
    pub fn is_go(&self) -> bool {
        self.state == CountdownState::Go
    }

    /// Enter `Staged` with the stage timer zeroed.
    pub fn start(&mut self, now_ms: u32) {
        self.state = CountdownState::Staged;
        self.stage_started_ms = now_ms;
    }

    /// Advance by elapsed time. Returns the new sub-state when it changed.
    pub fn tick(&mut self, mode: RaceMode, now_ms: u32) -> Option<CountdownState> {
        let next = match self.state {
            CountdownState::Staged => {
                if mode == RaceMode::Pro {
                    self.stage_ms = self.config.pro_stage_ms;
                    CountdownState::Y1
                } else {
                    self.stage_ms = self.config.stage_ms;
                    CountdownState::Y3
                }
            }
            CountdownState::Y3 | CountdownState::Y2 | CountdownState::Y1 => {
                if elapsed_ms(self.stage_started_ms, now_ms) < self.stage_ms {
                    return None;
                }
                match self.state {
                    CountdownState::Y3 => CountdownState::Y2,
                    CountdownState::Y2 => CountdownState::Y1,
                    _ => CountdownState::Go,
                }
            }
            CountdownState::Idle | CountdownState::Go => return None,
        };

        self.state = next;
        self.stage_started_ms = now_ms;
        Some(next)
    }
}

/// Light tree value for a countdown sub-state: blue staging lights always, the stage lamp, and a red
/// overlay for every fouled lane.
pub const fn light_config(state: CountdownState, fouls: FoulMask, mode: RaceMode) -> u8 {
    let mut config = LIGHT_BL | LIGHT_BR;

    config |= match state {
        CountdownState::Y3 => LIGHT_Y3,
        CountdownState::Y2 => LIGHT_Y2,
        CountdownState::Y1 => match mode {
            RaceMode::Pro => LIGHT_Y3 | LIGHT_Y2 | LIGHT_Y1,
            _ => LIGHT_Y1,
        },
        CountdownState::Go => LIGHT_GO,
        CountdownState::Idle | CountdownState::Staged => 0,
    };

    if fouls.is_fouled(Lane::Left) {
        config |= LIGHT_FL;
    }
    if fouls.is_fouled(Lane::Right) {
        config |= LIGHT_FR;
    }
    config
}
