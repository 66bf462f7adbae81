// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Tunable constants and configuration structs.
//!
//! Every magic number used by the link, the countdown, the light tree and the finish sensors lives
//! here so both nodes agree on them.

// Link
/// Serial baud rate for the node-to-node link.
pub const SERIAL_BAUD: u32 = 115_200;
/// Milliseconds to wait for an acknowledge before a send times out.
pub const TX_TIMEOUT_MS: u32 = 50;
/// Number of re-sends allowed after a negative acknowledge.
pub const TX_MAX_RETRIES: u8 = 3;

// RFID
/// Length of a car transponder UID in bytes.
pub const UID_LEN: usize = 4;
/// Minimum spacing between two tag reads on the same reader.
pub const RFID_READ_THROTTLE_MS: u32 = 500;

// Countdown
/// Stage duration for gate-drop, reaction and dial-in modes.
pub const STAGE_MS: u32 = 500;
/// Stage duration for pro mode (single amber stage).
pub const PRO_STAGE_MS: u32 = 400;

// Light tree
/// Toggle period for blink cues.
pub const BLINK_RATE_MS: u16 = 250;
/// On/off cycles for mode and winner cues.
pub const BLINK_CYCLES: u8 = 3;

// Gates
/// How long the return solenoid stays energised while pushing the gates up.
pub const GATE_RETURN_HOLD_MS: u32 = 500;

// Finish sensors
/// Triggers earlier than this after the start are treated as noise.
pub const MIN_RACE_TIME_US: u32 = 500_000;
/// A lane that has not finished by this time is force-latched at this value.
pub const MAX_RACE_TIME_US: u32 = 10_000_000;

/// Link layer timing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LinkConfig {
    /// Acknowledge window in milliseconds.
    pub timeout_ms: u32,
    /// Re-sends allowed after a negative acknowledge.
    pub max_retries: u8,
}

impl LinkConfig {
    pub const fn new() -> Self {
        Self {
            timeout_ms: TX_TIMEOUT_MS,
            max_retries: TX_MAX_RETRIES,
        }
    }

    /// Set the acknowledge window.
    pub const fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the retry ceiling.
    pub const fn with_max_retries(mut self, max_retries: u8) -> Self {
        self.max_retries = max_retries;
        self
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Finish-line sensor configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SensorConfig {
    /// Edges earlier than this (relative to the arm instant) are dropped.
    pub min_race_time_us: u32,
    /// Lanes that have not finished by this time are force-latched.
    pub max_race_time_us: u32,
    /// Sensors drive the line high when the beam is broken.
    pub active_high: bool,
}

impl SensorConfig {
    pub const fn new() -> Self {
        Self {
            min_race_time_us: MIN_RACE_TIME_US,
            max_race_time_us: MAX_RACE_TIME_US,
            active_high: true,
        }
    }

    pub const fn with_min_race_time_us(mut self, us: u32) -> Self {
        self.min_race_time_us = us;
        self
    }

    pub const fn with_max_race_time_us(mut self, us: u32) -> Self {
        self.max_race_time_us = us;
        self
    }

    pub const fn with_active_high(mut self, active_high: bool) -> Self {
        self.active_high = active_high;
        self
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Countdown stage durations.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CountdownConfig {
    pub stage_ms: u32,
    pub pro_stage_ms: u32,
}

impl CountdownConfig {
    pub const fn new() -> Self {
        Self {
            stage_ms: STAGE_MS,
            pro_stage_ms: PRO_STAGE_MS,
        }
    }

    pub const fn with_stage_ms(mut self, ms: u32) -> Self {
        self.stage_ms = ms;
        self
    }

    pub const fn with_pro_stage_ms(mut self, ms: u32) -> Self {
        self.pro_stage_ms = ms;
        self
    }
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self::new()
    }
}
