// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! MCU-level wrappers for the STM32F767 track controllers.

pub mod clock;
pub mod output;
pub mod pins;
pub mod serial;

pub use clock::{BoardClock, MicrosDelay};
pub use output::{ActiveLevel, Output};
pub use pins::{FinishPins, StartPins};
pub use serial::SerialPort;
