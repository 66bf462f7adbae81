// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # derbytrack Firmware
//!
//! Coordination core for a two-node drag-race timing track. The **Start** node owns the gates,
//! the light tree, the RFID readers and the operator buttons. The **Finish** node owns the
//! finish-line sensors and the lane time displays. The two controllers only share a serial link,
//! so both run the same race state machine and keep it consistent through an acknowledged,
//! retried message protocol.
//!
//! ## Crate Structure
//!
//! | Module | Purpose |
//! | ------ | -------- |
//! | [`protocol`] | Message catalog, wire framing, byte parser |
//! | [`link`] | Per-message transmit trackers, acknowledge/retry/timeout, inbox |
//! | [`race`] | Race state and mode machines, countdown, results computation |
//! | [`capture`] | Interrupt-safe finish-line latch (Finish node) |
//! | [`peripherals`] | Collaborator interfaces (lights, gates, display, buttons, RFID) |
//! | [`node`] | Per-node control loops |
//! | `hw` | STM32F7 wrappers for USART, timers, GPIO (feature `board`) |
//!
//! ## Getting Started
//!
//! Run the host tests:
//!
//! ```bash
//! cargo test
//! ```
//!
//! Flash a board:
//!
//! ```bash
//! cargo run --release --features board,defmt --bin start_node --target thumbv7em-none-eabihf
//! cargo run --release --features board,defmt --bin finish_node --target thumbv7em-none-eabihf
//! ```
//!
//! ## License
//!
//! Licensed under the **MIT License**.
//! See the `LICENSE` file in the repository root for full terms.
//!
//! © 2025–2026 Christopher Liu

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod capture;
pub mod config;
pub mod error;
pub mod link;
pub mod node;
pub mod peripherals;
pub mod protocol;
pub mod race;
pub mod time;

#[cfg(feature = "board")]
pub mod hw;

#[cfg(test)]
pub(crate) mod test_support;
