// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! USART transport for the node-to-node link.
//!
//! Wraps the HAL's split serial halves and maps their errors onto [`LinkError`] so
//! [`Link`](crate::link::Link) stays independent of the MCU. Both nodes run the link at
//! [`SERIAL_BAUD`](crate::config::SERIAL_BAUD), 8N1.

use embedded_hal::serial;
use stm32f7xx_hal::serial::{Error, Instance, Pins, Rx, Serial, Tx};

use crate::link::LinkError;

pub struct SerialPort<U: Instance> {
    tx: Tx<U>,
    rx: Rx<U>,
}

impl<U: Instance> SerialPort<U> {
    pub fn new<PINS: Pins<U>>(serial: Serial<U, PINS>) -> Self {
        let (tx, rx) = serial.split();
        Self { tx, rx }
    }
}

impl<U: Instance> serial::Read<u8> for SerialPort<U>
where
    Rx<U>: serial::Read<u8, Error = Error>,
{
    type Error = LinkError;

    fn read(&mut self) -> nb::Result<u8, LinkError> {
        serial::Read::read(&mut self.rx).map_err(|e| {
            e.map(|err| match err {
                Error::Overrun => LinkError::Overrun,
                _ => LinkError::Read,
            })
        })
    }
}

impl<U: Instance> serial::Write<u8> for SerialPort<U>
where
    Tx<U>: serial::Write<u8>,
{
    type Error = LinkError;

    #[inline]
    fn write(&mut self, byte: u8) -> nb::Result<(), LinkError> {
        serial::Write::write(&mut self.tx, byte).map_err(|e| e.map(|_| LinkError::Write))
    }

    /// Block until the hardware TX FIFO/drain is flushed.
    #[inline]
    fn flush(&mut self) -> nb::Result<(), LinkError> {
        serial::Write::flush(&mut self.tx).map_err(|e| e.map(|_| LinkError::Write))
    }
}
