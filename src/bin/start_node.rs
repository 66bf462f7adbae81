// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Start node firmware: gates, light tree, operator buttons and the link to the Finish node.

#![no_main]
#![no_std]

use cortex_m_rt::{entry, exception};
#[cfg(feature = "defmt")]
use defmt_rtt as _;
use panic_halt as _;

use hal::{
    pac,
    prelude::*,
    serial::{Config, Serial},
};
use stm32f7xx_hal as hal;

use derbytrack::config::{CountdownConfig, LinkConfig, SERIAL_BAUD};
use derbytrack::hw::{clock, BoardClock, Output, SerialPort, StartPins};
use derbytrack::link::Link;
use derbytrack::node::{StartIo, StartNode};
use derbytrack::peripherals::{GateBank, PinButtons, ShiftRegister, TagPoll, TagReader, TreeLights};
use derbytrack::race::Lane;
use derbytrack::time::Clock;

#[cfg(feature = "defmt")]
defmt::timestamp!("{=u32:us}", clock::micros());

/// Stand-in until the MFRC522 readers are wired; staging runs without car ids.
struct NoReaders;

impl TagReader for NoReaders {
    fn poll_tag(&mut self, _lane: Lane) -> TagPoll {
        TagPoll::NoTag
    }
}

#[exception]
fn SysTick() {
    clock::on_systick();
}

#[entry]
fn main() -> ! {
    // Peripherals
    let dp = pac::Peripherals::take().unwrap();
    let cp = cortex_m::Peripherals::take().unwrap();

    // Clocks
    let rcc = dp.RCC.constrain();
    let clocks = rcc.cfgr.freeze();
    let board_clock = BoardClock::start(dp.TIM2, cp.SYST, &clocks);

    let pins = StartPins::new(dp.GPIOB, dp.GPIOD, dp.GPIOE, dp.GPIOF, dp.GPIOG);
    let mut status = Output::active_high(pins.status);

    // USART2 (link)
    let usart_cfg = Config {
        baud_rate: SERIAL_BAUD.bps(),
        ..Default::default()
    };
    let serial = Serial::new(dp.USART2, (pins.link.tx, pins.link.rx), &clocks, usart_cfg);
    let link = Link::new(SerialPort::new(serial), LinkConfig::default());

    let io = StartIo {
        lights: TreeLights::new(ShiftRegister::new(
            pins.lights.data,
            pins.lights.clock,
            pins.lights.latch,
        )),
        gates: GateBank::new(
            Output::active_high(pins.gates.left),
            Output::active_high(pins.gates.right),
            Output::active_high(pins.gates.solenoid),
        ),
        buttons: PinButtons::new(
            pins.buttons.start,
            pins.buttons.mode,
            pins.buttons.left_trigger,
            pins.buttons.right_trigger,
        ),
        tags: NoReaders,
    };

    let mut node = StartNode::new(link, io, CountdownConfig::default());

    let mut last_beat = board_clock.now_ms();
    loop {
        node.tick(&board_clock);

        // Heartbeat; solid while the link has logged errors.
        let now = board_clock.now_ms();
        if now.wrapping_sub(last_beat) >= 500 {
            last_beat = now;
            if node.port().errors().count() > 0 {
                status.set(true).ok();
            } else {
                status.toggle().ok();
            }
        }
    }
}
