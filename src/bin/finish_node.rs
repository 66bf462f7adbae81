// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Finish node firmware: finish-line sensors, lane time displays and the link to the Start node.

#![no_main]
#![no_std]

use core::cell::RefCell;

use cortex_m_rt::{entry, exception};
use critical_section::Mutex;
#[cfg(feature = "defmt")]
use defmt_rtt as _;
use panic_halt as _;

use hal::{
    gpio::{Edge, ExtiPin},
    pac::{self, interrupt},
    prelude::*,
    serial::{Config, Serial},
};
use stm32f7xx_hal as hal;

use derbytrack::capture::FinishSensors;
use derbytrack::config::{LinkConfig, SensorConfig, SERIAL_BAUD};
use derbytrack::hw::pins::SensorPins;
use derbytrack::hw::{clock, BoardClock, FinishPins, MicrosDelay, Output, SerialPort};
use derbytrack::link::Link;
use derbytrack::node::FinishNode;
use derbytrack::peripherals::BcdDisplay;
use derbytrack::race::{Lane, Lanes};
use derbytrack::time::Clock;

#[cfg(feature = "defmt")]
defmt::timestamp!("{=u32:us}", clock::micros());

/// Finish latch, written from `EXTI9_5` and read by the control loop.
static SENSORS: FinishSensors = FinishSensors::new(SensorConfig::new());

/// Sensor pins, moved here so the interrupt handler can clear their pending bits.
static SENSOR_PINS: Mutex<RefCell<Option<SensorPins>>> = Mutex::new(RefCell::new(None));

#[exception]
fn SysTick() {
    clock::on_systick();
}

#[interrupt]
fn EXTI9_5() {
    let now = clock::micros();
    critical_section::with(|cs| {
        let mut pins = SENSOR_PINS.borrow_ref_mut(cs);
        let Some(pins) = pins.as_mut() else {
            return;
        };
        if pins.left.check_interrupt() {
            pins.left.clear_interrupt_pending_bit();
            SENSORS.on_edge(Lane::Left, now);
        }
        if pins.right.check_interrupt() {
            pins.right.clear_interrupt_pending_bit();
            SENSORS.on_edge(Lane::Right, now);
        }
    });
}

#[entry]
fn main() -> ! {
    // Peripherals
    let mut dp = pac::Peripherals::take().unwrap();
    let cp = cortex_m::Peripherals::take().unwrap();

    // Clocks
    let rcc = dp.RCC.constrain();
    let clocks = rcc.cfgr.freeze();
    let mut apb2 = rcc.apb2;
    let board_clock = BoardClock::start(dp.TIM2, cp.SYST, &clocks);

    let pins = FinishPins::new(dp.GPIOB, dp.GPIOD, dp.GPIOE, dp.GPIOF, dp.GPIOG);
    let mut status = Output::active_high(pins.status);

    // Sensors: interrupt on the beam-broken edge
    let edge = if SENSORS.config().active_high {
        Edge::Rising
    } else {
        Edge::Falling
    };
    let mut sensors = pins.sensors;
    sensors.left.make_interrupt_source(&mut dp.SYSCFG, &mut apb2);
    sensors.left.trigger_on_edge(&mut dp.EXTI, edge);
    sensors.left.enable_interrupt(&mut dp.EXTI);
    sensors.right.make_interrupt_source(&mut dp.SYSCFG, &mut apb2);
    sensors.right.trigger_on_edge(&mut dp.EXTI, edge);
    sensors.right.enable_interrupt(&mut dp.EXTI);
    critical_section::with(|cs| SENSOR_PINS.borrow_ref_mut(cs).replace(sensors));
    // SAFETY: the handler only touches state guarded by critical sections.
    unsafe { pac::NVIC::unmask(pac::Interrupt::EXTI9_5) };

    // USART2 (link)
    let usart_cfg = Config {
        baud_rate: SERIAL_BAUD.bps(),
        ..Default::default()
    };
    let serial = Serial::new(dp.USART2, (pins.link.tx, pins.link.rx), &clocks, usart_cfg);
    let link = Link::new(SerialPort::new(serial), LinkConfig::default());

    let display = BcdDisplay::new(
        pins.display.address,
        pins.display.bcd,
        pins.display.decimal,
        Lanes::new(pins.display.enable_left, pins.display.enable_right),
        MicrosDelay,
    );

    let mut node = FinishNode::new(link, display, &SENSORS);

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
