// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Pin definitions for the STM32F767 track controllers.
//!
//! Both nodes share the link UART (USART2 on PD5/PD6) and the status LED on PB0.

use stm32f7xx_hal::{
    gpio::{gpiob, gpiod, gpiof, Alternate, ErasedPin, Floating, Input, Output, PullUp, PushPull},
    pac,
    prelude::*,
};

pub type OutPin = ErasedPin<Output<PushPull>>;
pub type ButtonPin = ErasedPin<Input<PullUp>>;

pub struct LinkPins {
    pub tx: gpiod::PD5<Alternate<7>>,
    pub rx: gpiod::PD6<Alternate<7>>,
}

/// 74HC595 feeding the light tree.
pub struct LightPins {
    pub data: OutPin,
    pub clock: OutPin,
    pub latch: OutPin,
}

/// Gate magnet and return solenoid drivers.
pub struct GatePins {
    pub left: OutPin,
    pub right: OutPin,
    pub solenoid: OutPin,
}

pub struct ButtonPins {
    pub start: ButtonPin,
    pub mode: ButtonPin,
    pub left_trigger: ButtonPin,
    pub right_trigger: ButtonPin,
}

/// All Start node pins. Construct this once at startup using:
///
/// ```rust
/// let pins = StartPins::new(dp.GPIOB, dp.GPIOD, dp.GPIOE, dp.GPIOF, dp.GPIOG);
/// ```
pub struct StartPins {
    pub status: gpiob::PB0<Output<PushPull>>,
    pub link: LinkPins,
    pub lights: LightPins,
    pub gates: GatePins,
    pub buttons: ButtonPins,
}

impl StartPins {
    pub fn new(
        gpiob: pac::GPIOB,
        gpiod: pac::GPIOD,
        gpioe: pac::GPIOE,
        gpiof: pac::GPIOF,
        gpiog: pac::GPIOG,
    ) -> Self {
        let gpiob = gpiob.split();
        let gpiod = gpiod.split();
        let gpioe = gpioe.split();
        let gpiof = gpiof.split();
        let gpiog = gpiog.split();

        Self {
            status: gpiob.pb0.into_push_pull_output(),

            link: LinkPins {
                tx: gpiod.pd5.into_alternate::<7>(),
                rx: gpiod.pd6.into_alternate::<7>(),
            },

            lights: LightPins {
                data: gpioe.pe2.into_push_pull_output().erase(),
                clock: gpioe.pe4.into_push_pull_output().erase(),
                latch: gpioe.pe5.into_push_pull_output().erase(),
            },

            gates: GatePins {
                left: gpiof.pf0.into_push_pull_output().erase(),
                right: gpiof.pf1.into_push_pull_output().erase(),
                solenoid: gpiof.pf2.into_push_pull_output().erase(),
            },

            buttons: ButtonPins {
                start: gpiog.pg0.into_pull_up_input().erase(),
                mode: gpiog.pg1.into_pull_up_input().erase(),
                left_trigger: gpiog.pg2.into_pull_up_input().erase(),
                right_trigger: gpiog.pg3.into_pull_up_input().erase(),
            },
        }
    }
}

/// Finish-line beam sensors. Both sit on EXTI lines 5-9.
pub struct SensorPins {
    pub left: gpiof::PF8<Input<Floating>>,
    pub right: gpiof::PF9<Input<Floating>>,
}

/// MC14543 latches behind a 74HC238 digit decoder.
pub struct DisplayPins {
    pub address: [OutPin; 3],
    pub bcd: [OutPin; 4],
    pub decimal: OutPin,
    pub enable_left: OutPin,
    pub enable_right: OutPin,
}

/// All Finish node pins.
pub struct FinishPins {
    pub status: gpiob::PB0<Output<PushPull>>,
    pub link: LinkPins,
    pub sensors: SensorPins,
    pub display: DisplayPins,
}

impl FinishPins {
    pub fn new(
        gpiob: pac::GPIOB,
        gpiod: pac::GPIOD,
        gpioe: pac::GPIOE,
        gpiof: pac::GPIOF,
        gpiog: pac::GPIOG,
    ) -> Self {
        let gpiob = gpiob.split();
        let gpiod = gpiod.split();
        let gpioe = gpioe.split();
        let gpiof = gpiof.split();
        let gpiog = gpiog.split();

        Self {
            status: gpiob.pb0.into_push_pull_output(),

            link: LinkPins {
                tx: gpiod.pd5.into_alternate::<7>(),
                rx: gpiod.pd6.into_alternate::<7>(),
            },

            sensors: SensorPins {
                left: gpiof.pf8.into_floating_input(),
                right: gpiof.pf9.into_floating_input(),
            },

            display: DisplayPins {
                address: [
                    gpioe.pe7.into_push_pull_output().erase(),
                    gpioe.pe8.into_push_pull_output().erase(),
                    gpioe.pe10.into_push_pull_output().erase(),
                ],
                bcd: [
                    gpioe.pe12.into_push_pull_output().erase(),
                    gpioe.pe13.into_push_pull_output().erase(),
                    gpioe.pe14.into_push_pull_output().erase(),
                    gpioe.pe15.into_push_pull_output().erase(),
                ],
                decimal: gpioe.pe11.into_push_pull_output().erase(),
                enable_left: gpiog.pg4.into_push_pull_output().erase(),
                enable_right: gpiog.pg5.into_push_pull_output().erase(),
            },
        }
    }
}
