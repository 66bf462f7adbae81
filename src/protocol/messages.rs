// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Message catalog for the node-to-node link.
//!
//! Each message is a one-byte id followed by a payload whose length is fixed per id. There is no
//! length prefix, so the payload table in [`MsgId::payload_len`] is what delimits frames on the
//! wire. Multi-byte payloads are little-endian.

use core::fmt;

use crate::config::UID_LEN;
use crate::error::ErrorCode;
use crate::race::{Lane, RaceMode, RaceState};

/// Sync byte used by the checksummed framing.
pub const START_BYTE: u8 = 0xA5;

/// Largest payload in the catalog.
pub const MAX_PAYLOAD: usize = 4;

/// Number of message ids, and the size of any per-id table.
pub const MSG_COUNT: usize = 16;

/// Car transponder UID.
pub type Uid = [u8; UID_LEN];

/// Reaction value meaning "nothing pending".
pub const NO_REACTION: i32 = -1;

/// One-byte message identifier.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MsgId {
    Null = 0,
    Ack = 1,
    Nack = 2,
    RaceMode = 3,
    RaceState = 4,
    RaceStart = 5,
    Error = 6,
    LeftReact = 7,
    RightReact = 8,
    LeftResult = 9,
    RightResult = 10,
    Foul = 11,
    Winner = 12,
    DisplayAdvance = 13,
    LeftCarId = 14,
    RightCarId = 15,
}

impl MsgId {
    /// Map a raw id byte. Returns `None` for bytes outside the catalog.
    pub const fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::Null,
            1 => Self::Ack,
            2 => Self::Nack,
            3 => Self::RaceMode,
            4 => Self::RaceState,
            5 => Self::RaceStart,
            6 => Self::Error,
            7 => Self::LeftReact,
            8 => Self::RightReact,
            9 => Self::LeftResult,
            10 => Self::RightResult,
            11 => Self::Foul,
            12 => Self::Winner,
            13 => Self::DisplayAdvance,
            14 => Self::LeftCarId,
            15 => Self::RightCarId,
            _ => return None,
        })
    }

    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Fixed payload length following the id byte.
    pub const fn payload_len(self) -> usize {
        match self {
            Self::RaceMode
            | Self::RaceState
            | Self::RaceStart
            | Self::Foul
            | Self::Winner
            | Self::Ack
            | Self::Nack
            | Self::Error => 1,
            Self::LeftCarId | Self::RightCarId => UID_LEN,
            Self::LeftReact | Self::RightReact => 4,
            Self::DisplayAdvance | Self::Null | Self::LeftResult | Self::RightResult => 0,
        }
    }

    /// Reaction-time id for a lane.
    pub const fn react(lane: Lane) -> Self {
        match lane {
            Lane::Left => Self::LeftReact,
            Lane::Right => Self::RightReact,
        }
    }

    /// Car-id id for a lane.
    pub const fn car_id(lane: Lane) -> Self {
        match lane {
            Lane::Left => Self::LeftCarId,
            Lane::Right => Self::RightCarId,
        }
    }
}

/// Race start bitmask.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StartMask(pub u8);

impl StartMask {
    pub const RACE: u8 = 0b0001;
    pub const LEFT: u8 = 0b0010;
    pub const RIGHT: u8 = 0b0100;

    /// The plain "race started" signal.
    pub const fn race() -> Self {
        Self(Self::RACE)
    }

    #[inline]
    pub const fn is_race(self) -> bool {
        self.0 & Self::RACE != 0
    }

    #[inline]
    pub const fn is_lane(self, lane: Lane) -> bool {
        match lane {
            Lane::Left => self.0 & Self::LEFT != 0,
            Lane::Right => self.0 & Self::RIGHT != 0,
        }
    }
}

/// Foul bitmask: bit0 left, bit1 right.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FoulMask(pub u8);

impl FoulMask {
    pub const LEFT: u8 = 0b0001;
    pub const RIGHT: u8 = 0b0010;

    pub const fn from_flags(left: bool, right: bool) -> Self {
        let mut raw = 0;
        if left {
            raw |= Self::LEFT;
        }
        if right {
            raw |= Self::RIGHT;
        }
        Self(raw)
    }

    #[inline]
    pub const fn is_fouled(self, lane: Lane) -> bool {
        match lane {
            Lane::Left => self.0 & Self::LEFT != 0,
            Lane::Right => self.0 & Self::RIGHT != 0,
        }
    }
}

/// Winner bitmask: bit0 left, bit1 right, bit2 tie.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WinnerMask(pub u8);

impl WinnerMask {
    pub const LEFT: u8 = 0b0001;
    pub const RIGHT: u8 = 0b0010;
    pub const TIE: u8 = 0b0100;

    /// Build the mask from per-lane winner flags. Neither lane winning is a tie.
    pub const fn from_winners(left: bool, right: bool) -> Self {
        let mut raw = 0;
        if left {
            raw |= Self::LEFT;
        }
        if right {
            raw |= Self::RIGHT;
        }
        if !left && !right {
            raw |= Self::TIE;
        }
        Self(raw)
    }

    #[inline]
    pub const fn left(self) -> bool {
        self.0 & Self::LEFT != 0
    }

    #[inline]
    pub const fn right(self) -> bool {
        self.0 & Self::RIGHT != 0
    }

    #[inline]
    pub const fn tie(self) -> bool {
        self.0 & Self::TIE != 0
    }
}

/// Decoded application or control message.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Message {
    /// Positive acknowledge of the referenced raw id.
    Ack(u8),
    /// Negative acknowledge of the referenced raw id.
    Nack(u8),
    RaceMode(RaceMode),
    RaceState(RaceState),
    RaceStart(StartMask),
    Error(ErrorCode),
    /// Signed reaction time in microseconds; [`NO_REACTION`] means none pending.
    Reaction { lane: Lane, micros: i32 },
    CarId { lane: Lane, uid: Uid },
    Foul(FoulMask),
    Winner(WinnerMask),
    DisplayAdvance,
}

impl Message {
    pub const fn id(&self) -> MsgId {
        match self {
            Self::Ack(_) => MsgId::Ack,
            Self::Nack(_) => MsgId::Nack,
            Self::RaceMode(_) => MsgId::RaceMode,
            Self::RaceState(_) => MsgId::RaceState,
            Self::RaceStart(_) => MsgId::RaceStart,
            Self::Error(_) => MsgId::Error,
            Self::Reaction { lane, .. } => MsgId::react(*lane),
            Self::CarId { lane, .. } => MsgId::car_id(*lane),
            Self::Foul(_) => MsgId::Foul,
            Self::Winner(_) => MsgId::Winner,
            Self::DisplayAdvance => MsgId::DisplayAdvance,
        }
    }

    /// Write the payload into `out`, returning the number of bytes used.
    pub fn write_payload(&self, out: &mut [u8; MAX_PAYLOAD]) -> usize {
        match *self {
            Self::Ack(id) | Self::Nack(id) => out[0] = id,
            Self::RaceMode(mode) => out[0] = mode.as_u8(),
            Self::RaceState(state) => out[0] = state.as_u8(),
            Self::RaceStart(mask) => out[0] = mask.0,
            Self::Error(code) => out[0] = code.as_u8(),
            Self::Reaction { micros, .. } => *out = micros.to_le_bytes(),
            Self::CarId { uid, .. } => out[..UID_LEN].copy_from_slice(&uid),
            Self::Foul(mask) => out[0] = mask.0,
            Self::Winner(mask) => out[0] = mask.0,
            Self::DisplayAdvance => {}
        }
        self.id().payload_len()
    }

    /// Decode a complete frame. `payload` must be exactly `payload_len` bytes for `id`.
    pub fn decode(id: u8, payload: &[u8]) -> Result<Self, DecodeError> {
        let msg_id = MsgId::from_u8(id).ok_or(DecodeError::UnknownId(id))?;
        if payload.len() != msg_id.payload_len() {
            return Err(DecodeError::InvalidPayload(id));
        }
        let byte = payload.first().copied().unwrap_or(0);

        let msg = match msg_id {
            MsgId::Ack => Self::Ack(byte),
            MsgId::Nack => Self::Nack(byte),
            MsgId::RaceMode => {
                Self::RaceMode(RaceMode::from_u8(byte).ok_or(DecodeError::InvalidPayload(id))?)
            }
            MsgId::RaceState => {
                Self::RaceState(RaceState::from_u8(byte).ok_or(DecodeError::InvalidPayload(id))?)
            }
            MsgId::RaceStart => Self::RaceStart(StartMask(byte)),
            MsgId::Error => {
                Self::Error(ErrorCode::from_u8(byte).ok_or(DecodeError::InvalidPayload(id))?)
            }
            MsgId::LeftReact | MsgId::RightReact => {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(payload);
                let lane = if msg_id == MsgId::LeftReact {
                    Lane::Left
                } else {
                    Lane::Right
                };
                Self::Reaction {
                    lane,
                    micros: i32::from_le_bytes(raw),
                }
            }
            MsgId::LeftCarId | MsgId::RightCarId => {
                let mut uid = [0u8; UID_LEN];
                uid.copy_from_slice(payload);
                let lane = if msg_id == MsgId::LeftCarId {
                    Lane::Left
                } else {
                    Lane::Right
                };
                Self::CarId { lane, uid }
            }
            MsgId::Foul => Self::Foul(FoulMask(byte)),
            MsgId::Winner => Self::Winner(WinnerMask(byte)),
            MsgId::DisplayAdvance => Self::DisplayAdvance,
            MsgId::Null | MsgId::LeftResult | MsgId::RightResult => {
                return Err(DecodeError::Unhandled(id))
            }
        };
        Ok(msg)
    }
}

/// Why a frame could not be turned into a [`Message`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Id byte outside the catalog.
    UnknownId(u8),
    /// Id is in the catalog but carries no application meaning.
    Unhandled(u8),
    /// Payload length or value is not valid for the id.
    InvalidPayload(u8),
}

impl DecodeError {
    /// Raw id the error refers to, echoed back in the negative acknowledge.
    pub const fn id(self) -> u8 {
        match self {
            Self::UnknownId(id) | Self::Unhandled(id) | Self::InvalidPayload(id) => id,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownId(id) => write!(f, "unknown message id {:#04x}", id),
            Self::Unhandled(id) => write!(f, "unhandled message id {:#04x}", id),
            Self::InvalidPayload(id) => write!(f, "invalid payload for message id {:#04x}", id),
        }
    }
}
