// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

pub mod framing;
pub mod messages;
pub mod parser;

pub use framing::{FixedLengthFraming, FrameBuf, FrameEvent, Framing, RawFrame};
pub use messages::{
    DecodeError, FoulMask, Message, MsgId, StartMask, Uid, WinnerMask, MSG_COUNT, NO_REACTION,
};
pub use parser::ChecksumParser;
