// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Free-running clock access and wraparound-safe interval math.
//!
//! Both clocks are 32-bit counters that wrap: microseconds roughly every 71.6 minutes,
//! milliseconds roughly every 49.7 days. All interval math goes through [`elapsed_us`] /
//! [`elapsed_ms`] so a race that straddles the wrap still measures correctly.

/// Source of the two free-running node clocks.
pub trait Clock {
    /// Free-running microsecond counter.
    fn now_us(&self) -> u32;

    /// Free-running millisecond counter.
    fn now_ms(&self) -> u32;
}

impl<C: Clock> Clock for &C {
    fn now_us(&self) -> u32 {
        (**self).now_us()
    }

    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Microseconds from `start` to `end` on a wrapping 32-bit clock.
///
/// When `end < start` the counter wrapped in between and the result is
/// `(u32::MAX - start) + end + 1`.
#[inline]
pub const fn elapsed_us(start: u32, end: u32) -> u32 {
    if end >= start {
        end - start
    } else {
        (u32::MAX - start) + end + 1
    }
}

/// Milliseconds from `start` to `end` on a wrapping 32-bit clock.
#[inline]
pub const fn elapsed_ms(start: u32, end: u32) -> u32 {
    end.wrapping_sub(start)
}
