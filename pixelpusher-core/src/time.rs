// Copyright 2024 pixelpusher Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Clock agnostic points in time.
//!
//! A [Timestamp] counts the time elapsed since the origin of whatever clock produced it, so the pacing and liveness
//! logic never has to reach for the system clock itself.

use core::ops::{Add, Sub};
use core::time::Duration;

/// A point in time, measured from the origin of the clock that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    since_origin: Duration,
}

impl Timestamp {
    /// The origin of the clock.
    pub const ORIGIN: Self = Self {
        since_origin: Duration::ZERO,
    };

    /// A timestamp the given duration after the clock origin.
    pub const fn from_origin(since_origin: Duration) -> Self {
        Self { since_origin }
    }

    /// A timestamp the given number of milliseconds after the clock origin.
    pub const fn from_millis(millis: u64) -> Self {
        Self::from_origin(Duration::from_millis(millis))
    }

    /// Time elapsed between the clock origin and this timestamp.
    pub const fn since_origin(&self) -> Duration {
        self.since_origin
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is actually later.
    pub fn saturating_duration_since(&self, earlier: Self) -> Duration {
        self.since_origin.saturating_sub(earlier.since_origin)
    }

    /// `self + duration`, `None` on overflow.
    pub fn checked_add(self, duration: Duration) -> Option<Self> {
        self.since_origin.checked_add(duration).map(Self::from_origin)
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    /// Saturates at the largest representable timestamp.
    fn add(self, rhs: Duration) -> Self::Output {
        Self::from_origin(self.since_origin.saturating_add(rhs))
    }
}

impl Sub for Timestamp {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        self.saturating_duration_since(rhs)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_timestamp_arithmetic() {
        let t = Timestamp::from_millis(1500);
        assert_eq!(t + Duration::from_millis(500), Timestamp::from_millis(2000));
        assert_eq!(Timestamp::from_millis(2000) - t, Duration::from_millis(500));
        assert_eq!(t - Timestamp::from_millis(2000), Duration::ZERO);
        assert!(Timestamp::ORIGIN < t);
    }

    #[test]
    fn test_timestamp_add_saturates() {
        let end = Timestamp::from_origin(Duration::MAX);
        assert_eq!(end + Duration::from_secs(1), end);
        assert_eq!(end.checked_add(Duration::from_secs(1)), None);
    }
}
