//! Domain-specific newtypes for type safety.
//!
//! This module provides strongly-typed wrappers for the identifiers and
//! durations that flow through the playback tracker, so a device number can
//! never be passed where a track id is expected. Uses `derive_more` to
//! eliminate arithmetic boilerplate while maintaining zero-cost abstractions.

use std::fmt;
use std::ops::{AddAssign, Sub, SubAssign};

use derive_more::{Add as DeriveAdd, Display, From, Into};
use serde::{Deserialize, Serialize};

// ============================================================================
// DeviceId
// ============================================================================

/// Player number of a device on the network (CDJs are usually 1-4).
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    From,
    Into,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct DeviceId(pub u8);

impl DeviceId {
    /// Create a new device id.
    #[must_use]
    pub const fn new(number: u8) -> Self {
        Self(number)
    }

    /// Get the raw player number.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

// ============================================================================
// TrackId
// ============================================================================

/// Identifier of the track loaded on a device (the rekordbox id).
///
/// Zero means "nothing identified yet".
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    From,
    Into,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct TrackId(pub u32);

impl TrackId {
    /// Create a new track id.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw id.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Check if this is the "nothing identified" id.
    #[must_use]
    pub const fn is_unset(self) -> bool {
        self.0 == 0
    }
}

// ============================================================================
// Milliseconds
// ============================================================================

/// A duration in milliseconds.
///
/// Used for accumulated play time, snapshot timestamps and thresholds.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    DeriveAdd,
    From,
    Into,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct Milliseconds(pub i64);

impl Milliseconds {
    /// Create a new instance.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the inner value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Check if the value is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Whole seconds, truncated toward zero.
    #[must_use]
    pub const fn whole_secs(self) -> i64 {
        self.0 / 1000
    }

    /// Convert to seconds as a floating point value.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Create from seconds.
    #[must_use]
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs * 1000)
    }

    /// Convert to a std `Duration`, clamping negative values to zero.
    #[must_use]
    pub fn to_std(self) -> std::time::Duration {
        std::time::Duration::from_millis(u64::try_from(self.0).unwrap_or(0))
    }
}

impl Sub for Milliseconds {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Milliseconds {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl AddAssign for Milliseconds {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl fmt::Display for Milliseconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ms", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod device_id {
        use super::*;

        #[test]
        fn display_and_conversions() {
            let device = DeviceId::new(3);
            assert_eq!(device.get(), 3);
            assert_eq!(format!("{device}"), "3");

            let from_raw: DeviceId = 2u8.into();
            assert_eq!(from_raw, DeviceId(2));
        }

        #[test]
        fn ordering() {
            assert!(DeviceId(1) < DeviceId(4));
        }
    }

    mod track_id {
        use super::*;

        #[test]
        fn unset() {
            assert!(TrackId::default().is_unset());
            assert!(!TrackId::new(100).is_unset());
        }

        #[test]
        fn serde_is_transparent() {
            let json = serde_json::to_string(&TrackId(42)).unwrap();
            assert_eq!(json, "42");
        }
    }

    mod milliseconds {
        use super::*;

        #[test]
        fn basic_operations() {
            let ms = Milliseconds::new(5000);
            assert_eq!(ms.get(), 5000);
            assert!(!ms.is_zero());
            assert!(Milliseconds::default().is_zero());
        }

        #[test]
        fn whole_secs_truncates() {
            assert_eq!(Milliseconds::new(15_999).whole_secs(), 15);
            assert_eq!(Milliseconds::new(16_000).whole_secs(), 16);
        }

        #[test]
        fn display() {
            assert_eq!(format!("{}", Milliseconds::new(1200)), "1200 ms");
        }

        #[test]
        fn arithmetic() {
            let a = Milliseconds::new(1000);
            let b = Milliseconds::new(500);

            assert_eq!(a + b, Milliseconds::new(1500));
            assert_eq!(a - b, Milliseconds::new(500));

            let mut c = Milliseconds::new(1000);
            c += Milliseconds::new(300);
            assert_eq!(c, Milliseconds::new(1300));
            c -= Milliseconds::new(200);
            assert_eq!(c, Milliseconds::new(1100));
        }

        #[test]
        fn to_std_clamps_negative() {
            assert_eq!(Milliseconds::new(-5).to_std(), std::time::Duration::ZERO);
            assert_eq!(
                Milliseconds::from_secs(2).to_std(),
                std::time::Duration::from_secs(2)
            );
        }
    }
}
