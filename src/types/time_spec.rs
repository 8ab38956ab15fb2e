//! Device clock timestamps

use std::fmt;

use crate::{Result, StreamError};

/// Nanoseconds per second
pub const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Absolute device time as whole seconds plus a fractional second.
///
/// This is the representation the hardware clock interface works in. The
/// argument protocol carries plain nanosecond counters instead; [`TimeSpec::from_nanos`]
/// and [`TimeSpec::to_nanos`] convert between the two without losing a nanosecond
/// anywhere in `[0, 2^63)`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct TimeSpec {
    full_secs: i64,
    frac_secs: f64,
}

impl TimeSpec {
    /// Time zero of the device epoch
    pub const ZERO: TimeSpec = TimeSpec { full_secs: 0, frac_secs: 0.0 };

    /// Build a timestamp from whole and fractional seconds.
    ///
    /// Device time is monotonic and never negative, so `full_secs < 0` is
    /// rejected. `frac_secs` must be finite and within `[0, 1)`.
    pub fn new(full_secs: i64, frac_secs: f64) -> Result<Self> {
        if full_secs < 0 {
            return Err(StreamError::invalid_argument(
                "timestamp",
                format!("whole seconds must be non-negative, got {}", full_secs),
            ));
        }
        if !frac_secs.is_finite() || !(0.0..1.0).contains(&frac_secs) {
            return Err(StreamError::invalid_argument(
                "timestamp",
                format!("fractional seconds must be within [0, 1), got {}", frac_secs),
            ));
        }
        Ok(Self { full_secs, frac_secs })
    }

    /// Split a nanosecond counter into whole and fractional seconds.
    ///
    /// Integer division happens before the float conversion so large second
    /// counts do not eat into the fraction's precision.
    pub fn from_nanos(nsecs: u64) -> Self {
        let full_secs = (nsecs / NANOS_PER_SEC) as i64;
        let frac_secs = (nsecs % NANOS_PER_SEC) as f64 / NANOS_PER_SEC as f64;
        Self { full_secs, frac_secs }
    }

    /// Build a timestamp from floating point seconds.
    pub fn from_secs_f64(secs: f64) -> Result<Self> {
        if !secs.is_finite() || secs < 0.0 || secs >= i64::MAX as f64 {
            return Err(StreamError::invalid_argument(
                "timestamp",
                format!("seconds out of range: {}", secs),
            ));
        }
        let full = secs.floor();
        Self::new(full as i64, secs - full)
    }

    /// Convert back to a nanosecond counter, rounding the fraction to the
    /// nearest nanosecond.
    pub fn to_nanos(&self) -> Result<u64> {
        let whole = u64::try_from(self.full_secs).map_err(|_| {
            StreamError::invalid_argument(
                "timestamp",
                format!("whole seconds must be non-negative, got {}", self.full_secs),
            )
        })?;
        let frac = (self.frac_secs * NANOS_PER_SEC as f64).round() as u64;

        whole.checked_mul(NANOS_PER_SEC).and_then(|n| n.checked_add(frac)).ok_or_else(|| {
            StreamError::invalid_argument(
                "timestamp",
                format!("{} does not fit in a 64-bit nanosecond counter", self),
            )
        })
    }

    /// Whole seconds since the device epoch.
    pub fn full_secs(&self) -> i64 {
        self.full_secs
    }

    /// Fractional part of the second, in `[0, 1)`.
    pub fn frac_secs(&self) -> f64 {
        self.frac_secs
    }

    /// Lossy conversion to floating point seconds, for display and logging.
    pub fn as_secs_f64(&self) -> f64 {
        self.full_secs as f64 + self.frac_secs
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frac_ns = ((self.frac_secs * NANOS_PER_SEC as f64).round() as u64).min(NANOS_PER_SEC - 1);
        write!(f, "{}.{:09}s", self.full_secs, frac_ns)
    }
}

/// Split nanoseconds into `(whole, frac)` seconds.
pub fn to_timestamp(nsecs: u64) -> (i64, f64) {
    let spec = TimeSpec::from_nanos(nsecs);
    (spec.full_secs, spec.frac_secs)
}

/// Inverse of [`to_timestamp`]. Negative or out-of-range inputs are rejected.
pub fn from_timestamp(whole: i64, frac: f64) -> Result<u64> {
    TimeSpec::new(whole, frac)?.to_nanos()
}
