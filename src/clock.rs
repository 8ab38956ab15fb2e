//! Device clock helpers
//!
//! Command times are absolute device times. These helpers set up the epoch
//! they refer to and compute start times relative to the last PPS edge.

use std::time::Duration;

use tracing::debug;

use crate::transport::ClockControl;
use crate::types::TimeSpec;
use crate::{Result, StreamError};

/// Zero the device clock on the next PPS edge without waiting to align to it.
pub fn reset_epoch<C: ClockControl + ?Sized>(clock: &mut C) -> Result<()> {
    clock.set_time_unknown_pps(TimeSpec::ZERO)?;
    debug!("Device clock reset to zero");
    Ok(())
}

/// Nanosecond command time `offset` after the most recent PPS edge.
///
/// The result is ready to go into a command-time record.
pub fn start_after_last_pps<C: ClockControl + ?Sized>(clock: &C, offset: Duration) -> Result<u64> {
    let last_pps = clock.time_last_pps()?;
    let base = last_pps.to_nanos()?;
    let offset_nanos = u64::try_from(offset.as_nanos()).map_err(|_| {
        StreamError::invalid_argument(
            "start offset",
            format!("{:?} does not fit in a 64-bit nanosecond counter", offset),
        )
    })?;

    let at = base.checked_add(offset_nanos).ok_or_else(|| {
        StreamError::invalid_argument(
            "start offset",
            format!("{} + {:?} overflows the device clock", last_pps, offset),
        )
    })?;
    debug!(%last_pps, ?offset, at, "Computed start time after last PPS");
    Ok(at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{ArgBlockWriter, ParsedArgs};
    use crate::test_utils::{ClockCall, MockDevice};
    use anyhow::Result;

    #[test]
    fn reset_sets_zero_at_unknown_pps() -> Result<()> {
        let mut device = MockDevice::new(1, 1).with_last_pps(TimeSpec::from_nanos(42));
        reset_epoch(&mut device)?;
        assert_eq!(device.clock_calls(), &[ClockCall::UnknownPps(TimeSpec::ZERO)]);
        assert_eq!(device.time_last_pps()?, TimeSpec::ZERO);
        Ok(())
    }

    #[test]
    fn start_time_is_offset_from_last_pps() -> Result<()> {
        let device = MockDevice::new(1, 1).with_last_pps(TimeSpec::from_nanos(3_000_000_000));
        let at = start_after_last_pps(&device, Duration::from_millis(1500))?;
        assert_eq!(at, 4_500_000_000);

        let parsed = ParsedArgs::parse(&ArgBlockWriter::new().command_time(at).finish())?;
        assert_eq!(parsed.command_time().map(|c| c.nsecs), Some(4_500_000_000));
        Ok(())
    }

    #[test]
    fn overflowing_offset_is_rejected() {
        let device = MockDevice::new(1, 1).with_last_pps(TimeSpec::from_nanos(u64::MAX - 10));
        let err = start_after_last_pps(&device, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, StreamError::InvalidArgument { .. }));
    }
}
