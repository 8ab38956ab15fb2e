//! Burst transmit controller

use tracing::{debug, info, trace, warn};

use crate::config::StreamConfig;
use crate::session::{AppliedArgs, StreamingSession};
use crate::transport::{Device, Direction, TxStream};
use crate::types::{BurstPhase, TxMetadata};
use crate::{Result, StreamError};

/// Outcome of one transmit call.
///
/// A short transfer is not an error: the transport took what it could
/// within the timeout and the caller decides whether to resend the rest or
/// end the burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub requested: usize,
    pub accepted: usize,
}

impl Transfer {
    pub fn is_partial(&self) -> bool {
        self.accepted < self.requested
    }

    /// Samples per channel still to be sent.
    pub fn remaining(&self) -> usize {
        self.requested - self.accepted
    }
}

/// Drives `Idle -> Armed -> InBurst -> Idle` for one transmit streamer.
///
/// A scheduled start passed to [`begin_burst`](Self::begin_burst) is not applied
/// right away. It rides on the first transfer of the burst together with the
/// start-of-burst flag, and is dropped from every later transfer.
///
/// ```rust
/// # #[cfg(feature = "benchmark")]
/// # fn main() -> radiostream::Result<()> {
/// use radiostream::args::ArgBlockWriter;
/// use radiostream::config::StreamConfig;
/// use radiostream::streamer::BurstTransmitter;
/// use radiostream::test_utils::MockDevice;
///
/// let mut device = MockDevice::new(1, 1);
/// let mut tx = BurstTransmitter::open(&mut device, vec![0], StreamConfig::default())?;
///
/// let samples = vec![0u32; 256];
/// tx.begin_burst(&ArgBlockWriter::new().command_time(2_000_000_000).finish())?;
/// let sent = tx.transfer(&[&samples[..]], samples.len())?;
/// assert!(!sent.is_partial());
/// tx.end_burst()?;
/// # Ok(())
/// # }
/// # #[cfg(not(feature = "benchmark"))]
/// # fn main() {}
/// ```
pub struct BurstTransmitter<T: TxStream> {
    transport: T,
    session: StreamingSession,
    phase: BurstPhase,
    config: StreamConfig,
    burst_samples: u64,
}

impl<T: TxStream> BurstTransmitter<T> {
    /// Wrap an already created transport.
    pub fn new(transport: T, session: StreamingSession, config: StreamConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { transport, session, phase: BurstPhase::Idle, config, burst_samples: 0 })
    }

    /// Validate `channels` against the device and create a transmit streamer for them.
    pub fn open<D>(device: &mut D, channels: Vec<usize>, config: StreamConfig) -> Result<Self>
    where
        D: Device<Tx = T>,
    {
        let session = StreamingSession::new(channels, device.num_channels(Direction::Transmit))?;
        let transport = device.tx_stream(session.channels())?;
        debug!(channels = ?session.channels(), "Opened transmit streamer");
        Self::new(transport, session, config)
    }

    /// Open a burst, taking its scheduled start (if any) from `optional_args`.
    pub fn begin_burst(&mut self, optional_args: &[u8]) -> Result<AppliedArgs> {
        if self.phase != BurstPhase::Idle {
            return Err(StreamError::invalid_state("begin a burst", self.phase));
        }

        let applied = self.session.apply_optional_args(optional_args)?;
        let time = self.session.take_pending_time();

        match time {
            Some(time) => info!(%time, "Burst armed for scheduled start"),
            None => debug!("Burst armed for immediate start"),
        }

        self.phase = BurstPhase::Armed(time);
        self.burst_samples = 0;
        Ok(applied)
    }

    /// Send `sample_count` samples from each channel buffer.
    ///
    /// `buffers` holds one slice per streamer channel, each at least
    /// `sample_count` long. The burst moves to `InBurst` once the transport
    /// has accepted at least one sample; until then the start-of-burst flag
    /// and scheduled time are kept for the next attempt.
    pub fn transfer(&mut self, buffers: &[&[T::Sample]], sample_count: usize) -> Result<Transfer> {
        let metadata = match self.phase {
            BurstPhase::Idle => {
                return Err(StreamError::invalid_state("transfer", self.phase));
            }
            BurstPhase::Armed(time) => TxMetadata::start_of_burst(time),
            BurstPhase::InBurst => TxMetadata::continuation(),
        };

        self.check_buffers(buffers, sample_count)?;

        let accepted =
            self.transport.send(buffers, sample_count, &metadata, self.config.send_timeout())?;
        if accepted > sample_count {
            return Err(StreamError::transport_failed(format!(
                "transport reported {} samples sent out of {}",
                accepted, sample_count
            )));
        }

        if accepted > 0 {
            self.phase = BurstPhase::InBurst;
            self.burst_samples += accepted as u64;
        } else {
            warn!(requested = sample_count, "Transport accepted no samples");
        }

        trace!(requested = sample_count, accepted, "Transfer complete");
        Ok(Transfer { requested: sample_count, accepted })
    }

    /// Close the burst with a zero-length end-of-burst marker.
    ///
    /// Legal from `Armed` (an empty burst) and `InBurst`. A scheduled time that
    /// no transfer consumed is discarded.
    pub fn end_burst(&mut self) -> Result<()> {
        if self.phase == BurstPhase::Idle {
            return Err(StreamError::invalid_state("end a burst", self.phase));
        }

        let empty: Vec<&[T::Sample]> =
            (0..self.session.num_channels()).map(|_| &[][..]).collect();
        self.transport.send(&empty, 0, &TxMetadata::end_of_burst(), self.config.send_timeout())?;

        if let BurstPhase::Armed(Some(time)) = self.phase {
            debug!(%time, "Discarding unused scheduled start");
        }
        self.session.take_pending_time();
        self.phase = BurstPhase::Idle;

        debug!(samples = self.burst_samples, "Burst ended");
        Ok(())
    }

    pub fn phase(&self) -> BurstPhase {
        self.phase
    }

    pub fn session(&self) -> &StreamingSession {
        &self.session
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Samples accepted since the current (or last) burst began.
    pub fn burst_samples(&self) -> u64 {
        self.burst_samples
    }

    fn check_buffers(&self, buffers: &[&[T::Sample]], sample_count: usize) -> Result<()> {
        if buffers.len() != self.session.num_channels() {
            return Err(StreamError::invalid_argument(
                "transmit buffers",
                format!(
                    "expected {} channel buffers, got {}",
                    self.session.num_channels(),
                    buffers.len()
                ),
            ));
        }
        if let Some((channel, short)) =
            buffers.iter().enumerate().find(|(_, buffer)| buffer.len() < sample_count)
        {
            return Err(StreamError::invalid_argument(
                "transmit buffers",
                format!(
                    "channel {} buffer holds {} samples, {} requested",
                    channel,
                    short.len(),
                    sample_count
                ),
            ));
        }
        Ok(())
    }
}

impl<T: TxStream> Drop for BurstTransmitter<T> {
    fn drop(&mut self) {
        if self.phase != BurstPhase::Idle {
            warn!(phase = %self.phase, "Transmit streamer dropped without ending its burst");
        }
    }
}
