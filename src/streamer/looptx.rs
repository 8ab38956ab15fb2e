//! Loop transmit controller over device replay memory

use tracing::{debug, info, warn};

use crate::config::StreamConfig;
use crate::session::{AppliedArgs, StreamingSession};
use crate::transport::{Direction, ReplayDevice, ReplayStream};
use crate::types::{LoopPhase, TimeSpec, TxMetadata};
use crate::{Result, StreamError};

/// Drives `Empty -> Recorded -> Playing -> Recorded` for one replay streamer.
///
/// The signal is uploaded once with [`set_signal`](Self::set_signal) and then
/// played back in a loop by the device until [`stop`](Self::stop). A stored
/// signal survives a stop and can be played again.
///
/// ```rust
/// # #[cfg(feature = "benchmark")]
/// # fn main() -> radiostream::Result<()> {
/// use radiostream::args::ArgBlockWriter;
/// use radiostream::config::StreamConfig;
/// use radiostream::streamer::LoopTransmitter;
/// use radiostream::test_utils::MockDevice;
///
/// let mut device = MockDevice::new(1, 1);
/// let mut tx = LoopTransmitter::open(&mut device, vec![0], StreamConfig::default())?;
///
/// let signal = vec![0u32; 4096];
/// assert_eq!(tx.set_signal(&[&signal[..]], signal.len())?, 4096);
/// tx.start(&ArgBlockWriter::new().command_time(2_000_000_000).finish())?;
/// tx.stop()?;
/// # Ok(())
/// # }
/// # #[cfg(not(feature = "benchmark"))]
/// # fn main() {}
/// ```
pub struct LoopTransmitter<P: ReplayStream> {
    transport: P,
    session: StreamingSession,
    phase: LoopPhase,
    config: StreamConfig,
    recorded_samples: usize,
}

impl<P: ReplayStream> LoopTransmitter<P> {
    /// Wrap an already created replay transport.
    pub fn new(transport: P, session: StreamingSession, config: StreamConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { transport, session, phase: LoopPhase::Empty, config, recorded_samples: 0 })
    }

    /// Validate `channels` against the device and create a replay streamer for them.
    pub fn open<D>(device: &mut D, channels: Vec<usize>, config: StreamConfig) -> Result<Self>
    where
        D: ReplayDevice<Replay = P>,
    {
        let session = StreamingSession::new(channels, device.num_channels(Direction::Transmit))?;
        let transport = device.replay_stream(session.channels())?;
        debug!(channels = ?session.channels(), "Opened replay streamer");
        Self::new(transport, session, config)
    }

    /// Upload `sample_count` samples from each channel buffer as the loop signal.
    ///
    /// The whole signal goes out in one call bounded by the record timeout.
    /// Returns the number of samples stored. If the transport takes fewer than
    /// `sample_count` the upload is an error and no signal is considered stored.
    pub fn set_signal(&mut self, buffers: &[&[P::Sample]], sample_count: usize) -> Result<usize> {
        if self.phase == LoopPhase::Playing {
            return Err(StreamError::invalid_state("record a loop signal", self.phase));
        }
        if sample_count == 0 {
            return Err(StreamError::invalid_argument(
                "loop signal",
                "a loop signal needs at least one sample",
            ));
        }

        self.check_buffers(buffers, sample_count)?;

        // Replay memory is overwritten from the first sample on.
        self.phase = LoopPhase::Empty;
        self.recorded_samples = 0;

        let accepted = self.transport.record(
            buffers,
            sample_count,
            &TxMetadata::whole_burst(),
            self.config.record_timeout(),
        )?;
        if accepted != sample_count {
            warn!(requested = sample_count, accepted, "Loop signal upload incomplete");
            return Err(StreamError::transport_failed(format!(
                "replay memory took {} of {} samples",
                accepted, sample_count
            )));
        }

        self.phase = LoopPhase::Recorded;
        self.recorded_samples = accepted;
        info!(samples = accepted, "Loop signal recorded");
        Ok(accepted)
    }

    /// Schedule the next [`start`](Self::start) from a block's command time.
    ///
    /// Legal in every phase. The time stays pending until a start consumes it.
    pub fn set_next_command_time(&mut self, optional_args: &[u8]) -> Result<AppliedArgs> {
        let applied = self.session.apply_optional_args(optional_args)?;
        if let Some(time) = applied.time {
            debug!(%time, "Next loop start scheduled");
        }
        Ok(applied)
    }

    /// Start looping the recorded signal, now or at the scheduled time.
    ///
    /// A command time in `optional_args` takes precedence over one set with
    /// [`set_next_command_time`](Self::set_next_command_time). The block and the
    /// pending time are only consumed once the transport accepts the play
    /// command. Returns the time playback was scheduled for.
    pub fn start(&mut self, optional_args: &[u8]) -> Result<Option<TimeSpec>> {
        if self.phase != LoopPhase::Recorded {
            return Err(StreamError::invalid_state("start looping", self.phase));
        }

        let staged = self.session.stage_optional_args(optional_args)?;
        let time = self.session.effective_time(&staged);
        self.transport.play(time, true)?;
        self.session.commit(staged);
        self.session.take_pending_time();

        match time {
            Some(time) => info!(%time, samples = self.recorded_samples, "Loop playback scheduled"),
            None => info!(samples = self.recorded_samples, "Loop playback started"),
        }

        self.phase = LoopPhase::Playing;
        Ok(time)
    }

    /// Stop playback. The recorded signal is kept for another start.
    pub fn stop(&mut self) -> Result<()> {
        if self.phase != LoopPhase::Playing {
            return Err(StreamError::invalid_state("stop looping", self.phase));
        }

        self.transport.stop()?;
        self.phase = LoopPhase::Recorded;
        debug!("Loop playback stopped");
        Ok(())
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn session(&self) -> &StreamingSession {
        &self.session
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn transport(&self) -> &P {
        &self.transport
    }

    /// Samples per channel of the stored signal; 0 when nothing is stored.
    pub fn recorded_samples(&self) -> usize {
        self.recorded_samples
    }

    fn check_buffers(&self, buffers: &[&[P::Sample]], sample_count: usize) -> Result<()> {
        if buffers.len() != self.session.num_channels() {
            return Err(StreamError::invalid_argument(
                "loop signal",
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
                "loop signal",
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

impl<P: ReplayStream> Drop for LoopTransmitter<P> {
    fn drop(&mut self) {
        if self.phase == LoopPhase::Playing {
            warn!("Replay streamer dropped while the device is still looping");
        }
    }
}
