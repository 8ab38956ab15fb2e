//! Continuous receive controller

use tracing::{debug, info, trace, warn};

use crate::config::StreamConfig;
use crate::session::StreamingSession;
use crate::transport::{Device, Direction, RxStream};
use crate::types::{ReceivePhase, RxErrorCode, RxMetadata, StreamCommand};
use crate::{Result, StreamError};

/// Summary of the post-stop drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    /// Non-empty reads performed before the transport ran dry
    pub reads: usize,
    /// Samples per channel thrown away
    pub discarded_samples: u64,
}

/// Drives `Stopped -> Streaming -> Draining -> Stopped` for one receive streamer.
///
/// After a stop command the transport keeps delivering samples it had
/// already buffered. [`stop`](Self::stop) reads and discards them until a read
/// comes back empty, so that a later [`start`](Self::start) never sees stale data.
pub struct ContinuousReceiver<R: RxStream> {
    transport: R,
    session: StreamingSession,
    phase: ReceivePhase,
    config: StreamConfig,
    metadata: RxMetadata,
    scratch: Vec<Vec<R::Sample>>,
    samples_received: u64,
}

impl<R: RxStream> ContinuousReceiver<R> {
    /// Wrap an already created transport.
    pub fn new(transport: R, session: StreamingSession, config: StreamConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            transport,
            session,
            phase: ReceivePhase::Stopped,
            config,
            metadata: RxMetadata::default(),
            scratch: Vec::new(),
            samples_received: 0,
        })
    }

    /// Validate `channels` against the device and create a receive streamer for them.
    pub fn open<D>(device: &mut D, channels: Vec<usize>, config: StreamConfig) -> Result<Self>
    where
        D: Device<Rx = R>,
    {
        let session = StreamingSession::new(channels, device.num_channels(Direction::Receive))?;
        let transport = device.rx_stream(session.channels())?;
        debug!(channels = ?session.channels(), "Opened receive streamer");
        Self::new(transport, session, config)
    }

    /// Start streaming, now or at the command time carried by `optional_args`.
    ///
    /// Returns the command issued to the transport. The block is only folded
    /// into the session once the transport has accepted the command, so a
    /// rejected start leaves the pending time and the channel scope as they were.
    pub fn start(&mut self, optional_args: &[u8]) -> Result<StreamCommand> {
        if self.phase != ReceivePhase::Stopped {
            return Err(StreamError::invalid_state("start receiving", self.phase));
        }

        let staged = self.session.stage_optional_args(optional_args)?;
        let command = StreamCommand::start_continuous(self.session.effective_time(&staged));
        self.transport.issue_stream_cmd(&command)?;
        self.session.commit(staged);
        self.session.take_pending_time();

        match command.time {
            Some(time) => info!(%time, "Receive stream scheduled"),
            None => debug!("Receive stream started"),
        }

        self.phase = ReceivePhase::Streaming;
        self.metadata = RxMetadata::default();
        self.samples_received = 0;
        Ok(command)
    }

    /// Read up to `max_samples` into each channel buffer.
    ///
    /// Blocks for at most the configured receive timeout. Zero samples means
    /// nothing has arrived yet, which is not an error.
    pub fn poll(&mut self, buffers: &mut [&mut [R::Sample]], max_samples: usize) -> Result<usize> {
        if self.phase != ReceivePhase::Streaming {
            return Err(StreamError::invalid_state("poll", self.phase));
        }

        self.check_buffers(buffers, max_samples)?;

        let received = self.transport.recv(
            buffers,
            max_samples,
            &mut self.metadata,
            self.config.recv_timeout(),
        )?;
        if received > max_samples {
            return Err(StreamError::transport_failed(format!(
                "transport reported {} samples received into {}-sample buffers",
                received, max_samples
            )));
        }

        if self.metadata.error == RxErrorCode::Overflow {
            warn!(received, "Receive overflow, samples were dropped");
        }

        self.samples_received += received as u64;
        trace!(received, time = ?self.metadata.time, "Poll complete");
        Ok(received)
    }

    /// Stop streaming and flush whatever the transport still holds.
    ///
    /// From `Streaming` this issues the stop command first. From `Draining`
    /// (a previous drain failed or hit `max_drain_reads`) it resumes the drain.
    pub fn stop(&mut self) -> Result<DrainReport> {
        match self.phase {
            ReceivePhase::Stopped => Err(StreamError::invalid_state("stop", self.phase)),
            ReceivePhase::Streaming => {
                self.transport.issue_stream_cmd(&StreamCommand::stop_continuous())?;
                self.phase = ReceivePhase::Draining;
                debug!(samples = self.samples_received, "Receive stream stopped, draining");
                self.drain()
            }
            ReceivePhase::Draining => self.drain(),
        }
    }

    fn drain(&mut self) -> Result<DrainReport> {
        let channels = self.session.num_channels();
        let chunk = self.config.drain_chunk_samples;
        if self.scratch.len() != channels || self.scratch.iter().any(|b| b.len() != chunk) {
            self.scratch = vec![vec![R::Sample::default(); chunk]; channels];
        }

        let timeout = self.config.drain_timeout();
        let mut metadata = RxMetadata::default();
        let mut report = DrainReport::default();

        while report.reads < self.config.max_drain_reads {
            let mut buffers: Vec<&mut [R::Sample]> =
                self.scratch.iter_mut().map(|b| b.as_mut_slice()).collect();
            let received = self.transport.recv(&mut buffers, chunk, &mut metadata, timeout)?;

            if received == 0 {
                self.phase = ReceivePhase::Stopped;
                if report.discarded_samples > 0 {
                    info!(
                        reads = report.reads,
                        discarded = report.discarded_samples,
                        "Drained buffered samples"
                    );
                }
                return Ok(report);
            }

            report.reads += 1;
            report.discarded_samples += received as u64;
        }

        warn!(reads = report.reads, "Drain did not settle");
        Err(StreamError::DrainIncomplete { reads: report.reads })
    }

    pub fn phase(&self) -> ReceivePhase {
        self.phase
    }

    pub fn session(&self) -> &StreamingSession {
        &self.session
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn transport(&self) -> &R {
        &self.transport
    }

    /// Metadata of the most recent poll.
    pub fn last_metadata(&self) -> &RxMetadata {
        &self.metadata
    }

    /// Samples per channel received since the stream was started.
    pub fn samples_received(&self) -> u64 {
        self.samples_received
    }

    fn check_buffers(&self, buffers: &[&mut [R::Sample]], max_samples: usize) -> Result<()> {
        if buffers.len() != self.session.num_channels() {
            return Err(StreamError::invalid_argument(
                "receive buffers",
                format!(
                    "expected {} channel buffers, got {}",
                    self.session.num_channels(),
                    buffers.len()
                ),
            ));
        }
        if let Some((channel, short)) =
            buffers.iter().enumerate().find(|(_, buffer)| buffer.len() < max_samples)
        {
            return Err(StreamError::invalid_argument(
                "receive buffers",
                format!(
                    "channel {} buffer holds {} samples, {} requested",
                    channel,
                    short.len(),
                    max_samples
                ),
            ));
        }
        Ok(())
    }
}

impl<R: RxStream> Drop for ContinuousReceiver<R> {
    fn drop(&mut self) {
        if self.phase != ReceivePhase::Stopped {
            warn!(phase = %self.phase, "Receive streamer dropped while not stopped");
        }
    }
}
