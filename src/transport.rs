//! Collaborator traits for the radio driver
//!
//! The controllers in [`crate::streamer`] never talk to hardware directly.
//! They drive these traits, which a driver binding implements on top of the
//! vendor library. Every blocking call takes a finite, caller-supplied
//! timeout.

use std::time::Duration;

use crate::Result;
use crate::types::{RxMetadata, StreamCommand, TimeSpec, TxMetadata};

/// Signal direction of a streamer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Transmit,
    Receive,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Transmit => f.write_str("tx"),
            Direction::Receive => f.write_str("rx"),
        }
    }
}

/// Transmit half of the sample transport for one group of channels.
pub trait TxStream: Send {
    /// Sample element type. Payloads are passed through untouched.
    type Sample: Copy + Send + 'static;

    /// Send up to `sample_count` samples from each channel buffer.
    ///
    /// Returns the number of samples the transport accepted, which may be
    /// fewer than requested (including zero on a timeout).
    fn send(
        &mut self,
        buffers: &[&[Self::Sample]],
        sample_count: usize,
        metadata: &TxMetadata,
        timeout: Duration,
    ) -> Result<usize>;
}

/// Receive half of the sample transport for one group of channels.
pub trait RxStream: Send {
    /// Sample element type. Payloads are passed through untouched.
    type Sample: Copy + Default + Send + 'static;

    /// Start, stop or schedule the stream.
    fn issue_stream_cmd(&mut self, command: &StreamCommand) -> Result<()>;

    /// Receive up to `max_samples` into each channel buffer.
    ///
    /// Returns the number of samples written per channel; 0 means nothing
    /// arrived within `timeout`.
    fn recv(
        &mut self,
        buffers: &mut [&mut [Self::Sample]],
        max_samples: usize,
        metadata: &mut RxMetadata,
        timeout: Duration,
    ) -> Result<usize>;
}

/// Replay memory on the device: a signal is uploaded once and then played
/// back in a loop without further host traffic.
pub trait ReplayStream: Send {
    /// Sample element type. Payloads are passed through untouched.
    type Sample: Copy + Send + 'static;

    /// Upload `sample_count` samples from each channel buffer into replay memory.
    ///
    /// Returns the number of samples the transport accepted. Anything short
    /// of `sample_count` leaves the memory holding a truncated signal.
    fn record(
        &mut self,
        buffers: &[&[Self::Sample]],
        sample_count: usize,
        metadata: &TxMetadata,
        timeout: Duration,
    ) -> Result<usize>;

    /// Play the recorded signal, immediately or at `time`.
    fn play(&mut self, time: Option<TimeSpec>, repeat: bool) -> Result<()>;

    /// Stop playback. The recorded signal stays in memory.
    fn stop(&mut self) -> Result<()>;
}

/// A radio that hands out streamers for subsets of its channels.
pub trait Device {
    type Tx: TxStream;
    type Rx: RxStream;

    /// Number of channels available in `direction`. Valid indices are `0..n`.
    fn num_channels(&self, direction: Direction) -> usize;

    /// Create a transmit streamer over `channels`, already validated.
    fn tx_stream(&mut self, channels: &[usize]) -> Result<Self::Tx>;

    /// Create a receive streamer over `channels`, already validated.
    fn rx_stream(&mut self, channels: &[usize]) -> Result<Self::Rx>;
}

/// Device clock access used to establish the epoch that command times refer to.
pub trait ClockControl {
    /// Set the device time that will be latched on the next PPS edge.
    fn set_time_next_pps(&mut self, time: TimeSpec) -> Result<()>;

    /// Device time latched at the most recent PPS edge.
    fn time_last_pps(&self) -> Result<TimeSpec>;

    /// Set the device time on a PPS edge without first aligning to it.
    fn set_time_unknown_pps(&mut self, time: TimeSpec) -> Result<()>;
}

/// A radio with on-board replay memory behind its transmit channels.
pub trait ReplayDevice: Device {
    type Replay: ReplayStream;

    /// Create a replay streamer over transmit `channels`, already validated.
    fn replay_stream(&mut self, channels: &[usize]) -> Result<Self::Replay>;
}
