//! In-memory device, transports and clock for tests and benchmarks
//!
//! The mocks record every call they receive and replay a scripted sequence
//! of replies, so controller tests can assert on exactly what reached the
//! transport.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::VecDeque;
use std::time::Duration;

use crate::transport::{
    ClockControl, Device, Direction, ReplayDevice, ReplayStream, RxStream, TxStream,
};
use crate::types::{RxErrorCode, RxMetadata, StreamCommand, TimeSpec, TxMetadata};
use crate::{Result, StreamError};

/// Scripted reply for one transmit call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxReply {
    /// Accept everything requested
    All,
    /// Accept exactly this many samples
    Accept(usize),
    /// Fail with a transport error
    Fail,
}

/// One recorded transmit call.
#[derive(Debug, Clone, PartialEq)]
pub struct SentCall {
    pub channels: usize,
    pub sample_count: usize,
    pub metadata: TxMetadata,
    pub timeout: Duration,
    /// First sample of the first channel, if any was sent
    pub first_sample: Option<u32>,
}

/// Transmit transport that records calls and replays [`TxReply`]s.
///
/// Once the script runs out every call accepts all samples.
#[derive(Debug, Default)]
pub struct MockTxStream {
    script: VecDeque<TxReply>,
    sent: Vec<SentCall>,
}

impl MockTxStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(replies: impl IntoIterator<Item = TxReply>) -> Self {
        Self { script: replies.into_iter().collect(), sent: Vec::new() }
    }

    /// Calls received so far, oldest first, including failed ones.
    pub fn sent(&self) -> &[SentCall] {
        &self.sent
    }
}

impl TxStream for MockTxStream {
    type Sample = u32;

    fn send(
        &mut self,
        buffers: &[&[u32]],
        sample_count: usize,
        metadata: &TxMetadata,
        timeout: Duration,
    ) -> Result<usize> {
        self.sent.push(SentCall {
            channels: buffers.len(),
            sample_count,
            metadata: *metadata,
            timeout,
            first_sample: buffers
                .first()
                .and_then(|b| b.get(..sample_count))
                .and_then(|b| b.first().copied()),
        });

        match self.script.pop_front().unwrap_or(TxReply::All) {
            TxReply::All => Ok(sample_count),
            TxReply::Accept(n) => Ok(n),
            TxReply::Fail => Err(StreamError::transport_failed("mock transmit failure")),
        }
    }
}

/// Scripted reply for one receive read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxReply {
    /// Deliver this many samples, capped at the caller's maximum
    Samples(usize),
    /// Deliver samples and flag an overflow
    Overflow(usize),
    /// Fail with a transport error
    Fail,
}

/// Receive transport that records commands and replays [`RxReply`]s.
///
/// Once the script runs out every read times out with zero samples, unless
/// the stream was built with [`flooding`](Self::flooding).
#[derive(Debug, Default)]
pub struct MockRxStream {
    script: VecDeque<RxReply>,
    flood: bool,
    reject_commands: usize,
    commands: Vec<StreamCommand>,
    reads: Vec<usize>,
    next_sample: u32,
}

impl MockRxStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(replies: impl IntoIterator<Item = RxReply>) -> Self {
        Self { script: replies.into_iter().collect(), ..Self::default() }
    }

    /// Never run dry: every unscripted read fills the whole buffer.
    pub fn flooding(mut self) -> Self {
        self.flood = true;
        self
    }

    /// Reject the next `count` stream commands.
    pub fn rejecting_commands(mut self, count: usize) -> Self {
        self.reject_commands = count;
        self
    }

    /// Commands accepted so far, oldest first.
    pub fn commands(&self) -> &[StreamCommand] {
        &self.commands
    }

    /// Sample counts returned by every successful read.
    pub fn reads(&self) -> &[usize] {
        &self.reads
    }
}

impl RxStream for MockRxStream {
    type Sample = u32;

    fn issue_stream_cmd(&mut self, command: &StreamCommand) -> Result<()> {
        if self.reject_commands > 0 {
            self.reject_commands -= 1;
            return Err(StreamError::transport_failed("mock stream command rejected"));
        }
        self.commands.push(*command);
        Ok(())
    }

    fn recv(
        &mut self,
        buffers: &mut [&mut [u32]],
        max_samples: usize,
        metadata: &mut RxMetadata,
        timeout: Duration,
    ) -> Result<usize> {
        let (count, error) = match self.script.pop_front() {
            Some(RxReply::Samples(n)) => (n.min(max_samples), RxErrorCode::None),
            Some(RxReply::Overflow(n)) => (n.min(max_samples), RxErrorCode::Overflow),
            Some(RxReply::Fail) => {
                return Err(StreamError::transport_failed("mock receive failure"));
            }
            None if self.flood => (max_samples, RxErrorCode::None),
            None => {
                std::thread::sleep(timeout.min(Duration::from_millis(1)));
                (0, RxErrorCode::Timeout)
            }
        };

        for buffer in buffers.iter_mut() {
            for (offset, sample) in buffer[..count].iter_mut().enumerate() {
                *sample = self.next_sample.wrapping_add(offset as u32);
            }
        }

        *metadata = RxMetadata {
            time: (count > 0).then(|| TimeSpec::from_nanos(u64::from(self.next_sample))),
            error,
            more_fragments: false,
        };
        self.next_sample = self.next_sample.wrapping_add(count as u32);
        self.reads.push(count);
        Ok(count)
    }
}

/// One recorded replay-memory call.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayCall {
    Record { channels: usize, sample_count: usize, metadata: TxMetadata, timeout: Duration },
    Play { time: Option<TimeSpec>, repeat: bool },
    Stop,
}

/// Replay memory that records calls and replays [`TxReply`]s for uploads.
///
/// Once the upload script runs out every record call stores everything.
/// Rejected play or stop commands are not recorded.
#[derive(Debug, Default)]
pub struct MockReplayStream {
    record_script: VecDeque<TxReply>,
    reject_plays: usize,
    reject_stops: usize,
    calls: Vec<ReplayCall>,
}

impl MockReplayStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(replies: impl IntoIterator<Item = TxReply>) -> Self {
        Self { record_script: replies.into_iter().collect(), ..Self::default() }
    }

    /// Reject the next `count` play commands.
    pub fn rejecting_plays(mut self, count: usize) -> Self {
        self.reject_plays = count;
        self
    }

    /// Reject the next `count` stop commands.
    pub fn rejecting_stops(mut self, count: usize) -> Self {
        self.reject_stops = count;
        self
    }

    /// Calls received so far, oldest first, including failed uploads.
    pub fn calls(&self) -> &[ReplayCall] {
        &self.calls
    }
}

impl ReplayStream for MockReplayStream {
    type Sample = u32;

    fn record(
        &mut self,
        buffers: &[&[u32]],
        sample_count: usize,
        metadata: &TxMetadata,
        timeout: Duration,
    ) -> Result<usize> {
        self.calls.push(ReplayCall::Record {
            channels: buffers.len(),
            sample_count,
            metadata: *metadata,
            timeout,
        });

        match self.record_script.pop_front().unwrap_or(TxReply::All) {
            TxReply::All => Ok(sample_count),
            TxReply::Accept(n) => Ok(n),
            TxReply::Fail => Err(StreamError::transport_failed("mock record failure")),
        }
    }

    fn play(&mut self, time: Option<TimeSpec>, repeat: bool) -> Result<()> {
        if self.reject_plays > 0 {
            self.reject_plays -= 1;
            return Err(StreamError::transport_failed("mock play rejected"));
        }
        self.calls.push(ReplayCall::Play { time, repeat });
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if self.reject_stops > 0 {
            self.reject_stops -= 1;
            return Err(StreamError::transport_failed("mock stop rejected"));
        }
        self.calls.push(ReplayCall::Stop);
        Ok(())
    }
}

/// One recorded clock call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockCall {
    NextPps(TimeSpec),
    UnknownPps(TimeSpec),
}

/// Device exposing a fixed channel count per direction and a settable clock.
#[derive(Debug, Default)]
pub struct MockDevice {
    tx_channels: usize,
    rx_channels: usize,
    last_pps: TimeSpec,
    clock_calls: Vec<ClockCall>,
    opened: Vec<(Direction, Vec<usize>)>,
}

impl MockDevice {
    pub fn new(tx_channels: usize, rx_channels: usize) -> Self {
        Self { tx_channels, rx_channels, ..Self::default() }
    }

    /// Pretend the last PPS edge latched `time`.
    pub fn with_last_pps(mut self, time: TimeSpec) -> Self {
        self.last_pps = time;
        self
    }

    pub fn clock_calls(&self) -> &[ClockCall] {
        &self.clock_calls
    }

    /// Streamers handed out so far with their channel lists.
    pub fn opened(&self) -> &[(Direction, Vec<usize>)] {
        &self.opened
    }
}

impl Device for MockDevice {
    type Tx = MockTxStream;
    type Rx = MockRxStream;

    fn num_channels(&self, direction: Direction) -> usize {
        match direction {
            Direction::Transmit => self.tx_channels,
            Direction::Receive => self.rx_channels,
        }
    }

    fn tx_stream(&mut self, channels: &[usize]) -> Result<MockTxStream> {
        self.opened.push((Direction::Transmit, channels.to_vec()));
        Ok(MockTxStream::new())
    }

    fn rx_stream(&mut self, channels: &[usize]) -> Result<MockRxStream> {
        self.opened.push((Direction::Receive, channels.to_vec()));
        Ok(MockRxStream::new())
    }
}

impl ReplayDevice for MockDevice {
    type Replay = MockReplayStream;

    fn replay_stream(&mut self, channels: &[usize]) -> Result<MockReplayStream> {
        self.opened.push((Direction::Transmit, channels.to_vec()));
        Ok(MockReplayStream::new())
    }
}

impl ClockControl for MockDevice {
    fn set_time_next_pps(&mut self, time: TimeSpec) -> Result<()> {
        self.clock_calls.push(ClockCall::NextPps(time));
        self.last_pps = time;
        Ok(())
    }

    fn time_last_pps(&self) -> Result<TimeSpec> {
        Ok(self.last_pps)
    }

    fn set_time_unknown_pps(&mut self, time: TimeSpec) -> Result<()> {
        self.clock_calls.push(ClockCall::UnknownPps(time));
        self.last_pps = time;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_script_falls_back_to_accepting_everything() {
        let mut tx = MockTxStream::scripted([TxReply::Accept(3), TxReply::Fail]);
        let samples = [7u32; 8];
        let md = TxMetadata::continuation();

        assert_eq!(tx.send(&[&samples[..]], 8, &md, Duration::from_secs(1)).unwrap(), 3);
        assert!(tx.send(&[&samples[..]], 8, &md, Duration::from_secs(1)).is_err());
        assert_eq!(tx.send(&[&samples[..]], 8, &md, Duration::from_secs(1)).unwrap(), 8);
        assert_eq!(tx.sent().len(), 3);
        assert_eq!(tx.sent()[0].first_sample, Some(7));
    }

    #[test]
    fn rx_reads_are_capped_and_numbered() {
        let mut rx = MockRxStream::scripted([RxReply::Samples(10), RxReply::Overflow(2)]);
        let mut buf = [0u32; 4];
        let mut md = RxMetadata::default();

        let n = rx.recv(&mut [&mut buf[..]], 4, &mut md, Duration::from_millis(1)).unwrap();
        assert_eq!(n, 4);
        assert_eq!(buf, [0, 1, 2, 3]);
        assert_eq!(md.error, RxErrorCode::None);

        let n = rx.recv(&mut [&mut buf[..]], 4, &mut md, Duration::from_millis(1)).unwrap();
        assert_eq!(n, 2);
        assert_eq!(&buf[..2], &[4, 5]);
        assert_eq!(md.error, RxErrorCode::Overflow);

        let n = rx.recv(&mut [&mut buf[..]], 4, &mut md, Duration::from_millis(1)).unwrap();
        assert_eq!(n, 0);
        assert_eq!(md.error, RxErrorCode::Timeout);
    }

    #[test]
    fn replay_commands_fail_only_while_rejecting() {
        let mut replay = MockReplayStream::new().rejecting_plays(1).rejecting_stops(1);

        assert!(replay.play(None, true).is_err());
        assert!(replay.calls().is_empty());
        replay.play(None, true).unwrap();
        assert!(replay.stop().is_err());
        replay.stop().unwrap();
        assert_eq!(
            replay.calls(),
            &[ReplayCall::Play { time: None, repeat: true }, ReplayCall::Stop]
        );
    }
}
