//! Producer side of the argument block format

use super::format::{CommandTimeInfo, OptArg, StreamerChannelInfo, write_record};
use crate::Result;
use crate::types::TimeSpec;

/// Builds an argument block record by record.
///
/// ```rust
/// use radiostream::args::{ArgBlockWriter, ParsedArgs};
///
/// let block = ArgBlockWriter::new().command_time(2_000_000_000).channel(1).finish();
/// assert_eq!(block.len(), 20 + 16);
///
/// let parsed = ParsedArgs::parse(&block).unwrap();
/// assert_eq!(parsed.command_time().unwrap().nsecs, 2_000_000_000);
/// assert_eq!(parsed.channel().unwrap().index, 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ArgBlockWriter {
    buf: Vec<u8>,
}

impl ArgBlockWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule the decorated call at `nsecs` of device time.
    pub fn command_time(self, nsecs: u64) -> Self {
        self.push(CommandTimeInfo { nsecs })
    }

    /// Schedule the decorated call at `time`.
    pub fn at(self, time: TimeSpec) -> Result<Self> {
        Ok(self.command_time(time.to_nanos()?))
    }

    /// Scope the decorated call to one channel of the streamer.
    pub fn channel(self, index: u32) -> Self {
        self.push(StreamerChannelInfo { index })
    }

    pub fn push(mut self, arg: impl Into<OptArg>) -> Self {
        arg.into().encode_into(&mut self.buf);
        self
    }

    /// Append a record verbatim, e.g. to exercise a consumer with an unknown tag.
    pub fn record(mut self, tag: u32, payload: &[u8]) -> Self {
        write_record(&mut self.buf, tag, payload);
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}
