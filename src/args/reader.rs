//! Bounds-checked walk over an argument block
//!
//! [`RecordReader`] keeps an explicit cursor into the borrowed block and never
//! reads past its end. Decoding is lenient about the tail: once fewer than
//! [`RECORD_HEADER_SIZE`] bytes remain, or a header declares more payload than
//! is left, the walk ends quietly. Callers that must know whether the whole
//! block was understood compare [`RecordReader::consumed`] against the block
//! length (or check [`RecordReader::remaining`]) after the walk.
//!
//! ## Usage Example
//!
//! ```rust
//! use radiostream::args::{ArgBlockWriter, OptArg, ParsedArgs, RecordReader};
//!
//! fn inspect(block: &[u8]) -> radiostream::Result<()> {
//!     let mut reader = RecordReader::new(block);
//!     for record in reader.by_ref() {
//!         let arg = OptArg::decode(&record)?;
//!         println!("record at {}: {:?}", record.offset, arg);
//!     }
//!     if reader.remaining() > 0 {
//!         println!("ignored {} trailing bytes", reader.remaining());
//!     }
//!     Ok(())
//! }
//!
//! let block = ArgBlockWriter::new().command_time(1_500_000_000).finish();
//! inspect(&block).unwrap();
//!
//! let parsed = ParsedArgs::parse(&block).unwrap();
//! assert_eq!(parsed.command_times.len(), 1);
//! ```

use std::iter::FusedIterator;

use tracing::trace;

use super::format::{CommandTimeInfo, OptArg, RECORD_HEADER_SIZE, RawRecord, StreamerChannelInfo};
use crate::Result;

/// Lazy, order-preserving iterator over the records of an argument block.
#[derive(Debug, Clone)]
pub struct RecordReader<'a> {
    block: &'a [u8],
    position: usize,
}

impl<'a> RecordReader<'a> {
    pub fn new(block: &'a [u8]) -> Self {
        Self { block, position: 0 }
    }

    /// Bytes covered by the records yielded so far.
    pub fn consumed(&self) -> usize {
        self.position
    }

    /// Bytes not covered by any yielded record.
    pub fn remaining(&self) -> usize {
        self.block.len() - self.position
    }
}

impl<'a> Iterator for RecordReader<'a> {
    type Item = RawRecord<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.block.get(self.position..)?;
        let (size_bytes, rest) = rest.split_first_chunk::<8>()?;
        let (tag_bytes, rest) = rest.split_first_chunk::<4>()?;

        let size = u64::from_le_bytes(*size_bytes);
        let tag = u32::from_le_bytes(*tag_bytes);

        let payload = match usize::try_from(size).ok().and_then(|len| rest.get(..len)) {
            Some(payload) => payload,
            None => {
                trace!(
                    offset = self.position,
                    declared = size,
                    available = rest.len(),
                    "Record overruns argument block, stopping"
                );
                return None;
            }
        };

        let offset = self.position;
        self.position += RECORD_HEADER_SIZE + payload.len();
        trace!(offset, tag, size, "Read argument record");

        Some(RawRecord { tag, payload, offset })
    }
}

impl FusedIterator for RecordReader<'_> {}

/// Visit every complete record in buffer order. Returns the bytes consumed.
pub fn for_each_record<'a, F>(block: &'a [u8], mut visitor: F) -> usize
where
    F: FnMut(RawRecord<'a>),
{
    let mut reader = RecordReader::new(block);
    for record in reader.by_ref() {
        visitor(record);
    }
    reader.consumed()
}

/// Decode every complete record in buffer order and hand it to `visitor`.
///
/// Stops at the first protocol violation; records before it have already
/// been visited. Returns the bytes consumed.
pub fn decode_each<F>(block: &[u8], mut visitor: F) -> Result<usize>
where
    F: FnMut(OptArg),
{
    let mut reader = RecordReader::new(block);
    for record in reader.by_ref() {
        visitor(OptArg::decode(&record)?);
    }
    Ok(reader.consumed())
}

/// Every record of one block, grouped by type, in block order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    pub command_times: Vec<CommandTimeInfo>,
    pub channels: Vec<StreamerChannelInfo>,
    /// Bytes covered by complete records
    pub consumed: usize,
    /// Bytes left over after the last complete record
    pub trailing: usize,
}

impl ParsedArgs {
    /// Decode a whole block. Fails without partial results on any protocol violation.
    pub fn parse(block: &[u8]) -> Result<Self> {
        let mut command_times = Vec::new();
        let mut channels = Vec::new();
        let consumed = decode_each(block, |arg| match arg {
            OptArg::CommandTime(info) => command_times.push(info),
            OptArg::StreamerChannel(info) => channels.push(info),
        })?;

        Ok(Self { command_times, channels, consumed, trailing: block.len() - consumed })
    }

    /// The last command time in the block, which is the one that takes effect.
    pub fn command_time(&self) -> Option<CommandTimeInfo> {
        self.command_times.last().copied()
    }

    /// The last channel selector in the block.
    pub fn channel(&self) -> Option<StreamerChannelInfo> {
        self.channels.last().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.command_times.is_empty() && self.channels.is_empty()
    }
}
