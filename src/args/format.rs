//! Argument block wire format and typed payloads
//!
//! An argument block is a flat run of tagged records with no count and no
//! terminator:
//!
//! ```text
//! offset  size  field
//! 0       8     size     u64, payload length in bytes (header excluded)
//! 8       4     tag      u32, payload type
//! 12      size  payload
//! ```
//!
//! All integers are little-endian. Two payload types exist at this protocol
//! version:
//!
//! | tag          | payload               | size |
//! |--------------|-----------------------|------|
//! | `0x16C002AF` | `CommandTimeInfo`     | 8    |
//! | `0x78640439` | `StreamerChannelInfo` | 4    |

use crate::types::TimeSpec;
use crate::{Result, StreamError};

/// Size of the fixed `size` + `tag` record header
pub const RECORD_HEADER_SIZE: usize = 12;

/// Tag of [`CommandTimeInfo`]
pub const COMMAND_TIME_TAG: u32 = 0x16C0_02AF;

/// Tag of [`StreamerChannelInfo`]
pub const STREAMER_CHANNEL_TAG: u32 = 0x7864_0439;

/// A record as laid out in the block, payload not yet interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord<'a> {
    pub tag: u32,
    pub payload: &'a [u8],
    /// Byte offset of the record header within the block
    pub offset: usize,
}

/// Absolute device time, in nanoseconds, at which the decorated call takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandTimeInfo {
    pub nsecs: u64,
}

impl CommandTimeInfo {
    pub const TAG: u32 = COMMAND_TIME_TAG;
    pub const PAYLOAD_SIZE: usize = 8;

    pub fn time_spec(&self) -> TimeSpec {
        TimeSpec::from_nanos(self.nsecs)
    }
}

/// Zero-based channel, within the streamer, that the decorated call applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamerChannelInfo {
    pub index: u32,
}

impl StreamerChannelInfo {
    pub const TAG: u32 = STREAMER_CHANNEL_TAG;
    pub const PAYLOAD_SIZE: usize = 4;
}

/// A decoded argument record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptArg {
    CommandTime(CommandTimeInfo),
    StreamerChannel(StreamerChannelInfo),
}

impl OptArg {
    /// Interpret a raw record.
    ///
    /// Unknown tags and size mismatches are protocol violations: the producer
    /// speaks a different version of the format and nothing it sent can be
    /// trusted, so they are reported instead of skipped.
    pub fn decode(record: &RawRecord<'_>) -> Result<Self> {
        match record.tag {
            COMMAND_TIME_TAG => {
                let bytes = fixed_payload::<{ CommandTimeInfo::PAYLOAD_SIZE }>(record)?;
                Ok(OptArg::CommandTime(CommandTimeInfo { nsecs: u64::from_le_bytes(bytes) }))
            }
            STREAMER_CHANNEL_TAG => {
                let bytes = fixed_payload::<{ StreamerChannelInfo::PAYLOAD_SIZE }>(record)?;
                Ok(OptArg::StreamerChannel(StreamerChannelInfo {
                    index: u32::from_le_bytes(bytes),
                }))
            }
            tag => Err(StreamError::UnknownTag { tag, offset: record.offset }),
        }
    }

    pub fn tag(&self) -> u32 {
        match self {
            OptArg::CommandTime(_) => COMMAND_TIME_TAG,
            OptArg::StreamerChannel(_) => STREAMER_CHANNEL_TAG,
        }
    }

    /// Append this record, header included, to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            OptArg::CommandTime(info) => write_record(out, self.tag(), &info.nsecs.to_le_bytes()),
            OptArg::StreamerChannel(info) => {
                write_record(out, self.tag(), &info.index.to_le_bytes())
            }
        }
    }
}

impl From<CommandTimeInfo> for OptArg {
    fn from(info: CommandTimeInfo) -> Self {
        OptArg::CommandTime(info)
    }
}

impl From<StreamerChannelInfo> for OptArg {
    fn from(info: StreamerChannelInfo) -> Self {
        OptArg::StreamerChannel(info)
    }
}

/// Append a record with an arbitrary tag and payload to `out`.
pub fn write_record(out: &mut Vec<u8>, tag: u32, payload: &[u8]) {
    out.reserve(RECORD_HEADER_SIZE + payload.len());
    out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    out.extend_from_slice(&tag.to_le_bytes());
    out.extend_from_slice(payload);
}

fn fixed_payload<const N: usize>(record: &RawRecord<'_>) -> Result<[u8; N]> {
    <[u8; N]>::try_from(record.payload).map_err(|_| StreamError::PayloadLength {
        tag: record.tag,
        expected: N,
        found: record.payload.len() as u64,
    })
}
