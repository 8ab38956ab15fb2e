//! Tagged argument blocks attached to streaming calls
//!
//! Callers decorate a streaming call (begin a burst, start a receive stream)
//! with a small binary block of optional arguments: when the call should
//! take effect on the device clock, and which channel it applies to. This
//! module parses and produces those blocks; it knows nothing about streaming.

pub mod format;
pub mod reader;
pub mod writer;

pub use format::{
    COMMAND_TIME_TAG, CommandTimeInfo, OptArg, RECORD_HEADER_SIZE, RawRecord,
    STREAMER_CHANNEL_TAG, StreamerChannelInfo,
};
pub use reader::{ParsedArgs, RecordReader, decode_each, for_each_record};
pub use writer::ArgBlockWriter;
