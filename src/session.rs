//! Per-streamer argument state shared by the transmit and receive controllers

use tracing::debug;

use crate::args::ParsedArgs;
use crate::types::TimeSpec;
use crate::{Result, StreamError};

/// What one argument block contributed to the session.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AppliedArgs {
    /// Scheduled time set by this block, if it carried one
    pub time: Option<TimeSpec>,
    /// Channel the decorated call is scoped to, if any
    pub channel: Option<usize>,
}

/// Channel set and pending scheduled start of one streamer.
///
/// The channel list is fixed at construction. The pending time is written by
/// [`apply_optional_args`](Self::apply_optional_args) and consumed exactly once
/// by [`take_pending_time`](Self::take_pending_time).
#[derive(Debug, Clone, PartialEq)]
pub struct StreamingSession {
    channels: Vec<usize>,
    pending_time: Option<TimeSpec>,
    scoped_channel: Option<usize>,
}

impl StreamingSession {
    /// Create a session over `channels` of a device exposing `available` channels.
    pub fn new(channels: Vec<usize>, available: usize) -> Result<Self> {
        if channels.is_empty() {
            return Err(StreamError::invalid_argument(
                "streamer channels",
                "at least one channel is required",
            ));
        }

        for (position, &channel) in channels.iter().enumerate() {
            if channel >= available {
                return Err(StreamError::invalid_argument(
                    "streamer channels",
                    format!("channel {} out of range, device has {}", channel, available),
                ));
            }
            if channels[..position].contains(&channel) {
                return Err(StreamError::invalid_argument(
                    "streamer channels",
                    format!("channel {} listed twice", channel),
                ));
            }
        }

        Ok(Self { channels, pending_time: None, scoped_channel: None })
    }

    /// Fold an argument block into the session.
    ///
    /// The whole block is decoded and validated before anything is stored, so
    /// a rejected block leaves the session untouched. Within one block the last
    /// command time and the last channel selector win. A block with no command
    /// time keeps any pending time; the channel scope always belongs to the
    /// latest block only.
    pub fn apply_optional_args(&mut self, block: &[u8]) -> Result<AppliedArgs> {
        let applied = self.stage_optional_args(block)?;
        self.commit(applied);
        Ok(applied)
    }

    /// Decode and validate a block without storing anything.
    ///
    /// Callers that must first hear back from the transport stage the block,
    /// issue the command, then [`commit`](Self::commit) on success.
    pub fn stage_optional_args(&self, block: &[u8]) -> Result<AppliedArgs> {
        let parsed = ParsedArgs::parse(block)?;

        let channel = match parsed.channel() {
            Some(info) => {
                let index = info.index as usize;
                if index >= self.channels.len() {
                    return Err(StreamError::invalid_argument(
                        "streamer channel selector",
                        format!(
                            "index {} out of range for a {}-channel streamer",
                            info.index,
                            self.channels.len()
                        ),
                    ));
                }
                Some(index)
            }
            None => None,
        };

        let time = parsed.command_time().map(|info| info.time_spec());
        if parsed.command_times.len() > 1 {
            debug!(count = parsed.command_times.len(), "Multiple command times, keeping last");
        }

        debug!(
            time = ?time,
            channel = ?channel,
            trailing = parsed.trailing,
            "Decoded optional arguments"
        );

        Ok(AppliedArgs { time, channel })
    }

    /// Store a staged block: its time (if any) becomes pending, its channel
    /// selector replaces the current scope.
    pub fn commit(&mut self, applied: AppliedArgs) {
        if let Some(time) = applied.time {
            self.pending_time = Some(time);
        }
        self.scoped_channel = applied.channel;
    }

    /// The time a command issued with `staged` would carry: the staged time,
    /// else the one already pending.
    pub fn effective_time(&self, staged: &AppliedArgs) -> Option<TimeSpec> {
        staged.time.or(self.pending_time)
    }

    /// Return and clear the pending scheduled time.
    pub fn take_pending_time(&mut self) -> Option<TimeSpec> {
        self.pending_time.take()
    }

    pub fn pending_time(&self) -> Option<TimeSpec> {
        self.pending_time
    }

    /// Channel (as an index into [`channels`](Self::channels)) scoped by the
    /// latest block.
    pub fn scoped_channel(&self) -> Option<usize> {
        self.scoped_channel
    }

    /// Device channel indices, in streamer order.
    pub fn channels(&self) -> &[usize] {
        &self.channels
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }
}
