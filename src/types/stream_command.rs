//! Receive stream commands

use super::TimeSpec;

/// How a receive stream should run once started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Stream until told to stop
    StartContinuous,
    /// Stop a continuous stream
    StopContinuous,
}

/// A command for the receive transport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamCommand {
    pub mode: StreamMode,
    /// Always 0, continuous streams are unbounded
    pub num_samples: u64,
    /// Start immediately rather than at `time`
    pub stream_now: bool,
    pub time: Option<TimeSpec>,
}

impl StreamCommand {
    /// Start an unbounded stream, immediately or at `time`.
    pub fn start_continuous(time: Option<TimeSpec>) -> Self {
        Self { mode: StreamMode::StartContinuous, num_samples: 0, stream_now: time.is_none(), time }
    }

    /// Stop an unbounded stream now.
    pub fn stop_continuous() -> Self {
        Self { mode: StreamMode::StopContinuous, num_samples: 0, stream_now: true, time: None }
    }

    /// Whether this command waits for a device time before taking effect.
    pub fn is_timed(&self) -> bool {
        !self.stream_now && self.time.is_some()
    }
}
