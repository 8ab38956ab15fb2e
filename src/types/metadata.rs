//! Per-call metadata exchanged with the sample transport

use super::TimeSpec;

/// Metadata attached to every transmit call.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TxMetadata {
    /// First packet of a burst
    pub start_of_burst: bool,
    /// Last packet of a burst
    pub end_of_burst: bool,
    /// Device time at which the first sample of this call goes out
    pub time: Option<TimeSpec>,
}

impl TxMetadata {
    /// Metadata for the opening transfer of a burst.
    pub fn start_of_burst(time: Option<TimeSpec>) -> Self {
        Self { start_of_burst: true, end_of_burst: false, time }
    }

    /// Metadata for a transfer in the middle of a burst.
    pub fn continuation() -> Self {
        Self::default()
    }

    /// Metadata for a burst sent in a single call, such as a replay upload.
    pub fn whole_burst() -> Self {
        Self { start_of_burst: true, end_of_burst: true, time: None }
    }

    /// Metadata for the zero-length end-of-burst marker.
    pub fn end_of_burst() -> Self {
        Self { start_of_burst: false, end_of_burst: true, time: None }
    }
}

/// Condition reported by the receive transport alongside a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RxErrorCode {
    #[default]
    None,
    /// No packet arrived within the timeout
    Timeout,
    /// Host could not keep up and samples were dropped
    Overflow,
    /// A timed stream command arrived after its scheduled time
    LateCommand,
    /// Expected another stream command but the stream ended
    BrokenChain,
    /// Multi-channel packets could not be time aligned
    Alignment,
    /// Packet could not be parsed
    BadPacket,
}

/// Metadata filled in by the receive transport on every read.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RxMetadata {
    /// Device time of the first sample in the buffer
    pub time: Option<TimeSpec>,
    pub error: RxErrorCode,
    /// The transport split a packet across reads
    pub more_fragments: bool,
}
