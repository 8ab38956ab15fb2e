//! Controller phases

use std::fmt;

use super::TimeSpec;

/// Phase of a burst transmitter.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BurstPhase {
    #[default]
    Idle,
    /// Burst opened; nothing accepted yet. Holds the scheduled start, if any.
    Armed(Option<TimeSpec>),
    /// At least one sample of the burst has been accepted
    InBurst,
}

impl fmt::Display for BurstPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BurstPhase::Idle => f.write_str("idle"),
            BurstPhase::Armed(None) => f.write_str("armed"),
            BurstPhase::Armed(Some(time)) => write!(f, "armed for {}", time),
            BurstPhase::InBurst => f.write_str("in burst"),
        }
    }
}

/// Phase of a continuous receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceivePhase {
    #[default]
    Stopped,
    Streaming,
    /// Stop issued; flushing samples the transport had already buffered
    Draining,
}

impl fmt::Display for ReceivePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReceivePhase::Stopped => f.write_str("stopped"),
            ReceivePhase::Streaming => f.write_str("streaming"),
            ReceivePhase::Draining => f.write_str("draining"),
        }
    }
}

/// Phase of a loop transmitter backed by replay memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopPhase {
    /// Nothing usable in replay memory
    #[default]
    Empty,
    /// A complete signal is stored and can be played
    Recorded,
    /// The stored signal is being played in a loop
    Playing,
}

impl fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopPhase::Empty => f.write_str("empty"),
            LoopPhase::Recorded => f.write_str("recorded"),
            LoopPhase::Playing => f.write_str("playing"),
        }
    }
}
