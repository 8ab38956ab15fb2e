//! Transmit and receive controllers
//!
//! [`BurstTransmitter`], [`ContinuousReceiver`] and [`LoopTransmitter`] own
//! one transport each and walk it through its lifecycle. Each takes the tagged
//! optional-argument block on the call that opens a burst, a stream or a loop;
//! a command time in that block schedules the start on the device clock.

mod looptx;
mod rx;
mod tx;


pub use looptx::LoopTransmitter;
pub use rx::{ContinuousReceiver, DrainReport};
pub use tx::{BurstTransmitter, Transfer};
