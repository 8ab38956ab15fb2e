//! Core value types shared by the codec, the session and the controllers.
//!
//! - [`TimeSpec`] is the hardware clock's `(whole, frac)` timestamp
//! - [`TxMetadata`] / [`RxMetadata`] travel with every transport call
//! - [`StreamCommand`] starts and stops receive streams
//! - [`BurstPhase`] / [`ReceivePhase`] / [`LoopPhase`] are the controller state machines' states
//!
//! ## Usage Example
//!
//! ```rust
//! use radiostream::types::{TimeSpec, to_timestamp, from_timestamp};
//!
//! let (whole, frac) = to_timestamp(1_500_000_000);
//! assert_eq!((whole, frac), (1, 0.5));
//! assert_eq!(from_timestamp(whole, frac).unwrap(), 1_500_000_000);
//!
//! let at = TimeSpec::from_nanos(2_000_000_001);
//! assert_eq!(at.to_string(), "2.000000001s");
//! ```

mod metadata;
mod phase;
mod stream_command;
mod time_spec;

pub use metadata::{RxErrorCode, RxMetadata, TxMetadata};
pub use phase::{BurstPhase, LoopPhase, ReceivePhase};
pub use stream_command::{StreamCommand, StreamMode};
pub use time_spec::{NANOS_PER_SEC, TimeSpec, from_timestamp, to_timestamp};
