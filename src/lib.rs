//! Tagged optional-argument codec and streaming control for software-defined radios.
//!
//! Radio streaming calls can carry a block of optional arguments: a sequence
//! of size/tag/payload records that schedule the call on the device clock or
//! scope it to one channel. This crate decodes those blocks and drives the
//! radio's transmit and receive streamers through their lifecycles.
//!
//! # Features
//!
//! - **Argument codec**: lenient record walking, strict tag and size checks
//! - **Burst transmit**: `begin_burst` / `transfer` / `end_burst` with a
//!   scheduled start riding on the first transfer
//! - **Continuous receive**: `start` / `poll` / `stop` with a bounded drain
//! - **Loop transmit**: upload a signal to replay memory once, then loop it
//! - **Async driver**: receive on tokio's blocking pool, consume as a `Stream`
//! - **Device layouts**: streamer groups and timeouts from YAML
//!
//! The hardware is reached through the traits in [`transport`], which a driver
//! binding implements.
//!
//! ## Example
//!
//! ```rust,no_run
//! use radiostream::args::ArgBlockWriter;
//! use radiostream::config::DeviceLayout;
//! use radiostream::transport::{Device, TxStream};
//!
//! fn send_burst<D>(device: &mut D, samples: &[f32]) -> radiostream::Result<()>
//! where
//!     D: Device,
//!     D::Tx: TxStream<Sample = f32>,
//! {
//!     let layout = DeviceLayout::from_path("radio.yaml")?;
//!     let mut tx = layout.transmitter(device, 0)?;
//!
//!     tx.begin_burst(&ArgBlockWriter::new().command_time(2_000_000_000).finish())?;
//!     let mut sent = 0;
//!     while sent < samples.len() {
//!         sent += tx.transfer(&[&samples[sent..]], samples.len() - sent)?.accepted;
//!     }
//!     tx.end_burst()
//! }
//! ```

// Core types and error handling
pub mod args;
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Streaming control
pub mod session;
pub mod streamer;
pub mod transport;

// Async driver
pub mod driver;

// Device setup
pub mod clock;
pub mod config;

// Core exports
pub use error::*;
pub use types::*;

// Main API exports
pub use args::{ArgBlockWriter, OptArg, ParsedArgs};
pub use config::{DeviceLayout, StreamConfig};
pub use driver::{ReceiveDriver, SampleBlock};
pub use session::{AppliedArgs, StreamingSession};
pub use streamer::{BurstTransmitter, ContinuousReceiver, DrainReport, LoopTransmitter, Transfer};
pub use transport::{
    ClockControl, Device, Direction, ReplayDevice, ReplayStream, RxStream, TxStream,
};
