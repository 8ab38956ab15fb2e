//! Device layout and streaming configuration
//!
//! A device layout names the streamer groups a radio is split into and the
//! timeouts the controllers use. It is usually loaded from YAML:
//!
//! ```yaml
//! tx:
//!   streamers:
//!     - channels: [0, 1]
//! rx:
//!   streamers:
//!     - channels: [0]
//!     - channels: [1]
//! stream:
//!   send_timeout_secs: 10.0
//!   drain_chunk_samples: 128
//! ```
//!
//! Every field of `stream` is optional and falls back to [`StreamConfig::default`].

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::streamer::{BurstTransmitter, ContinuousReceiver, LoopTransmitter};
use crate::transport::{Device, Direction, ReplayDevice};
use crate::{Result, StreamError};

/// Timeouts and drain parameters for the streaming controllers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Upper bound for one transmit call
    pub send_timeout_secs: f64,
    /// Upper bound for one receive poll
    pub recv_timeout_secs: f64,
    /// Upper bound for each read of the post-stop drain
    pub drain_timeout_secs: f64,
    /// Scratch buffer size, per channel, used while draining
    pub drain_chunk_samples: usize,
    /// Give up draining after this many non-empty reads
    pub max_drain_reads: usize,
    /// Upper bound for uploading a loop signal into replay memory
    pub record_timeout_secs: f64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            send_timeout_secs: 10.0,
            recv_timeout_secs: 10.0,
            drain_timeout_secs: 0.1,
            drain_chunk_samples: 128,
            max_drain_reads: 10_000,
            record_timeout_secs: 5.0,
        }
    }
}

impl StreamConfig {
    pub fn send_timeout(&self) -> Duration {
        seconds(self.send_timeout_secs)
    }

    pub fn recv_timeout(&self) -> Duration {
        seconds(self.recv_timeout_secs)
    }

    pub fn drain_timeout(&self) -> Duration {
        seconds(self.drain_timeout_secs)
    }

    pub fn record_timeout(&self) -> Duration {
        seconds(self.record_timeout_secs)
    }

    /// Check that every timeout is a positive, representable duration and the
    /// drain is bounded.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("send_timeout_secs", self.send_timeout_secs),
            ("recv_timeout_secs", self.recv_timeout_secs),
            ("drain_timeout_secs", self.drain_timeout_secs),
            ("record_timeout_secs", self.record_timeout_secs),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(StreamError::config_error(
                    "stream configuration",
                    format!("{} must be a positive number of seconds, got {}", name, value),
                ));
            }
            if Duration::try_from_secs_f64(value).is_err() {
                return Err(StreamError::config_error(
                    "stream configuration",
                    format!("{} is too large to be a timeout, got {}", name, value),
                ));
            }
        }

        if self.drain_chunk_samples == 0 {
            return Err(StreamError::config_error(
                "stream configuration",
                "drain_chunk_samples must be at least 1",
            ));
        }
        if self.max_drain_reads == 0 {
            return Err(StreamError::config_error(
                "stream configuration",
                "max_drain_reads must be at least 1",
            ));
        }

        Ok(())
    }
}

/// Timeouts are validated before use; an out-of-range value saturates here
/// instead of panicking.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
}

/// One streamer group: the device channels it spans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamerLayout {
    pub channels: Vec<usize>,
}

/// Streamer groups for one direction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DirectionLayout {
    #[serde(default)]
    pub streamers: Vec<StreamerLayout>,
}

/// Streamer groups of a device plus controller settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceLayout {
    #[serde(default)]
    pub tx: Option<DirectionLayout>,
    #[serde(default)]
    pub rx: Option<DirectionLayout>,
    #[serde(default)]
    pub stream: StreamConfig,
}

impl DeviceLayout {
    /// Parse a layout from YAML.
    pub fn parse(yaml: &str) -> Result<Self> {
        let layout: DeviceLayout = serde_yaml_ng::from_str(yaml).map_err(|e| {
            StreamError::config_error("device layout deserialization", e.to_string())
        })?;
        layout.stream.validate()?;
        Ok(layout)
    }

    /// Read and parse a layout file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| StreamError::file_error(path.to_path_buf(), e))?;
        debug!("Loaded device layout from {}", path.display());
        Self::parse(&yaml)
    }

    /// Streamer groups declared for `direction`.
    pub fn streamers(&self, direction: Direction) -> &[StreamerLayout] {
        let section = match direction {
            Direction::Transmit => self.tx.as_ref(),
            Direction::Receive => self.rx.as_ref(),
        };
        section.map(|s| s.streamers.as_slice()).unwrap_or(&[])
    }

    /// Channel list of streamer `index` in `direction`.
    pub fn channels(&self, direction: Direction, index: usize) -> Result<&[usize]> {
        self.streamers(direction).get(index).map(|s| s.channels.as_slice()).ok_or_else(|| {
            StreamError::config_error(
                "device layout",
                format!(
                    "no {} streamer {} (layout declares {})",
                    direction,
                    index,
                    self.streamers(direction).len()
                ),
            )
        })
    }

    /// Check every declared channel against the device.
    pub fn validate<D: Device>(&self, device: &D) -> Result<()> {
        for direction in [Direction::Transmit, Direction::Receive] {
            let available = device.num_channels(direction);
            for (index, streamer) in self.streamers(direction).iter().enumerate() {
                if let Some(&bad) = streamer.channels.iter().find(|&&c| c >= available) {
                    return Err(StreamError::invalid_argument(
                        format!("{} streamer {}", direction, index),
                        format!("channel {} out of range, device has {}", bad, available),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Open transmit streamer `index` on `device`.
    pub fn transmitter<D: Device>(
        &self,
        device: &mut D,
        index: usize,
    ) -> Result<BurstTransmitter<D::Tx>> {
        let channels = self.channels(Direction::Transmit, index)?.to_vec();
        BurstTransmitter::open(device, channels, self.stream.clone())
    }

    /// Open transmit streamer `index` on `device` as a loop transmitter over
    /// its replay memory.
    pub fn loop_transmitter<D: ReplayDevice>(
        &self,
        device: &mut D,
        index: usize,
    ) -> Result<LoopTransmitter<D::Replay>> {
        let channels = self.channels(Direction::Transmit, index)?.to_vec();
        LoopTransmitter::open(device, channels, self.stream.clone())
    }

    /// Open receive streamer `index` on `device`.
    pub fn receiver<D: Device>(
        &self,
        device: &mut D,
        index: usize,
    ) -> Result<ContinuousReceiver<D::Rx>> {
        let channels = self.channels(Direction::Receive, index)?.to_vec();
        ContinuousReceiver::open(device, channels, self.stream.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockDevice;
    use anyhow::Result;

    const LAYOUT: &str = r#"
tx:
  streamers:
    - channels: [0, 1]
rx:
  streamers:
    - channels: [0]
    - channels: [1]
stream:
  send_timeout_secs: 2.5
  drain_chunk_samples: 64
"#;

    #[test]
    fn parses_streamers_and_overrides() -> Result<()> {
        let layout = DeviceLayout::parse(LAYOUT)?;

        assert_eq!(layout.channels(Direction::Transmit, 0)?, &[0, 1]);
        assert_eq!(layout.channels(Direction::Receive, 1)?, &[1]);
        assert_eq!(layout.streamers(Direction::Receive).len(), 2);

        assert_eq!(layout.stream.send_timeout(), Duration::from_millis(2500));
        assert_eq!(layout.stream.drain_chunk_samples, 64);
        assert_eq!(layout.stream.recv_timeout_secs, 10.0);
        assert_eq!(layout.stream.drain_timeout(), Duration::from_millis(100));
        Ok(())
    }

    #[test]
    fn empty_document_uses_defaults() -> Result<()> {
        let layout = DeviceLayout::parse("{}")?;
        assert!(layout.streamers(Direction::Transmit).is_empty());
        assert_eq!(layout.stream, StreamConfig::default());
        Ok(())
    }

    #[test]
    fn missing_streamer_is_a_config_error() -> Result<()> {
        let layout = DeviceLayout::parse(LAYOUT)?;
        let err = layout.channels(Direction::Transmit, 3).unwrap_err();
        assert!(matches!(err, StreamError::Config { .. }));
        Ok(())
    }

    #[test]
    fn non_positive_timeouts_are_rejected() {
        let err = DeviceLayout::parse("stream:\n  recv_timeout_secs: 0\n").unwrap_err();
        assert!(matches!(err, StreamError::Config { .. }));

        let err = DeviceLayout::parse("stream:\n  max_drain_reads: 0\n").unwrap_err();
        assert!(matches!(err, StreamError::Config { .. }));
    }

    #[test]
    fn unrepresentable_timeouts_are_rejected() {
        let fields =
            ["send_timeout_secs", "recv_timeout_secs", "drain_timeout_secs", "record_timeout_secs"];
        for field in fields {
            let yaml = format!("stream:\n  {}: 1.0e30\n", field);
            let err = DeviceLayout::parse(&yaml).unwrap_err();
            assert!(matches!(err, StreamError::Config { .. }), "{} accepted", field);
            assert!(err.to_string().contains(field));
        }
    }

    #[test]
    fn huge_timeout_cannot_reach_a_controller() {
        let config = StreamConfig { send_timeout_secs: 1.0e30, ..StreamConfig::default() };
        assert!(config.validate().is_err());
        assert_eq!(config.send_timeout(), Duration::MAX);

        let mut device = MockDevice::new(1, 1);
        let layout = DeviceLayout {
            tx: Some(DirectionLayout { streamers: vec![StreamerLayout { channels: vec![0] }] }),
            rx: None,
            stream: config,
        };
        let err = layout.transmitter(&mut device, 0).err();
        assert!(matches!(err, Some(StreamError::Config { .. })));
    }

    #[test]
    fn malformed_yaml_is_reported() {
        let err = DeviceLayout::parse("tx: [unclosed").unwrap_err();
        assert!(matches!(err, StreamError::Config { .. }));
    }

    #[test]
    fn validate_checks_device_channel_count() -> Result<()> {
        let layout = DeviceLayout::parse(LAYOUT)?;
        layout.validate(&MockDevice::new(2, 2))?;

        let err = layout.validate(&MockDevice::new(1, 2)).unwrap_err();
        assert!(matches!(err, StreamError::InvalidArgument { .. }));
        Ok(())
    }

    #[test]
    fn opens_indexed_streamers() -> Result<()> {
        let layout = DeviceLayout::parse(LAYOUT)?;
        let mut device = MockDevice::new(2, 2);

        let tx = layout.transmitter(&mut device, 0)?;
        assert_eq!(tx.session().channels(), &[0, 1]);

        let rx = layout.receiver(&mut device, 1)?;
        assert_eq!(rx.session().channels(), &[1]);

        assert!(layout.receiver(&mut device, 2).is_err());
        Ok(())
    }

    #[test]
    fn opens_loop_transmitter_with_record_timeout() -> Result<()> {
        let yaml = "tx:\n  streamers:\n    - channels: [1]\nstream:\n  record_timeout_secs: 30\n";
        let layout = DeviceLayout::parse(yaml)?;
        let mut device = MockDevice::new(2, 0);

        let looptx = layout.loop_transmitter(&mut device, 0)?;
        assert_eq!(looptx.session().channels(), &[1]);
        assert_eq!(looptx.config().record_timeout(), Duration::from_secs(30));
        assert_eq!(device.opened(), &[(Direction::Transmit, vec![1])]);

        assert!(layout.loop_transmitter(&mut device, 1).is_err());
        Ok(())
    }

    #[test]
    fn missing_file_is_a_file_error() {
        let err = DeviceLayout::from_path("/nonexistent/layout.yaml").unwrap_err();
        assert!(matches!(err, StreamError::File { .. }));
    }
}
