//! Error types for argument decoding and stream control.
//!
//! Every fallible operation in this crate returns [`StreamError`]. The variants
//! fall into a few categories:
//!
//! - **Protocol violations**: an argument block carried a tag this build does
//!   not know, or a known tag with the wrong payload size. These indicate a
//!   producer/consumer version skew and are never skipped silently.
//! - **Invalid arguments**: out-of-range channel indices, negative timestamps,
//!   mis-sized sample buffers.
//! - **Invalid state**: a controller operation called outside its legal phase.
//! - **Transport errors**: failures reported by the radio transport, passed up
//!   verbatim. Retrying is the caller's decision.
//! - **Configuration errors**: malformed or incomplete device layouts.
//!
//! Truncated argument blocks and partial transfers are not errors.
//!
//! ```rust
//! use radiostream::StreamError;
//!
//! let error = StreamError::transport_failed("device disconnected");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for stream operations.
pub type Result<T, E = StreamError> = std::result::Result<T, E>;

/// Main error type for stream operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StreamError {
    #[error("Unknown argument tag {tag:#010x} at offset {offset}")]
    UnknownTag { tag: u32, offset: usize },

    #[error("Argument tag {tag:#010x} expects a {expected}-byte payload, found {found}")]
    PayloadLength { tag: u32, expected: usize, found: u64 },

    #[error("Invalid argument in {context}: {details}")]
    InvalidArgument { context: String, details: String },

    #[error("Cannot {operation} while {phase}")]
    InvalidState { operation: &'static str, phase: String },

    #[error("Transport failure: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Receive drain did not settle after {reads} reads")]
    DrainIncomplete { reads: usize },

    #[error("Configuration error in {context}: {details}")]
    Config { context: String, details: String },

    #[error("Configuration file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StreamError {
    /// Returns whether this error signals producer/consumer protocol skew.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, StreamError::UnknownTag { .. } | StreamError::PayloadLength { .. })
    }

    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::Transport { .. } => true,
            StreamError::Timeout { .. } => true,
            StreamError::DrainIncomplete { .. } => true,
            StreamError::UnknownTag { .. } => false,
            StreamError::PayloadLength { .. } => false,
            StreamError::InvalidArgument { .. } => false,
            StreamError::InvalidState { .. } => false,
            StreamError::Config { .. } => false,
            StreamError::File { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            StreamError::UnknownTag { .. } | StreamError::PayloadLength { .. } => vec![
                "Check that the argument producer and this library agree on the protocol version",
                "Verify the argument block is not built from stale struct layouts",
            ],
            StreamError::InvalidArgument { .. } => vec![
                "Check channel indices against the device channel count",
                "Verify timestamps are non-negative device times",
                "Pass one sample buffer per streamer channel",
            ],
            StreamError::InvalidState { .. } => vec![
                "Follow the begin/transfer/end, start/poll/stop or record/start/stop call order",
                "Check the controller phase before issuing the operation",
            ],
            StreamError::Transport { .. } => vec![
                "Check the device connection",
                "Retry the operation",
                "Reopen the streamer if the device was reset",
            ],
            StreamError::Timeout { .. } => vec![
                "Increase the configured timeout",
                "Verify the scheduled start time is not too far in the future",
            ],
            StreamError::DrainIncomplete { .. } => vec![
                "Call stop() again to resume draining",
                "Raise max_drain_reads in the stream configuration",
            ],
            StreamError::Config { .. } => vec![
                "Check the device layout YAML against the documented schema",
                "Verify the requested streamer index exists",
            ],
            StreamError::File { .. } => vec![
                "Check the configuration file exists and is readable",
                "Check file permissions",
            ],
        }
    }

    /// Helper constructor for invalid argument errors.
    pub fn invalid_argument(context: impl Into<String>, details: impl Into<String>) -> Self {
        StreamError::InvalidArgument { context: context.into(), details: details.into() }
    }

    /// Helper constructor for state machine violations.
    pub fn invalid_state(operation: &'static str, phase: impl std::fmt::Display) -> Self {
        StreamError::InvalidState { operation, phase: phase.to_string() }
    }

    /// Helper constructor for transport errors.
    pub fn transport_failed(reason: impl Into<String>) -> Self {
        StreamError::Transport { reason: reason.into(), source: None }
    }

    /// Helper constructor for transport errors with source.
    pub fn transport_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        StreamError::Transport { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        StreamError::Config { context: context.into(), details: details.into() }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        StreamError::File { path, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
          #[test]
          fn error_messages_carry_their_context(
            tag in any::<u32>(),
            offset in 0usize..0x10000usize,
            expected in 1usize..16usize,
            found in any::<u64>(),
            details in ".*"
          ) {
            let unknown = StreamError::UnknownTag { tag, offset };
            let length = StreamError::PayloadLength { tag, expected, found };
            let argument = StreamError::invalid_argument("channel list", details.clone());

            let tag_hex = format!("{:#010x}", tag);
            prop_assert!(unknown.to_string().contains(&tag_hex));
            prop_assert!(unknown.to_string().contains(&offset.to_string()));
            prop_assert!(length.to_string().contains(&found.to_string()));
            prop_assert!(argument.to_string().contains(&details));

            prop_assert!(unknown.is_protocol_violation());
            prop_assert!(length.is_protocol_violation());
            prop_assert!(!argument.is_protocol_violation());
          }

          #[test]
          fn transport_source_chain_is_preserved(base_message in ".*") {
            let source: Box<dyn std::error::Error + Send + Sync> =
              Box::new(std::io::Error::other(base_message.clone()));
            let error = StreamError::transport_failed_with_source("send failed", source);

            let inner = std::error::Error::source(&error);
            prop_assert!(inner.is_some());
            prop_assert_eq!(inner.map(|e| e.to_string()), Some(base_message));
          }
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<StreamError>();

        let error = StreamError::transport_failed("test");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn retry_classification() {
        assert!(StreamError::transport_failed("x").is_retryable());
        assert!(StreamError::Timeout { duration: Duration::from_millis(100) }.is_retryable());
        assert!(StreamError::DrainIncomplete { reads: 4 }.is_retryable());
        assert!(!StreamError::UnknownTag { tag: 1, offset: 0 }.is_retryable());
        assert!(!StreamError::invalid_state("transfer", "idle").is_retryable());
    }

    #[test]
    fn every_variant_has_suggestions() {
        let errors = [
            StreamError::UnknownTag { tag: 7, offset: 0 },
            StreamError::PayloadLength { tag: 7, expected: 8, found: 4 },
            StreamError::invalid_argument("ctx", "details"),
            StreamError::invalid_state("poll", "stopped"),
            StreamError::transport_failed("gone"),
            StreamError::Timeout { duration: Duration::from_secs(1) },
            StreamError::DrainIncomplete { reads: 10 },
            StreamError::config_error("layout", "missing tx"),
            StreamError::file_error(
                PathBuf::from("/missing.yaml"),
                std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            ),
        ];

        for error in &errors {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty(), "no suggestions for {error}");
            for suggestion in suggestions {
                assert!(suggestion.len() > 5);
            }
        }
    }

    #[test]
    fn invalid_state_message_names_operation_and_phase() {
        let error = StreamError::invalid_state("transfer", "idle");
        assert_eq!(error.to_string(), "Cannot transfer while idle");
    }
}
