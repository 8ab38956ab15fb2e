//! Driver runs a receive controller on a blocking task

use futures::Stream;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::streamer::{ContinuousReceiver, DrainReport};
use crate::transport::RxStream;
use crate::types::{ReceivePhase, TimeSpec};
use crate::{Result, StreamError};

/// Blocks buffered between the receive task and its consumer.
const BLOCK_QUEUE_DEPTH: usize = 16;

/// One non-empty poll, copied out of the driver's buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBlock<S> {
    /// One vector per streamer channel, all the same length
    pub samples: Vec<Vec<S>>,
    /// Device time of the first sample, if the transport reported one
    pub time: Option<TimeSpec>,
}

impl<S> SampleBlock<S> {
    /// Samples per channel.
    pub fn len(&self) -> usize {
        self.samples.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What the receive task hands back when it ends.
pub struct DriverExit<R: RxStream> {
    /// The controller, stopped unless the final drain failed
    pub receiver: ContinuousReceiver<R>,
    /// Blocks delivered to the consumer
    pub blocks: u64,
    /// Drain summary, or the error that ended the task
    pub result: Result<DrainReport>,
}

/// Handle on a running receive task. Dropping it cancels the task.
pub struct ReceiveTask<R: RxStream> {
    cancel: CancellationToken,
    handle: Option<JoinHandle<DriverExit<R>>>,
}

impl<R: RxStream> ReceiveTask<R> {
    /// Ask the task to stop after the current poll.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the task and wait for it to stop and drain the controller.
    pub async fn join(mut self) -> Result<DriverExit<R>> {
        self.cancel.cancel();
        let handle = self
            .handle
            .take()
            .ok_or_else(|| StreamError::transport_failed("receive task already joined"))?;
        handle
            .await
            .map_err(|e| StreamError::transport_failed_with_source("receive task failed", Box::new(e)))
    }
}

impl<R: RxStream> Drop for ReceiveTask<R> {
    fn drop(&mut self) {
        if self.handle.is_some() {
            debug!("Dropping receive task");
            self.cancel.cancel();
        }
    }
}

/// Result of spawning a receive task
pub struct ReceiveChannels<R: RxStream> {
    /// Sample blocks in arrival order
    pub blocks: mpsc::Receiver<SampleBlock<R::Sample>>,
    pub task: ReceiveTask<R>,
}

impl<R: RxStream> ReceiveChannels<R> {
    /// Split into a block stream and the task handle.
    pub fn into_stream(
        self,
    ) -> (impl Stream<Item = SampleBlock<R::Sample>> + Send + 'static, ReceiveTask<R>) {
        (ReceiverStream::new(self.blocks), self.task)
    }

    /// Stop the task, discarding undelivered blocks, and recover the controller.
    pub async fn shutdown(mut self) -> Result<DriverExit<R>> {
        self.blocks.close();
        self.task.join().await
    }
}

/// Driver moves a [`ContinuousReceiver`] onto tokio's blocking pool
///
/// The controller's transport calls block for up to the configured receive
/// timeout, so the loop runs under `spawn_blocking` and hands each non-empty
/// poll to async consumers over a bounded channel. The loop ends when the
/// task is cancelled, the consumer goes away, or the transport fails. The
/// controller is then stopped and returned through [`ReceiveTask::join`].
pub struct ReceiveDriver;

impl ReceiveDriver {
    /// Start `receiver` with `optional_args` and poll it in `chunk`-sample reads.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<R>(
        receiver: ContinuousReceiver<R>,
        optional_args: Vec<u8>,
        chunk: usize,
    ) -> ReceiveChannels<R>
    where
        R: RxStream + 'static,
    {
        let (block_tx, block_rx) = mpsc::channel(BLOCK_QUEUE_DEPTH);
        let cancel = CancellationToken::new();
        let cancel_task = cancel.clone();
        let runtime = Handle::current();

        let handle = tokio::task::spawn_blocking(move || {
            Self::receive_loop(receiver, optional_args, chunk.max(1), block_tx, cancel_task, runtime)
        });

        ReceiveChannels { blocks: block_rx, task: ReceiveTask { cancel, handle: Some(handle) } }
    }

    fn receive_loop<R: RxStream>(
        mut receiver: ContinuousReceiver<R>,
        optional_args: Vec<u8>,
        chunk: usize,
        block_tx: mpsc::Sender<SampleBlock<R::Sample>>,
        cancel: CancellationToken,
        runtime: Handle,
    ) -> DriverExit<R> {
        if let Err(e) = receiver.start(&optional_args) {
            error!("Failed to start receive stream: {}", e);
            return DriverExit { receiver, blocks: 0, result: Err(e) };
        }
        info!("Receive task started");

        let channels = receiver.session().num_channels();
        let mut buffers = vec![vec![R::Sample::default(); chunk]; channels];
        let mut delivered = 0u64;
        let mut failure = None;

        loop {
            if cancel.is_cancelled() {
                info!("Receive task cancelled");
                break;
            }

            let received = {
                let mut views: Vec<&mut [R::Sample]> =
                    buffers.iter_mut().map(|b| b.as_mut_slice()).collect();
                receiver.poll(&mut views, chunk)
            };

            let received = match received {
                Ok(0) => continue,
                Ok(n) => n,
                Err(e) => {
                    error!("Receive poll failed: {}", e);
                    failure = Some(e);
                    break;
                }
            };

            let block = SampleBlock {
                samples: buffers.iter().map(|b| b[..received].to_vec()).collect(),
                time: receiver.last_metadata().time,
            };

            // Waiting on a full queue must still observe cancellation.
            let sent = runtime.block_on(async {
                tokio::select! {
                    _ = cancel.cancelled() => None,
                    sent = block_tx.send(block) => Some(sent.is_ok()),
                }
            });

            match sent {
                Some(true) => {
                    delivered += 1;
                    trace!(block = delivered, samples = received, "Delivered sample block");
                }
                Some(false) => {
                    debug!("Block receiver dropped, shutting down");
                    break;
                }
                None => {
                    info!("Receive task cancelled while delivering");
                    break;
                }
            }
        }

        let stopped = match receiver.phase() {
            ReceivePhase::Stopped => Ok(DrainReport::default()),
            _ => receiver.stop(),
        };
        let result = match failure {
            Some(e) => {
                if let Err(stop_err) = stopped {
                    warn!("Stop after receive failure also failed: {}", stop_err);
                }
                Err(e)
            }
            None => stopped,
        };

        info!("Receive task ended (delivered {} blocks)", delivered);
        DriverExit { receiver, blocks: delivered, result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::ArgBlockWriter;
    use crate::config::StreamConfig;
    use crate::session::StreamingSession;
    use crate::test_utils::{MockRxStream, RxReply};
    use crate::types::StreamMode;
    use anyhow::Result;
    use futures::StreamExt;

    fn receiver(transport: MockRxStream) -> ContinuousReceiver<MockRxStream> {
        let session = StreamingSession::new(vec![0, 1], 2).unwrap();
        ContinuousReceiver::new(transport, session, StreamConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn forwards_blocks_and_returns_stopped_receiver() -> Result<()> {
        let _ = tracing_subscriber::fmt::try_init();

        let transport =
            MockRxStream::scripted([RxReply::Samples(4), RxReply::Samples(4), RxReply::Samples(2)]);
        let channels = ReceiveDriver::spawn(receiver(transport), Vec::new(), 4);
        let (mut blocks, task) = channels.into_stream();

        let first = blocks.next().await.expect("first block");
        assert_eq!(first.samples, vec![vec![0, 1, 2, 3], vec![0, 1, 2, 3]]);
        assert_eq!(first.time, Some(TimeSpec::ZERO));

        assert_eq!(blocks.next().await.expect("second block").len(), 4);
        assert_eq!(blocks.next().await.expect("third block").len(), 2);

        drop(blocks);
        let exit = task.join().await?;
        assert!(exit.result.is_ok());
        assert_eq!(exit.blocks, 3);
        assert_eq!(exit.receiver.phase(), ReceivePhase::Stopped);

        let modes: Vec<_> = exit.receiver.transport().commands().iter().map(|c| c.mode).collect();
        assert_eq!(modes, vec![StreamMode::StartContinuous, StreamMode::StopContinuous]);
        Ok(())
    }

    #[tokio::test]
    async fn scheduled_start_is_passed_through() -> Result<()> {
        let block = ArgBlockWriter::new().command_time(2_000_000_000).finish();
        let channels = ReceiveDriver::spawn(receiver(MockRxStream::new()), block, 8);

        let exit = channels.shutdown().await?;
        let start = exit.receiver.transport().commands()[0];
        assert_eq!(start.time, Some(TimeSpec::from_nanos(2_000_000_000)));
        assert!(!start.stream_now);
        Ok(())
    }

    #[tokio::test]
    async fn transport_error_ends_the_stream() -> Result<()> {
        let transport = MockRxStream::scripted([RxReply::Samples(3), RxReply::Fail]);
        let channels = ReceiveDriver::spawn(receiver(transport), Vec::new(), 8);
        let (blocks, task) = channels.into_stream();

        let received: Vec<_> = blocks.collect().await;
        assert_eq!(received.len(), 1);

        let exit = task.join().await?;
        assert!(matches!(exit.result, Err(StreamError::Transport { .. })));
        assert_eq!(exit.receiver.phase(), ReceivePhase::Stopped);
        Ok(())
    }

    #[tokio::test]
    async fn failed_start_returns_receiver_untouched() -> Result<()> {
        let channels =
            ReceiveDriver::spawn(receiver(MockRxStream::new().rejecting_commands(1)), Vec::new(), 8);
        let (blocks, task) = channels.into_stream();

        assert_eq!(blocks.count().await, 0);
        let exit = task.join().await?;
        assert!(exit.result.is_err());
        assert_eq!(exit.blocks, 0);
        assert_eq!(exit.receiver.phase(), ReceivePhase::Stopped);
        assert!(exit.receiver.transport().commands().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn dropped_consumer_stops_and_drains() -> Result<()> {
        let transport = MockRxStream::scripted([RxReply::Samples(8); 6]);
        let ReceiveChannels { blocks, task } = ReceiveDriver::spawn(receiver(transport), Vec::new(), 8);
        drop(blocks);

        let exit = task.join().await?;
        assert!(exit.result.is_ok());
        assert_eq!(exit.blocks, 0);
        assert_eq!(exit.receiver.phase(), ReceivePhase::Stopped);

        // Whatever was not polled before shutdown is drained.
        let reads = exit.receiver.transport().reads();
        assert_eq!(reads.iter().filter(|&&n| n > 0).count(), 6);
        assert_eq!(reads.last(), Some(&0));
        Ok(())
    }
}
