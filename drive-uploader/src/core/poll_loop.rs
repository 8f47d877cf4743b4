use crate::core::upload_engine::UploadPass;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Runs an upload pass every `interval` until cancelled.
///
/// The wait starts only after the previous pass returned, so passes never
/// overlap. Cancellation interrupts the wait, never a running pass.
pub struct PollLoop {
    interval: Duration,
    cancel: CancellationToken,
}

impl PollLoop {
    pub fn new(interval: Duration, cancel: CancellationToken) -> Self {
        Self { interval, cancel }
    }

    /// Returns the number of passes that ran.
    pub async fn run<P: UploadPass + ?Sized>(&self, pass: &mut P) -> usize {
        let mut passes = 0;
        tracing::info!("Checking for new images every {}s", self.interval.as_secs());

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }

            match pass.run_pass().await {
                Ok(report) => tracing::debug!("Pass finished: {:?}", report),
                Err(e) => tracing::error!("Upload pass failed: {}", e),
            }
            passes += 1;
        }

        tracing::info!("Leaving poll loop. Goodbye!");
        passes
    }
}
