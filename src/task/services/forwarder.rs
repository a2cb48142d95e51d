//! Fire-and-forget forwarding of worker output to the observability sink.

use crate::task::{
    domain::TaskId,
    ports::{OutputSink, OutputStream},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Owns the background task that drains a worker's output stream.
///
/// Dropping the forwarder aborts the background task, which drops the
/// stream; this covers every way a task flow can end, including the flow
/// itself being cancelled.
#[derive(Debug)]
pub struct OutputForwarder {
    handle: JoinHandle<u64>,
}

impl OutputForwarder {
    /// Starts forwarding `stream` to `sink`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn<S>(task_id: TaskId, mut stream: OutputStream, sink: Arc<S>) -> Self
    where
        S: OutputSink + ?Sized + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut forwarded = 0_u64;
            while let Some(line) = stream.next_line().await {
                if let Err(err) = sink.forward_line(task_id, &line).await {
                    warn!(%task_id, error = %err, "failed to forward worker output");
                    continue;
                }
                forwarded = forwarded.saturating_add(1);
            }
            forwarded
        });
        Self { handle }
    }

    /// Lets the forwarder drain buffered output for up to `grace`, then
    /// stops it.
    ///
    /// Returns the number of lines forwarded when the stream closed in time.
    pub async fn finish(mut self, grace: Duration) -> Option<u64> {
        match tokio::time::timeout(grace, &mut self.handle).await {
            Ok(Ok(forwarded)) => {
                debug!(forwarded, "worker output drained");
                Some(forwarded)
            }
            Ok(Err(err)) => {
                warn!(error = %err, "worker output forwarder stopped abnormally");
                None
            }
            Err(_) => {
                debug!("worker output still open after grace period, stopping forwarder");
                None
            }
        }
    }
}

impl Drop for OutputForwarder {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
