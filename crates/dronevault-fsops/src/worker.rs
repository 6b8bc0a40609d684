//! Bounded execution of conversion jobs.
//!
//! Jobs run on spawned tasks so a disconnecting client never interrupts a
//! half-written artifact. Two limits apply to every job:
//! - a lock per output directory, so two jobs never write the same target at once;
//! - a semaphore permit, so at most `workers` conversions run concurrently.
//!
//! The output lock is taken before the permit so queued duplicates do not
//! hold a worker slot while they wait.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use dronevault_core::ConversionOutcome;
use dronevault_telemetry::{Metrics, current_request, with_request_context};
use tokio::sync::{Mutex as AsyncMutex, Semaphore, oneshot};
use tracing::{Instrument, debug, error, info_span};

use crate::error::{FsOpsError, FsOpsResult};
use crate::pipeline::{ConversionPipeline, ConversionRequest};

/// Bounded pool that runs [`ConversionPipeline`] jobs.
#[derive(Clone)]
pub struct ConversionWorker {
    pipeline: ConversionPipeline,
    permits: Arc<Semaphore>,
    locks: Arc<OutputLocks>,
    metrics: Metrics,
}

impl ConversionWorker {
    /// Worker allowing `workers` concurrent conversions (at least one).
    #[must_use]
    pub fn new(pipeline: ConversionPipeline, workers: usize, metrics: Metrics) -> Self {
        Self {
            pipeline,
            permits: Arc::new(Semaphore::new(workers.max(1))),
            locks: Arc::new(OutputLocks::default()),
            metrics,
        }
    }

    /// Submit a job and wait for its outcome.
    ///
    /// The job keeps running if the caller stops waiting.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::WorkerUnavailable`] if the job task ends without
    /// reporting an outcome.
    pub async fn submit(&self, request: ConversionRequest) -> FsOpsResult<ConversionOutcome> {
        let (reply, outcome) = oneshot::channel();
        let worker = self.clone();
        let span = info_span!("conversion.job", asset_id = %request.asset);
        let job = async move {
            let result = worker.execute(&request).await;
            if reply.send(result).is_err() {
                debug!("conversion finished after the caller went away");
            }
        };
        match current_request() {
            Some(context) => tokio::spawn(with_request_context(context, job).instrument(span)),
            None => tokio::spawn(job.instrument(span)),
        };

        outcome.await.map_err(|_| {
            error!("conversion job ended without reporting an outcome");
            FsOpsError::WorkerUnavailable {
                reason: "job_dropped",
            }
        })?
    }

    /// `true` while the most recent conversion failed.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.pipeline.is_degraded()
    }

    async fn execute(&self, request: &ConversionRequest) -> FsOpsResult<ConversionOutcome> {
        let output_lock = self.locks.acquire(&request.target.output_dir);
        let outcome = {
            let _writing = output_lock.lock().await;
            let _permit = self.permits.acquire().await.map_err(|_| {
                FsOpsError::WorkerUnavailable {
                    reason: "worker_closed",
                }
            })?;
            let _in_flight = self.metrics.track_conversion();
            self.pipeline.convert(request).await
        };
        drop(output_lock);
        self.locks.release(&request.target.output_dir);
        Ok(outcome)
    }
}

/// Lazily created async locks keyed by output directory.
#[derive(Default)]
struct OutputLocks {
    entries: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

impl OutputLocks {
    fn acquire(&self, dir: &Path) -> Arc<AsyncMutex<()>> {
        Arc::clone(self.entries().entry(dir.to_path_buf()).or_default())
    }

    /// Drop the entry for `dir` once no job holds or awaits it.
    fn release(&self, dir: &Path) {
        let mut entries = self.entries();
        if entries
            .get(dir)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            entries.remove(dir);
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<AsyncMutex<()>>>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("output lock table poisoned; continuing with recovered guard");
                poisoned.into_inner()
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries().len()
    }
}
