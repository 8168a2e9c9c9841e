//! Bounded-parallelism execution of independent media commands.

use std::time::Duration;

use rayon::prelude::*;

use crate::cancel::CancelHandle;

use super::commands::MediaCommand;
use super::errors::{MediaError, MediaResult};
use super::process::{run_with_timeout, ProcessOutput};

/// Result of one command in a batch.
#[derive(Debug)]
pub struct CommandOutcome {
    /// Position of the command in the submitted batch.
    pub index: usize,
    pub result: MediaResult<ProcessOutput>,
}

impl CommandOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs a batch of commands on a dedicated worker pool.
///
/// Owned by whoever submits the batch; there is no global executor.
#[derive(Debug, Clone)]
pub struct BatchExecutor {
    workers: usize,
    timeout: Option<Duration>,
    cancel: Option<CancelHandle>,
}

impl BatchExecutor {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            timeout: None,
            cancel: None,
        }
    }

    /// Kill any single command that runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Commands not yet started when `cancel` fires report `Cancelled`.
    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run all commands, returning one outcome per command in submission order.
    pub fn run(&self, commands: &[MediaCommand]) -> MediaResult<Vec<CommandOutcome>> {
        if commands.is_empty() {
            return Ok(Vec::new());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers.min(commands.len()))
            .build()
            .map_err(|e| MediaError::Io(std::io::Error::other(e.to_string())))?;

        tracing::debug!(
            "[Batch] Running {} commands on {} workers",
            commands.len(),
            self.workers.min(commands.len())
        );

        let outcomes = pool.install(|| {
            commands
                .par_iter()
                .enumerate()
                .map(|(index, command)| {
                    let result = if self.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
                        Err(MediaError::Cancelled)
                    } else {
                        run_with_timeout(command, self.timeout)
                    };
                    if let Err(e) = &result {
                        tracing::warn!("[Batch] Command {} failed: {}", index, e);
                    }
                    CommandOutcome { index, result }
                })
                .collect()
        });

        Ok(outcomes)
    }

    /// Run all commands and fail on the first failed outcome.
    pub fn run_all(&self, commands: &[MediaCommand]) -> MediaResult<Vec<ProcessOutput>> {
        self.run(commands)?
            .into_iter()
            .map(|outcome| outcome.result)
            .collect()
    }
}

impl Default for BatchExecutor {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);
        Self::new(workers)
    }
}
