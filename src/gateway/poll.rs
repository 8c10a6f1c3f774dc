use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const MAX_POLL_ATTEMPTS: u32 = 300;

/// Opaque identifier of a job submitted to an image provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle(pub String);

/// URLs produced by a finished generation job.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GeneratedImage {
    pub file_url: String,
    pub thumb_url: Option<String>,
    pub depth_map_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Succeeded(GeneratedImage),
    Failed(String),
}

/// What a provider answers right after a job is submitted. Some providers
/// finish small jobs synchronously, so the status may already be final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub handle: JobHandle,
    pub status: JobStatus,
}

/// An asynchronous text-to-image provider.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Identifies the model or style recorded alongside generated assets.
    fn model_id(&self) -> String;

    async fn submit(&self, prompt: &str) -> Result<Submission>;

    async fn status(&self, handle: &JobHandle) -> Result<JobStatus>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    /// Wall-clock budget for the whole wait, on top of the attempt budget.
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            max_attempts: MAX_POLL_ATTEMPTS,
            timeout: None,
        }
    }
}

/// Waits for a submitted job, sleeping `interval` before every status check.
///
/// A `Failed` status ends the wait at once. Running out of attempts (or of
/// the optional wall-clock budget) yields [`Error::GenerationTimeout`], and
/// cancelling `cancel` yields [`Error::Cancelled`] without another request
/// being sent.
pub async fn poll_to_completion<G>(
    generator: &G,
    handle: &JobHandle,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> Result<GeneratedImage>
where
    G: ImageGenerator + ?Sized,
{
    let attempts_made = AtomicU32::new(0);
    let polling = async {
        for attempt in 1..=policy.max_attempts {
            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(policy.interval) => {}
            }

            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                status = generator.status(handle) => status?,
            };
            attempts_made.store(attempt, Ordering::Relaxed);

            match status {
                JobStatus::Succeeded(image) => {
                    log::info!("Job {} completed after {} polls", handle.0, attempt);
                    return Ok(image);
                }
                JobStatus::Failed(reason) => {
                    log::warn!("Job {} failed: {}", handle.0, reason);
                    return Err(Error::Upstream(format!(
                        "generation job {} failed: {}",
                        handle.0, reason
                    )));
                }
                JobStatus::Pending => {
                    log::debug!("Job {} still pending (poll {})", handle.0, attempt);
                }
            }
        }

        Err(Error::GenerationTimeout {
            attempts: policy.max_attempts,
        })
    };

    match policy.timeout {
        Some(budget) => tokio::time::timeout(budget, polling)
            .await
            .unwrap_or_else(|_| {
                Err(Error::GenerationTimeout {
                    attempts: attempts_made.load(Ordering::Relaxed),
                })
            }),
        None => polling.await,
    }
}

/// Submits a job and, unless the provider finished it immediately, polls it to completion.
pub async fn generate<G>(
    generator: &G,
    prompt: &str,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> Result<GeneratedImage>
where
    G: ImageGenerator + ?Sized,
{
    let submission = generator.submit(prompt).await?;
    match submission.status {
        JobStatus::Succeeded(image) => Ok(image),
        JobStatus::Failed(reason) => Err(Error::Upstream(format!(
            "generation job {} failed: {}",
            submission.handle.0, reason
        ))),
        JobStatus::Pending => {
            log::info!("Polling job {} for completion...", submission.handle.0);
            poll_to_completion(generator, &submission.handle, policy, cancel).await
        }
    }
}
