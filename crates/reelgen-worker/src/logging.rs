//! Structured job logging utilities.

use tracing::{error, info, warn, Span};

use reelgen_models::{JobId, Stage};

/// Job logger for structured logging with consistent formatting.
///
/// Carries the job ID so stage lifecycle events share the same
/// contextual fields.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
}

impl JobLogger {
    pub fn new(job_id: &JobId) -> Self {
        Self {
            job_id: job_id.to_string(),
        }
    }

    /// Log entry into a pipeline stage.
    pub fn stage_started(&self, stage: Stage, attempt: u32) {
        info!(
            job_id = %self.job_id,
            stage = %stage,
            attempt,
            "stage started"
        );
    }

    /// Log a progress update during stage execution.
    pub fn progress(&self, stage: Stage, message: &str) {
        info!(
            job_id = %self.job_id,
            stage = %stage,
            "{}", message
        );
    }

    /// Log a retriable failure within a stage.
    pub fn stage_retrying(&self, stage: Stage, message: &str) {
        warn!(
            job_id = %self.job_id,
            stage = %stage,
            "stage retrying: {}", message
        );
    }

    /// Log a stage failure that ends the job.
    pub fn stage_failed(&self, stage: Stage, message: &str) {
        error!(
            job_id = %self.job_id,
            stage = %stage,
            "stage failed: {}", message
        );
    }

    /// Log job completion.
    pub fn completed(&self, message: &str) {
        info!(job_id = %self.job_id, "job completed: {}", message);
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Create a tracing span for this job.
    pub fn span(&self) -> Span {
        tracing::info_span!("job", job_id = %self.job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logger_carries_the_job_id() {
        let job_id = JobId::from_string("job-123");
        let logger = JobLogger::new(&job_id);
        assert_eq!(logger.job_id(), "job-123");
    }
}
