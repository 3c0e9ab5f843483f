use crate::error::SubmissionFailure;
use async_trait::async_trait;

/// A fully specified bid for one listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    pub identifier: String,
    pub link: String,
    pub title: String,
    pub amount: u32,
    pub duration_days: u32,
    pub message: String,
}

/// Success signal from a submission port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionReceipt {
    /// The offer was posted to the site.
    Live,
    /// Nothing was sent.
    DryRun,
}

impl SubmissionReceipt {
    pub fn is_live(self) -> bool {
        matches!(self, SubmissionReceipt::Live)
    }
}

/// Whatever drives the target site's offer form.
///
/// Calls are made one at a time: implementations may hold a single
/// interactive session.
#[async_trait]
pub trait SubmissionPort: Send {
    /// Open the session. Called once per run before the first submission.
    async fn authenticate(&mut self) -> Result<(), SubmissionFailure>;

    async fn submit(&mut self, request: &SubmissionRequest)
        -> Result<SubmissionReceipt, SubmissionFailure>;
}

/// Logs the offers it would post.
#[derive(Debug, Default)]
pub struct DryRunSubmitter {
    submitted: Vec<SubmissionRequest>,
}

impl DryRunSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> &[SubmissionRequest] {
        &self.submitted
    }
}

#[async_trait]
impl SubmissionPort for DryRunSubmitter {
    async fn authenticate(&mut self) -> Result<(), SubmissionFailure> {
        tracing::info!("DRY RUN: skipping sign-in");
        Ok(())
    }

    async fn submit(
        &mut self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionReceipt, SubmissionFailure> {
        tracing::info!(
            link = %request.link,
            title = %request.title,
            amount = request.amount,
            duration_days = request.duration_days,
            "DRY RUN: would submit offer"
        );
        self.submitted.push(request.clone());
        Ok(SubmissionReceipt::DryRun)
    }
}
