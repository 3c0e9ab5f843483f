use std::path::PathBuf;
use thiserror::Error;

/// Budget phrase matched none of the known tiers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized budget: {phrase:?}")]
pub struct UnrecognizedBudget {
    pub phrase: String,
}

/// Ledger storage could not be read or appended to. Fatal for a run.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("ledger {path} unavailable")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The submission collaborator could not complete the form flow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionFailure {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("form element `{0}` not found")]
    MissingElement(String),

    #[error("submission to {url} rejected with status {status}")]
    Rejected { url: String, status: u16 },

    #[error("timed out during {0}")]
    Timeout(String),
}

/// Conditions that stop a dispatch run before the feed is exhausted.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("could not open a submission session: {0}")]
    Authentication(SubmissionFailure),
}
