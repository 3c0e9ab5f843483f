pub mod executor;
pub mod form;

pub use executor::{DryRunSubmitter, SubmissionPort, SubmissionReceipt, SubmissionRequest};
pub use form::{Credentials, FormSubmitter};
