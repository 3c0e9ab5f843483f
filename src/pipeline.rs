use crate::engine::budget::{classify, extract_budget};
use crate::engine::ledger::DedupLedger;
use crate::engine::message::compose;
use crate::engine::qualify::{qualify, Qualification, QualificationCriteria, SkipReason};
use crate::error::{DispatchError, SubmissionFailure};
use crate::execution::{SubmissionPort, SubmissionRequest};
use crate::feed::types::ListingEntry;
use chrono::{DateTime, Utc};
use rand::Rng;

/// A listing that will not get a bid, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipDecision {
    pub identifier: String,
    pub title: String,
    pub reason: SkipReason,
}

/// Outcome of the pure decision stage for one listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Skip(SkipDecision),
    Submit(SubmissionRequest),
}

/// Terminal state of one listing after a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingOutcome {
    Skipped(SkipDecision),
    /// Accepted by the port. `recorded` is false for dry-run receipts.
    Submitted {
        request: SubmissionRequest,
        recorded: bool,
    },
    /// The port failed; the identifier stays out of the ledger.
    Failed {
        request: SubmissionRequest,
        failure: SubmissionFailure,
    },
}

impl ListingOutcome {
    /// One-line human-readable status.
    pub fn status_line(&self) -> String {
        match self {
            ListingOutcome::Skipped(skip) => {
                format!("SKIP   [{}] {}", skip.reason, skip.title)
            }
            ListingOutcome::Submitted { request, recorded } => format!(
                "{} {} € / {} j - {}",
                if *recorded { "SENT  " } else { "DRY   " },
                request.amount,
                request.duration_days,
                request.title
            ),
            ListingOutcome::Failed { request, failure } => {
                format!("FAILED {} - {}", request.title, failure)
            }
        }
    }
}

/// Per-listing outcomes of one run, in feed order.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<ListingOutcome>,
}

impl RunSummary {
    pub fn submitted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ListingOutcome::Submitted { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ListingOutcome::Failed { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ListingOutcome::Skipped(_)))
            .count()
    }
}

/// Turns feed entries into bids: qualification, budget tier, message, submission,
/// then ledger bookkeeping. Listings are handled strictly one at a time.
pub struct DispatchPipeline<R> {
    ledger: DedupLedger,
    templates: Vec<String>,
    criteria: QualificationCriteria,
    rng: R,
}

impl<R: Rng + Send> DispatchPipeline<R> {
    pub fn new(
        ledger: DedupLedger,
        templates: Vec<String>,
        criteria: QualificationCriteria,
        rng: R,
    ) -> Self {
        Self {
            ledger,
            templates,
            criteria,
            rng,
        }
    }

    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    pub fn into_ledger(self) -> DedupLedger {
        self.ledger
    }

    /// Decide what to do with one listing. Touches nothing but the RNG.
    pub fn evaluate(&mut self, entry: &ListingEntry, now: DateTime<Utc>) -> Decision {
        let skip = |reason: SkipReason| {
            Decision::Skip(SkipDecision {
                identifier: entry.identifier.clone(),
                title: entry.title.clone(),
                reason,
            })
        };

        if let Qualification::Skip(reason) = qualify(entry, &self.ledger, &self.criteria, now) {
            return skip(reason);
        }

        let phrase = extract_budget(&entry.description);
        let tier = match classify(&phrase) {
            Ok(tier) => tier,
            Err(e) => return skip(SkipReason::UnrecognizedBudget(e.phrase)),
        };

        let message = compose(&entry.title, &self.templates, &mut self.rng);
        Decision::Submit(SubmissionRequest {
            identifier: entry.identifier.clone(),
            link: entry.link.clone(),
            title: entry.title.clone(),
            amount: tier.amount,
            duration_days: tier.duration_days,
            message,
        })
    }

    /// Process one feed snapshot in order.
    ///
    /// The port is authenticated lazily before the first submission. Only live
    /// receipts are recorded. Submission failures are reported per listing;
    /// ledger write failures and sign-in failures abort the run.
    pub async fn run<P, C>(
        &mut self,
        entries: &[ListingEntry],
        port: &mut P,
        clock: C,
    ) -> Result<RunSummary, DispatchError>
    where
        P: SubmissionPort + ?Sized,
        C: Fn() -> DateTime<Utc> + Send,
    {
        let mut summary = RunSummary::default();
        let mut authenticated = false;

        for entry in entries {
            let request = match self.evaluate(entry, clock()) {
                Decision::Skip(skip) => {
                    tracing::info!(
                        id = %skip.identifier,
                        title = %skip.title,
                        reason = skip.reason.tag(),
                        "listing skipped"
                    );
                    summary.outcomes.push(ListingOutcome::Skipped(skip));
                    continue;
                }
                Decision::Submit(request) => request,
            };

            if !authenticated {
                port.authenticate()
                    .await
                    .map_err(DispatchError::Authentication)?;
                authenticated = true;
            }

            match port.submit(&request).await {
                Ok(receipt) => {
                    let recorded = receipt.is_live();
                    if recorded {
                        self.ledger.record(&request.identifier)?;
                    }
                    tracing::info!(
                        id = %request.identifier,
                        amount = request.amount,
                        duration_days = request.duration_days,
                        recorded,
                        "offer accepted"
                    );
                    summary
                        .outcomes
                        .push(ListingOutcome::Submitted { request, recorded });
                }
                Err(failure) => {
                    tracing::warn!(
                        id = %request.identifier,
                        title = %request.title,
                        error = %failure,
                        "offer submission failed"
                    );
                    summary
                        .outcomes
                        .push(ListingOutcome::Failed { request, failure });
                }
            }
        }

        tracing::info!(
            submitted = summary.submitted(),
            failed = summary.failed(),
            skipped = summary.skipped(),
            "dispatch run complete"
        );
        Ok(summary)
    }
}
