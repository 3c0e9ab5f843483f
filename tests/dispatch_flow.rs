//! End-to-end dispatch runs against a fake submission port.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeDelta, TimeZone, Utc};
use listing_bidder::engine::message::fallback_message;
use listing_bidder::engine::{DedupLedger, QualificationCriteria, SkipReason};
use listing_bidder::error::{DispatchError, SubmissionFailure};
use listing_bidder::execution::{DryRunSubmitter, SubmissionPort, SubmissionReceipt, SubmissionRequest};
use listing_bidder::feed::rss::parse_listings;
use listing_bidder::feed::types::ListingEntry;
use listing_bidder::pipeline::{Decision, DispatchPipeline, ListingOutcome};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

const FEED_XML: &str = include_str!("fixtures/projects_rss.xml");

/// Records every call; fails submissions for the listed identifiers.
#[derive(Default)]
struct FakePort {
    fail_for: HashSet<String>,
    reject_sign_in: bool,
    sign_ins: usize,
    submitted: Vec<SubmissionRequest>,
}

#[async_trait]
impl SubmissionPort for FakePort {
    async fn authenticate(&mut self) -> Result<(), SubmissionFailure> {
        self.sign_ins += 1;
        if self.reject_sign_in {
            return Err(SubmissionFailure::Authentication("bad password".into()));
        }
        Ok(())
    }

    async fn submit(
        &mut self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionReceipt, SubmissionFailure> {
        self.submitted.push(request.clone());
        if self.fail_for.contains(&request.identifier) {
            return Err(SubmissionFailure::MissingElement("offer_amount".into()));
        }
        Ok(SubmissionReceipt::Live)
    }
}

fn paris() -> FixedOffset {
    FixedOffset::east_opt(3600).unwrap()
}

/// 2025-01-15 10:00 +01:00, matching the fixture feed.
fn now() -> DateTime<Utc> {
    paris()
        .with_ymd_and_hms(2025, 1, 15, 10, 0, 0)
        .unwrap()
        .with_timezone(&Utc)
}

fn minutes_ago(minutes: i64) -> String {
    (now().with_timezone(&paris()) - TimeDelta::minutes(minutes))
        .format("%a, %d %b %Y %H:%M:%S %z")
        .to_string()
}

fn site_vitrine(description: &str) -> ListingEntry {
    ListingEntry {
        title: "Site vitrine".to_string(),
        link: "https://www.codeur.com/projects/4001-site-vitrine".to_string(),
        description: description.to_string(),
        identifier: "codeur-4001".to_string(),
        published: minutes_ago(5),
    }
}

fn pipeline_in(
    dir: &tempfile::TempDir,
    templates: Vec<String>,
    criteria: QualificationCriteria,
) -> DispatchPipeline<StdRng> {
    let ledger = DedupLedger::load(dir.path().join("posted_offers.txt")).unwrap();
    DispatchPipeline::new(ledger, templates, criteria, StdRng::seed_from_u64(5))
}

#[tokio::test]
async fn test_under_500_listing_is_submitted_and_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipe = pipeline_in(&dir, vec![], QualificationCriteria::default());
    let mut port = FakePort::default();

    let entry = site_vitrine("Budget : Moins de 500 € - Catégories : Web");
    let summary = pipe.run(&[entry], &mut port, now).await.unwrap();

    assert_eq!(summary.submitted(), 1);
    assert_eq!(port.sign_ins, 1);
    assert_eq!(port.submitted.len(), 1);
    let req = &port.submitted[0];
    assert_eq!(req.amount, 390);
    assert_eq!(req.duration_days, 2);
    assert_eq!(req.link, "https://www.codeur.com/projects/4001-site-vitrine");
    assert!(pipe.ledger().contains("codeur-4001"));
}

#[tokio::test]
async fn test_listing_already_in_ledger_is_not_submitted() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("posted_offers.txt"), "codeur-4001\n").unwrap();
    let mut pipe = pipeline_in(&dir, vec![], QualificationCriteria::default());
    let mut port = FakePort::default();

    let entry = site_vitrine("Budget : Moins de 500 € - Catégories : Web");
    let summary = pipe.run(&[entry], &mut port, now).await.unwrap();

    match &summary.outcomes[0] {
        ListingOutcome::Skipped(skip) => assert_eq!(skip.reason, SkipReason::Duplicate),
        other => panic!("expected duplicate skip, got {:?}", other),
    }
    assert!(port.submitted.is_empty());
    // Nothing qualified, so no session was opened.
    assert_eq!(port.sign_ins, 0);
}

#[test]
fn test_missing_budget_marker_is_unrecognized() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipe = pipeline_in(&dir, vec![], QualificationCriteria::default());

    let entry = site_vitrine("Création d'un site. Catégories : Web");
    match pipe.evaluate(&entry, now()) {
        Decision::Skip(skip) => {
            assert_eq!(skip.reason, SkipReason::UnrecognizedBudget(String::new()));
        }
        other => panic!("expected skip, got {:?}", other),
    }
}

#[test]
fn test_empty_template_store_uses_fallback_message() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipe = pipeline_in(&dir, vec![], QualificationCriteria::default());

    let entry = site_vitrine("Budget : Moins de 500 € - Catégories : Web");
    match pipe.evaluate(&entry, now()) {
        Decision::Submit(req) => {
            assert_eq!(req.message, fallback_message("Site vitrine"));
            assert!(req.message.contains("Site vitrine"));
        }
        other => panic!("expected submit, got {:?}", other),
    }
}

#[tokio::test]
async fn test_submission_failure_is_not_recorded_and_run_continues() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipe = pipeline_in(&dir, vec![], QualificationCriteria::default());
    let mut port = FakePort {
        fail_for: HashSet::from(["codeur-1".to_string()]),
        ..Default::default()
    };

    let mut first = site_vitrine("Budget : Moins de 500 €");
    first.identifier = "codeur-1".into();
    let mut second = site_vitrine("Budget : 500 - 1000 €");
    second.identifier = "codeur-2".into();

    let summary = pipe.run(&[first, second], &mut port, now).await.unwrap();

    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.submitted(), 1);
    assert!(matches!(
        &summary.outcomes[0],
        ListingOutcome::Failed { failure: SubmissionFailure::MissingElement(_), .. }
    ));
    assert!(!pipe.ledger().contains("codeur-1"));
    assert!(pipe.ledger().contains("codeur-2"));
    assert_eq!(port.sign_ins, 1);
}

#[tokio::test]
async fn test_rejected_sign_in_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipe = pipeline_in(&dir, vec![], QualificationCriteria::default());
    let mut port = FakePort {
        reject_sign_in: true,
        ..Default::default()
    };

    let entry = site_vitrine("Budget : Moins de 500 €");
    let result = pipe.run(&[entry], &mut port, now).await;

    assert!(matches!(result, Err(DispatchError::Authentication(_))));
    assert!(port.submitted.is_empty());
    assert!(pipe.ledger().is_empty());
}

#[tokio::test]
async fn test_unwritable_ledger_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = DedupLedger::load(dir.path().join("gone").join("posted_offers.txt")).unwrap();
    let mut pipe = DispatchPipeline::new(
        ledger,
        vec![],
        QualificationCriteria::default(),
        StdRng::seed_from_u64(1),
    );
    let mut port = FakePort::default();

    let mut first = site_vitrine("Budget : Moins de 500 €");
    first.identifier = "codeur-1".into();
    let mut second = site_vitrine("Budget : Moins de 500 €");
    second.identifier = "codeur-2".into();

    let result = pipe.run(&[first, second], &mut port, now).await;
    assert!(matches!(result, Err(DispatchError::Ledger(_))));
    // Stopped right after the first submission could not be recorded.
    assert_eq!(port.submitted.len(), 1);
}

#[tokio::test]
async fn test_dry_run_is_never_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipe = pipeline_in(&dir, vec![], QualificationCriteria::default());
    let mut port = DryRunSubmitter::new();

    let entry = site_vitrine("Budget : Moins de 500 €");
    let summary = pipe.run(&[entry], &mut port, now).await.unwrap();

    assert!(matches!(
        &summary.outcomes[0],
        ListingOutcome::Submitted { recorded: false, .. }
    ));
    assert_eq!(port.submitted().len(), 1);
    assert!(pipe.ledger().is_empty());
    assert!(!dir.path().join("posted_offers.txt").exists());
}

#[tokio::test]
async fn test_fixture_feed_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let criteria = QualificationCriteria {
        exclusion_keywords: vec!["Shopify".to_string()],
        ..Default::default()
    };
    let templates = vec!["Bonjour, $title nous intéresse.".to_string()];
    let mut pipe = pipeline_in(&dir, templates, criteria);
    let mut port = FakePort::default();

    let entries = parse_listings(FEED_XML).unwrap();
    assert_eq!(entries.len(), 5);
    let summary = pipe.run(&entries, &mut port, now).await.unwrap();

    let reasons: Vec<Option<&str>> = summary
        .outcomes
        .iter()
        .map(|o| match o {
            ListingOutcome::Skipped(s) => Some(s.reason.tag()),
            _ => None,
        })
        .collect();
    assert_eq!(
        reasons,
        vec![
            None,
            Some("excluded-keyword"),
            None,
            Some("unrecognized-budget"),
            Some("stale"),
        ]
    );

    let terms: Vec<(u32, u32)> = port
        .submitted
        .iter()
        .map(|r| (r.amount, r.duration_days))
        .collect();
    assert_eq!(terms, vec![(390, 2), (3500, 21)]);
    assert_eq!(port.submitted[1].message, "Bonjour, Application de réservation nous intéresse.");

    let mut recorded: Vec<&String> = pipe.ledger().identifiers().iter().collect();
    recorded.sort();
    assert_eq!(recorded, vec!["codeur-4001", "codeur-4003"]);
}

#[tokio::test]
async fn test_each_listing_sees_fresh_clock() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipe = pipeline_in(&dir, vec![], QualificationCriteria::default());
    let mut port = FakePort::default();

    // Published 29 minutes before the first tick; the clock then jumps 2 minutes.
    let mut first = site_vitrine("Budget : Moins de 500 €");
    first.published = minutes_ago(29);
    first.identifier = "codeur-a".into();
    let mut second = first.clone();
    second.identifier = "codeur-b".into();

    let ticks = std::sync::atomic::AtomicI64::new(0);
    let clock = || {
        let n = ticks.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        now() + TimeDelta::minutes(2 * n)
    };
    let summary = pipe.run(&[first, second], &mut port, clock).await.unwrap();

    assert_eq!(summary.submitted(), 1);
    assert_eq!(summary.skipped(), 1);
    assert!(pipe.ledger().contains("codeur-a"));
}
