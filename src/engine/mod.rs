pub mod budget;
pub mod ledger;
pub mod message;
pub mod qualify;

pub use budget::{classify, extract_budget, BudgetTier};
pub use ledger::DedupLedger;
pub use qualify::{qualify, Qualification, QualificationCriteria, SkipReason};
