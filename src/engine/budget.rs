use crate::error::UnrecognizedBudget;

/// Marker preceding the budget phrase inside a listing description.
pub const BUDGET_MARKER: &str = "Budget :";
/// Currency symbol closing the budget phrase.
pub const CURRENCY_MARKER: &str = "€";
/// Phrase used by the feed for the lowest budget bracket.
pub const UNDER_500_MARKER: &str = "Moins de 500";

/// Bid terms derived from a listing's budget bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetTier {
    pub amount: u32,
    pub duration_days: u32,
}

impl BudgetTier {
    pub const UNDER_500: BudgetTier = BudgetTier { amount: 390, duration_days: 2 };
    pub const FROM_500_TO_1000: BudgetTier = BudgetTier { amount: 750, duration_days: 7 };
    pub const FROM_1000_TO_10000: BudgetTier = BudgetTier { amount: 3500, duration_days: 21 };
    pub const OVER_10000: BudgetTier = BudgetTier { amount: 7500, duration_days: 90 };
}

/// Pull the budget phrase out of a listing description.
///
/// "Budget : Moins de 500 € - Catégories : Web" -> "Moins de 500".
/// Returns an empty phrase when the description carries no budget marker.
pub fn extract_budget(description: &str) -> String {
    let Some((_, after)) = description.split_once(BUDGET_MARKER) else {
        return String::new();
    };
    let section = after.split(BUDGET_MARKER).next().unwrap_or_default();
    section
        .split(CURRENCY_MARKER)
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Map a budget phrase to its bid tier.
///
/// Literal, case-sensitive substring checks in fixed priority order; the first
/// match wins. A phrase carrying "500", "1000" and "10000" therefore lands in
/// the 500-1000 tier.
pub fn classify(phrase: &str) -> Result<BudgetTier, UnrecognizedBudget> {
    let has = |needle: &str| phrase.contains(needle);

    if has(UNDER_500_MARKER) {
        Ok(BudgetTier::UNDER_500)
    } else if has("500") && has("1000") {
        Ok(BudgetTier::FROM_500_TO_1000)
    } else if has("1000") && has("10000") {
        Ok(BudgetTier::FROM_1000_TO_10000)
    } else if has("10000") {
        // Shadowed by the rule above ("10000" contains "1000"); kept so the
        // tier table stays complete.
        Ok(BudgetTier::OVER_10000)
    } else {
        Err(UnrecognizedBudget {
            phrase: phrase.to_string(),
        })
    }
}
