use std::collections::BTreeMap;
use std::time::Instant;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{with_metadata, ComputationOutput, Money, Percent};
use crate::SavingsPlanResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Inputs for expanding a base contribution into per-year plans.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanInput {
    pub horizon_years: u32,
    /// Contribution paid in policy year 1.
    pub base_contribution: Money,
    /// Annual indexation applied to the previous year's amount.
    #[serde(default)]
    pub base_index_percent: Percent,
    /// Per-year indexation replacing `base_index_percent` for that year.
    #[serde(default)]
    pub index_overrides: BTreeMap<u32, Percent>,
    /// Explicit yearly amounts, used verbatim.
    #[serde(default)]
    pub contribution_overrides: BTreeMap<u32, Money>,
    #[serde(default)]
    pub withdrawals: BTreeMap<u32, Money>,
}

/// Per-year contribution and withdrawal amounts. Both vectors have
/// `horizon_years + 1` slots; slot 0 is unused so that index == policy year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpandedPlans {
    pub contributions: Vec<Money>,
    pub withdrawals: Vec<Money>,
}

impl ExpandedPlans {
    pub fn horizon_years(&self) -> u32 {
        self.contributions.len().saturating_sub(1) as u32
    }

    pub fn contribution(&self, year: u32) -> Money {
        self.contributions
            .get(year as usize)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn withdrawal(&self, year: u32) -> Money {
        self.withdrawals
            .get(year as usize)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn total_contributions(&self) -> Money {
        self.contributions.iter().skip(1).sum()
    }

    pub fn total_withdrawals(&self) -> Money {
        self.withdrawals.iter().skip(1).sum()
    }
}

// ---------------------------------------------------------------------------
// Core function
// ---------------------------------------------------------------------------

/// Expand the base contribution and the override maps into full yearly plans.
///
/// Year 1 pays the base amount. Every later year either takes its explicit
/// override verbatim or grows the previous year's amount by that year's
/// index (override or base). Overrides outside `1..=horizon_years` are
/// ignored. Never fails.
pub fn expand_plans(input: &PlanInput) -> ExpandedPlans {
    let slots = input.horizon_years as usize + 1;
    let mut contributions = vec![Decimal::ZERO; slots];
    let mut withdrawals = vec![Decimal::ZERO; slots];

    for year in 1..=input.horizon_years {
        let amount = if year == 1 {
            input.base_contribution
        } else if let Some(explicit) = input.contribution_overrides.get(&year) {
            *explicit
        } else {
            let index = input
                .index_overrides
                .get(&year)
                .copied()
                .unwrap_or(input.base_index_percent);
            contributions[year as usize - 1] * (Decimal::ONE + index / Decimal::ONE_HUNDRED)
        };
        contributions[year as usize] = amount;
        withdrawals[year as usize] = input
            .withdrawals
            .get(&year)
            .copied()
            .unwrap_or(Decimal::ZERO);
    }

    ExpandedPlans {
        contributions,
        withdrawals,
    }
}

/// Envelope wrapper around [`expand_plans`] used by the CLI and bindings.
pub fn build_plan(input: &PlanInput) -> SavingsPlanResult<ComputationOutput<ExpandedPlans>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    crate::projection::check_horizon(input.horizon_years)?;

    let ignored: Vec<u32> = input
        .index_overrides
        .keys()
        .chain(input.contribution_overrides.keys())
        .chain(input.withdrawals.keys())
        .copied()
        .filter(|y| *y == 0 || *y > input.horizon_years)
        .collect();
    if !ignored.is_empty() {
        warnings.push(format!(
            "Overrides for years outside 1..={} ignored: {:?}",
            input.horizon_years, ignored
        ));
    }
    if input.contribution_overrides.contains_key(&1) {
        warnings.push("Year 1 always pays the base contribution; override ignored".into());
    }

    let plans = expand_plans(input);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Contribution plan expansion (indexed base with explicit yearly overrides)",
        &serde_json::json!({
            "horizon_years": input.horizon_years,
            "base_contribution": input.base_contribution.to_string(),
            "base_index_percent": input.base_index_percent.to_string(),
        }),
        warnings,
        elapsed,
        plans,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
