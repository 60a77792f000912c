use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Percentages as plain numbers (12 = 12%). Divided by 100 at point of use.
pub type Percent = Decimal;

/// Fund units held in an account pool.
pub type Units = Decimal;

/// Currency code
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    HUF,
    EUR,
    USD,
    GBP,
    CHF,
    Other(String),
}

/// How often a contribution is paid within a policy year. The Hungarian
/// names (`havi`, `negyedéves`, `féléves`, `éves`) load as aliases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentFrequency {
    #[default]
    #[serde(alias = "havi")]
    Monthly,
    #[serde(alias = "negyedeves", alias = "negyedéves")]
    Quarterly,
    #[serde(alias = "feleves", alias = "féléves")]
    SemiAnnual,
    #[serde(alias = "eves", alias = "éves")]
    Annual,
}

impl PaymentFrequency {
    /// Months between two payments.
    pub fn interval_months(self) -> u32 {
        match self {
            PaymentFrequency::Monthly => 1,
            PaymentFrequency::Quarterly => 3,
            PaymentFrequency::SemiAnnual => 6,
            PaymentFrequency::Annual => 12,
        }
    }

    pub fn payments_per_year(self) -> u32 {
        12 / self.interval_months()
    }

    /// True when a payment falls due in `month` (1-based month of the policy year).
    pub fn is_payment_month(self, month: u32) -> bool {
        month >= 1 && (month - 1) % self.interval_months() == 0
    }
}

/// Inclusive policy-year window. An open `to` means "until the end of the horizon".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub from: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<u32>,
}

impl YearRange {
    pub fn new(from: u32, to: Option<u32>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, year: u32) -> bool {
        year >= self.from && self.to.map_or(true, |to| year <= to)
    }

    /// A closed range whose end precedes its start selects no year at all.
    pub fn is_empty(&self) -> bool {
        matches!(self.to, Some(to) if to < self.from)
    }
}

/// A year-indexed parameter: a base value plus sparse per-year overrides.
///
/// Absence of an override means "use the base value"; an explicit zero
/// override is a real value and is honoured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YearTable {
    #[serde(default)]
    pub base: Decimal,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub by_year: BTreeMap<u32, Decimal>,
}

impl YearTable {
    pub fn flat(base: Decimal) -> Self {
        Self {
            base,
            by_year: BTreeMap::new(),
        }
    }

    pub fn with_override(mut self, year: u32, value: Decimal) -> Self {
        self.by_year.insert(year, value);
        self
    }

    pub fn get(&self, year: u32) -> Decimal {
        self.by_year.get(&year).copied().unwrap_or(self.base)
    }

    /// Smallest value the table can produce.
    pub fn min_value(&self) -> Decimal {
        self.by_year
            .values()
            .copied()
            .fold(self.base, |acc, v| acc.min(v))
    }

    /// Largest value the table can produce.
    pub fn max_value(&self) -> Decimal {
        self.by_year
            .values()
            .copied()
            .fold(self.base, |acc, v| acc.max(v))
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
