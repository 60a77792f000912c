use std::collections::BTreeMap;
use std::time::Instant;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::SavingsPlanError;
use crate::projection::{
    run_projection, BonusConfig, ProjectionOutput, RiskInsuranceConfig, SimulationInputs,
    TaxAccountConfig, TaxCreditConfig,
};
use crate::types::{with_metadata, ComputationOutput, Currency, Money, Percent, YearRange, YearTable};
use crate::SavingsPlanResult;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A product is configuration, not behaviour: an identifier, a label and the
/// parameter tables it imposes on the shared engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductProfile {
    pub id: String,
    pub label: String,
    /// Account currency the product is sold in, when it fixes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,
    #[serde(default)]
    pub parameters: ProductParameters,
}

/// Product defaults. Every `Some` field replaces the caller's value; `None`
/// leaves it untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_unit_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing_currency: Option<Currency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upfront_cost_percent: Option<Percent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upfront_cost_by_year: Option<BTreeMap<u32, Percent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ongoing_fee_percent: Option<Percent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ongoing_fixed_fee_amount: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_active_years: Option<YearRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_based_fee_percent: Option<YearTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redemption_fee_percent: Option<YearTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invested_share_percent: Option<YearTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus: Option<BonusConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_credit: Option<TaxCreditConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_account: Option<TaxAccountConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_insurance: Option<RiskInsuranceConfig>,
}

/// Inputs for comparing several products on the same customer inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonInput {
    pub inputs: SimulationInputs,
    pub products: Vec<ProductProfile>,
}

/// Headline figures for one product in a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: String,
    pub label: String,
    pub final_balance: Money,
    pub surrender_value: Money,
    pub total_contributions: Money,
    pub total_costs: Money,
    pub total_bonus: Money,
    pub total_tax_credit: Money,
    pub net_interest: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonOutput {
    /// Best surrender value first.
    pub ranking: Vec<ProductSummary>,
}

// ---------------------------------------------------------------------------
// Product contract
// ---------------------------------------------------------------------------

impl ProductProfile {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            currency: None,
            parameters: ProductParameters::default(),
        }
    }

    pub fn validate(&self) -> SavingsPlanResult<()> {
        if self.id.trim().is_empty() {
            return Err(SavingsPlanError::invalid(
                "id",
                "product identifier must not be empty",
            ));
        }
        Ok(())
    }

    /// Overlay this product's defaults onto the caller's inputs.
    pub fn apply(&self, inputs: &SimulationInputs) -> SimulationInputs {
        let p = &self.parameters;
        let mut out = inputs.clone();

        if let Some(currency) = &self.currency {
            out.currency = currency.clone();
        }

        if let Some(price) = p.starting_unit_price {
            out.starting_unit_price = price;
        }
        if let Some(currency) = &p.pricing_currency {
            out.pricing_currency = Some(currency.clone());
        }
        if let Some(v) = p.upfront_cost_percent {
            out.costs.upfront_cost_percent = v;
        }
        if let Some(v) = &p.upfront_cost_by_year {
            out.costs.upfront_cost_by_year = v.clone();
        }
        if let Some(v) = p.ongoing_fee_percent {
            out.costs.ongoing_fee_percent = v;
        }
        if let Some(v) = p.ongoing_fixed_fee_amount {
            out.costs.ongoing_fixed_fee_amount = v;
        }
        if let Some(v) = p.fee_active_years {
            out.costs.fee_active_years = Some(v);
        }
        if let Some(v) = &p.asset_based_fee_percent {
            out.costs.asset_based_fee_percent = v.clone();
        }
        if let Some(v) = &p.redemption_fee_percent {
            out.costs.redemption_fee_percent = v.clone();
        }
        if let Some(v) = &p.invested_share_percent {
            out.invested_share_percent = v.clone();
        }
        if let Some(v) = &p.bonus {
            out.bonus = v.clone();
        }
        if let Some(v) = &p.tax_credit {
            out.tax_credit = v.clone();
        }
        if let Some(v) = &p.tax_account {
            out.tax_account = Some(v.clone());
        }
        if let Some(v) = &p.risk_insurance {
            out.risk_insurance = Some(v.clone());
        }
        out
    }

    /// Fill in this product's defaults and run the shared engine.
    pub fn compute(
        &self,
        inputs: &SimulationInputs,
    ) -> SavingsPlanResult<ComputationOutput<ProjectionOutput>> {
        self.validate()?;
        let mut output = run_projection(&self.apply(inputs))?;
        output.methodology = format!("{}: {}", self.label, output.methodology);
        Ok(output)
    }

    fn summarize(&self, output: &ProjectionOutput) -> ProductSummary {
        ProductSummary {
            id: self.id.clone(),
            label: self.label.clone(),
            final_balance: output.final_balance,
            surrender_value: output.surrender_value,
            total_contributions: output.total_contributions,
            total_costs: output.total_costs,
            total_bonus: output.total_bonus,
            total_tax_credit: output.total_tax_credit,
            net_interest: output.net_interest,
        }
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// Run every product against the same inputs and rank by surrender value.
/// Runs are independent, so they execute in parallel when the `parallel`
/// feature is enabled; ties keep the input order.
pub fn compare_products(
    input: &ComparisonInput,
) -> SavingsPlanResult<ComputationOutput<ComparisonOutput>> {
    let start = Instant::now();

    if input.products.is_empty() {
        return Err(SavingsPlanError::InsufficientData(
            "at least one product is required for a comparison".into(),
        ));
    }

    #[cfg(feature = "parallel")]
    let runs: Vec<_> = input
        .products
        .par_iter()
        .map(|product| product.compute(&input.inputs))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let runs: Vec<_> = input
        .products
        .iter()
        .map(|product| product.compute(&input.inputs))
        .collect();

    let mut warnings: Vec<String> = Vec::new();
    let mut ranking: Vec<ProductSummary> = Vec::with_capacity(runs.len());
    for (product, run) in input.products.iter().zip(runs) {
        let output = run?;
        warnings.extend(
            output
                .warnings
                .iter()
                .map(|w| format!("{}: {}", product.id, w)),
        );
        ranking.push(product.summarize(&output.result));
    }
    ranking.sort_by(|a, b| b.surrender_value.cmp(&a.surrender_value));

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Product comparison (shared projection engine, ranked by surrender value)",
        &serde_json::json!({
            "products": input.products.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
            "horizon_years": input.inputs.horizon_years,
        }),
        warnings,
        elapsed,
        ComparisonOutput { ranking },
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaymentFrequency;
    use rust_decimal_macros::dec;

    fn inputs() -> SimulationInputs {
        SimulationInputs::new(
            Currency::HUF,
            dec!(20_000),
            PaymentFrequency::Monthly,
            10,
            dec!(5),
        )
    }

    fn cheap() -> ProductProfile {
        let mut p = ProductProfile::new("cheap", "Low-cost index plan");
        p.parameters.asset_based_fee_percent = Some(YearTable::flat(dec!(0.5)));
        p
    }

    fn expensive() -> ProductProfile {
        let mut p = ProductProfile::new("expensive", "Classic unit-linked plan");
        p.parameters.upfront_cost_percent = Some(dec!(60));
        p.parameters.asset_based_fee_percent = Some(YearTable::flat(dec!(2.5)));
        p.parameters.redemption_fee_percent = Some(YearTable::flat(dec!(3)));
        p
    }

    #[test]
    fn test_apply_overrides_only_present_fields() {
        let mut base = inputs();
        base.costs.ongoing_fixed_fee_amount = dec!(300);
        let applied = expensive().apply(&base);
        assert_eq!(applied.costs.upfront_cost_percent, dec!(60));
        assert_eq!(applied.costs.ongoing_fixed_fee_amount, dec!(300));
        assert_eq!(applied.contribution_amount, dec!(20_000));
    }

    #[test]
    fn test_compute_delegates_to_engine() {
        let out = expensive().compute(&inputs()).unwrap();
        assert!(out.methodology.starts_with("Classic unit-linked plan"));
        assert_eq!(out.result.total_upfront_cost, dec!(144_000));
    }

    #[test]
    fn test_empty_id_rejected() {
        let product = ProductProfile::new("  ", "Nameless");
        assert!(product.compute(&inputs()).is_err());
    }

    #[test]
    fn test_comparison_ranks_by_surrender_value() {
        let input = ComparisonInput {
            inputs: inputs(),
            products: vec![expensive(), cheap()],
        };
        let out = compare_products(&input).unwrap();
        let ids: Vec<&str> = out.result.ranking.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["cheap", "expensive"]);
    }

    #[test]
    fn test_comparison_requires_products() {
        let input = ComparisonInput {
            inputs: inputs(),
            products: Vec::new(),
        };
        assert!(matches!(
            compare_products(&input),
            Err(SavingsPlanError::InsufficientData(_))
        ));
    }
}
