use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::plan::PlanInput;
use crate::types::{Currency, Money, PaymentFrequency, Percent, YearRange, YearTable};

/// Everything one projection run needs. Immutable for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationInputs {
    /// Account (native) currency.
    pub currency: Currency,
    /// Amount paid on every payment date.
    pub contribution_amount: Money,
    pub frequency: PaymentFrequency,
    pub horizon_years: u32,
    /// Annual gross fund yield, e.g. 6 = 6% a year.
    pub annual_yield_percent: Percent,

    #[serde(default)]
    pub annual_index_percent: Percent,
    /// Disable contribution indexation entirely.
    #[serde(default)]
    pub keep_annual_contribution: bool,
    #[serde(default)]
    pub index_overrides: BTreeMap<u32, Percent>,
    #[serde(default)]
    pub contribution_overrides: BTreeMap<u32, Money>,
    #[serde(default)]
    pub withdrawals: BTreeMap<u32, Money>,
    /// Pre-expanded plans (`horizon_years + 1` slots). When present they
    /// replace the plan built from the fields above.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yearly_contribution_plan: Option<Vec<Money>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yearly_withdrawal_plan: Option<Vec<Money>>,

    #[serde(default = "default_unit_price")]
    pub starting_unit_price: Decimal,
    /// Currency the fund is priced in, when it differs from `currency`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing_currency: Option<Currency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fx_rate_to_base_currency: Option<Decimal>,

    #[serde(default)]
    pub costs: CostParameters,
    #[serde(default)]
    pub bonus: BonusConfig,
    #[serde(default)]
    pub tax_credit: TaxCreditConfig,
    /// Share of each net contribution that is invested (earns yield).
    #[serde(default = "full_invested_share")]
    pub invested_share_percent: YearTable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_account: Option<TaxAccountConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_insurance: Option<RiskInsuranceConfig>,

    #[serde(default)]
    pub breakdown: Breakdown,
    /// First day of policy year 1; labels monthly rows with calendar months.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
}

fn default_unit_price() -> Decimal {
    Decimal::ONE
}

fn full_invested_share() -> YearTable {
    YearTable::flat(Decimal::ONE_HUNDRED)
}

impl SimulationInputs {
    /// Minimal inputs: no costs, no bonus, no tax credit, fully invested.
    pub fn new(
        currency: Currency,
        contribution_amount: Money,
        frequency: PaymentFrequency,
        horizon_years: u32,
        annual_yield_percent: Percent,
    ) -> Self {
        Self {
            currency,
            contribution_amount,
            frequency,
            horizon_years,
            annual_yield_percent,
            annual_index_percent: Decimal::ZERO,
            keep_annual_contribution: false,
            index_overrides: BTreeMap::new(),
            contribution_overrides: BTreeMap::new(),
            withdrawals: BTreeMap::new(),
            yearly_contribution_plan: None,
            yearly_withdrawal_plan: None,
            starting_unit_price: default_unit_price(),
            pricing_currency: None,
            fx_rate_to_base_currency: None,
            costs: CostParameters::default(),
            bonus: BonusConfig::default(),
            tax_credit: TaxCreditConfig::default(),
            invested_share_percent: full_invested_share(),
            tax_account: None,
            risk_insurance: None,
            breakdown: Breakdown::Yearly,
            start_date: None,
        }
    }

    /// Plan-builder view of these inputs. The yearly base is one payment
    /// times the number of payments in a year.
    pub fn plan_input(&self) -> PlanInput {
        let payments = Decimal::from(self.frequency.payments_per_year());
        let (base_index_percent, index_overrides) = if self.keep_annual_contribution {
            (Decimal::ZERO, BTreeMap::new())
        } else {
            (self.annual_index_percent, self.index_overrides.clone())
        };
        PlanInput {
            horizon_years: self.horizon_years,
            base_contribution: self.contribution_amount * payments,
            base_index_percent,
            index_overrides,
            contribution_overrides: self.contribution_overrides.clone(),
            withdrawals: self.withdrawals.clone(),
        }
    }

    /// Unit price at the start of the run, converted into the account
    /// currency when the fund is priced in another currency.
    pub fn effective_starting_price(&self) -> Decimal {
        match (&self.pricing_currency, self.fx_rate_to_base_currency) {
            (Some(pricing), Some(fx)) if *pricing != self.currency => {
                self.starting_unit_price * fx
            }
            _ => self.starting_unit_price,
        }
    }
}

/// Cost tables charged by the product.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostParameters {
    /// Deducted from gross contributions paid in year 1.
    #[serde(default)]
    pub upfront_cost_percent: Percent,
    /// Product-specific upfront percentage for named years; replaces the
    /// year-1-only policy for those years.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub upfront_cost_by_year: BTreeMap<u32, Percent>,
    /// Annual percentage-of-balance fee, charged monthly.
    #[serde(default)]
    pub ongoing_fee_percent: Percent,
    /// Fixed fee charged every month.
    #[serde(default)]
    pub ongoing_fixed_fee_amount: Money,
    /// Years in which the ongoing fees run. `None` means every year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_active_years: Option<YearRange>,
    /// Annual asset-based fee, charged with daily compounding.
    #[serde(default)]
    pub asset_based_fee_percent: YearTable,
    /// Fee on withdrawn amounts, by the year of the withdrawal.
    #[serde(default)]
    pub redemption_fee_percent: YearTable,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusMode {
    #[default]
    None,
    /// A percentage of each gross contribution is added before investing.
    PercentOfContribution,
    /// From year 2 the year-1 upfront cost is refunded at an escalating
    /// rate of `(year - 1)%` a year.
    EscalatingRefund,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusConfig {
    #[serde(default)]
    pub mode: BonusMode,
    #[serde(default)]
    pub percent: Percent,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub percent_by_year: BTreeMap<u32, Percent>,
    /// First policy year in which the contribution bonus is paid.
    #[serde(default = "first_year")]
    pub from_year: u32,
    /// Fixed loyalty bonuses credited at the end of the named years.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub amount_by_year: BTreeMap<u32, Money>,
}

fn first_year() -> u32 {
    1
}

impl Default for BonusConfig {
    fn default() -> Self {
        Self {
            mode: BonusMode::None,
            percent: Decimal::ZERO,
            percent_by_year: BTreeMap::new(),
            from_year: first_year(),
            amount_by_year: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxCreditConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub rate_percent: Percent,
    /// Maximum credit per year. `None` means uncapped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_cap: Option<Money>,
    /// Eligible years. `None` means every year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_range: Option<YearRange>,
    /// No credit from the year of the first withdrawal onward.
    #[serde(default)]
    pub stop_after_first_withdrawal: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub manual_limits_by_year: BTreeMap<u32, Money>,
}

/// A second, tax-eligible account fed by a share of every contribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxAccountConfig {
    pub share_percent: Percent,
    /// Asset-based fee for this account; falls back to the main table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_based_fee_percent: Option<YearTable>,
}

/// Monthly risk (life cover) premium deducted from the balance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskInsuranceConfig {
    #[serde(default)]
    pub monthly_amount: Money,
    #[serde(default)]
    pub percent_of_contribution: Percent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_range: Option<YearRange>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Breakdown {
    #[default]
    Yearly,
    Monthly,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sparse_document_fills_defaults() {
        let json = r#"{
            "currency": "HUF",
            "contribution_amount": 12000,
            "frequency": "monthly",
            "horizon_years": 10,
            "annual_yield_percent": 0
        }"#;
        let inputs: SimulationInputs = serde_json::from_str(json).unwrap();
        assert_eq!(inputs.starting_unit_price, Decimal::ONE);
        assert_eq!(inputs.invested_share_percent.get(7), dec!(100));
        assert_eq!(inputs.bonus.from_year, 1);
        assert_eq!(inputs.bonus.mode, BonusMode::None);
        assert!(!inputs.tax_credit.enabled);
        assert_eq!(inputs.breakdown, Breakdown::Yearly);
    }

    #[test]
    fn test_missing_required_field_is_rejected() {
        let json = r#"{ "currency": "HUF", "frequency": "monthly", "horizon_years": 10 }"#;
        let parsed: Result<SimulationInputs, _> = serde_json::from_str(json);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_plan_input_scales_by_payments_per_year() {
        let inputs = SimulationInputs::new(
            Currency::HUF,
            dec!(30_000),
            PaymentFrequency::Quarterly,
            3,
            dec!(5),
        );
        assert_eq!(inputs.plan_input().base_contribution, dec!(120_000));
    }

    #[test]
    fn test_keep_annual_contribution_drops_indexation() {
        let mut inputs =
            SimulationInputs::new(Currency::HUF, dec!(10_000), PaymentFrequency::Monthly, 3, dec!(5));
        inputs.annual_index_percent = dec!(5);
        inputs.index_overrides.insert(2, dec!(20));
        inputs.keep_annual_contribution = true;
        let plan = inputs.plan_input();
        assert_eq!(plan.base_index_percent, Decimal::ZERO);
        assert!(plan.index_overrides.is_empty());
    }

    #[test]
    fn test_starting_price_converted_only_for_foreign_pricing() {
        let mut inputs =
            SimulationInputs::new(Currency::HUF, dec!(10_000), PaymentFrequency::Monthly, 3, dec!(5));
        inputs.fx_rate_to_base_currency = Some(dec!(390));
        assert_eq!(inputs.effective_starting_price(), Decimal::ONE);

        inputs.pricing_currency = Some(Currency::EUR);
        assert_eq!(inputs.effective_starting_price(), dec!(390));

        inputs.pricing_currency = Some(Currency::HUF);
        assert_eq!(inputs.effective_starting_price(), Decimal::ONE);
    }
}
