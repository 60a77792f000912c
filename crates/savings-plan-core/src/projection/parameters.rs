use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use tracing::warn;

use super::inputs::{BonusMode, SimulationInputs};
use crate::types::{Money, Percent, YearRange, YearTable};

const DAYS_PER_YEAR: Decimal = dec!(365);
const MONTHS_PER_YEAR: Decimal = dec!(12);

/// Clamped view of the inputs. Degenerate values are replaced with safe
/// ones here, once, and reported as warnings; the monthly loop only ever
/// sees values in range.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedParameters {
    monthly_growth: Decimal,
    upfront_percent: Percent,
    upfront_by_year: BTreeMap<u32, Percent>,
    ongoing_keep: Decimal,
    fixed_fee: Money,
    fee_active_years: Option<YearRange>,
    asset_fee_main: YearTable,
    asset_fee_tax: YearTable,
    redemption_fee: YearTable,
    invested_share: YearTable,
    bonus_mode: BonusMode,
    bonus_percent: Percent,
    bonus_by_year: BTreeMap<u32, Percent>,
    bonus_from_year: u32,
    loyalty_bonus: BTreeMap<u32, Money>,
    tax_share: Decimal,
    tax_credit: Option<TaxCreditRule>,
    risk: Option<RiskRule>,
}

#[derive(Debug, Clone)]
pub(crate) struct TaxCreditRule {
    rate: Decimal,
    annual_cap: Option<Money>,
    years: Option<YearRange>,
    pub stop_after_first_withdrawal: bool,
    manual_limits: BTreeMap<u32, Money>,
}

impl TaxCreditRule {
    pub fn applies_to(&self, year: u32) -> bool {
        self.years.map_or(true, |r| r.contains(year))
    }

    /// `min(rate * base, cap)`, further capped by the manual limit for the year.
    pub fn credit_for(&self, year: u32, gross_base: Money) -> Money {
        let mut credit = (gross_base * self.rate).max(Decimal::ZERO);
        if let Some(cap) = self.annual_cap {
            credit = credit.min(cap);
        }
        if let Some(limit) = self.manual_limits.get(&year).copied() {
            credit = credit.min(limit.max(Decimal::ZERO));
        }
        credit
    }
}

#[derive(Debug, Clone)]
struct RiskRule {
    monthly_amount: Money,
    contribution_rate: Decimal,
    years: Option<YearRange>,
}

/// Everything the monthly loop needs for one policy year, as fractions.
#[derive(Debug, Clone)]
pub(crate) struct YearParameters {
    pub upfront_rate: Decimal,
    pub bonus_rate: Decimal,
    pub invested_share: Decimal,
    pub tax_share: Decimal,
    pub fees_active: bool,
    pub asset_keep_main: Decimal,
    pub asset_keep_tax: Decimal,
    pub ongoing_keep: Decimal,
    pub fixed_fee: Money,
    pub risk: Option<(Money, Decimal)>,
    pub redemption_rate: Decimal,
    pub loyalty_bonus: Money,
}

impl ResolvedParameters {
    pub fn resolve(inputs: &SimulationInputs, warnings: &mut Vec<String>) -> Self {
        let yield_percent = non_negative(inputs.annual_yield_percent, "annual_yield_percent", warnings);
        let monthly_growth = fractional_power(
            Decimal::ONE + yield_percent / Decimal::ONE_HUNDRED,
            Decimal::ONE / MONTHS_PER_YEAR,
        );

        let costs = &inputs.costs;
        let upfront_percent = percent(costs.upfront_cost_percent, "upfront_cost_percent", warnings);
        let upfront_by_year = costs
            .upfront_cost_by_year
            .iter()
            .map(|(y, v)| (*y, percent(*v, "upfront_cost_by_year", warnings)))
            .collect();
        let ongoing_percent = percent(costs.ongoing_fee_percent, "ongoing_fee_percent", warnings);
        let ongoing_keep = fractional_power(
            Decimal::ONE - ongoing_percent / Decimal::ONE_HUNDRED,
            Decimal::ONE / MONTHS_PER_YEAR,
        );
        let fixed_fee = non_negative(
            costs.ongoing_fixed_fee_amount,
            "ongoing_fixed_fee_amount",
            warnings,
        );
        let fee_active_years = range(costs.fee_active_years, "fee_active_years", warnings);

        let asset_fee_main = percent_table(&costs.asset_based_fee_percent, "asset_based_fee_percent", warnings);
        let redemption_fee = percent_table(&costs.redemption_fee_percent, "redemption_fee_percent", warnings);
        let invested_share = percent_table(&inputs.invested_share_percent, "invested_share_percent", warnings);

        let (tax_share, asset_fee_tax) = match &inputs.tax_account {
            Some(account) => {
                let share = percent(account.share_percent, "tax_account.share_percent", warnings);
                let table = account
                    .asset_based_fee_percent
                    .as_ref()
                    .map(|t| percent_table(t, "tax_account.asset_based_fee_percent", warnings))
                    .unwrap_or_else(|| asset_fee_main.clone());
                (share / Decimal::ONE_HUNDRED, table)
            }
            None => (Decimal::ZERO, asset_fee_main.clone()),
        };

        let bonus = &inputs.bonus;
        let bonus_percent = non_negative(bonus.percent, "bonus.percent", warnings);
        let bonus_by_year = bonus
            .percent_by_year
            .iter()
            .map(|(y, v)| (*y, non_negative(*v, "bonus.percent_by_year", warnings)))
            .collect();
        let loyalty_bonus = bonus
            .amount_by_year
            .iter()
            .map(|(y, v)| (*y, non_negative(*v, "bonus.amount_by_year", warnings)))
            .collect();

        let tc = &inputs.tax_credit;
        let tax_credit = if tc.enabled {
            Some(TaxCreditRule {
                rate: percent(tc.rate_percent, "tax_credit.rate_percent", warnings)
                    / Decimal::ONE_HUNDRED,
                annual_cap: tc
                    .annual_cap
                    .map(|cap| non_negative(cap, "tax_credit.annual_cap", warnings)),
                years: range(tc.year_range, "tax_credit.year_range", warnings),
                stop_after_first_withdrawal: tc.stop_after_first_withdrawal,
                manual_limits: tc.manual_limits_by_year.clone(),
            })
        } else {
            None
        };

        let risk = inputs.risk_insurance.as_ref().map(|r| RiskRule {
            monthly_amount: non_negative(r.monthly_amount, "risk_insurance.monthly_amount", warnings),
            contribution_rate: percent(
                r.percent_of_contribution,
                "risk_insurance.percent_of_contribution",
                warnings,
            ) / Decimal::ONE_HUNDRED,
            years: range(r.year_range, "risk_insurance.year_range", warnings),
        });

        Self {
            monthly_growth,
            upfront_percent,
            upfront_by_year,
            ongoing_keep,
            fixed_fee,
            fee_active_years,
            asset_fee_main,
            asset_fee_tax,
            redemption_fee,
            invested_share,
            bonus_mode: bonus.mode,
            bonus_percent,
            bonus_by_year,
            bonus_from_year: bonus.from_year,
            loyalty_bonus,
            tax_share,
            tax_credit,
            risk,
        }
    }

    /// Monthly price growth factor, `(1 + yield)^(1/12)`.
    pub fn monthly_growth(&self) -> Decimal {
        self.monthly_growth
    }

    pub fn bonus_mode(&self) -> BonusMode {
        self.bonus_mode
    }

    pub fn tax_credit(&self) -> Option<&TaxCreditRule> {
        self.tax_credit.as_ref()
    }

    pub fn has_tax_account(&self) -> bool {
        self.tax_share > Decimal::ZERO
    }

    pub fn year(&self, year: u32) -> YearParameters {
        let upfront = self
            .upfront_by_year
            .get(&year)
            .copied()
            .unwrap_or(if year == 1 {
                self.upfront_percent
            } else {
                Decimal::ZERO
            });

        let bonus_rate = if self.bonus_mode == BonusMode::PercentOfContribution
            && year >= self.bonus_from_year
        {
            self.bonus_by_year
                .get(&year)
                .copied()
                .unwrap_or(self.bonus_percent)
                / Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };

        let risk = self.risk.as_ref().and_then(|r| {
            if r.years.map_or(true, |range| range.contains(year)) {
                Some((r.monthly_amount, r.contribution_rate))
            } else {
                None
            }
        });

        YearParameters {
            upfront_rate: upfront / Decimal::ONE_HUNDRED,
            bonus_rate,
            invested_share: clamp_percent(self.invested_share.get(year)) / Decimal::ONE_HUNDRED,
            tax_share: self.tax_share,
            fees_active: self.fee_active_years.map_or(true, |r| r.contains(year)),
            asset_keep_main: asset_keep_factor(self.asset_fee_main.get(year)),
            asset_keep_tax: asset_keep_factor(self.asset_fee_tax.get(year)),
            ongoing_keep: self.ongoing_keep,
            fixed_fee: self.fixed_fee,
            risk,
            redemption_rate: clamp_percent(self.redemption_fee.get(year)) / Decimal::ONE_HUNDRED,
            loyalty_bonus: self
                .loyalty_bonus
                .get(&year)
                .copied()
                .unwrap_or(Decimal::ZERO),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `base^exponent` for fractional exponents. Exact for a unit base, zero for
/// a non-positive base.
pub(crate) fn fractional_power(base: Decimal, exponent: Decimal) -> Decimal {
    if base == Decimal::ONE {
        return Decimal::ONE;
    }
    if base <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    base.powd(exponent)
}

/// Share of the balance left after one month of an annual asset-based fee
/// charged daily: `(1 - pct/100/365)^(365/12)`.
pub(crate) fn asset_keep_factor(annual_percent: Percent) -> Decimal {
    let daily = clamp_percent(annual_percent) / Decimal::ONE_HUNDRED / DAYS_PER_YEAR;
    fractional_power(Decimal::ONE - daily, DAYS_PER_YEAR / MONTHS_PER_YEAR)
}

fn clamp_percent(value: Percent) -> Percent {
    value.max(Decimal::ZERO).min(Decimal::ONE_HUNDRED)
}

fn percent(value: Percent, field: &str, warnings: &mut Vec<String>) -> Percent {
    let clamped = clamp_percent(value);
    if clamped != value {
        report(warnings, format!("{field} = {value} clamped to {clamped}"));
    }
    clamped
}

fn non_negative(value: Decimal, field: &str, warnings: &mut Vec<String>) -> Decimal {
    if value < Decimal::ZERO {
        report(warnings, format!("{field} = {value} is negative; treated as 0"));
        return Decimal::ZERO;
    }
    value
}

fn percent_table(table: &YearTable, field: &str, warnings: &mut Vec<String>) -> YearTable {
    if table.min_value() < Decimal::ZERO || table.max_value() > Decimal::ONE_HUNDRED {
        report(
            warnings,
            format!("{field} has values outside 0..=100; clamped per year"),
        );
    }
    YearTable {
        base: clamp_percent(table.base),
        by_year: table
            .by_year
            .iter()
            .map(|(y, v)| (*y, clamp_percent(*v)))
            .collect(),
    }
}

fn range(value: Option<YearRange>, field: &str, warnings: &mut Vec<String>) -> Option<YearRange> {
    if let Some(r) = value {
        if r.is_empty() {
            report(warnings, format!("{field} is inverted ({:?}); no year qualifies", r));
        }
    }
    value
}

fn report(warnings: &mut Vec<String>, message: String) {
    warn!(detail = %message, "degenerate projection parameter");
    warnings.push(message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::inputs::{RiskInsuranceConfig, TaxAccountConfig};
    use crate::types::{Currency, PaymentFrequency};

    fn inputs() -> SimulationInputs {
        SimulationInputs::new(Currency::HUF, dec!(10_000), PaymentFrequency::Monthly, 10, dec!(6))
    }

    #[test]
    fn test_zero_yield_growth_is_exactly_one() {
        let mut i = inputs();
        i.annual_yield_percent = Decimal::ZERO;
        let p = ResolvedParameters::resolve(&i, &mut Vec::new());
        assert_eq!(p.monthly_growth(), Decimal::ONE);
    }

    #[test]
    fn test_monthly_growth_compounds_to_annual_yield() {
        let p = ResolvedParameters::resolve(&inputs(), &mut Vec::new());
        let mut annual = Decimal::ONE;
        for _ in 0..12 {
            annual *= p.monthly_growth();
        }
        assert!((annual - dec!(1.06)).abs() < dec!(0.0000001), "annual={annual}");
    }

    #[test]
    fn test_asset_keep_factor_close_to_monthly_share() {
        // 1.2% a year charged daily is roughly 0.1% a month
        let keep = asset_keep_factor(dec!(1.2));
        assert!((Decimal::ONE - keep - dec!(0.001)).abs() < dec!(0.000001), "keep={keep}");
        assert_eq!(asset_keep_factor(Decimal::ZERO), Decimal::ONE);
    }

    #[test]
    fn test_negative_values_clamped_with_warnings() {
        let mut i = inputs();
        i.annual_yield_percent = dec!(-3);
        i.costs.upfront_cost_percent = dec!(-5);
        i.costs.ongoing_fixed_fee_amount = dec!(-100);
        let mut warnings = Vec::new();
        let p = ResolvedParameters::resolve(&i, &mut warnings);
        assert_eq!(warnings.len(), 3);
        assert_eq!(p.monthly_growth(), Decimal::ONE);
        assert_eq!(p.year(1).upfront_rate, Decimal::ZERO);
        assert_eq!(p.year(1).fixed_fee, Decimal::ZERO);
    }

    #[test]
    fn test_upfront_policy_year_one_only_unless_tabled() {
        let mut i = inputs();
        i.costs.upfront_cost_percent = dec!(5);
        let p = ResolvedParameters::resolve(&i, &mut Vec::new());
        assert_eq!(p.year(1).upfront_rate, dec!(0.05));
        assert_eq!(p.year(2).upfront_rate, Decimal::ZERO);

        i.costs.upfront_cost_by_year.insert(2, dec!(3));
        i.costs.upfront_cost_by_year.insert(1, dec!(40));
        let p = ResolvedParameters::resolve(&i, &mut Vec::new());
        assert_eq!(p.year(1).upfront_rate, dec!(0.40));
        assert_eq!(p.year(2).upfront_rate, dec!(0.03));
        assert_eq!(p.year(3).upfront_rate, Decimal::ZERO);
    }

    #[test]
    fn test_bonus_rate_respects_mode_and_start_year() {
        let mut i = inputs();
        i.bonus.percent = dec!(2);
        i.bonus.from_year = 3;
        let p = ResolvedParameters::resolve(&i, &mut Vec::new());
        assert_eq!(p.year(5).bonus_rate, Decimal::ZERO);

        i.bonus.mode = BonusMode::PercentOfContribution;
        i.bonus.percent_by_year.insert(4, dec!(5));
        let p = ResolvedParameters::resolve(&i, &mut Vec::new());
        assert_eq!(p.year(2).bonus_rate, Decimal::ZERO);
        assert_eq!(p.year(3).bonus_rate, dec!(0.02));
        assert_eq!(p.year(4).bonus_rate, dec!(0.05));
    }

    #[test]
    fn test_tax_credit_rule_caps() {
        let mut i = inputs();
        i.tax_credit.enabled = true;
        i.tax_credit.rate_percent = dec!(20);
        i.tax_credit.annual_cap = Some(dec!(130_000));
        i.tax_credit.manual_limits_by_year.insert(2, dec!(50_000));
        i.tax_credit.manual_limits_by_year.insert(3, dec!(-10));
        let p = ResolvedParameters::resolve(&i, &mut Vec::new());
        let rule = p.tax_credit().unwrap();
        // 20% of 500,000 stays under the cap
        assert_eq!(rule.credit_for(1, dec!(500_000)), dec!(100_000));
        assert_eq!(rule.credit_for(1, dec!(650_000)), dec!(130_000));
        assert_eq!(rule.credit_for(1, dec!(6_000_000)), dec!(130_000));
        assert_eq!(rule.credit_for(1, dec!(400_000)), dec!(80_000));
        assert_eq!(rule.credit_for(2, dec!(500_000)), dec!(50_000));
        // a negative manual limit means no credit for that year
        assert_eq!(rule.credit_for(3, dec!(500_000)), Decimal::ZERO);
    }

    #[test]
    fn test_tax_account_inherits_main_asset_fee() {
        let mut i = inputs();
        i.costs.asset_based_fee_percent = YearTable::flat(dec!(1.5));
        i.tax_account = Some(TaxAccountConfig {
            share_percent: dec!(40),
            asset_based_fee_percent: None,
        });
        let p = ResolvedParameters::resolve(&i, &mut Vec::new());
        let y = p.year(1);
        assert!(p.has_tax_account());
        assert_eq!(y.tax_share, dec!(0.4));
        assert_eq!(y.asset_keep_main, y.asset_keep_tax);
    }

    #[test]
    fn test_risk_only_inside_year_range() {
        let mut i = inputs();
        i.risk_insurance = Some(RiskInsuranceConfig {
            monthly_amount: dec!(500),
            percent_of_contribution: dec!(1),
            year_range: Some(YearRange::new(1, Some(2))),
        });
        let p = ResolvedParameters::resolve(&i, &mut Vec::new());
        assert_eq!(p.year(2).risk, Some((dec!(500), dec!(0.01))));
        assert_eq!(p.year(3).risk, None);
    }
}
