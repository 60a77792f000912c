use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Currency, Money, Units};

/// Snapshot of one policy year. Emitted once, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearRow {
    pub year: u32,
    /// Gross contributions actually paid in the year.
    pub yearly_contribution: Money,
    pub cumulative_contributions: Money,
    pub yield_for_year: Money,
    pub upfront_cost_for_year: Money,
    pub asset_based_cost_for_year: Money,
    /// Percentage-of-balance fee plus the fixed monthly fee.
    pub ongoing_cost_for_year: Money,
    pub risk_insurance_cost_for_year: Money,
    pub redemption_cost_for_year: Money,
    /// Sum of every cost category above.
    pub cost_for_year: Money,
    pub bonus_for_year: Money,
    pub tax_credit_for_year: Money,
    /// Gross amount removed from the account.
    pub withdrawal_for_year: Money,
    /// Amount paid out after the redemption fee.
    pub net_withdrawal_for_year: Money,
    pub invested_balance: Money,
    pub client_balance: Money,
    pub tax_account_balance: Money,
    pub end_balance: Money,
}

/// Snapshot of one simulated month in the monthly breakdown view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthRow {
    pub year: u32,
    /// Month of the policy year, 1..=12.
    pub month: u32,
    /// Month counted from the start of the projection, 1-based.
    pub month_index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_start: Option<NaiveDate>,
    pub contribution: Money,
    pub upfront_cost: Money,
    pub bonus: Money,
    pub yield_amount: Money,
    pub asset_based_cost: Money,
    pub ongoing_cost: Money,
    pub risk_insurance_cost: Money,
    pub withdrawal: Money,
    pub redemption_cost: Money,
    pub tax_credit: Money,
    pub unit_price: Decimal,
    pub invested_units: Units,
    pub client_units: Units,
    pub balance: Money,
}

/// Result of a projection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionOutput {
    pub currency: Currency,
    pub final_balance: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_balance_in_base_currency: Option<Money>,
    /// Final balance less the final year's redemption fee on all of it.
    pub surrender_value: Money,
    pub total_contributions: Money,
    pub total_costs: Money,
    pub total_upfront_cost: Money,
    pub total_asset_based_cost: Money,
    pub total_ongoing_cost: Money,
    pub total_risk_insurance_cost: Money,
    pub total_redemption_cost: Money,
    pub total_bonus: Money,
    pub total_tax_credit: Money,
    pub total_withdrawals: Money,
    pub total_withdrawals_net: Money,
    pub total_yield: Money,
    /// Reconciliation figure derived from the totals, not accumulated.
    pub net_interest: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_withdrawal_year: Option<u32>,
    pub yearly_breakdown: Vec<YearRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_breakdown: Option<Vec<MonthRow>>,
}

/// Cost, bonus and cash-flow amounts accumulated over a period.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct PeriodFlows {
    pub contribution: Money,
    pub upfront_cost: Money,
    pub bonus: Money,
    pub yield_amount: Money,
    pub asset_based_cost: Money,
    pub ongoing_cost: Money,
    pub risk_insurance_cost: Money,
    pub withdrawal: Money,
    pub redemption_cost: Money,
    pub tax_credit: Money,
}

impl PeriodFlows {
    pub fn total_cost(&self) -> Money {
        self.upfront_cost
            + self.asset_based_cost
            + self.ongoing_cost
            + self.risk_insurance_cost
            + self.redemption_cost
    }

    pub fn net_withdrawal(&self) -> Money {
        self.withdrawal - self.redemption_cost
    }

    pub fn absorb(&mut self, other: &PeriodFlows) {
        self.contribution += other.contribution;
        self.upfront_cost += other.upfront_cost;
        self.bonus += other.bonus;
        self.yield_amount += other.yield_amount;
        self.asset_based_cost += other.asset_based_cost;
        self.ongoing_cost += other.ongoing_cost;
        self.risk_insurance_cost += other.risk_insurance_cost;
        self.withdrawal += other.withdrawal;
        self.redemption_cost += other.redemption_cost;
        self.tax_credit += other.tax_credit;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_period_flows_totals() {
        let mut year = PeriodFlows::default();
        let month = PeriodFlows {
            contribution: dec!(1000),
            upfront_cost: dec!(50),
            asset_based_cost: dec!(2),
            ongoing_cost: dec!(3),
            risk_insurance_cost: dec!(4),
            withdrawal: dec!(100),
            redemption_cost: dec!(5),
            ..Default::default()
        };
        year.absorb(&month);
        year.absorb(&month);
        assert_eq!(year.contribution, dec!(2000));
        assert_eq!(year.total_cost(), dec!(128));
        assert_eq!(year.net_withdrawal(), dec!(190));
    }
}
