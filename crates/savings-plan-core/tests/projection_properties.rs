use proptest::prelude::{prop_assert, prop_assert_eq, proptest};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use savings_plan_core::projection::{run_projection, BonusMode, Breakdown, SimulationInputs};
use savings_plan_core::types::{Currency, PaymentFrequency, YearTable};

const FREQUENCIES: [PaymentFrequency; 4] = [
    PaymentFrequency::Monthly,
    PaymentFrequency::Quarterly,
    PaymentFrequency::SemiAnnual,
    PaymentFrequency::Annual,
];

/// Basis points to a percentage, e.g. 250 -> 2.50.
fn bp(value: u32) -> Decimal {
    Decimal::new(i64::from(value), 2)
}

fn tolerance(scale: Decimal) -> Decimal {
    dec!(0.000001) * (Decimal::ONE + scale.abs())
}

#[allow(clippy::too_many_arguments)]
fn build_inputs(
    amount: u32,
    frequency: usize,
    horizon: u32,
    yield_bp: u32,
    upfront: u32,
    asset_fee_bp: u32,
    ongoing_fee_bp: u32,
    fixed_fee: u32,
    invested_share: u32,
    bonus_percent: u32,
    withdrawal_year: u32,
    withdrawal_amount: u32,
    tax_credit_rate: u32,
    tax_credit_cap: u32,
) -> SimulationInputs {
    let mut inputs = SimulationInputs::new(
        Currency::HUF,
        Decimal::from(amount),
        FREQUENCIES[frequency % FREQUENCIES.len()],
        horizon,
        bp(yield_bp),
    );
    inputs.costs.upfront_cost_percent = Decimal::from(upfront);
    inputs.costs.asset_based_fee_percent = YearTable::flat(bp(asset_fee_bp));
    inputs.costs.ongoing_fee_percent = bp(ongoing_fee_bp);
    inputs.costs.ongoing_fixed_fee_amount = Decimal::from(fixed_fee);
    inputs.costs.redemption_fee_percent = YearTable::flat(dec!(2));
    inputs.invested_share_percent = YearTable::flat(Decimal::from(invested_share));
    if bonus_percent > 0 {
        inputs.bonus.mode = BonusMode::PercentOfContribution;
        inputs.bonus.percent = Decimal::from(bonus_percent);
    }
    inputs
        .withdrawals
        .insert(withdrawal_year, Decimal::from(withdrawal_amount));
    inputs.tax_credit.enabled = tax_credit_rate > 0;
    inputs.tax_credit.rate_percent = Decimal::from(tax_credit_rate);
    inputs.tax_credit.annual_cap = Some(Decimal::from(tax_credit_cap));
    inputs.tax_credit.stop_after_first_withdrawal = true;
    inputs.breakdown = Breakdown::Monthly;
    inputs
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(32))]

    #[test]
    fn prop_projection_is_non_negative_and_reconciles(
        amount in 0u32..200_000,
        frequency in 0usize..4,
        horizon in 0u32..12,
        yield_bp in 0u32..1_500,
        upfront in 0u32..90,
        asset_fee_bp in 0u32..300,
        ongoing_fee_bp in 0u32..300,
        fixed_fee in 0u32..2_000,
        invested_share in 0u32..=100,
        bonus_percent in 0u32..10,
        withdrawal_year in 1u32..12,
        withdrawal_amount in 0u32..3_000_000,
        tax_credit_rate in 0u32..30,
        tax_credit_cap in 0u32..200_000,
        limited_year in 1u32..12,
        manual_limit in 0u32..100_000,
    ) {
        let mut inputs = build_inputs(
            amount, frequency, horizon, yield_bp, upfront, asset_fee_bp, ongoing_fee_bp,
            fixed_fee, invested_share, bonus_percent, withdrawal_year, withdrawal_amount,
            tax_credit_rate, tax_credit_cap,
        );
        inputs
            .tax_credit
            .manual_limits_by_year
            .insert(limited_year, Decimal::from(manual_limit));
        let first = run_projection(&inputs).unwrap().result;
        let second = run_projection(&inputs).unwrap().result;
        prop_assert_eq!(&first, &second);

        prop_assert!(first.final_balance >= Decimal::ZERO);
        prop_assert!(first.surrender_value >= Decimal::ZERO);
        prop_assert!(first.total_costs >= Decimal::ZERO);
        prop_assert!(first.total_withdrawals <= Decimal::from(withdrawal_amount));

        for row in &first.yearly_breakdown {
            prop_assert!(row.end_balance >= Decimal::ZERO);
            prop_assert!(row.cost_for_year >= Decimal::ZERO);
            prop_assert!(row.tax_credit_for_year >= Decimal::ZERO);
            prop_assert!(row.tax_credit_for_year <= Decimal::from(tax_credit_cap));
            let by_rate = row.yearly_contribution * Decimal::from(tax_credit_rate)
                / Decimal::ONE_HUNDRED;
            prop_assert!(
                row.tax_credit_for_year <= by_rate + tolerance(by_rate),
                "year {}: credit {} above {}% of {}",
                row.year, row.tax_credit_for_year, tax_credit_rate, row.yearly_contribution
            );
            if row.year == limited_year {
                prop_assert!(row.tax_credit_for_year <= Decimal::from(manual_limit));
            }
            if let Some(year) = first.first_withdrawal_year {
                if row.year >= year {
                    prop_assert_eq!(row.tax_credit_for_year, Decimal::ZERO);
                }
            }
        }

        let gap = (first.net_interest - first.total_yield).abs();
        prop_assert!(gap <= tolerance(first.total_contributions), "gap {}", gap);
    }

    #[test]
    fn prop_monthly_rows_conserve_money(
        amount in 1u32..100_000,
        frequency in 0usize..4,
        horizon in 1u32..6,
        yield_bp in 0u32..1_200,
        upfront in 0u32..60,
        asset_fee_bp in 0u32..250,
        fixed_fee in 0u32..1_000,
        invested_share in 0u32..=100,
        withdrawal_year in 1u32..6,
        withdrawal_amount in 0u32..500_000,
    ) {
        let inputs = build_inputs(
            amount, frequency, horizon, yield_bp, upfront, asset_fee_bp, 0, fixed_fee,
            invested_share, 0, withdrawal_year, withdrawal_amount, 15, 50_000,
        );
        let result = run_projection(&inputs).unwrap().result;
        let months = result.monthly_breakdown.unwrap();
        prop_assert_eq!(months.len() as u32, horizon * 12);

        let mut previous = Decimal::ZERO;
        for row in &months {
            prop_assert!(row.invested_units >= Decimal::ZERO);
            prop_assert!(row.client_units >= Decimal::ZERO);
            prop_assert_eq!(
                row.balance,
                (row.invested_units + row.client_units) * row.unit_price
            );

            let expected = previous + row.contribution - row.upfront_cost + row.bonus
                + row.yield_amount - row.asset_based_cost - row.ongoing_cost
                - row.risk_insurance_cost - row.withdrawal + row.tax_credit;
            prop_assert!(
                (row.balance - expected).abs() <= tolerance(row.balance),
                "month {}: balance {} expected {}", row.month_index, row.balance, expected
            );
            previous = row.balance;
        }
    }

    #[test]
    fn prop_zero_yield_without_costs_returns_net_contributions(
        amount in 0u32..100_000,
        frequency in 0usize..4,
        horizon in 1u32..10,
        invested_share in 0u32..=100,
        withdrawal_year in 1u32..10,
        withdrawal_amount in 0u32..400_000,
    ) {
        let mut inputs = SimulationInputs::new(
            Currency::HUF,
            Decimal::from(amount),
            FREQUENCIES[frequency],
            horizon,
            Decimal::ZERO,
        );
        inputs.invested_share_percent = YearTable::flat(Decimal::from(invested_share));
        inputs.withdrawals.insert(withdrawal_year, Decimal::from(withdrawal_amount));

        let result = run_projection(&inputs).unwrap().result;
        prop_assert_eq!(result.total_yield, Decimal::ZERO);
        let expected = result.total_contributions - result.total_withdrawals;
        prop_assert!(
            (result.final_balance - expected).abs() <= tolerance(expected),
            "final {} expected {}", result.final_balance, expected
        );
    }
}
