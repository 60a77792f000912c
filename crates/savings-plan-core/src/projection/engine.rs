use std::time::Instant;

use chrono::Months;
use rust_decimal::Decimal;
use tracing::{debug, debug_span, trace};

use super::inputs::{BonusMode, Breakdown, SimulationInputs};
use super::ledger::{AccountKind, Ledger};
use super::output::{MonthRow, PeriodFlows, ProjectionOutput, YearRow};
use super::parameters::{ResolvedParameters, YearParameters};
use super::MAX_HORIZON_YEARS;
use crate::error::SavingsPlanError;
use crate::plan::{expand_plans, ExpandedPlans};
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::SavingsPlanResult;

const MONTHS_PER_YEAR: u32 = 12;

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Run a full projection: expand the contribution/withdrawal plans (unless
/// the inputs already carry them) and simulate month by month.
pub fn run_projection(
    inputs: &SimulationInputs,
) -> SavingsPlanResult<ComputationOutput<ProjectionOutput>> {
    let plans = resolve_plans(inputs)?;
    project_with_plans(inputs, &plans)
}

/// Simulate with caller-supplied plans. Same inputs and plans always give
/// the same `result`.
pub fn project_with_plans(
    inputs: &SimulationInputs,
    plans: &ExpandedPlans,
) -> SavingsPlanResult<ComputationOutput<ProjectionOutput>> {
    let start = Instant::now();
    validate(inputs, plans)?;

    let span = debug_span!(
        "projection",
        horizon_years = inputs.horizon_years,
        currency = ?inputs.currency
    );
    let _entered = span.enter();

    let mut warnings: Vec<String> = Vec::new();
    let params = ResolvedParameters::resolve(inputs, &mut warnings);
    if plans
        .contributions
        .iter()
        .chain(plans.withdrawals.iter())
        .any(|v| *v < Decimal::ZERO)
    {
        warnings.push("Negative planned contributions or withdrawals treated as 0".into());
    }
    if inputs.horizon_years == 0 {
        warnings.push("Zero-year horizon: nothing to project".into());
    }

    let output = simulate(inputs, plans, &params);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Unit-linked savings projection (monthly unit ledger, daily-compounded asset fee)",
        &serde_json::json!({
            "horizon_years": inputs.horizon_years,
            "frequency": inputs.frequency,
            "annual_yield_percent": inputs.annual_yield_percent.to_string(),
            "starting_unit_price": inputs.effective_starting_price().to_string(),
            "bonus_mode": inputs.bonus.mode,
            "tax_credit_enabled": inputs.tax_credit.enabled,
            "tax_account": inputs.tax_account.is_some(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// The plans a run will use: explicit arrays from the inputs when present,
/// otherwise built by the plan builder.
pub fn resolve_plans(inputs: &SimulationInputs) -> SavingsPlanResult<ExpandedPlans> {
    check_horizon(inputs.horizon_years)?;
    let slots = inputs.horizon_years as usize + 1;
    for (field, plan) in [
        ("yearly_contribution_plan", &inputs.yearly_contribution_plan),
        ("yearly_withdrawal_plan", &inputs.yearly_withdrawal_plan),
    ] {
        if let Some(values) = plan {
            if values.len() != slots {
                return Err(SavingsPlanError::invalid(
                    field,
                    format!(
                        "expected {} entries (horizon_years + 1), got {}",
                        slots,
                        values.len()
                    ),
                ));
            }
        }
    }

    let built = expand_plans(&inputs.plan_input());
    Ok(ExpandedPlans {
        contributions: inputs
            .yearly_contribution_plan
            .clone()
            .unwrap_or(built.contributions),
        withdrawals: inputs
            .yearly_withdrawal_plan
            .clone()
            .unwrap_or(built.withdrawals),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub(crate) fn check_horizon(horizon_years: u32) -> SavingsPlanResult<()> {
    if horizon_years > MAX_HORIZON_YEARS {
        return Err(SavingsPlanError::invalid(
            "horizon_years",
            format!("horizon must not exceed {MAX_HORIZON_YEARS} years"),
        ));
    }
    Ok(())
}

fn validate(inputs: &SimulationInputs, plans: &ExpandedPlans) -> SavingsPlanResult<()> {
    check_horizon(inputs.horizon_years)?;
    if inputs.starting_unit_price <= Decimal::ZERO {
        return Err(SavingsPlanError::invalid(
            "starting_unit_price",
            "starting unit price must be > 0",
        ));
    }
    if let Some(fx) = inputs.fx_rate_to_base_currency {
        if fx <= Decimal::ZERO {
            return Err(SavingsPlanError::invalid(
                "fx_rate_to_base_currency",
                "FX rate must be > 0",
            ));
        }
    }
    let slots = inputs.horizon_years as usize + 1;
    if plans.contributions.len() != slots || plans.withdrawals.len() != slots {
        return Err(SavingsPlanError::invalid(
            "plans",
            format!(
                "plans must have {} entries (horizon_years + 1), got {} contributions and {} withdrawals",
                slots,
                plans.contributions.len(),
                plans.withdrawals.len()
            ),
        ));
    }
    check_magnitude(inputs, plans)
}

/// Upper bound on any amount a run may produce. Run totals add up many
/// months of balance-sized flows, so it sits well below `Decimal::MAX`.
fn max_projected_amount() -> Decimal {
    Decimal::from_i128_with_scale(10_i128.pow(25), 0)
}

/// Rejects inputs whose compounded balance, unit price or unit count would
/// leave the decimal range. Every bound is an over-estimate: all money
/// credited over the run, grown at the full yield for the whole horizon.
fn check_magnitude(inputs: &SimulationInputs, plans: &ExpandedPlans) -> SavingsPlanResult<()> {
    let limit = max_projected_amount();
    let too_large = |field: &str| {
        SavingsPlanError::invalid(
            field,
            format!(
                "projected amounts over {} years would exceed {limit}",
                inputs.horizon_years
            ),
        )
    };

    let price = match (&inputs.pricing_currency, inputs.fx_rate_to_base_currency) {
        (Some(pricing), Some(fx)) if *pricing != inputs.currency => inputs
            .starting_unit_price
            .checked_mul(fx)
            .ok_or_else(|| too_large("starting_unit_price"))?,
        _ => inputs.starting_unit_price,
    };

    let mut contributions = Decimal::ZERO;
    for value in &plans.contributions {
        contributions = contributions
            .checked_add((*value).max(Decimal::ZERO))
            .ok_or_else(|| too_large("yearly_contribution_plan"))?;
    }

    // money credited on top of contributions: bonus, tax credit, refunds
    let horizon = Decimal::from(inputs.horizon_years);
    let mut multiplier = Decimal::ONE;
    if inputs.bonus.mode == BonusMode::PercentOfContribution {
        let top = inputs
            .bonus
            .percent_by_year
            .values()
            .copied()
            .fold(inputs.bonus.percent, Decimal::max)
            .max(Decimal::ZERO);
        multiplier = multiplier
            .checked_add(top / Decimal::ONE_HUNDRED)
            .ok_or_else(|| too_large("bonus.percent"))?;
    }
    if inputs.tax_credit.enabled {
        multiplier += Decimal::ONE;
    }
    if inputs.bonus.mode == BonusMode::EscalatingRefund {
        multiplier += horizon * horizon / Decimal::from(200);
    }
    let mut credited = contributions
        .checked_mul(multiplier)
        .ok_or_else(|| too_large("bonus.percent"))?;
    for amount in inputs.bonus.amount_by_year.values() {
        credited = credited
            .checked_add((*amount).max(Decimal::ZERO))
            .ok_or_else(|| too_large("bonus.amount_by_year"))?;
    }

    let annual =
        Decimal::ONE + inputs.annual_yield_percent.max(Decimal::ZERO) / Decimal::ONE_HUNDRED;
    let mut growth = Decimal::ONE;
    for _ in 0..inputs.horizon_years {
        growth = growth
            .checked_mul(annual)
            .filter(|g| *g <= limit)
            .ok_or_else(|| too_large("annual_yield_percent"))?;
    }

    let balance = credited
        .checked_mul(growth)
        .filter(|b| *b <= limit)
        .ok_or_else(|| too_large("annual_yield_percent"))?;
    let final_price = price
        .checked_mul(growth)
        .filter(|p| *p <= limit)
        .ok_or_else(|| too_large("starting_unit_price"))?;
    let units = credited
        .checked_div(price)
        .filter(|u| *u <= limit)
        .ok_or_else(|| too_large("starting_unit_price"))?;
    trace!(%balance, %final_price, %units, "magnitude bounds");

    if let Some(fx) = inputs.fx_rate_to_base_currency {
        balance
            .checked_mul(fx)
            .filter(|b| *b <= limit)
            .ok_or_else(|| too_large("fx_rate_to_base_currency"))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Run-wide accumulators that are not part of the ledger itself.
#[derive(Debug, Default)]
struct RunState {
    totals: PeriodFlows,
    first_year_upfront_cost: Money,
    first_withdrawal_year: Option<u32>,
    month_index: u32,
}

fn simulate(
    inputs: &SimulationInputs,
    plans: &ExpandedPlans,
    params: &ResolvedParameters,
) -> ProjectionOutput {
    let mut ledger = Ledger::new(inputs.effective_starting_price());
    let mut state = RunState::default();
    let mut yearly_breakdown: Vec<YearRow> = Vec::with_capacity(inputs.horizon_years as usize);
    let mut monthly_breakdown: Option<Vec<MonthRow>> = match inputs.breakdown {
        Breakdown::Monthly => Some(Vec::with_capacity(
            (inputs.horizon_years * MONTHS_PER_YEAR) as usize,
        )),
        Breakdown::Yearly => None,
    };

    let payments_per_year = Decimal::from(inputs.frequency.payments_per_year());
    let mut last_redemption_rate = Decimal::ZERO;

    for year in 1..=inputs.horizon_years {
        let year_params = params.year(year);
        last_redemption_rate = year_params.redemption_rate;
        let payment = plans.contribution(year).max(Decimal::ZERO) / payments_per_year;
        let mut year_flows = PeriodFlows::default();
        let mut tax_credit_base = Decimal::ZERO;

        for month in 1..=MONTHS_PER_YEAR {
            state.month_index += 1;
            let mut flows = PeriodFlows::default();

            // 1. escalating refund of the year-1 upfront cost
            if params.bonus_mode() == BonusMode::EscalatingRefund && year >= 2 && month == 1 {
                let refund = state.first_year_upfront_cost * Decimal::from(year - 1)
                    / Decimal::ONE_HUNDRED;
                ledger.credit_invested(AccountKind::Main, refund);
                flows.bonus += refund;
            }

            // 2. payment due this month?
            let gross = if inputs.frequency.is_payment_month(month) {
                payment
            } else {
                Decimal::ZERO
            };

            if gross > Decimal::ZERO {
                invest_contribution(&mut ledger, &year_params, gross, &mut flows);
                if year == 1 {
                    state.first_year_upfront_cost += flows.upfront_cost;
                }
                tax_credit_base += if params.has_tax_account() {
                    gross * year_params.tax_share
                } else {
                    gross
                };
            }

            // 6. yield on the invested pool only
            flows.yield_amount = ledger.accrue_yield(params.monthly_growth());

            // 7. ongoing fee waterfall
            if year_params.fees_active && ledger.total_units() > Decimal::ZERO {
                charge_ongoing_fees(&mut ledger, &year_params, &mut flows);
            }
            if let Some((monthly_amount, contribution_rate)) = year_params.risk {
                if ledger.total_units() > Decimal::ZERO {
                    let premium = monthly_amount + gross * contribution_rate;
                    flows.risk_insurance_cost += ledger.deduct_combined(premium);
                }
            }

            // 8. year-end events
            if month == MONTHS_PER_YEAR {
                if year_params.loyalty_bonus > Decimal::ZERO {
                    ledger.credit_invested(AccountKind::Main, year_params.loyalty_bonus);
                    flows.bonus += year_params.loyalty_bonus;
                }

                let planned = plans.withdrawal(year);
                if planned > Decimal::ZERO {
                    let withdrawn = ledger.withdraw(planned);
                    flows.withdrawal += withdrawn;
                    flows.redemption_cost += withdrawn * year_params.redemption_rate;
                    if withdrawn > Decimal::ZERO && state.first_withdrawal_year.is_none() {
                        state.first_withdrawal_year = Some(year);
                    }
                }

                if let Some(rule) = params.tax_credit() {
                    let disqualified =
                        rule.stop_after_first_withdrawal && state.first_withdrawal_year.is_some();
                    if rule.applies_to(year) && !disqualified {
                        let credit = rule.credit_for(year, tax_credit_base);
                        let target = if params.has_tax_account() {
                            AccountKind::TaxEligible
                        } else {
                            AccountKind::Main
                        };
                        ledger.credit_invested(target, credit);
                        flows.tax_credit += credit;
                    }
                }
            }

            trace!(
                year,
                month,
                balance = %ledger.balance(),
                unit_price = %ledger.unit_price(),
                "month simulated"
            );

            if let Some(rows) = monthly_breakdown.as_mut() {
                rows.push(month_row(inputs, &ledger, year, month, state.month_index, &flows));
            }
            year_flows.absorb(&flows);
        }

        state.totals.absorb(&year_flows);
        debug!(
            year,
            contribution = %year_flows.contribution,
            tax_credit = %year_flows.tax_credit,
            withdrawal = %year_flows.withdrawal,
            end_balance = %ledger.balance(),
            "year closed"
        );
        yearly_breakdown.push(year_row(&ledger, year, &year_flows, &state.totals));
    }

    let totals = state.totals;
    let final_balance = ledger.balance();
    let total_costs = totals.total_cost();
    let total_withdrawals_net = totals.net_withdrawal();

    ProjectionOutput {
        currency: inputs.currency.clone(),
        final_balance,
        final_balance_in_base_currency: inputs.fx_rate_to_base_currency.map(|fx| final_balance * fx),
        surrender_value: final_balance - final_balance * last_redemption_rate,
        total_contributions: totals.contribution,
        total_costs,
        total_upfront_cost: totals.upfront_cost,
        total_asset_based_cost: totals.asset_based_cost,
        total_ongoing_cost: totals.ongoing_cost,
        total_risk_insurance_cost: totals.risk_insurance_cost,
        total_redemption_cost: totals.redemption_cost,
        total_bonus: totals.bonus,
        total_tax_credit: totals.tax_credit,
        total_withdrawals: totals.withdrawal,
        total_withdrawals_net,
        total_yield: totals.yield_amount,
        net_interest: final_balance - totals.contribution - totals.bonus - totals.tax_credit
            + total_costs
            + total_withdrawals_net,
        first_withdrawal_year: state.first_withdrawal_year,
        yearly_breakdown,
        monthly_breakdown,
    }
}

/// Steps 3 to 5: upfront cost, contribution bonus, account and pool split.
fn invest_contribution(
    ledger: &mut Ledger,
    year_params: &YearParameters,
    gross: Money,
    flows: &mut PeriodFlows,
) {
    let upfront = gross * year_params.upfront_rate;
    let bonus = gross * year_params.bonus_rate;
    let net = gross - upfront + bonus;

    let to_tax = net * year_params.tax_share;
    for (kind, amount) in [
        (AccountKind::Main, net - to_tax),
        (AccountKind::TaxEligible, to_tax),
    ] {
        let invested = amount * year_params.invested_share;
        ledger.buy(kind, invested, amount - invested);
    }

    flows.contribution += gross;
    flows.upfront_cost += upfront;
    flows.bonus += bonus;
}

/// Step 7: asset-based fee, then percentage fee, then fixed fee. Each one
/// works on the balance left by the previous one.
fn charge_ongoing_fees(ledger: &mut Ledger, year_params: &YearParameters, flows: &mut PeriodFlows) {
    for (kind, keep) in [
        (AccountKind::Main, year_params.asset_keep_main),
        (AccountKind::TaxEligible, year_params.asset_keep_tax),
    ] {
        let value = ledger.account_balance(kind);
        flows.asset_based_cost += ledger.deduct_from(kind, value * (Decimal::ONE - keep));
    }

    for kind in [AccountKind::Main, AccountKind::TaxEligible] {
        let value = ledger.account_balance(kind);
        flows.ongoing_cost +=
            ledger.deduct_from(kind, value * (Decimal::ONE - year_params.ongoing_keep));
    }

    if year_params.fixed_fee > Decimal::ZERO {
        flows.ongoing_cost += ledger.deduct_combined(year_params.fixed_fee);
    }
}

fn month_row(
    inputs: &SimulationInputs,
    ledger: &Ledger,
    year: u32,
    month: u32,
    month_index: u32,
    flows: &PeriodFlows,
) -> MonthRow {
    MonthRow {
        year,
        month,
        month_index,
        period_start: inputs
            .start_date
            .and_then(|d| d.checked_add_months(Months::new(month_index - 1))),
        contribution: flows.contribution,
        upfront_cost: flows.upfront_cost,
        bonus: flows.bonus,
        yield_amount: flows.yield_amount,
        asset_based_cost: flows.asset_based_cost,
        ongoing_cost: flows.ongoing_cost,
        risk_insurance_cost: flows.risk_insurance_cost,
        withdrawal: flows.withdrawal,
        redemption_cost: flows.redemption_cost,
        tax_credit: flows.tax_credit,
        unit_price: ledger.unit_price(),
        invested_units: ledger.invested_units(),
        client_units: ledger.client_units(),
        balance: ledger.balance(),
    }
}

fn year_row(ledger: &Ledger, year: u32, flows: &PeriodFlows, totals: &PeriodFlows) -> YearRow {
    YearRow {
        year,
        yearly_contribution: flows.contribution,
        cumulative_contributions: totals.contribution,
        yield_for_year: flows.yield_amount,
        upfront_cost_for_year: flows.upfront_cost,
        asset_based_cost_for_year: flows.asset_based_cost,
        ongoing_cost_for_year: flows.ongoing_cost,
        risk_insurance_cost_for_year: flows.risk_insurance_cost,
        redemption_cost_for_year: flows.redemption_cost,
        cost_for_year: flows.total_cost(),
        bonus_for_year: flows.bonus,
        tax_credit_for_year: flows.tax_credit,
        withdrawal_for_year: flows.withdrawal,
        net_withdrawal_for_year: flows.net_withdrawal(),
        invested_balance: ledger.invested_balance(),
        client_balance: ledger.client_balance(),
        tax_account_balance: ledger.account_balance(AccountKind::TaxEligible),
        end_balance: ledger.balance(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
