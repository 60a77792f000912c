use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use savings_plan_core::projection::{self, Breakdown, SimulationInputs};
use savings_plan_core::types::{Currency, PaymentFrequency, YearTable};

use crate::input;

/// Payment frequency accepted on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FrequencyArg {
    Monthly,
    Quarterly,
    SemiAnnual,
    Annual,
}

impl From<FrequencyArg> for PaymentFrequency {
    fn from(arg: FrequencyArg) -> Self {
        match arg {
            FrequencyArg::Monthly => PaymentFrequency::Monthly,
            FrequencyArg::Quarterly => PaymentFrequency::Quarterly,
            FrequencyArg::SemiAnnual => PaymentFrequency::SemiAnnual,
            FrequencyArg::Annual => PaymentFrequency::Annual,
        }
    }
}

/// Arguments for a projection run
#[derive(Args)]
pub struct ProjectArgs {
    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Amount paid on every payment date
    #[arg(long)]
    pub amount: Option<Decimal>,

    /// Payment frequency
    #[arg(long, value_enum, default_value = "monthly")]
    pub frequency: FrequencyArg,

    /// Horizon in policy years
    #[arg(long)]
    pub years: Option<u32>,

    /// Annual gross fund yield in percent
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub yield_percent: Decimal,

    /// Annual contribution indexation in percent
    #[arg(long, default_value = "0")]
    pub index_percent: Decimal,

    /// Upfront cost on year-1 contributions in percent
    #[arg(long)]
    pub upfront_cost_percent: Option<Decimal>,

    /// Annual asset-based fee in percent
    #[arg(long)]
    pub asset_fee_percent: Option<Decimal>,

    /// Account currency code (HUF, EUR, USD, ...)
    #[arg(long)]
    pub currency: Option<String>,

    /// Emit the month-by-month breakdown
    #[arg(long)]
    pub monthly: bool,

    /// First day of policy year 1 (YYYY-MM-DD), labels monthly rows
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
}

pub fn run_project(args: ProjectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut inputs: SimulationInputs = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let amount = args
            .amount
            .ok_or("--amount is required (or provide --input)")?;
        let years = args
            .years
            .ok_or("--years is required (or provide --input)")?;

        let mut inputs = SimulationInputs::new(
            args.currency
                .as_deref()
                .map(parse_currency)
                .unwrap_or_default(),
            amount,
            args.frequency.into(),
            years,
            args.yield_percent,
        );
        inputs.annual_index_percent = args.index_percent;
        if let Some(upfront) = args.upfront_cost_percent {
            inputs.costs.upfront_cost_percent = upfront;
        }
        if let Some(fee) = args.asset_fee_percent {
            inputs.costs.asset_based_fee_percent = YearTable::flat(fee);
        }
        inputs
    };

    if args.monthly {
        inputs.breakdown = Breakdown::Monthly;
    }
    if args.start_date.is_some() {
        inputs.start_date = args.start_date;
    }

    let result = projection::run_projection(&inputs)?;
    Ok(serde_json::to_value(result)?)
}

fn parse_currency(code: &str) -> Currency {
    match code.to_ascii_uppercase().as_str() {
        "HUF" => Currency::HUF,
        "EUR" => Currency::EUR,
        "USD" => Currency::USD,
        "GBP" => Currency::GBP,
        "CHF" => Currency::CHF,
        other => Currency::Other(other.to_string()),
    }
}
