use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use savings_plan_core::plan::{self, PlanInput};

use crate::input;

/// Arguments for the plan builder
#[derive(Args)]
pub struct PlanArgs {
    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Horizon in policy years
    #[arg(long)]
    pub years: Option<u32>,

    /// Contribution paid in policy year 1
    #[arg(long)]
    pub base_contribution: Option<Decimal>,

    /// Annual indexation in percent
    #[arg(long, default_value = "0")]
    pub index_percent: Decimal,
}

pub fn run_plan(args: PlanArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let plan_input: PlanInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        PlanInput {
            horizon_years: args
                .years
                .ok_or("--years is required (or provide --input)")?,
            base_contribution: args
                .base_contribution
                .ok_or("--base-contribution is required (or provide --input)")?,
            base_index_percent: args.index_percent,
            ..Default::default()
        }
    };

    let result = plan::build_plan(&plan_input)?;
    Ok(serde_json::to_value(result)?)
}
