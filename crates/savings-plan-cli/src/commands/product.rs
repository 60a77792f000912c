use clap::Args;
use serde_json::Value;

use savings_plan_core::product::{self, ComparisonInput};

use crate::input;

/// Arguments for a product comparison
#[derive(Args)]
pub struct CompareArgs {
    /// Path to JSON or YAML file holding `inputs` and `products`
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_compare(args: CompareArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let comparison: ComparisonInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file> or stdin required for a product comparison".into());
    };

    let result = product::compare_products(&comparison)?;
    Ok(serde_json::to_value(result)?)
}
