use napi::Result as NapiResult;
use napi_derive::napi;

use savings_plan_core::{plan, product, projection};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

#[napi]
pub fn expand_plans(input_json: String) -> NapiResult<String> {
    let input: plan::PlanInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = plan::build_plan(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

#[napi]
pub fn run_projection(input_json: String) -> NapiResult<String> {
    let input: projection::SimulationInputs =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = projection::run_projection(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[napi]
pub fn compare_products(input_json: String) -> NapiResult<String> {
    let input: product::ComparisonInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = product::compare_products(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
