//! Month-by-month projection of a unit-linked savings account.
//!
//! A run turns [`SimulationInputs`] plus expanded yearly plans into a
//! [`ProjectionOutput`]. The ledger keeps two unit pools per account
//! (invested and client) priced by one shared unit price; every monthly
//! step is applied in a fixed order because later steps see the balance
//! left by earlier ones.

mod engine;
mod inputs;
mod ledger;
mod output;
mod parameters;

pub(crate) use engine::check_horizon;
pub use engine::{project_with_plans, resolve_plans, run_projection};
pub use inputs::{
    BonusConfig, BonusMode, Breakdown, CostParameters, RiskInsuranceConfig, SimulationInputs,
    TaxAccountConfig, TaxCreditConfig,
};
pub use ledger::{AccountKind, Ledger, Pools};
pub use output::{MonthRow, ProjectionOutput, YearRow};

/// Longest horizon a single run accepts.
pub const MAX_HORIZON_YEARS: u32 = 100;
