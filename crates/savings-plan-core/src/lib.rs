pub mod error;
pub mod plan;
pub mod product;
pub mod projection;
pub mod types;

pub use error::SavingsPlanError;
pub use types::*;

/// Standard result type for all savings-plan operations
pub type SavingsPlanResult<T> = Result<T, SavingsPlanError>;
