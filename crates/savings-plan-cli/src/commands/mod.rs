pub mod plan;
pub mod product;
pub mod projection;
