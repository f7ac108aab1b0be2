pub mod risk;

pub use risk::{RiskLevel, classify};
