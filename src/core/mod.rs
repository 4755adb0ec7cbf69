mod engine;
mod error;
mod scenarios;
mod types;

pub use engine::Simulation;
pub use error::ScenarioError;
pub use scenarios::{duration_months, run_mortgage, run_savings, trace_mortgage};
pub use types::{MonthTracePoint, MortgageInputs, MortgageResult, SavingsInputs, SavingsResult};
