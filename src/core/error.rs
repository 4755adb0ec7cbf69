use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScenarioError {
    /// Compounding overflowed; the figure must not be reported.
    #[error("{field} is not a finite number (got {value})")]
    NonFinite { field: &'static str, value: f64 },
}
