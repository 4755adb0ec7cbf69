use std::fmt;

use serde::Serialize;

/// Rent-versus-buy inputs. Rates are fractions, e.g. 0.015 for 1.5%.
#[derive(Debug, Clone, PartialEq)]
pub struct MortgageInputs {
    pub rent: f64,
    pub duration_years: f64,
    pub property_value: f64,
    pub loan: f64,
    pub loan_interest_rate: f64,
    pub loan_amortization_rate: f64,
    pub stock_interest_rate: f64,
    pub property_interest_rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SavingsInputs {
    pub duration_years: f64,
    pub starting_amount: f64,
    pub monthly_savings: f64,
    pub interest_rate: f64,
}

// Halves round up, towards positive infinity, so -1000.5 renders as -1000.
fn rounded(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MortgageResult {
    pub months: u32,
    pub total_payment: f64,
    pub average_monthly_payment: f64,
    pub total_revenue: f64,
    pub average_monthly_revenue: f64,
}

impl fmt::Display for MortgageResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "RESULT (monthly average)")?;
        writeln!(f, "Payment: {}", rounded(self.average_monthly_payment))?;
        write!(f, "Revenue: {}", rounded(self.average_monthly_revenue))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsResult {
    pub duration_years: f64,
    pub months: u32,
    pub new_balance: f64,
}

impl fmt::Display for SavingsResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Balance after {} years: {}",
            self.duration_years,
            rounded(self.new_balance)
        )
    }
}

/// State after one simulated month.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthTracePoint {
    pub month: u32,
    pub payed_this_month: f64,
    pub total_payed: f64,
    pub total_amortized: f64,
    pub ghost_savings: f64,
    pub money_in_the_bank: f64,
    pub property_value: f64,
    pub outstanding_debt: f64,
    pub total_revenue: f64,
}
