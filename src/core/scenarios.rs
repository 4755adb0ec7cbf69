use super::engine::Simulation;
use super::error::ScenarioError;
use super::types::{MonthTracePoint, MortgageInputs, MortgageResult, SavingsInputs, SavingsResult};

/// Whole months in `years`, rounded to the nearest month.
pub fn duration_months(years: f64) -> u32 {
    (years * 12.0).round().max(0.0) as u32
}

fn mortgage_simulation(inputs: &MortgageInputs) -> Simulation {
    let mut simulation = Simulation::new(
        0.0,
        inputs.stock_interest_rate,
        inputs.property_interest_rate,
    );
    simulation
        .add_rent(inputs.rent)
        .buy_property(inputs.property_value)
        .take_loan(
            inputs.loan,
            inputs.loan_interest_rate,
            inputs.loan_amortization_rate,
        );
    simulation
}

fn per_month(total: f64, months: u32) -> f64 {
    if months == 0 {
        0.0
    } else {
        total / months as f64
    }
}

fn ensure_finite(field: &'static str, value: f64) -> Result<f64, ScenarioError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ScenarioError::NonFinite { field, value })
    }
}

fn mortgage_result(simulation: &Simulation, months: u32) -> Result<MortgageResult, ScenarioError> {
    let total_payment = ensure_finite("totalPayment", simulation.total_payed())?;
    let total_revenue = ensure_finite("totalRevenue", simulation.total_revenue())?;
    Ok(MortgageResult {
        months,
        total_payment,
        average_monthly_payment: per_month(total_payment, months),
        total_revenue,
        average_monthly_revenue: per_month(total_revenue, months),
    })
}

pub fn run_mortgage(inputs: &MortgageInputs) -> Result<MortgageResult, ScenarioError> {
    let months = duration_months(inputs.duration_years);
    let mut simulation = mortgage_simulation(inputs);
    tracing::debug!(
        months,
        loans = simulation.loan_count(),
        rent = inputs.rent,
        "running mortgage scenario"
    );

    simulation.fast_forward(months);
    mortgage_result(&simulation, months)
}

/// Mortgage scenario plus the month-by-month state it went through.
pub fn trace_mortgage(
    inputs: &MortgageInputs,
) -> Result<(MortgageResult, Vec<MonthTracePoint>), ScenarioError> {
    let months = duration_months(inputs.duration_years);
    let mut simulation = mortgage_simulation(inputs);
    tracing::debug!(
        months,
        loans = simulation.loan_count(),
        rent = inputs.rent,
        "tracing mortgage scenario"
    );

    let trace = simulation.fast_forward_traced(months);
    Ok((mortgage_result(&simulation, months)?, trace))
}

pub fn run_savings(inputs: &SavingsInputs) -> Result<SavingsResult, ScenarioError> {
    let months = duration_months(inputs.duration_years);
    let mut simulation = Simulation::new(inputs.starting_amount, inputs.interest_rate, 0.0);
    simulation
        .invest_money_in_the_bank(true)
        .add_income(inputs.monthly_savings);
    tracing::debug!(
        months,
        loans = simulation.loan_count(),
        monthly = inputs.monthly_savings,
        "running savings scenario"
    );

    simulation.fast_forward(months);

    Ok(SavingsResult {
        duration_years: inputs.duration_years,
        months,
        new_balance: ensure_finite("newBalance", simulation.money_in_the_bank())?,
    })
}
