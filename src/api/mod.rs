use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    MonthTracePoint, MortgageInputs, MortgageResult, SavingsInputs, SavingsResult, ScenarioError,
    run_mortgage, run_savings, trace_mortgage,
};

const MAX_DURATION_YEARS: f64 = 100.0;

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(
    name = "mortgage",
    about = "Compare renting or buying with a mortgage against investing the same money"
)]
pub struct MortgageCli {
    #[arg(long, help = "Monthly rent")]
    pub rent: f64,
    #[arg(long, default_value_t = 1.0)]
    pub duration_years: f64,
    #[arg(long, default_value_t = 0.0, help = "Purchase price of the property")]
    pub property_value: f64,
    #[arg(long, default_value_t = 0.0)]
    pub loan: f64,
    #[arg(long, default_value_t = 0.0, help = "Annual loan interest in percent")]
    pub loan_interest_percent: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Share of the original loan repaid per year, in percent"
    )]
    pub loan_amortization_percent: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        allow_negative_numbers = true,
        help = "Annual market return in percent"
    )]
    pub stock_interest_percent: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        allow_negative_numbers = true,
        help = "Annual property appreciation in percent"
    )]
    pub property_interest_percent: f64,
}

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(
    name = "savings",
    about = "Grow a starting balance and monthly savings at a market return"
)]
pub struct SavingsCli {
    #[arg(long)]
    pub duration_years: f64,
    #[arg(long)]
    pub starting_amount: f64,
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub monthly_savings: f64,
    #[arg(
        long,
        default_value_t = 8.0,
        allow_negative_numbers = true,
        help = "Annual market return in percent"
    )]
    pub interest_percent: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct MortgagePayload {
    rent: Option<f64>,
    #[serde(alias = "duration", alias = "duration_years")]
    duration_years: Option<f64>,
    #[serde(alias = "property_value")]
    property_value: Option<f64>,
    loan: Option<f64>,
    #[serde(alias = "loanInterest", alias = "loan_interest_percent")]
    loan_interest_percent: Option<f64>,
    #[serde(alias = "loanAmortization", alias = "loan_amortization_percent")]
    loan_amortization_percent: Option<f64>,
    #[serde(alias = "stockInterest", alias = "stock_interest_percent")]
    stock_interest_percent: Option<f64>,
    #[serde(alias = "propertyInterest", alias = "property_interest_percent")]
    property_interest_percent: Option<f64>,
    #[serde(alias = "include_trace")]
    include_trace: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SavingsPayload {
    #[serde(alias = "duration", alias = "duration_years")]
    duration_years: Option<f64>,
    #[serde(alias = "startingBalance", alias = "starting_amount")]
    starting_amount: Option<f64>,
    #[serde(alias = "monthly_savings")]
    monthly_savings: Option<f64>,
    #[serde(alias = "interest", alias = "interest_percent")]
    interest_percent: Option<f64>,
}

#[derive(Debug)]
struct MortgageRequest {
    inputs: MortgageInputs,
    include_trace: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MortgageResponse {
    #[serde(flatten)]
    result: MortgageResult,
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    monthly_trace: Option<Vec<MonthTracePoint>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SavingsResponse {
    #[serde(flatten)]
    result: SavingsResult,
    summary: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn require_finite(flag: &str, value: f64) -> Result<(), String> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(format!("--{flag} must be a finite number"))
    }
}

fn require_non_negative(flag: &str, value: f64) -> Result<(), String> {
    require_finite(flag, value)?;
    if value < 0.0 {
        return Err(format!("--{flag} must be >= 0"));
    }
    Ok(())
}

fn require_duration(value: f64) -> Result<(), String> {
    require_finite("duration-years", value)?;
    if !(0.0..=MAX_DURATION_YEARS).contains(&value) {
        return Err(format!(
            "--duration-years must be between 0 and {MAX_DURATION_YEARS}"
        ));
    }
    Ok(())
}

// A return of -100% or less has no monthly equivalent.
fn require_growth_percent(flag: &str, value: f64) -> Result<(), String> {
    require_finite(flag, value)?;
    if value <= -100.0 {
        return Err(format!("--{flag} must be > -100"));
    }
    Ok(())
}

pub fn build_mortgage_inputs(cli: MortgageCli) -> Result<MortgageInputs, String> {
    require_duration(cli.duration_years)?;
    require_non_negative("rent", cli.rent)?;
    require_non_negative("property-value", cli.property_value)?;
    require_non_negative("loan", cli.loan)?;

    require_finite("loan-interest-percent", cli.loan_interest_percent)?;
    if !(0.0..=100.0).contains(&cli.loan_interest_percent) {
        return Err("--loan-interest-percent must be between 0 and 100".to_string());
    }

    require_finite("loan-amortization-percent", cli.loan_amortization_percent)?;
    if !(0.0..=1200.0).contains(&cli.loan_amortization_percent) {
        return Err("--loan-amortization-percent must be between 0 and 1200".to_string());
    }

    require_growth_percent("stock-interest-percent", cli.stock_interest_percent)?;
    require_growth_percent("property-interest-percent", cli.property_interest_percent)?;

    Ok(MortgageInputs {
        rent: cli.rent,
        duration_years: cli.duration_years,
        property_value: cli.property_value,
        loan: cli.loan,
        loan_interest_rate: cli.loan_interest_percent / 100.0,
        loan_amortization_rate: cli.loan_amortization_percent / 100.0,
        stock_interest_rate: cli.stock_interest_percent / 100.0,
        property_interest_rate: cli.property_interest_percent / 100.0,
    })
}

pub fn build_savings_inputs(cli: SavingsCli) -> Result<SavingsInputs, String> {
    require_duration(cli.duration_years)?;
    require_non_negative("starting-amount", cli.starting_amount)?;
    // Negative savings are withdrawals.
    require_finite("monthly-savings", cli.monthly_savings)?;
    require_growth_percent("interest-percent", cli.interest_percent)?;

    Ok(SavingsInputs {
        duration_years: cli.duration_years,
        starting_amount: cli.starting_amount,
        monthly_savings: cli.monthly_savings,
        interest_rate: cli.interest_percent / 100.0,
    })
}

/// Runs the mortgage scenario and renders it as text.
pub fn mortgage_report(cli: MortgageCli) -> Result<String, String> {
    let inputs = build_mortgage_inputs(cli)?;
    let result = run_mortgage(&inputs).map_err(|e| e.to_string())?;
    Ok(result.to_string())
}

pub fn savings_report(cli: SavingsCli) -> Result<String, String> {
    let inputs = build_savings_inputs(cli)?;
    let result = run_savings(&inputs).map_err(|e| e.to_string())?;
    Ok(result.to_string())
}

pub fn router() -> Router {
    Router::new()
        .route(
            "/api/mortgage",
            get(mortgage_get_handler).post(mortgage_post_handler),
        )
        .route(
            "/api/savings",
            get(savings_get_handler).post(savings_post_handler),
        )
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("rent-or-buy HTTP API listening on http://{addr}");
    tracing::info!("Local access: http://127.0.0.1:{port}/api/mortgage?rent=1000");

    axum::serve(listener, router()).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn mortgage_get_handler(
    payload: Result<Query<MortgagePayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => mortgage_handler_impl(payload),
        Err(rejection) => malformed_request_response(&rejection.body_text()),
    }
}

async fn mortgage_post_handler(payload: Result<Json<MortgagePayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => mortgage_handler_impl(payload),
        Err(rejection) => malformed_request_response(&rejection.body_text()),
    }
}

async fn savings_get_handler(payload: Result<Query<SavingsPayload>, QueryRejection>) -> Response {
    match payload {
        Ok(Query(payload)) => savings_handler_impl(payload),
        Err(rejection) => malformed_request_response(&rejection.body_text()),
    }
}

async fn savings_post_handler(payload: Result<Json<SavingsPayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => savings_handler_impl(payload),
        Err(rejection) => malformed_request_response(&rejection.body_text()),
    }
}

// Extractor rejections are plain text by default.
fn malformed_request_response(detail: &str) -> Response {
    tracing::warn!(%detail, "rejected malformed request");
    error_response(StatusCode::BAD_REQUEST, &format!("Invalid request: {detail}"))
}

fn mortgage_handler_impl(payload: MortgagePayload) -> Response {
    let request = match mortgage_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => {
            tracing::warn!(%msg, "rejected mortgage request");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    let outcome = if request.include_trace {
        trace_mortgage(&request.inputs).map(|(result, trace)| (result, Some(trace)))
    } else {
        run_mortgage(&request.inputs).map(|result| (result, None))
    };

    match outcome {
        Ok((result, monthly_trace)) => json_response(
            StatusCode::OK,
            MortgageResponse {
                summary: result.to_string(),
                result,
                monthly_trace,
            },
        ),
        Err(err) => scenario_error_response(err),
    }
}

fn savings_handler_impl(payload: SavingsPayload) -> Response {
    let inputs = match savings_inputs_from_payload(payload) {
        Ok(inputs) => inputs,
        Err(msg) => {
            tracing::warn!(%msg, "rejected savings request");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    match run_savings(&inputs) {
        Ok(result) => json_response(
            StatusCode::OK,
            SavingsResponse {
                summary: result.to_string(),
                result,
            },
        ),
        Err(err) => scenario_error_response(err),
    }
}

fn scenario_error_response(err: ScenarioError) -> Response {
    tracing::warn!(%err, "scenario produced an unusable result");
    error_response(StatusCode::UNPROCESSABLE_ENTITY, &err.to_string())
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn default_mortgage_cli_for_api(rent: f64) -> MortgageCli {
    MortgageCli {
        rent,
        duration_years: 1.0,
        property_value: 0.0,
        loan: 0.0,
        loan_interest_percent: 0.0,
        loan_amortization_percent: 0.0,
        stock_interest_percent: 0.0,
        property_interest_percent: 0.0,
    }
}

fn mortgage_request_from_payload(payload: MortgagePayload) -> Result<MortgageRequest, String> {
    let Some(rent) = payload.rent else {
        return Err("rent is required".to_string());
    };
    let mut cli = default_mortgage_cli_for_api(rent);

    if let Some(v) = payload.duration_years {
        cli.duration_years = v;
    }
    if let Some(v) = payload.property_value {
        cli.property_value = v;
    }
    if let Some(v) = payload.loan {
        cli.loan = v;
    }
    if let Some(v) = payload.loan_interest_percent {
        cli.loan_interest_percent = v;
    }
    if let Some(v) = payload.loan_amortization_percent {
        cli.loan_amortization_percent = v;
    }
    if let Some(v) = payload.stock_interest_percent {
        cli.stock_interest_percent = v;
    }
    if let Some(v) = payload.property_interest_percent {
        cli.property_interest_percent = v;
    }

    Ok(MortgageRequest {
        inputs: build_mortgage_inputs(cli)?,
        include_trace: payload.include_trace.unwrap_or(false),
    })
}

fn savings_inputs_from_payload(payload: SavingsPayload) -> Result<SavingsInputs, String> {
    let Some(duration_years) = payload.duration_years else {
        return Err("durationYears is required".to_string());
    };
    let Some(starting_amount) = payload.starting_amount else {
        return Err("startingAmount is required".to_string());
    };

    build_savings_inputs(SavingsCli {
        duration_years,
        starting_amount,
        monthly_savings: payload.monthly_savings.unwrap_or(0.0),
        interest_percent: payload.interest_percent.unwrap_or(8.0),
    })
}

#[cfg(test)]
fn mortgage_request_from_json(json: &str) -> Result<MortgageRequest, String> {
    let payload = serde_json::from_str::<MortgagePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    mortgage_request_from_payload(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_cli() -> MortgageCli {
        MortgageCli {
            rent: 1_000.0,
            duration_years: 25.0,
            property_value: 1_000_000.0,
            loan: 850_000.0,
            loan_interest_percent: 1.5,
            loan_amortization_percent: 2.0,
            stock_interest_percent: 8.0,
            property_interest_percent: 3.0,
        }
    }

    fn sample_savings_cli() -> SavingsCli {
        SavingsCli {
            duration_years: 10.0,
            starting_amount: 100_000.0,
            monthly_savings: 2_000.0,
            interest_percent: 8.0,
        }
    }

    #[test]
    fn clap_defaults_match_api_defaults() {
        let parsed = MortgageCli::try_parse_from(["mortgage", "--rent", "1000"]).expect("parse");
        assert_eq!(parsed, default_mortgage_cli_for_api(1_000.0));

        let parsed = SavingsCli::try_parse_from([
            "savings",
            "--duration-years",
            "2",
            "--starting-amount",
            "5000",
        ])
        .expect("parse");
        assert_eq!(parsed.monthly_savings, 0.0);
        assert_eq!(parsed.interest_percent, 8.0);
    }

    #[test]
    fn clap_requires_rent() {
        assert!(MortgageCli::try_parse_from(["mortgage", "--loan", "1000"]).is_err());
    }

    #[test]
    fn build_mortgage_inputs_converts_percent_to_fraction() {
        let inputs = build_mortgage_inputs(sample_cli()).expect("valid inputs");
        assert_approx(inputs.loan_interest_rate, 0.015);
        assert_approx(inputs.loan_amortization_rate, 0.02);
        assert_approx(inputs.stock_interest_rate, 0.08);
        assert_approx(inputs.property_interest_rate, 0.03);
        assert_approx(inputs.loan, 850_000.0);
    }

    #[test]
    fn build_mortgage_inputs_rejects_negative_duration() {
        let mut cli = sample_cli();
        cli.duration_years = -1.0;
        let err = build_mortgage_inputs(cli).expect_err("must reject negative duration");
        assert!(err.contains("--duration-years"));
    }

    #[test]
    fn build_mortgage_inputs_rejects_excessive_duration() {
        let mut cli = sample_cli();
        cli.duration_years = 1_000.0;
        let err = build_mortgage_inputs(cli).expect_err("must cap duration");
        assert!(err.contains("--duration-years"));
    }

    #[test]
    fn build_mortgage_inputs_rejects_non_finite_values() {
        let mut cli = sample_cli();
        cli.loan = f64::NAN;
        let err = build_mortgage_inputs(cli).expect_err("must reject NaN");
        assert!(err.contains("--loan"));
    }

    #[test]
    fn build_mortgage_inputs_rejects_out_of_range_percentages() {
        let mut cli = sample_cli();
        cli.loan_interest_percent = 150.0;
        let err = build_mortgage_inputs(cli).expect_err("must reject interest > 100");
        assert!(err.contains("--loan-interest-percent"));

        let mut cli = sample_cli();
        cli.loan_amortization_percent = -1.0;
        let err = build_mortgage_inputs(cli).expect_err("must reject negative amortization");
        assert!(err.contains("--loan-amortization-percent"));

        let mut cli = sample_cli();
        cli.property_interest_percent = -100.0;
        let err = build_mortgage_inputs(cli).expect_err("must reject total loss");
        assert!(err.contains("--property-interest-percent"));
    }

    #[test]
    fn build_mortgage_inputs_allows_negative_market_return() {
        let mut cli = sample_cli();
        cli.stock_interest_percent = -20.0;
        let inputs = build_mortgage_inputs(cli).expect("valid inputs");
        assert_approx(inputs.stock_interest_rate, -0.2);
    }

    #[test]
    fn build_savings_inputs_allows_withdrawals_but_not_negative_start() {
        let mut cli = sample_savings_cli();
        cli.monthly_savings = -500.0;
        assert!(build_savings_inputs(cli).is_ok());

        let mut cli = sample_savings_cli();
        cli.starting_amount = -1.0;
        let err = build_savings_inputs(cli).expect_err("must reject negative start");
        assert!(err.contains("--starting-amount"));
    }

    #[test]
    fn mortgage_request_from_json_parses_web_keys() {
        let json = r#"{
          "rent": 900,
          "durationYears": 2,
          "propertyValue": 400000,
          "loan": 300000,
          "loanInterest": 3.5,
          "loanAmortizationPercent": 2,
          "stockInterest": 7,
          "property_interest_percent": 1,
          "includeTrace": true
        }"#;
        let request = mortgage_request_from_json(json).expect("json should parse");
        let inputs = request.inputs;

        assert!(request.include_trace);
        assert_approx(inputs.rent, 900.0);
        assert_approx(inputs.duration_years, 2.0);
        assert_approx(inputs.property_value, 400_000.0);
        assert_approx(inputs.loan, 300_000.0);
        assert_approx(inputs.loan_interest_rate, 0.035);
        assert_approx(inputs.loan_amortization_rate, 0.02);
        assert_approx(inputs.stock_interest_rate, 0.07);
        assert_approx(inputs.property_interest_rate, 0.01);
    }

    #[test]
    fn mortgage_request_requires_rent() {
        let err = mortgage_request_from_json(r#"{"loan": 1000}"#).expect_err("rent is required");
        assert!(err.contains("rent"));
    }

    #[test]
    fn savings_payload_applies_command_defaults() {
        let inputs = savings_inputs_from_payload(SavingsPayload {
            duration_years: Some(1.0),
            starting_amount: Some(1_000_000.0),
            ..SavingsPayload::default()
        })
        .expect("valid payload");
        assert_approx(inputs.monthly_savings, 0.0);
        assert_approx(inputs.interest_rate, 0.08);
    }

    #[test]
    fn mortgage_report_renders_monthly_averages() {
        let cli = MortgageCli::try_parse_from(["mortgage", "--rent", "1000"]).expect("parse");
        let report = mortgage_report(cli).expect("valid report");
        assert_eq!(report, "RESULT (monthly average)\nPayment: 1000\nRevenue: -1000");
    }

    #[test]
    fn savings_report_renders_balance() {
        let cli = SavingsCli {
            duration_years: 2.0,
            starting_amount: 1_000_000.0,
            monthly_savings: 0.0,
            interest_percent: 8.0,
        };
        assert_eq!(
            savings_report(cli).expect("valid report"),
            "Balance after 2 years: 1166400"
        );
    }

    #[test]
    fn mortgage_response_serialization_contains_expected_fields() {
        let inputs = build_mortgage_inputs(sample_cli()).expect("valid inputs");
        let (result, trace) = trace_mortgage(&inputs).expect("finite result");
        let response = MortgageResponse {
            summary: result.to_string(),
            result,
            monthly_trace: Some(trace),
        };

        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"months\":300"));
        assert!(json.contains("\"totalPayment\""));
        assert!(json.contains("\"averageMonthlyPayment\""));
        assert!(json.contains("\"totalRevenue\""));
        assert!(json.contains("\"averageMonthlyRevenue\""));
        assert!(json.contains("\"summary\""));
        assert!(json.contains("\"monthlyTrace\""));
        assert!(json.contains("\"ghostSavings\""));
        assert!(json.contains("\"outstandingDebt\""));
    }

    #[test]
    fn mortgage_response_omits_trace_unless_requested() {
        let inputs = build_mortgage_inputs(sample_cli()).expect("valid inputs");
        let result = run_mortgage(&inputs).expect("finite result");
        let response = MortgageResponse {
            summary: result.to_string(),
            result,
            monthly_trace: None,
        };

        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(!json.contains("monthlyTrace"));
    }
}
