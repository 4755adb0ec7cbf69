use std::env;

use clap::Parser;
use rentbuy::api::{MortgageCli, SavingsCli, mortgage_report, savings_report};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rentbuy=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let raw_args: Vec<String> = env::args().collect();
    let report = match raw_args.get(1).map(|s| s.as_str()) {
        Some("serve") => {
            let port = raw_args
                .get(2)
                .and_then(|s| s.parse::<u16>().ok())
                .unwrap_or(8080);
            if let Err(e) = rentbuy::api::run_http_server(port).await {
                tracing::error!("Server error: {e}");
                std::process::exit(1);
            }
            return;
        }
        Some("mortgage") => mortgage_report(MortgageCli::parse_from(raw_args[1..].iter())),
        Some("savings") => savings_report(SavingsCli::parse_from(raw_args[1..].iter())),
        _ => {
            eprintln!("Usage: cargo run -- serve [port]");
            eprintln!("       cargo run -- mortgage --rent <RENT> [options]");
            eprintln!("       cargo run -- savings --duration-years <YEARS> --starting-amount <AMOUNT> [options]");
            std::process::exit(1);
        }
    };

    match report {
        Ok(text) => println!("{text}"),
        Err(msg) => {
            eprintln!("{msg}");
            std::process::exit(1);
        }
    }
}
