//! Forecast one account from a delimited series file.
//!
//! Usage: cargo run --example forecast_account -- <series.csv> <account> [horizon]
//!
//! `account` is either a reserved account UUID or an integer >= 3. Without a
//! file argument a small built-in series for the primary account is used.
//! Set `RUST_LOG=debug` to see coefficient selection.

use budget_forecast::identity::RESERVED_PRIMARY;
use budget_forecast::{
    ForecastEngine, ForecastResponse, IdentifierInput, SeriesLoader, SeriesSource, SourceSelection,
};
use std::env;
use std::error::Error;
use tracing_subscriber::EnvFilter;

const BUILTIN_SERIES: &str = "user_id,tx_id,date,current_budget
698841bd-189c-4407-b582-9d5fa2689336,1,01/03/2024 09:00,1520.00
698841bd-189c-4407-b582-9d5fa2689336,2,02/03/2024 18:30,1488.40
698841bd-189c-4407-b582-9d5fa2689336,3,04/03/2024 12:10,1432.15
698841bd-189c-4407-b582-9d5fa2689336,4,05/03/2024 08:45,1401.90
698841bd-189c-4407-b582-9d5fa2689336,5,07/03/2024 19:20,1356.00
698841bd-189c-4407-b582-9d5fa2689336,6,08/03/2024 13:05,1340.75
698841bd-189c-4407-b582-9d5fa2689336,7,10/03/2024 10:00,1298.30
";

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let account = args
        .get(1)
        .map(|raw| match raw.parse::<i64>() {
            Ok(id) => IdentifierInput::Integer(id),
            Err(_) => IdentifierInput::Text(raw.clone()),
        })
        .unwrap_or_else(|| IdentifierInput::from(RESERVED_PRIMARY));
    let horizon = args.get(2).and_then(|h| h.parse().ok()).unwrap_or(6);

    let engine = ForecastEngine::default();
    let values = match args.first() {
        Some(path) => {
            let source = SeriesSource::Delimited(path.into());
            engine.forecast_input(&account, horizon, &source)?
        }
        None => {
            if let SourceSelection::Remote { url, .. } = SourceSelection::from_env() {
                println!("Remote dataset configured at {}; using the built-in series instead", url);
            }
            let table = SeriesLoader::from_reader(BUILTIN_SERIES.as_bytes())?;
            let identifier = budget_forecast::Identifier::parse(&account)?;
            let report = engine.forecast_table(&identifier, horizon, &table)?;
            println!("Method: {:?}", report.method);
            report.values
        }
    };

    let response = ForecastResponse {
        user_id: match &account {
            IdentifierInput::Text(raw) => raw.clone(),
            IdentifierInput::Integer(id) => id.to_string(),
            IdentifierInput::Unsigned(id) => id.to_string(),
            IdentifierInput::Other(kind) => kind.to_string(),
        },
        n: horizon,
        values,
    };
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
