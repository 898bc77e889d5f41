//! CSV batch pricing.
//!
//! Input columns (header required):
//!
//! ```text
//! spot,strike,maturity,option_type,style,rate,volatility[,dividend_yield][,engine]
//! ```
//!
//! A malformed or invalid row produces an error entry for that row only.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

use crate::error::{PricingError, Result};
use crate::models::engine::EngineKind;
use crate::pricing::config::PricerConfig;
use crate::pricing::pipeline::{price_requests, PricingRequest};
use crate::pricing::types::{
    ExerciseStyle, MarketEnvironment, OptionContract, OptionType, PricingReport,
};

/// Raw CSV row before validation
#[derive(Debug, Clone, Deserialize)]
struct RequestRow {
    spot: f64,
    strike: f64,
    maturity: f64,
    option_type: OptionType,
    style: ExerciseStyle,
    rate: f64,
    volatility: f64,
    #[serde(default)]
    dividend_yield: Option<f64>,
    #[serde(default)]
    engine: Option<EngineKind>,
}

impl RequestRow {
    fn into_request(self) -> Result<PricingRequest> {
        let option = OptionContract::new(
            self.spot,
            self.strike,
            self.maturity,
            self.option_type,
            self.style,
        )?;
        let market = MarketEnvironment::new(
            self.rate,
            self.volatility,
            self.dividend_yield.unwrap_or(0.0),
        )?;
        Ok(PricingRequest {
            option,
            market,
            engine: self.engine,
        })
    }
}

/// Outcome for one data line of the input
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    /// 1-based record number, header excluded
    pub record: usize,
    pub result: Result<PricingReport>,
}

/// Flat output row
#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    record: usize,
    engine: &'a str,
    option_type: String,
    style: String,
    spot: Option<f64>,
    strike: Option<f64>,
    maturity: Option<f64>,
    price: Option<f64>,
    delta: Option<f64>,
    vega: Option<f64>,
    warnings: String,
    error: String,
}

/// Parse requests from CSV; each record is validated independently.
pub fn read_requests<R: io::Read>(reader: R) -> Vec<Result<PricingRequest>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    csv_reader
        .deserialize::<RequestRow>()
        .map(|row| {
            row.map_err(|e| PricingError::InvalidParameter(format!("malformed row: {e}")))
                .and_then(RequestRow::into_request)
        })
        .collect()
}

/// Parse and price every record of a CSV input.
pub fn price_csv<R: io::Read>(reader: R, config: &PricerConfig) -> Vec<BatchEntry> {
    let parsed = read_requests(reader);
    let valid: Vec<PricingRequest> = parsed
        .iter()
        .filter_map(|r| r.as_ref().ok().copied())
        .collect();
    let mut priced = price_requests(&valid, config).into_iter();

    parsed
        .into_iter()
        .enumerate()
        .map(|(i, request)| BatchEntry {
            record: i + 1,
            result: match request {
                // price_requests returns exactly one result per valid request, in order
                Ok(_) => priced.next().unwrap_or_else(|| {
                    Err(PricingError::InvalidParameter("missing batch result".to_string()))
                }),
                Err(e) => Err(e),
            },
        })
        .collect()
}

/// Price a CSV file on disk.
pub fn price_csv_file(
    path: impl AsRef<Path>,
    config: &PricerConfig,
) -> anyhow::Result<Vec<BatchEntry>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open batch input {}", path.display()))?;
    Ok(price_csv(file, config))
}

/// Write batch results as CSV.
pub fn write_entries<W: io::Write>(writer: W, entries: &[BatchEntry]) -> anyhow::Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for entry in entries {
        let row = match &entry.result {
            Ok(report) => ReportRow {
                record: entry.record,
                engine: report.engine,
                option_type: report.option.option_type().to_string(),
                style: report.option.style().to_string(),
                spot: Some(report.option.spot()),
                strike: Some(report.option.strike()),
                maturity: Some(report.option.maturity()),
                price: Some(report.price),
                delta: report.greeks.map(|g| g.delta),
                vega: report.greeks.map(|g| g.vega),
                warnings: report
                    .warnings
                    .iter()
                    .map(|w| w.to_string())
                    .collect::<Vec<_>>()
                    .join("; "),
                error: String::new(),
            },
            Err(e) => ReportRow {
                record: entry.record,
                engine: "",
                option_type: String::new(),
                style: String::new(),
                spot: None,
                strike: None,
                maturity: None,
                price: None,
                delta: None,
                vega: None,
                warnings: String::new(),
                error: e.to_string(),
            },
        };
        csv_writer.serialize(row).context("failed to write batch row")?;
    }
    csv_writer.flush().context("failed to flush batch output")?;
    Ok(())
}
