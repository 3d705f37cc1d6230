//! End-of-day history command.

use anyhow::{Context, Result, anyhow};
use clap::{Args, ValueEnum};
use volcurve_lib::{
    DateRange, FieldId, HistoricalRequest, PeriodicityAdjustment, SecurityId, parse_date,
};

use super::SessionArgs;
use crate::display::Output;

/// Calendar the daily series is aligned to.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum Adjustment {
    Actual,
    Calendar,
    Fiscal,
}

impl From<Adjustment> for PeriodicityAdjustment {
    fn from(adjustment: Adjustment) -> Self {
        match adjustment {
            Adjustment::Actual => Self::Actual,
            Adjustment::Calendar => Self::Calendar,
            Adjustment::Fiscal => Self::Fiscal,
        }
    }
}

/// Optional history request settings.
#[derive(Debug, Clone, Default, Args)]
pub(crate) struct HistoryOptions {
    /// Periodicity adjustment
    #[arg(long, value_enum)]
    pub(crate) adjustment: Option<Adjustment>,

    /// Maximum number of points returned per security
    #[arg(long)]
    pub(crate) max_points: Option<u32>,

    /// Field override as FIELD=VALUE; may be repeated
    #[arg(long = "override", value_name = "FIELD=VALUE", value_parser = parse_override)]
    pub(crate) overrides: Vec<(String, String)>,
}

impl HistoryOptions {
    fn apply(&self, mut request: HistoricalRequest) -> HistoricalRequest {
        if let Some(adjustment) = self.adjustment {
            request = request.with_adjustment(adjustment.into());
        }
        if let Some(points) = self.max_points {
            request = request.with_max_data_points(points);
        }
        for (field, value) in &self.overrides {
            request = request.with_override(field.as_str(), value.as_str());
        }
        request
    }
}

/// Splits `FIELD=VALUE` at the first `=`.
fn parse_override(s: &str) -> Result<(String, String)> {
    let (field, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected FIELD=VALUE, got {s}"))?;
    anyhow::ensure!(!field.is_empty(), "override field is empty in {s}");
    Ok((field.to_string(), value.to_string()))
}

/// Fetch daily history and write one table per field.
pub(crate) async fn history(
    session: &SessionArgs,
    securities: &[String],
    fields: &[String],
    start: &str,
    end: &str,
    options: &HistoryOptions,
    output: &Output,
) -> Result<()> {
    let start = parse_date(start).with_context(|| format!("Invalid start date: {start}"))?;
    let end = parse_date(end).with_context(|| format!("Invalid end date: {end}"))?;

    let request = options.apply(HistoricalRequest::new(
        securities.iter().map(SecurityId::new).collect(),
        fields.iter().map(FieldId::new).collect(),
        DateRange::new(start, end),
    ));

    let data = session
        .fetcher()?
        .historical(&request)
        .await
        .context("Historical request failed")?;

    // Separate files per field only when more than one was requested.
    let split = fields.len() > 1;
    for (field, table) in data.iter() {
        let part = split.then(|| field.as_str());
        output.write_frame(part, "date", table)?;
    }

    Ok(())
}
