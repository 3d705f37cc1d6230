//! Intraday tick command.

use anyhow::{Context, Result};
use volcurve_lib::{EventType, SecurityId, TickRequest, TimeRange};

use super::SessionArgs;
use crate::display::Output;

/// Fetch raw ticks for one security.
pub(crate) async fn ticks(
    session: &SessionArgs,
    security: &str,
    start: &str,
    end: &str,
    events: &[String],
    condition_codes: bool,
    output: &Output,
) -> Result<()> {
    let range = TimeRange::parse(start, end).context("Invalid tick window")?;
    let event_types = events
        .iter()
        .map(|e| e.parse::<EventType>())
        .collect::<Result<Vec<_>, _>>()?;

    let request = TickRequest::new(SecurityId::new(security), event_types, range)
        .with_condition_codes(condition_codes);

    let ticks = session
        .fetcher()?
        .ticks(&request)
        .await
        .with_context(|| format!("Tick request for {security} failed"))?;

    if !output.quiet() {
        eprintln!("Fetched {} ticks for {security}", ticks.len());
    }
    output.write_ticks(&ticks)
}
