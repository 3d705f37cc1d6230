//! Intraday bar command.

use anyhow::{Context, Result};
use volcurve_lib::{BarRequest, EventType, SecurityId, TimeRange};

use super::SessionArgs;
use crate::display::Output;

/// Fetch intraday bars for one security.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn bars(
    session: &SessionArgs,
    security: &str,
    start: &str,
    end: &str,
    event: &str,
    interval: u32,
    fields: &[String],
    output: &Output,
) -> Result<()> {
    let range = TimeRange::parse(start, end).context("Invalid bar window")?;
    let event_type: EventType = event.parse()?;

    let request = BarRequest::new(SecurityId::new(security), event_type, range, interval)
        .with_fields(fields.iter().cloned());

    let bars = session
        .fetcher()?
        .bars(&request)
        .await
        .with_context(|| format!("Bar request for {security} failed"))?;

    output.write_frame(None, "time", &bars)
}
