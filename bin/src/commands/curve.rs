//! Volume curve command.

use anyhow::{Context, Result};
use volcurve_lib::{CurveProgress, CurveRequest, EventType, parse_datetime, volume_curve};

use super::SessionArgs;
use crate::display::{Output, basket_progress};

/// Arguments of the `curve` subcommand.
#[derive(Debug)]
pub(crate) struct CurveArgs {
    pub(crate) index: String,
    pub(crate) end: String,
    pub(crate) days: u32,
    pub(crate) interval: u32,
    pub(crate) event: String,
    pub(crate) fields: Vec<String>,
    pub(crate) reference_hour: u32,
    pub(crate) label_width: usize,
}

impl CurveArgs {
    fn request(&self) -> Result<CurveRequest> {
        let end = parse_datetime(&self.end).with_context(|| format!("Invalid end: {}", self.end))?;
        let event_type: EventType = self.event.parse()?;
        Ok(
            CurveRequest::new(self.index.as_str(), event_type, end, self.days, self.interval)
                .with_fields(self.fields.iter().cloned())
                .with_reference_hour(self.reference_hour)
                .with_label_width(self.label_width),
        )
    }
}

/// Build the volume curve of an index basket and write ADV, average and
/// cumulative tables.
pub(crate) async fn curve(session: &SessionArgs, args: &CurveArgs, output: &Output) -> Result<()> {
    let request = args.request()?;
    let fetcher = session.fetcher()?;

    let progress = basket_progress(output.quiet(), &args.index);
    let curve = volume_curve(&fetcher, &request, |step| match step {
        CurveProgress::Resolved(count) => progress.set_length(count as u64),
        CurveProgress::Fetched(security) => {
            progress.set_message(security.to_string());
            progress.inc(1);
        }
    })
    .await;

    let curve = match curve {
        Ok(curve) => {
            progress.finish_with_message(format!("{} members", curve.adv.len()));
            curve
        }
        Err(e) => {
            progress.abandon();
            return Err(e).with_context(|| format!("Volume curve for {} failed", args.index));
        }
    };

    output.write_frame(Some("adv"), "security", &curve.adv.to_frame("ADV")?)?;
    output.write_frame(Some("average"), "time", &curve.average)?;
    output.write_frame(Some("cumulative"), "time", &curve.cumulative)?;

    Ok(())
}
