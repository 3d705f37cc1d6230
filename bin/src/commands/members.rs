//! Index members command.

use anyhow::{Context, Result};
use volcurve_lib::{Frame, MembersRequest};

use super::SessionArgs;
use crate::display::Output;

/// List the members of an index, one identifier per row.
pub(crate) async fn members(
    session: &SessionArgs,
    index: &str,
    suffix: &str,
    output: &Output,
) -> Result<()> {
    let request = MembersRequest::new(index).with_suffix(suffix);
    let members = session
        .fetcher()?
        .index_members(&request)
        .await
        .with_context(|| format!("Member request for {index} failed"))?;

    let listing = Frame::new(members.into_iter().map(String::from).collect());
    output.write_frame(None, "security", &listing)
}
