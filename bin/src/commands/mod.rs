//! CLI command implementations.

use anyhow::{Context, Result};
use chrono::FixedOffset;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use volcurve_lib::{
    BridgeGateway, DEFAULT_HOST, DEFAULT_PORT, Fetcher, Gateway, Interrupt, ScriptedGateway,
    SessionConfig, Transcript, parse_utc_offset,
};

pub(crate) mod bars;
pub(crate) mod curve;
pub(crate) mod history;
pub(crate) mod members;
pub(crate) mod ticks;

/// Gateway connection options shared by every subcommand.
#[derive(Debug, Args)]
pub(crate) struct SessionArgs {
    /// Gateway host
    #[arg(short = 'a', long = "ip", default_value = DEFAULT_HOST, global = true)]
    pub(crate) host: String,

    /// Gateway port
    #[arg(short, long, default_value_t = DEFAULT_PORT, global = true)]
    pub(crate) port: u16,

    /// Offset of local time from UTC (±HH:MM). Defaults to the local clock.
    #[arg(long, value_parser = parse_utc_offset, allow_hyphen_values = true, global = true)]
    pub(crate) utc_offset: Option<FixedOffset>,

    /// Replay a recorded transcript instead of connecting to a gateway
    #[arg(long, value_name = "FILE", global = true)]
    pub(crate) replay: Option<PathBuf>,
}

impl SessionArgs {
    /// Builds the session configuration, capturing the local offset once.
    pub(crate) fn config(&self) -> SessionConfig {
        let mut config = SessionConfig::new(self.host.clone(), self.port);
        if let Some(offset) = self.utc_offset {
            config = config.with_utc_offset(offset);
        }
        config
    }

    /// Builds a fetcher whose polling stops on Ctrl-C.
    pub(crate) fn fetcher(&self) -> Result<Fetcher> {
        let gateway: Arc<dyn Gateway> = match &self.replay {
            Some(path) => {
                let transcript = Transcript::from_path(path)
                    .with_context(|| format!("Failed to load transcript {}", path.display()))?;
                info!(path = %path.display(), "replaying transcript");
                Arc::new(ScriptedGateway::new(transcript))
            }
            None => Arc::new(BridgeGateway::new()),
        };

        let fetcher = Fetcher::new(gateway, self.config());
        watch_ctrl_c(fetcher.interrupt().clone());
        Ok(fetcher)
    }
}

/// Sets the interrupt flag on the first Ctrl-C.
fn watch_ctrl_c(interrupt: Interrupt) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping session");
            interrupt.trigger();
        }
    });
}
