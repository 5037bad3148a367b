pub mod config;
pub mod logging;
pub mod service;
pub mod shutdown;

pub use config::{Config, ConfigError, LogFormat, LogLevel, ResolvedConfig};
pub use service::{FeedService, IngestReport, ServiceError};

use crate::domain::{FeedData, Record};
use crate::parser::RecordParser;
use anyhow::Context;
use clap::Parser;
use std::collections::BTreeMap;
use std::io::Write;
use tokio::io::AsyncBufRead;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct App {
    config: Config,
    service: FeedService,
    shutdown_token: CancellationToken,
}

impl App {
    pub fn from_args<I, T>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Config::from_args(args)?;
        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let resolved = config
            .resolve()
            .context("failed to resolve buffer configuration")?;
        for key in &resolved.ignored_keys {
            warn!("Ignoring unknown configuration key: {}", key);
        }

        info!("Starting telemetry-buffer v{}", crate::VERSION);
        info!(
            "Configuration: memory={:?}, disk={:?}, disk_location={}, memory_only={}",
            resolved.buffer.memory,
            resolved.buffer.disk,
            resolved.buffer.disk_location.display(),
            config.memory_only
        );

        let shutdown_token = CancellationToken::new();
        let service = FeedService::new(resolved.buffer, config.memory_only, shutdown_token.clone())
            .context("failed to build buffer rings")?;

        Ok(Self {
            config,
            service,
            shutdown_token,
        })
    }

    pub fn service(&self) -> &FeedService {
        &self.service
    }

    /// Ingests `input` until EOF or a termination signal, optionally writes the
    /// buffered feeds to `output`, then shuts the service down.
    pub async fn run<R, W>(mut self, input: R, mut output: W) -> anyhow::Result<IngestReport>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        self.service.start()?;
        let signal_task = shutdown::cancel_on_signal(self.shutdown_token.clone());

        let parser = RecordParser::with_default_unit(self.config.default_unit);
        let report = self.service.ingest_lines(input, &parser).await?;

        if self.config.dump {
            let snapshot = self.service.snapshot(self.config.default_unit);
            write_dump(&mut output, &snapshot).context("failed to write feed dump")?;
        }

        self.service.shutdown().await?;
        if let Err(e) = signal_task.await {
            warn!("Signal task ended abnormally: {}", e);
        }
        Ok(report)
    }
}

fn write_dump<W: Write>(output: &mut W, snapshot: &FeedData) -> anyhow::Result<()> {
    let ordered: BTreeMap<&String, &Vec<Record>> = snapshot.iter().collect();
    serde_json::to_writer_pretty(&mut *output, &ordered)?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

pub fn get_version() -> String {
    crate::VERSION.to_string()
}

// Main entry point for the application
pub async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    logging::init_tracing(config.log_level, config.log_format);

    let app = App::from_config(config)?;
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let report = app.run(stdin, std::io::stdout()).await?;

    info!(
        "telemetry-buffer stopped ({} records buffered, {} rejected)",
        report.accepted, report.rejected
    );
    Ok(())
}
