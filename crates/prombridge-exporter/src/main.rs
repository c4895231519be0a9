// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

use anyhow::{bail, Result};
use clap::Parser;
use prombridge_exporter::{
    ExtensionInformation, ExtensionMain, ExtensionStartInput, ExtensionStartOutput, GaugeValue,
    MetricRegistry, PrometheusExtension, EXTENSION_NAME,
};
use prombridge_observability::{init_tracing_with_config, LogConfig, LogFormat};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Parser)]
#[command(name = "prombridge")]
#[command(version, about = "Serve an in-process metric registry to Prometheus")]
#[command(author = "prombridge Contributors")]
struct Cli {
    /// Extension home containing conf/config.properties
    #[arg(long, value_name = "DIR", default_value = ".")]
    home: PathBuf,

    /// Configuration file, bypassing the lookup in the home directory
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log format (pretty|compact|json)
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    log_format: String,

    /// Log level filter, e.g. "info" or "prombridge_exporter=debug"
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,

    /// Disable colored log output
    #[arg(long)]
    no_color: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format: LogFormat = cli.log_format.parse()?;
    let mut log_config = LogConfig::new()
        .with_format(format)
        .with_color(!cli.no_color);
    if let Some(level) = &cli.log_level {
        log_config = log_config.with_level(level);
    }
    init_tracing_with_config(log_config)?;

    let registry = MetricRegistry::new();
    let started = Instant::now();
    registry.gauge(&MetricRegistry::name(&["prombridge", "uptime", "seconds"]), move || {
        GaugeValue::Float(started.elapsed().as_secs_f64())
    })?;
    let heartbeats = registry.meter(&MetricRegistry::name(&["prombridge", "heartbeats"]))?;
    let tick_timer = registry.timer(&MetricRegistry::name(&["prombridge", "heartbeat", "duration"]))?;

    let mut extension = PrometheusExtension::new();
    if let Some(config) = cli.config {
        extension = extension.with_config_path(config);
    }

    let input = ExtensionStartInput {
        information: ExtensionInformation::new(EXTENSION_NAME, cli.home),
        metric_registry: Arc::new(registry.clone()),
    };
    let mut output = ExtensionStartOutput::default();
    extension.extension_start(&input, &mut output);
    if let Some(reason) = output.startup_prevented() {
        bail!("{}", reason);
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut interval = tokio::time::interval(Duration::from_secs(10));
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("received shutdown signal");
                break;
            }
            _ = interval.tick() => tick_timer.time(|| heartbeats.mark()),
        }
    }

    extension.extension_stop();
    Ok(())
}
