//! downtime-check: verify a planned producer downtime on a live devnet
//!
//! Schedules a downtime for the producer that owns the rotation shortly
//! after "now", then watches the chain and asserts block authors around
//! the recorded window. Exits non-zero on the first failed check.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use downtime_verifier::adapters::{
    BorRpcClient, HeimdallCliAdmin, HeimdallRestClient, ShellCommandRunner, SystemClock,
};
use downtime_verifier::{
    DowntimeVerification, OrchestratorDeps, VerificationOrchestrator, VerificationReport,
    VerifierConfig,
};
use verifier_telemetry::{init_telemetry, TelemetryConfig};

/// Verify that a planned producer downtime is honored by the span rotation
#[derive(Parser, Debug)]
#[command(name = "downtime-check")]
#[command(about = "Schedules a producer downtime and checks block authors around it")]
struct Args {
    /// Bor JSON-RPC endpoint (scheme optional)
    #[arg(long)]
    rpc_url: String,

    /// Heimdall REST endpoint (scheme optional)
    #[arg(long)]
    registry_url: String,

    /// Shell template for validator commands; `{validator}` and `{command}` are substituted
    #[arg(long, default_value = "{command}")]
    exec_template: String,

    /// Validator the downtime is requested for
    #[arg(long)]
    target_validator: Option<u64>,

    /// Chain height to wait for before starting
    #[arg(long)]
    min_start_block: Option<u64>,

    /// Seconds from now until the downtime starts
    #[arg(long)]
    start_offset_secs: Option<u64>,

    /// Downtime length in seconds
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Heimdall home directory on the validators
    #[arg(long)]
    heimdall_home: Option<String>,

    /// Log level filter (overrides PDV_LOG_LEVEL / RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,

    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,

    /// Print the report as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

impl Args {
    /// Environment configuration with flags applied on top.
    fn config(&self) -> VerifierConfig {
        let mut config = VerifierConfig::from_env();
        if let Some(id) = self.target_validator {
            config.target_validator_id = id;
        }
        if let Some(height) = self.min_start_block {
            config.min_start_block = height;
        }
        if let Some(secs) = self.start_offset_secs {
            config.downtime_start_offset_secs = secs;
        }
        if let Some(secs) = self.duration_secs {
            config.downtime_duration_secs = secs;
        }
        if let Some(home) = &self.heimdall_home {
            config.heimdall_home = home.clone();
        }
        config
    }

    fn telemetry(&self) -> TelemetryConfig {
        let mut telemetry = TelemetryConfig::from_env();
        if let Some(level) = &self.log_level {
            telemetry = telemetry.with_log_level(level.clone());
        }
        if self.json_logs {
            telemetry = telemetry.with_json_logs(true);
        }
        telemetry
    }
}

fn print_summary(report: &VerificationReport) {
    let (start_drift, end_drift) = report.estimate_drift();
    println!("planned downtime verified");
    println!("  requested by validator: {}", report.target_validator_id);
    println!(
        "  downed producer:        validator {} ({})",
        report.downed_validator_id, report.downed_producer
    );
    println!("  wall-clock window:      {}", report.request);
    println!(
        "  estimated blocks:       {} (drift {:+}/{:+})",
        report.estimated_range, start_drift, end_drift
    );
    println!("  recorded blocks:        {}", report.authoritative_range);
    for record in &report.checkpoints {
        println!(
            "  {:<14} block {:<8} author {} (span {})",
            record.checkpoint.to_string(),
            record.height,
            record.author,
            record.span_id
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let telemetry = init_telemetry(args.telemetry()).context("Failed to initialize logging")?;

    let config = args.config();
    config.validate()?;

    let timeout = config.http_timeout();
    let rest = Arc::new(
        HeimdallRestClient::new(&args.registry_url, timeout)
            .context("Failed to build Heimdall REST client")?,
    );
    let bor =
        BorRpcClient::new(&args.rpc_url, timeout).context("Failed to build Bor RPC client")?;
    let runner = ShellCommandRunner::new(args.exec_template.clone()).map_err(anyhow::Error::msg)?;

    info!(
        service = telemetry.service_name(),
        registry = %rest.base_url(),
        rpc = %bor.rpc_url(),
        target_validator = config.target_validator_id,
        "starting downtime verification"
    );

    let deps = OrchestratorDeps {
        spans: rest.clone(),
        downtime: rest,
        chain: Arc::new(bor),
        admin: Arc::new(HeimdallCliAdmin::new(
            Arc::new(runner),
            config.heimdall_home.clone(),
        )),
        clock: Arc::new(SystemClock),
    };

    let mut orchestrator = VerificationOrchestrator::new(config, deps);
    let report = orchestrator
        .verify()
        .await
        .context("Planned downtime verification failed")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to encode report")?
        );
    } else {
        print_summary(&report);
    }
    Ok(())
}
