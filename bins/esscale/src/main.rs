use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use esscale_domain::report::{render_config, render_evaluation, render_update};
use esscale_domain::{Autoscaler, AutoscalerConfig, DomainError, RunOutcome, SnapshotBackend};
use esscale_policy::{
    PolicyError, ScalingParameters, DEFAULT_HEADROOM_FRACTION, DEFAULT_MAX_NODES,
    DEFAULT_MIN_NODES,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "esscale")]
#[command(about = "Resize an Elasticsearch domain's data nodes to fit its used storage")]
struct Args {
    /// The Elasticsearch domain name to evaluate.
    #[arg(short = 'd', long)]
    domain_name: String,

    #[arg(short = 'r', long, default_value = esscale_domain::DEFAULT_REGION)]
    region: String,

    /// Minimum number of data nodes to run.
    #[arg(long, default_value_t = DEFAULT_MIN_NODES)]
    min_slaves: u32,

    /// Maximum number of data nodes to run.
    #[arg(long, default_value_t = DEFAULT_MAX_NODES)]
    max_slaves: u32,

    /// Fraction of the required nodes to add for growth and sharding.
    #[arg(short = 'p', long, default_value_t = DEFAULT_HEADROOM_FRACTION)]
    percent_allow: f64,

    /// Actually request the cluster configuration change.
    #[arg(short = 'c', long)]
    configure: bool,

    /// Domain snapshot (describe response plus storage datapoints).
    #[arg(long, default_value = "es-domain.json")]
    state_file: PathBuf,

    #[arg(long, default_value = "300")]
    metrics_window_secs: u64,

    /// Write Prometheus text-format metrics here after the run.
    #[arg(long)]
    metrics_textfile: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

impl Args {
    fn autoscaler_config(&self) -> AutoscalerConfig {
        let mut config = AutoscalerConfig::new(&self.domain_name);
        config.region = self.region.clone();
        config.params = ScalingParameters::new(self.percent_allow, self.min_slaves, self.max_slaves);
        config.configure = self.configure;
        config.metrics_window = Duration::from_secs(self.metrics_window_secs);
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let metrics_handle = match &args.metrics_textfile {
        Some(_) => Some(
            PrometheusBuilder::new()
                .install_recorder()
                .context("failed to install metrics recorder")?,
        ),
        None => None,
    };

    let result = run(&args).await;

    if let (Some(path), Some(handle)) = (&args.metrics_textfile, &metrics_handle) {
        write_metrics(path, handle)?;
    }

    print!("{}", result?);
    Ok(())
}

/// Evaluates (and with `--configure` applies) the domain and returns what
/// should go to stdout.
async fn run(args: &Args) -> Result<String> {
    let config = args.autoscaler_config();

    tracing::info!(
        domain = %config.domain_name,
        state_file = %args.state_file.display(),
        configure = config.configure,
        "evaluating domain"
    );

    let backend = Arc::new(SnapshotBackend::new(&args.state_file));
    let scaler = Autoscaler::with_backend(config, backend);
    let outcome = scaler
        .run()
        .await
        .map_err(|e| failure_context(&args.domain_name, e))?;

    match args.output {
        OutputFormat::Text => Ok(render_text(scaler.config(), &outcome)),
        OutputFormat::Json => render_json(scaler.config(), &outcome),
    }
}

/// Names the command-line flag behind an invalid scaling parameter.
fn cli_flag(parameter: &str) -> Option<&'static str> {
    match parameter {
        "min_nodes" => Some("--min-slaves"),
        "max_nodes" => Some("--max-slaves"),
        "headroom_fraction" => Some("--percent-allow"),
        _ => None,
    }
}

fn failure_context(domain_name: &str, err: DomainError) -> anyhow::Error {
    let flag = match &err {
        DomainError::Policy(PolicyError::InvalidConfiguration {
            parameter, value, ..
        }) => cli_flag(parameter).map(|flag| format!("invalid {flag} {value}")),
        _ => None,
    };
    let context = flag.unwrap_or_else(|| format!("autoscaling {domain_name} failed"));
    anyhow::Error::new(err).context(context)
}

fn render_text(config: &AutoscalerConfig, outcome: &RunOutcome) -> String {
    let mut out = render_config(config);
    out.push('\n');
    out.push_str(&render_evaluation(&outcome.evaluation));
    if let Some(update) = &outcome.update {
        out.push_str(&render_update(update));
    }
    out
}

fn render_json(config: &AutoscalerConfig, outcome: &RunOutcome) -> Result<String> {
    let document = serde_json::json!({
        "config": config,
        "evaluation": outcome.evaluation,
        "update": outcome.update,
    });
    let mut out = serde_json::to_string_pretty(&document)?;
    out.push('\n');
    Ok(out)
}

fn write_metrics(path: &Path, handle: &PrometheusHandle) -> Result<()> {
    std::fs::write(path, handle.render())
        .with_context(|| format!("failed to write metrics to {}", path.display()))?;
    tracing::debug!(path = %path.display(), "wrote metrics textfile");
    Ok(())
}
