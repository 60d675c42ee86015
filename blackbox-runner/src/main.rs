use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use blackbox_core::{BlackboxConfig, Context};
use blackbox_runner::cli::RunnerCli;
use blackbox_runner::logging::init_tracing;
use blackbox_runner::metrics_server::install_metrics_recorder;
use blackbox_runner::suite::Suite;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = RunnerCli::parse();

    let mut config = load_config(&cli.config).await?;
    apply_cli_overrides(&mut config, &cli);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    init_tracing(&config.general)?;

    let suite = Suite::new(config, &cli.scenarios);
    if cli.list {
        for scenario in suite.scenarios() {
            println!("{}\t{}", scenario.name, scenario.protocol);
        }
        return Ok(ExitCode::SUCCESS);
    }
    if suite.scenarios().is_empty() {
        return Err(anyhow::anyhow!(
            "no scenario matches {:?}; use --list to see them",
            cli.scenarios
        ));
    }

    if suite.config().metrics.enabled {
        install_metrics_recorder(&suite.config().metrics)?;
    }

    let (ctx, cancel) = Context::with_cancel(&Context::background());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping scenarios");
            cancel.cancel();
        }
    });

    let report = suite.run_processes(&ctx).await;

    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        println!("{report}");
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Load `path`, or fall back to defaults plus environment overrides when
/// the file does not exist.
async fn load_config(path: &Path) -> Result<BlackboxConfig> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        return BlackboxConfig::load(path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config {}: {}", path.display(), e));
    }
    let mut config = BlackboxConfig::default();
    config.apply_env_overrides();
    Ok(config)
}

fn apply_cli_overrides(config: &mut BlackboxConfig, cli: &RunnerCli) {
    if let Some(level) = &cli.log_level {
        config.general.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.general.log_format = format.clone();
    }
    if let Some(dir) = &cli.work_dir {
        config.server.work_dir = dir.clone();
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.scenario.timeout_ms = timeout_ms;
    }
}
