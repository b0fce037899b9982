use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use glass_stepper::{
    metrics, ChannelObserver, ControllerConfig, StepRegistry, StepStatus, WorkflowController,
};

/// Drive a step workflow from a registry file with a scripted list of intents.
#[derive(Debug, Parser)]
#[command(name = "stepper", version)]
struct Args {
    /// Step registry (.json, .yaml or .yml)
    #[arg(short, long)]
    steps: PathBuf,

    /// Index of the initially active step
    #[arg(short, long, default_value_t = 0)]
    initial: usize,

    /// Advance automatically after complete/skip (overrides STEPPER_AUTO_ADVANCE)
    #[arg(long)]
    auto_advance: bool,

    /// Comma separated intents, e.g. "complete:0,wait:600,skip:1,next"
    #[arg(long, default_value = "")]
    script: String,

    /// Print Prometheus metrics when done
    #[arg(long)]
    metrics: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Intent {
    GoTo(usize),
    Next,
    Previous,
    Complete(usize),
    Skip(usize),
    Edit(usize),
    Delete(usize),
    Reorder(usize, usize),
    Status(usize, StepStatus),
    Save,
    Reset,
    Wait(u64),
}

impl FromStr for Intent {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split(':');
        let name = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        let index = |position: usize| -> anyhow::Result<usize> {
            args.get(position)
                .ok_or_else(|| {
                    anyhow!("'{}' needs an argument at position {}", name, position + 1)
                })?
                .parse()
                .with_context(|| format!("invalid index in '{}'", s))
        };

        let intent = match name {
            "goto" | "go_to" => Intent::GoTo(index(0)?),
            "next" => Intent::Next,
            "previous" | "prev" => Intent::Previous,
            "complete" => Intent::Complete(index(0)?),
            "skip" => Intent::Skip(index(0)?),
            "edit" => Intent::Edit(index(0)?),
            "delete" => Intent::Delete(index(0)?),
            "reorder" => Intent::Reorder(index(0)?, index(1)?),
            "status" => {
                let status = args
                    .get(1)
                    .ok_or_else(|| anyhow!("'status' needs a status name"))?
                    .parse::<StepStatus>()?;
                Intent::Status(index(0)?, status)
            }
            "save" => Intent::Save,
            "reset" => Intent::Reset,
            "wait" => Intent::Wait(
                args.first()
                    .ok_or_else(|| anyhow!("'wait' needs a duration in milliseconds"))?
                    .parse()
                    .with_context(|| format!("invalid duration in '{}'", s))?,
            ),
            other => return Err(anyhow!("unknown intent '{}'", other)),
        };
        Ok(intent)
    }
}

fn parse_script(script: &str) -> anyhow::Result<Vec<Intent>> {
    script
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Load configuration
    let mut config = ControllerConfig::load()?;
    if args.auto_advance {
        config.auto_advance = true;
    }
    info!("Loaded configuration: {:?}", config);

    let registry = StepRegistry::from_path(&args.steps)?;
    let intents = parse_script(&args.script)?;

    let (observer, mut events) = ChannelObserver::new();
    let controller = WorkflowController::builder(registry)
        .config(config)
        .initial_index(args.initial)
        .observer(observer)
        .build()?;

    for intent in intents {
        info!("Applying {:?}", intent);
        match intent {
            Intent::GoTo(index) => controller.go_to(index),
            Intent::Next => controller.next(),
            Intent::Previous => controller.previous(),
            Intent::Complete(index) => controller.complete(index),
            Intent::Skip(index) => controller.skip(index),
            Intent::Edit(index) => controller.edit(index),
            Intent::Delete(index) => controller.delete(index),
            Intent::Reorder(from, to) => controller.reorder(from, to),
            Intent::Status(index, status) => controller.set_status(index, status),
            Intent::Save => controller.save(),
            Intent::Reset => controller.reset(),
            Intent::Wait(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
        }

        while let Ok(event) = events.try_recv() {
            println!("{}", serde_json::to_string(&event)?);
        }
    }

    println!("{}", serde_json::to_string_pretty(&controller.snapshot())?);
    controller.dispose();

    if args.metrics {
        print!("{}", metrics::gather_metrics()?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let intents =
            parse_script("complete:0, wait:600 ,skip:1,next,reorder:2:0,status:1:error").unwrap();
        assert_eq!(
            intents,
            vec![
                Intent::Complete(0),
                Intent::Wait(600),
                Intent::Skip(1),
                Intent::Next,
                Intent::Reorder(2, 0),
                Intent::Status(1, StepStatus::Error),
            ]
        );
        assert!(parse_script("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_script_rejects_bad_intents() {
        assert!(parse_script("jump:1").is_err());
        assert!(parse_script("complete").is_err());
        assert!(parse_script("goto:first").is_err());
        assert!(parse_script("status:1:done").is_err());
    }
}
