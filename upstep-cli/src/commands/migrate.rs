//! `upstep migrate`

use super::{open_runner, print_failure, Outcome};
use crate::prompt::{ask_target, LineReader, PromptError};
use anyhow::Result;
use colored::Colorize;
use tracing::info;
use upstep_config::UpstepConfig;
use upstep_core::{MigrationError, TargetVersion};
use upstep_storage::{MigrationReport, MigrationRunner};

/// Settle the target (asking if none was given), initialise the store and migrate
///
/// The store is only created once a valid target exists.
pub async fn run(
    config: &UpstepConfig,
    target: Option<&str>,
    reader: &mut impl LineReader,
) -> Result<Outcome> {
    let runner = open_runner(config).await?;
    let baseline = config.migrations.baseline()?;

    let target = match target {
        Some(raw) => raw.parse::<TargetVersion>(),
        None => match ask_target(reader) {
            Ok(target) => Ok(target),
            Err(PromptError::Version(err)) => Err(err),
            Err(PromptError::InvalidAnswer) => {
                println!("{}", PromptError::InvalidAnswer.to_string().red());
                return Ok(Outcome::Failed);
            }
            Err(err) => return Err(err.into()),
        },
    };

    let target = match target {
        Ok(target) => target,
        Err(err) => {
            print_failure(&err, runner.registry());
            return Ok(Outcome::Failed);
        }
    };

    if runner.initialize(baseline).await? {
        info!("Schema version store created at baseline {}", baseline);
    }

    Ok(execute(&runner, target).await)
}

async fn execute(runner: &MigrationRunner, target: TargetVersion) -> Outcome {
    match runner.migrate(target).await {
        Ok(report) => render_report(runner, &report),
        Err(MigrationError::AlreadyAtTarget(version)) => {
            println!(
                "Cannot migrate. You already have the highest version {}",
                version
            );
            Outcome::NothingToDo
        }
        Err(err) => {
            print_failure(&err, runner.registry());
            Outcome::Failed
        }
    }
}

fn render_report(runner: &MigrationRunner, report: &MigrationReport) -> Outcome {
    for step in &report.applied {
        println!(
            "  {} {} -> {} ({} ms)",
            "✓".green(),
            step.from,
            step.to,
            step.duration.as_millis()
        );
    }

    match &report.error {
        None => {
            println!("{}", "Migration successful".green().bold());
            println!("Schema is now at version {}", report.final_version);
            Outcome::Success
        }
        Some(err) => {
            println!("Schema remains at version {}", report.final_version);
            print_failure(err, runner.registry());
            Outcome::Failed
        }
    }
}
