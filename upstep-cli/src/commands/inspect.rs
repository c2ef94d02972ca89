//! Read-only commands: `plan`, `status`, `history`, `list`

use super::{load_migrations, open_runner, print_failure, print_possible_migrations, Outcome};
use anyhow::Result;
use colored::Colorize;
use upstep_config::UpstepConfig;
use upstep_core::{MigrationError, TargetVersion};

pub async fn plan(config: &UpstepConfig, target: &str) -> Result<Outcome> {
    let runner = open_runner(config).await?;
    let target = match target.parse::<TargetVersion>() {
        Ok(target) => target,
        Err(err) => {
            print_failure(&err, runner.registry());
            return Ok(Outcome::Failed);
        }
    };

    match runner.plan(target).await {
        Ok(plan) => {
            print!("{}", plan);
            Ok(Outcome::Success)
        }
        Err(MigrationError::AlreadyAtTarget(version)) => {
            println!("Already at version {}; nothing to apply", version);
            Ok(Outcome::NothingToDo)
        }
        Err(MigrationError::UninitializedStore) => {
            // The first migrate run starts from the baseline, so plan from there
            let baseline = config.migrations.baseline()?;
            println!(
                "{} schema version store not initialized; planning from baseline {}",
                "note:".yellow(),
                baseline
            );
            let resolved = runner
                .graph()
                .resolve_target(target)
                .and_then(|target| runner.graph().find_path(baseline, target).map(|p| p.to_string()));
            match resolved {
                Ok(path) => {
                    println!("{}", path);
                    Ok(Outcome::Success)
                }
                Err(err) if err.is_noop() => {
                    println!("Baseline {} is already the target; nothing to apply", baseline);
                    Ok(Outcome::NothingToDo)
                }
                Err(err) => {
                    print_failure(&err, runner.registry());
                    Ok(Outcome::Failed)
                }
            }
        }
        Err(err) => {
            print_failure(&err, runner.registry());
            Ok(Outcome::Failed)
        }
    }
}

pub async fn status(config: &UpstepConfig) -> Result<Outcome> {
    let runner = open_runner(config).await?;

    let status = match runner.status().await {
        Ok(status) => status,
        Err(MigrationError::UninitializedStore) => {
            println!(
                "Current version: {} (baseline {})",
                "not initialized".yellow(),
                config.migrations.baseline_version
            );
            return Ok(Outcome::Success);
        }
        Err(err) => return Err(err.into()),
    };

    println!("Current version: {}", status.current.to_string().bold());
    match status.highest {
        Some(highest) => println!("Highest version: {}", highest),
        None => println!("Highest version: (no migrations registered)"),
    }

    if status.is_up_to_date() {
        println!("{}", "Up to date".green());
    } else if status.reachable {
        println!("Pending steps: {}", status.pending);
    } else {
        println!(
            "{}",
            "The highest version cannot be reached from the current version".red()
        );
    }

    Ok(Outcome::Success)
}

pub async fn history(config: &UpstepConfig) -> Result<Outcome> {
    let runner = open_runner(config).await?;
    let history = runner.history().await?;

    if history.is_empty() {
        println!("No migrations applied");
        return Ok(Outcome::Success);
    }

    for applied in history {
        println!(
            "{}  {} -> {}",
            applied.applied_at.format("%Y-%m-%d %H:%M:%S UTC"),
            applied.from,
            applied.to
        );
    }
    Ok(Outcome::Success)
}

pub fn list(config: &UpstepConfig) -> Result<Outcome> {
    let registry = load_migrations(config)?;
    print_possible_migrations(&registry);
    Ok(Outcome::Success)
}
