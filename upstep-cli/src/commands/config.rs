//! `upstep config validate` / `upstep config generate`

use super::Outcome;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{error, info};
use upstep_config::{ConfigLoader, UpstepConfig};

/// Handle configuration validation
pub fn validate(config_file: &Path) -> Result<Outcome> {
    info!("Validating configuration file: {:?}", config_file);

    if !config_file.exists() {
        return Err(anyhow::anyhow!(
            "Configuration file not found: {:?}",
            config_file
        ));
    }

    match ConfigLoader::new().from_file(config_file) {
        Ok(_config) => {
            println!("✅ Configuration file is valid");
            info!("Configuration validation passed");
            Ok(Outcome::Success)
        }
        Err(e) => {
            println!("❌ Configuration validation failed: {}", e);
            error!("Configuration validation failed: {}", e);
            Ok(Outcome::Failed)
        }
    }
}

/// Handle configuration generation
pub fn generate(output: &Path, force: bool) -> Result<Outcome> {
    info!("Generating configuration at: {:?}", output);

    if output.exists() && !force {
        return Err(anyhow::anyhow!(
            "Output file already exists: {:?}. Use --force to overwrite.",
            output
        ));
    }

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).context("Failed to create output directory")?;
    }

    let content = format!(
        "# upstep configuration\n# Environment variables prefixed with UPSTEP_ override these values.\n{}",
        UpstepConfig::generate_sample()
    );
    fs::write(output, content)
        .with_context(|| format!("Failed to write configuration to {:?}", output))?;

    println!("✅ Configuration written to {:?}", output);
    Ok(Outcome::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_generate_then_validate() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("conf").join("upstep.yaml");

        assert_eq!(generate(&output, false).unwrap(), Outcome::Success);
        assert_eq!(validate(&output).unwrap(), Outcome::Success);
    }

    #[test]
    fn test_generate_refuses_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("upstep.yaml");
        fs::write(&output, "existing").unwrap();

        assert!(generate(&output, false).is_err());
        assert_eq!(fs::read_to_string(&output).unwrap(), "existing");
        assert_eq!(generate(&output, true).unwrap(), Outcome::Success);
    }

    #[test]
    fn test_validate_reports_domain_errors() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("bad.yaml");
        fs::write(&file, "migrations:\n  baseline_version: latest\n").unwrap();

        assert_eq!(validate(&file).unwrap(), Outcome::Failed);
        assert!(validate(&dir.path().join("missing.yaml")).is_err());
    }
}
