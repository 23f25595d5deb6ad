// Copyright 2024 insight-agent contributors
// SPDX-License-Identifier: MIT

use clap::Parser;
use insight_secrets::{AgentConfig, ConfigError, SecretFileWriter, SecretTree, SecretsAgent};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "insight-agent",
    about = "Fetch secrets and managed-account passwords from BeyondInsight Password Safe",
    version,
    long_about = "Signs in to Password Safe, resolves the configured secrets, folders and managed accounts, and prints them as one JSON document.\n\nConfiguration is read from the environment (BT_API_URL, BT_API_KEY, SECRETS_LIST, ...) unless --config is given.\n\nExamples:\n  insight-agent                                # Configure from the environment, print to stdout\n  insight-agent --config agent.yaml            # Configure from a file\n  insight-agent --output secrets.json          # Write the result to a file\n  insight-agent --write-files                  # Also write file secrets below SECRETS_PATH\n  insight-agent --debug                        # Show detailed debug information"
)]
struct Cli {
    /// Read configuration from a .json, .yml or .yaml file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the aggregated JSON to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write file secrets below the configured secrets path
    #[arg(long)]
    write_files: bool,

    /// Run in verbose mode with detailed output
    #[arg(short, long)]
    verbose: bool,

    /// Run in debug mode with extensive execution details
    #[arg(short, long)]
    debug: bool,
}

fn load_config(path: Option<&Path>) -> Result<AgentConfig, ConfigError> {
    match path {
        Some(path) => AgentConfig::from_file(path),
        None => AgentConfig::from_env(),
    }
}

fn write_result(secrets: &SecretTree, output: Option<&Path>) -> Result<(), String> {
    let rendered = secrets
        .to_json_pretty()
        .map_err(|e: serde_json::Error| format!("Failed to render result: {}", e))?;

    match output {
        Some(path) => std::fs::write(path, format!("{}\n", rendered))
            .map_err(|e| format!("Failed to write {}: {}", path.display(), e)),
        None => {
            println!("{}", rendered);
            Ok(())
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let execution_id = uuid::Uuid::new_v4().to_string();
    insight_logging::init(&execution_id);

    if cli.debug || cli.verbose {
        insight_logging::set_log_level(insight_logging::LogLevel::Debug);
        insight_logging::debug("Debug logging enabled");
    } else {
        insight_logging::set_log_level(insight_logging::LogLevel::Info);
    }

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            insight_logging::error(&format!("Invalid configuration: {}", e));
            return ExitCode::FAILURE;
        }
    };
    if cli.debug {
        insight_logging::debug(&format!("{:?}", config));
    }

    let writer = cli
        .write_files
        .then(|| SecretFileWriter::new(config.secrets_path.clone()));
    let mut agent = SecretsAgent::new(config).with_execution_id(&execution_id);
    if let Some(writer) = writer {
        agent = agent.with_file_writer(writer);
    }

    let run = match agent.run().await {
        Ok(run) => run,
        Err(e) => {
            insight_logging::error(&format!("No secrets were retrieved: {}", e));
            return ExitCode::FAILURE;
        }
    };

    match write_result(&run.secrets, cli.output.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            insight_logging::error(&message);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::{Builder, TempDir};
    use std::io::Write;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from([
            "insight-agent",
            "--config",
            "agent.yaml",
            "-o",
            "out.json",
            "--write-files",
            "-d",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("agent.yaml")));
        assert_eq!(cli.output, Some(PathBuf::from("out.json")));
        assert!(cli.write_files);
        assert!(cli.debug);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"api_url": "https://h/api", "api_key": "k", "folder_list": "Shared"}}"#
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.folder_list, "shared");
    }

    #[test]
    fn test_write_result_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("result.json");

        write_result(&SecretTree::new(), Some(&path)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}\n");
    }
}
