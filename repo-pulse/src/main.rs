//! Command-line interface for the repo-pulse binary.
//!
//! Without a subcommand the binary runs the ingestion pipeline and prints the
//! run report as JSON. `check-config` validates the configuration file and
//! prints the resolved settings with credentials removed.

use std::{
    fs::OpenOptions,
    io,
    path::{Path, PathBuf},
    process,
    sync::Mutex,
};

use chrono::Utc;
use clap::{ArgAction, Args, Parser, Subcommand};
use repo_pulse::{ElasticStore, Error, GithubClient, Pipeline, Settings, StatKind};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Command line interface for ingesting repository statistics.
#[derive(Debug, Parser,)]
#[command(name = "repo-pulse", version, about = "Index GitHub repository statistics")]
struct Cli
{
    #[command(subcommand)]
    command: Option<Command,>,

    /// Path to the YAML configuration file.
    #[arg(
        long = "config",
        value_name = "PATH",
        env = "REPO_PULSE_CONFIG",
        default_value = "config.yaml",
        global = true
    )]
    config: PathBuf,

    /// Append log output to this file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    log_file: Option<PathBuf,>,

    /// Output formatted JSON for easier inspection.
    #[arg(long = "pretty", action = ArgAction::SetTrue, global = true)]
    pretty: bool,

    #[command(flatten)]
    ingest: IngestArgs,
}

#[derive(Debug, Subcommand,)]
enum Command
{
    /// Validate the configuration and print the resolved settings.
    #[command(name = "check-config")]
    CheckConfig,
}

/// Arguments accepted when the CLI runs the pipeline.
#[derive(Debug, Args, Default,)]
struct IngestArgs
{
    /// Statistics to ingest; repeat to select several. Defaults to all.
    #[arg(long = "stats", value_enum, value_name = "KIND")]
    stats: Vec<StatKind,>,
}

impl IngestArgs
{
    fn selected(&self,) -> Vec<StatKind,>
    {
        if self.stats.is_empty() { StatKind::ALL.to_vec() } else { self.stats.clone() }
    }
}

/// Entry point that reports fatal errors and sets the exit status.
#[tokio::main]
async fn main()
{
    if let Err(error,) = run().await {
        eprintln!("{}", error.to_display_string());
        process::exit(1,);
    }
}

/// Executes the CLI using parsed arguments.
///
/// # Errors
///
/// Propagates configuration, client construction and output errors. Failures
/// scoped to a single repository are part of the report instead.
async fn run() -> Result<(), Error,>
{
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref(),)?;

    match cli.command {
        Some(Command::CheckConfig,) => {
            let stdout = io::stdout();
            check_config(&cli.config, &mut stdout.lock(), cli.pretty,)
        }
        None => run_ingest(&cli.config, &cli.ingest, cli.pretty,).await,
    }
}

fn init_logging(log_file: Option<&Path,>,) -> Result<(), Error,>
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info",),);
    let builder = tracing_subscriber::fmt().with_env_filter(filter,).with_target(true,);

    match log_file {
        Some(path,) => {
            let file = OpenOptions::new().create(true,).append(true,).open(path,).map_err(|e| {
                Error::service(format!("failed to open log file {}: {e}", path.display()),)
            },)?;
            builder.with_ansi(false,).with_writer(Mutex::new(file,),).init();
        }
        None => builder.with_writer(io::stderr,).init(),
    }

    Ok((),)
}

async fn run_ingest(config: &Path, args: &IngestArgs, pretty: bool,) -> Result<(), Error,>
{
    let settings = Settings::load(config,)?;
    let client = GithubClient::new(&settings.github,)?;
    let store = ElasticStore::new(&settings.elasticsearch,)?;

    let report = Pipeline::new(&client, store, &settings,)
        .with_stats(&args.selected(),)
        .with_progress()
        .run(Utc::now().date_naive(),)
        .await;

    let stdout = io::stdout();
    write_json(&mut stdout.lock(), &report, pretty,)
}

fn check_config<W: io::Write,>(config: &Path, writer: &mut W, pretty: bool,) -> Result<(), Error,>
{
    let settings = Settings::load(config,)?;
    write_json(writer, &settings, pretty,)
}

fn write_json<W: io::Write, T: Serialize,>(writer: &mut W, value: &T, pretty: bool,) -> Result<(), Error,>
{
    if pretty {
        serde_json::to_writer_pretty(writer, value,)?;
    } else {
        serde_json::to_writer(writer, value,)?;
    }

    Ok((),)
}

#[cfg(test)]
mod tests
{
    use std::{fs, io::Cursor, path::Path};

    use clap::Parser;
    use repo_pulse::StatKind;
    use tempfile::tempdir;

    use super::{Cli, Command, check_config, write_json};

    const CONFIG: &str = r#"
GITHUB:
  endpoint: https://api.github.com/repos/
  api_key: token secret-value
  punch_card_rsrc: /stats/punch_card
  contrib_rsrc: /stats/contributors
REPOS:
  hello: octocat/Hello-World
ELASTICSEARCH:
  host: localhost
  port: 9200
  index: github-punch-card
  contrib_index: github-contributions
"#;

    #[test]
    fn cli_defaults_to_ingesting_every_statistic()
    {
        let cli = Cli::try_parse_from([env!("CARGO_PKG_NAME")],).expect("failed to parse CLI",);

        assert!(cli.command.is_none());
        assert!(!cli.pretty);
        assert_eq!(cli.ingest.selected(), StatKind::ALL.to_vec());
    }

    #[test]
    fn cli_accepts_repeated_stats_filter()
    {
        let cli = Cli::try_parse_from([
            env!("CARGO_PKG_NAME"),
            "--config",
            "pulse.yaml",
            "--stats",
            "contributors",
            "--stats",
            "punch-card",
        ],)
        .expect("failed to parse CLI",);

        assert_eq!(cli.config, Path::new("pulse.yaml"));
        assert_eq!(cli.ingest.selected(), vec![StatKind::Contributors, StatKind::PunchCard]);
    }

    #[test]
    fn cli_rejects_unknown_statistic()
    {
        assert!(Cli::try_parse_from([env!("CARGO_PKG_NAME"), "--stats", "stars"],).is_err());
    }

    #[test]
    fn check_config_subcommand_accepts_global_flags()
    {
        let cli = Cli::try_parse_from([
            env!("CARGO_PKG_NAME"),
            "check-config",
            "--config",
            "pulse.yaml",
            "--pretty",
        ],)
        .expect("failed to parse CLI",);

        assert!(matches!(cli.command, Some(Command::CheckConfig)));
        assert!(cli.pretty);
    }

    #[test]
    fn check_config_prints_redacted_settings()
    {
        let temp = tempdir().expect("failed to create tempdir",);
        let path = temp.path().join("config.yaml",);
        fs::write(&path, CONFIG,).expect("failed to write config",);

        let mut buffer = Cursor::new(Vec::new(),);
        check_config(&path, &mut buffer, false,).expect("valid configuration",);

        let output = String::from_utf8(buffer.into_inner(),).expect("invalid UTF-8",);
        assert!(output.contains("octocat/Hello-World"));
        assert!(output.contains("github-punch-card"));
        assert!(!output.contains("secret-value"));
    }

    #[test]
    fn check_config_reports_missing_file()
    {
        let temp = tempdir().expect("failed to create tempdir",);
        let mut buffer = Cursor::new(Vec::new(),);
        let error = check_config(&temp.path().join("absent.yaml",), &mut buffer, false,)
            .expect_err("missing file",);
        assert!(error.is_fatal());
    }

    #[test]
    fn pretty_flag_uses_pretty_writer()
    {
        let mut buffer = Cursor::new(Vec::new(),);
        write_json(&mut buffer, &serde_json::json!({"repositories": []}), true,)
            .expect("failed to serialize",);

        let output = String::from_utf8(buffer.into_inner(),).expect("invalid UTF-8",);
        assert_eq!(output, "{\n  \"repositories\": []\n}");
    }
}
