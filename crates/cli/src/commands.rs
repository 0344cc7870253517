use anyhow::{Context, Result};
use checker::{CheckerConfig, EvaluationError, EvaluationInput, Pipeline};
use clap::{Args, Parser, Subcommand};
use extract::OracleClient;
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::report;

#[derive(Parser, Debug)]
#[command(
    name = "discussion-check",
    version,
    about = "Check that a quoted finding comes from a paper's Discussion section and that the student paraphrased it fairly."
)]
pub struct Cli {
    /// JSON config file (defaults, then this file, then environment overrides)
    #[arg(long, global = true, env = "DISCUSSION_CHECK_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the parsed cells and the document that would be used
    Preview(InputArgs),

    /// Download the document and print the Discussion excerpt
    Excerpt(InputArgs),

    /// Run the full check, including the judgment
    Evaluate(InputArgs),
}

#[derive(Args, Debug)]
pub struct InputArgs {
    /// The pasted spreadsheet row (tab separated)
    #[arg(long, conflicts_with = "row_file")]
    pub row: Option<String>,

    /// Read the row from a file; stdin is used when neither is given
    #[arg(long)]
    pub row_file: Option<PathBuf>,

    /// PDF link, used instead of the one in the row
    #[arg(long)]
    pub url: Option<String>,

    /// Local PDF, used when no link is available
    #[arg(long)]
    pub pdf: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

impl InputArgs {
    fn to_input(&self) -> Result<EvaluationInput> {
        let row = match (&self.row, &self.row_file) {
            (Some(row), _) => row.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read row file: {:?}", path))?,
            (None, None) => {
                let mut buffer = String::new();
                std::io::stdin()
                    .read_to_string(&mut buffer)
                    .context("Failed to read the row from stdin")?;
                buffer
            }
        };

        let upload = match &self.pdf {
            Some(path) => Some(
                std::fs::read(path).with_context(|| format!("Failed to read PDF: {:?}", path))?,
            ),
            None => None,
        };

        Ok(EvaluationInput {
            row,
            url_override: self.url.clone(),
            upload,
        })
    }
}

impl Cli {
    pub async fn run(self) -> Result<ExitCode> {
        let config = CheckerConfig::load(self.config.as_deref())?;

        match &self.command {
            Commands::Preview(args) => run_preview(config, args),
            Commands::Excerpt(args) => run_excerpt(config, args).await,
            Commands::Evaluate(args) => run_evaluate(config, args).await,
        }
    }
}

fn run_preview(config: CheckerConfig, args: &InputArgs) -> Result<ExitCode> {
    let pipeline = Pipeline::new(config)?;
    let preview = pipeline.preview(&args.to_input()?);

    if args.json {
        print_json(&preview)?;
    } else {
        print!("{}", report::preview(&preview));
    }

    Ok(if preview.missing.is_empty() { ExitCode::SUCCESS } else { ExitCode::from(1) })
}

async fn run_excerpt(config: CheckerConfig, args: &InputArgs) -> Result<ExitCode> {
    let pipeline = Pipeline::new(config)?;

    match pipeline.prepare(&args.to_input()?).await {
        Ok(prepared) => {
            if args.json {
                print_json(&prepared)?;
            } else {
                print!("{}", report::prepared(&prepared));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => failure(&e, args.json),
    }
}

async fn run_evaluate(config: CheckerConfig, args: &InputArgs) -> Result<ExitCode> {
    let oracle = OracleClient::from_config(&config.oracle)?;
    let pipeline = Pipeline::new(config)?;

    match pipeline.evaluate(&args.to_input()?, oracle.as_ref()).await {
        Ok(evaluation) => {
            if args.json {
                print_json(&evaluation)?;
            } else {
                print!("{}", report::evaluation(&evaluation));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => failure(&e, args.json),
    }
}

#[derive(Serialize)]
struct FailureReport<'a> {
    error: String,
    cause: &'a str,
    remedy: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw: Option<&'a str>,
}

fn failure(err: &EvaluationError, json: bool) -> Result<ExitCode> {
    if json {
        print_json(&FailureReport {
            error: err.to_string(),
            cause: err.cause(),
            remedy: err.remedy(),
            raw: err.raw_output(),
        })?;
    } else {
        eprint!("{}", report::failure(err));
    }
    Ok(ExitCode::from(1))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
