use crate::demo::{run_batch, run_demo, run_evaluate, BatchArgs, DemoArgs, EvaluateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use imci_triage::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "IMCI Triage",
    about = "Run and exercise the IMCI triage rule engine from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Triage one patient given as a JSON object of extracted fields
    Evaluate(EvaluateArgs),
    /// Triage every patient row of a CSV file
    Batch(BatchArgs),
    /// Walk through a scripted multi-turn triage conversation
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[command(flatten)]
    pub(crate) rules: RulesArgs,
}

#[derive(Args, Debug, Default, Clone)]
pub(crate) struct RulesArgs {
    /// JSON rule file overriding APP_RULES_PATH and the built-in IMCI rules
    #[arg(long = "rules")]
    pub(crate) path: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Evaluate(args) => run_evaluate(args),
        Command::Batch(args) => run_batch(args),
        Command::Demo(args) => run_demo(args),
    }
}
