use crate::demo::{run_demo, run_gap_check, DemoArgs, GapCheckArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use driver_hiring::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Driver Hiring",
    about = "Run the driver hiring service or exercise its workflows from the command line",
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
    /// Check a JSON list of month ranges for history gaps
    Gaps(GapCheckArgs),
    /// Walk a sample applicant from submission to hire
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
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Gaps(args) => run_gap_check(args),
        Command::Demo(args) => run_demo(args),
    }
}
