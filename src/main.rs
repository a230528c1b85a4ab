//! Stackform CLI: synthesize the ALB + auto-scaling group stack.

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "stackform",
    version,
    about = "Desired-state descriptor for an ALB-fronted auto-scaling group, synthesized to CloudFormation"
)]
struct Cli {
    #[command(subcommand)]
    command: stackform::cli::Commands,
}

fn main() {
    // AWS_ACCOUNT and CDK_REGION may come from a local .env
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("warning: failed to load .env file: {e}");
        }
    }

    // stdout carries the template; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    if let Err(e) = stackform::cli::dispatch(cli.command) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
