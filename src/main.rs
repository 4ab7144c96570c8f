use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub mod cli;
pub mod config;
pub mod confirm;
pub mod infra;
pub mod invocation;
pub mod keypair;
pub mod secrets;
pub mod stack;
pub mod writer;

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("cfn_tasks=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cfn_tasks=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();
}

async fn run(args: cli::Cli) -> Result<(), cli::Error> {
    let config = config::load(args.config.as_deref())?;

    let mut context = cli::Context {
        runner: invocation::AwsCli::new(config.aws_cli.clone()),
        confirmation: confirm::stdio(),
        key_dir: PathBuf::from("."),
        config,
    };

    return cli::dispatch(args.command, &mut context, &mut io::stdout()).await;
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::Cli::parse();
    init_tracing(args.debug);

    return match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {}", error);
            ExitCode::from(error.exit_code())
        }
    };
}
