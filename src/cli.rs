use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{self, Config};
use crate::confirm::Confirmation;
use crate::infra::{self, DEFAULT_KEYPAIR_NAME, DEFAULT_SSH_CIDR};
use crate::invocation::{self, Runner};
use crate::keypair;
use crate::secrets::{self, DbCredentials};
use crate::stack::{self, Stack};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] config::Error),

    #[error(transparent)]
    Stack(#[from] stack::Error),

    #[error(transparent)]
    Secrets(#[from] secrets::Error),

    #[error(transparent)]
    KeyPair(#[from] keypair::Error),

    #[error("Unable to write output: {0}")]
    Output(#[from] io::Error),
}

impl Error {
    /// The AWS CLI's own exit code when it failed with one, otherwise 1.
    pub fn exit_code(&self) -> u8 {
        let invocation_error = match self {
            Error::Stack(stack::Error::Invocation(error)) => Some(error),
            Error::Secrets(secrets::Error::Invocation(error)) => Some(error),
            Error::KeyPair(keypair::Error::Invocation(error)) => Some(error),
            _ => None,
        };

        return match invocation_error {
            Some(invocation::Error::CommandFailed {
                code: Some(code), ..
            }) => match u8::try_from(*code) {
                Ok(code) if code != 0 => code,
                _ => 1,
            },
            _ => 1,
        };
    }
}

/// Manage CloudFormation stacks, Secrets Manager entries and EC2 keypairs through the AWS CLI.
#[derive(Debug, Parser)]
#[command(name = "cfn-tasks")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (defaults to ./cfn-tasks.yaml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print name, description, status and outputs of any stack
    CheckStackStatus(NameArgs),

    /// Delete any stack
    DeleteStack(StackNameArgs),

    /// Deploy the VPC template as a new stack
    CreateVpc(NameArgs),

    /// Deploy an update of the VPC stack
    UpdateVpc(NameArgs),

    /// Delete the VPC stack
    DestroyVpc(NameArgs),

    /// Print the status of the VPC stack
    CheckVpcStatus(NameArgs),

    /// List Secrets Manager entries
    ListSecrets,

    /// Store database credentials as a JSON secret
    CreateDbCredentials(CredentialsArgs),

    /// Delete the database credentials secret
    DestroyDbCredentials(SecretArgs),

    /// Print the stored database credentials in clear text
    GetDbCredentials(SecretArgs),

    /// Deploy the Postgres Aurora Serverless template
    CreateDb(DatabaseArgs),

    /// Deploy an update of the Postgres Aurora Serverless stack
    UpdateDb(DatabaseArgs),

    /// Delete the database stack after confirming delete protection is off
    DestroyDb(StackNameArgs),

    /// Print the status of the database stack
    CheckDbStatus(NameArgs),

    /// Create an EC2 keypair and save its private key as <name>.pem
    CreateKeypair(KeyPairArgs),

    /// Delete an EC2 keypair
    DestroyKeypair(KeyPairArgs),

    /// Deploy the EC2 instance template
    #[command(name = "create-ec2")]
    CreateEc2(Ec2Args),

    /// Deploy an update of the EC2 instance stack
    #[command(name = "update-ec2")]
    UpdateEc2(Ec2Args),

    /// Delete the EC2 instance stack
    #[command(name = "destroy-ec2")]
    DestroyEc2(StackNameArgs),

    /// Print the status of the EC2 instance stack
    #[command(name = "check-ec2-status")]
    CheckEc2Status(NameArgs),
}

#[derive(Debug, Args)]
pub struct NameArgs {
    /// Stack name
    #[arg(long)]
    pub name: String,

    /// AWS region (defaults to the config file, then eu-west-1)
    #[arg(long)]
    pub region: Option<String>,
}

#[derive(Debug, Args)]
pub struct StackNameArgs {
    #[arg(long)]
    pub stack_name: String,

    #[arg(long)]
    pub region: Option<String>,
}

#[derive(Debug, Args)]
pub struct DatabaseArgs {
    #[arg(long)]
    pub stack_name: String,

    /// Name of the stack that created the VPC
    #[arg(long)]
    pub vpc_stack_name: String,

    /// Secrets Manager entry holding the database credentials
    #[arg(long)]
    pub secretsmanager_name: String,

    #[arg(long)]
    pub region: Option<String>,
}

#[derive(Debug, Args)]
pub struct Ec2Args {
    #[arg(long)]
    pub stack_name: String,

    #[arg(long)]
    pub vpc_stack_name: String,

    /// CIDR block allowed to reach the instance over SSH
    #[arg(long, default_value = DEFAULT_SSH_CIDR)]
    pub ssh_cidr: String,

    #[arg(long, default_value = DEFAULT_KEYPAIR_NAME)]
    pub keypair_name: String,

    #[arg(long)]
    pub region: Option<String>,
}

#[derive(Debug, Args)]
pub struct CredentialsArgs {
    /// Secret name
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub username: String,

    #[arg(long, env = "CFN_TASKS_DB_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Debug, Args)]
pub struct SecretArgs {
    /// Secret name or ARN
    #[arg(long)]
    pub name: String,
}

#[derive(Debug, Args)]
pub struct KeyPairArgs {
    #[arg(long, default_value = DEFAULT_KEYPAIR_NAME)]
    pub name: String,
}

pub struct Context<R, C> {
    pub config: Config,
    pub runner: R,
    pub confirmation: C,
    /// Where `create-keypair` writes `<name>.pem`.
    pub key_dir: PathBuf,
}

impl<R: Runner, C: Confirmation> Context<R, C> {
    async fn stack(&self, name: String, region: Option<String>) -> Stack {
        let region = config::resolve_region(region, &self.config).await;
        return Stack::new(name, region);
    }
}

pub async fn dispatch<R, C>(
    command: Command,
    context: &mut Context<R, C>,
    out: &mut impl Write,
) -> Result<(), Error>
where
    R: Runner,
    C: Confirmation,
{
    let templates = context.config.templates.clone();
    let runner = &context.runner;

    match command {
        Command::CheckStackStatus(args)
        | Command::CheckVpcStatus(args)
        | Command::CheckDbStatus(args)
        | Command::CheckEc2Status(args) => {
            let stack = context.stack(args.name, args.region).await;
            stack.status(runner).await?.render(out)?;
        }
        Command::DeleteStack(args) | Command::DestroyEc2(args) => {
            let stack = context.stack(args.stack_name, args.region).await;
            stack.delete(runner).await?;
        }
        Command::DestroyVpc(args) => {
            let stack = context.stack(args.name, args.region).await;
            stack.delete(runner).await?;
        }
        Command::CreateVpc(args) => {
            let stack = context.stack(args.name, args.region).await;
            stack
                .create(runner, &templates.vpc, &infra::vpc_parameters())
                .await?;
        }
        Command::UpdateVpc(args) => {
            let stack = context.stack(args.name, args.region).await;
            stack
                .update(runner, &templates.vpc, &infra::vpc_parameters())
                .await?;
        }
        Command::ListSecrets => secrets::list(runner).await?,
        Command::CreateDbCredentials(args) => {
            let credentials = DbCredentials {
                username: args.username,
                password: args.password,
            };
            secrets::create(runner, &args.name, &credentials).await?;
        }
        Command::DestroyDbCredentials(args) => secrets::destroy(runner, &args.name).await?,
        Command::GetDbCredentials(args) => {
            secrets::get(runner, &args.name).await?.render(out)?;
        }
        Command::CreateDb(args) => {
            let parameters =
                infra::database_parameters(&args.vpc_stack_name, &args.secretsmanager_name);
            let stack = context.stack(args.stack_name, args.region).await;
            stack
                .create(runner, &templates.database, &parameters)
                .await?;
        }
        Command::UpdateDb(args) => {
            let parameters =
                infra::database_parameters(&args.vpc_stack_name, &args.secretsmanager_name);
            let stack = context.stack(args.stack_name, args.region).await;
            stack
                .update(runner, &templates.database, &parameters)
                .await?;
        }
        Command::DestroyDb(args) => {
            let stack = context.stack(args.stack_name, args.region).await;
            infra::destroy_database(&stack, &context.runner, &mut context.confirmation).await?;
        }
        Command::CreateKeypair(args) => {
            let (keypair, _) = keypair::create(runner, &args.name, &context.key_dir).await?;
            keypair.render(out)?;
        }
        Command::DestroyKeypair(args) => keypair::destroy(runner, &args.name).await?,
        Command::CreateEc2(args) => {
            let parameters =
                infra::ec2_parameters(&args.vpc_stack_name, &args.ssh_cidr, &args.keypair_name);
            let stack = context.stack(args.stack_name, args.region).await;
            stack.create(runner, &templates.ec2, &parameters).await?;
        }
        Command::UpdateEc2(args) => {
            let parameters =
                infra::ec2_parameters(&args.vpc_stack_name, &args.ssh_cidr, &args.keypair_name);
            let stack = context.stack(args.stack_name, args.region).await;
            stack.update(runner, &templates.ec2, &parameters).await?;
        }
    }

    return Ok(());
}
