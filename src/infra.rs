use crate::confirm::Confirmation;
use crate::invocation::Runner;
use crate::stack::{Error, Parameters, Stack};

pub const DEFAULT_SSH_CIDR: &str = "0.0.0.0/0";
pub const DEFAULT_KEYPAIR_NAME: &str = "ec2keypair";

const DELETE_PROTECTION_QUESTION: &str = "Have you removed the delete protection (yes/no)?";

pub fn vpc_parameters() -> Parameters {
    return Parameters::new();
}

pub fn database_parameters(vpc_stack_name: &str, secret_name: &str) -> Parameters {
    return Parameters::new()
        .push("AppVpcStackName", vpc_stack_name)
        .push("DbCredentialsSecretName", secret_name);
}

pub fn ec2_parameters(vpc_stack_name: &str, ssh_cidr: &str, keypair_name: &str) -> Parameters {
    return Parameters::new()
        .push("AppVpcStackName", vpc_stack_name)
        .push("SshCidrBlock", ssh_cidr)
        .push("Ec2KeyName", keypair_name);
}

// declining is not an error: nothing is invoked and `Ok(false)` is returned
pub async fn destroy_database<R, C>(
    stack: &Stack,
    runner: &R,
    confirmation: &mut C,
) -> Result<bool, Error>
where
    R: Runner,
    C: Confirmation,
{
    let confirmed = match confirmation.confirm(DELETE_PROTECTION_QUESTION) {
        Ok(answer) => answer,
        Err(error) => return Err(Error::PromptError(error.to_string())),
    };

    if !confirmed {
        tracing::debug!(stack = %stack.stack_name, "deletion not confirmed, skipping");
        return Ok(false);
    }

    stack.delete(runner).await?;
    return Ok(true);
}
