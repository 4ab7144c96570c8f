use std::fmt;
use std::io::{self, Write};
use std::path::Path;

use aws_types::region::Region;
use serde::{Deserialize, Serialize};

use crate::invocation::{self, ExecutionMode, Invocation, Runner};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Invocation(#[from] invocation::Error),

    #[error("Unable to parse the describe-stacks response: {0}")]
    ParsingError(String),

    #[error("Stack {0} not found")]
    NotFoundError(String),

    #[error("Parameter {key} cannot contain a comma: {value}")]
    InvalidParameter { key: String, value: String },

    #[error("Unable to read the confirmation: {0}")]
    PromptError(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters(Vec<(String, String)>);

impl Parameters {
    pub fn new() -> Self {
        return Self::default();
    }

    pub fn push(mut self, key: &str, value: impl Into<String>) -> Self {
        self.0.push((String::from(key), value.into()));
        return self;
    }

    pub fn is_empty(&self) -> bool {
        return self.0.is_empty();
    }

    pub fn tokens(&self) -> Result<Vec<String>, Error> {
        return self
            .0
            .iter()
            .map(|(key, value)| {
                // the AWS CLI shorthand syntax splits on commas
                if value.contains(',') {
                    return Err(Error::InvalidParameter {
                        key: key.clone(),
                        value: value.clone(),
                    });
                }
                Ok(parameter_token(key, value))
            })
            .collect();
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .0
            .iter()
            .map(|(key, value)| parameter_token(key, value))
            .collect();
        return f.write_str(&rendered.join(" "));
    }
}

fn parameter_token(key: &str, value: &str) -> String {
    return format!("ParameterKey={},ParameterValue={}", key, value);
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StackDescription {
    pub stack_name: String,

    #[serde(default)]
    pub description: Option<String>,

    pub stack_status: String,

    #[serde(default)]
    pub outputs: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStacksResponse {
    stacks: Vec<StackDescription>,
}

impl StackDescription {
    /// A stack created without a description prints an empty `Description:` line
    /// instead of failing; every other field is required by the response parser.
    pub fn render(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "StackName: {}", self.stack_name)?;
        writeln!(
            out,
            "Description: {}",
            self.description.as_deref().unwrap_or_default()
        )?;
        writeln!(out, "Stack Status: {}", self.stack_status)?;
        if let Some(outputs) = &self.outputs {
            writeln!(out, "Outputs: {}", indented_json(outputs)?)?;
        }
        return Ok(());
    }
}

fn indented_json(value: &impl Serialize) -> io::Result<String> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    return String::from_utf8(buffer)
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error));
}

pub struct Stack {
    pub stack_name: String,

    region: Region,
}

impl Stack {
    pub fn new(stack_name: impl Into<String>, region: Region) -> Self {
        return Self {
            stack_name: stack_name.into(),
            region,
        };
    }

    fn invocation(&self, verb: &str) -> Invocation {
        return Invocation::aws("cloudformation", verb)
            .arg("--stack-name", self.stack_name.as_str())
            .arg("--region", self.region.to_string());
    }

    pub fn describe_invocation(&self) -> Invocation {
        return self.invocation("describe-stacks");
    }

    pub fn create_invocation(
        &self,
        template: &Path,
        parameters: &Parameters,
    ) -> Result<Invocation, Error> {
        return self.deploy_invocation("create-stack", template, parameters);
    }

    pub fn update_invocation(
        &self,
        template: &Path,
        parameters: &Parameters,
    ) -> Result<Invocation, Error> {
        return self.deploy_invocation("update-stack", template, parameters);
    }

    pub fn delete_invocation(&self) -> Invocation {
        return self.invocation("delete-stack");
    }

    fn deploy_invocation(
        &self,
        verb: &str,
        template: &Path,
        parameters: &Parameters,
    ) -> Result<Invocation, Error> {
        let invocation = self
            .invocation(verb)
            .arg("--template-body", format!("file://{}", template.display()));

        if parameters.is_empty() {
            return Ok(invocation);
        }
        return Ok(invocation.args("--parameters", parameters.tokens()?));
    }

    pub async fn status<R: Runner>(&self, runner: &R) -> Result<StackDescription, Error> {
        let output = runner
            .run(&self.describe_invocation(), ExecutionMode::CapturedSilent)
            .await?;

        let response: DescribeStacksResponse = match serde_json::from_str(&output.stdout) {
            Ok(data) => data,
            Err(error) => return Err(Error::ParsingError(error.to_string())),
        };

        return match response.stacks.into_iter().next() {
            Some(stack) => Ok(stack),
            None => Err(Error::NotFoundError(self.stack_name.clone())),
        };
    }

    pub async fn create<R: Runner>(
        &self,
        runner: &R,
        template: &Path,
        parameters: &Parameters,
    ) -> Result<(), Error> {
        let invocation = self.create_invocation(template, parameters)?;
        runner.run(&invocation, ExecutionMode::Visible).await?;
        return Ok(());
    }

    pub async fn update<R: Runner>(
        &self,
        runner: &R,
        template: &Path,
        parameters: &Parameters,
    ) -> Result<(), Error> {
        let invocation = self.update_invocation(template, parameters)?;
        runner.run(&invocation, ExecutionMode::Visible).await?;
        return Ok(());
    }

    pub async fn delete<R: Runner>(&self, runner: &R) -> Result<(), Error> {
        runner
            .run(&self.delete_invocation(), ExecutionMode::Visible)
            .await?;
        return Ok(());
    }
}
