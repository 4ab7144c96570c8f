use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;

const AWS_PROGRAM: &str = "aws";
const MASK: &str = "****";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Unable to start `{program}`: {message}")]
    SpawnFailed { program: String, message: String },

    #[error("Command failed with exit code {code:?}: {command}")]
    CommandFailed { command: String, code: Option<i32> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Visible,
    CapturedSilent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    tokens: Vec<String>,
    sensitive: Vec<usize>,
}

impl Invocation {
    pub fn aws(service: &str, verb: &str) -> Self {
        return Self {
            tokens: vec![
                String::from(AWS_PROGRAM),
                String::from(service),
                String::from(verb),
            ],
            sensitive: Vec::new(),
        };
    }

    pub fn arg(mut self, flag: &str, value: impl Into<String>) -> Self {
        self.tokens.push(String::from(flag));
        self.tokens.push(value.into());
        return self;
    }

    /// Like [`Invocation::arg`], but the value is masked whenever the invocation is displayed.
    pub fn sensitive_arg(mut self, flag: &str, value: impl Into<String>) -> Self {
        self.tokens.push(String::from(flag));
        self.sensitive.push(self.tokens.len());
        self.tokens.push(value.into());
        return self;
    }

    pub fn args<I>(mut self, flag: &str, values: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        self.tokens.push(String::from(flag));
        self.tokens.extend(values);
        return self;
    }

    pub fn tokens(&self) -> &[String] {
        return &self.tokens;
    }

    pub fn program(&self) -> &str {
        return &self.tokens[0];
    }

    pub fn arguments(&self) -> &[String] {
        return &self.tokens[1..];
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, token) in self.tokens.iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }
            if self.sensitive.contains(&index) {
                f.write_str(MASK)?;
            } else if needs_quoting(token) {
                write!(f, "'{}'", token.replace('\'', r"'\''"))?;
            } else {
                f.write_str(token)?;
            }
        }
        return Ok(());
    }
}

fn needs_quoting(token: &str) -> bool {
    return token.is_empty()
        || token
            .chars()
            .any(|c| c.is_whitespace() || "'\"$`\\|&;<>(){}*?!#~".contains(c));
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    /// Empty unless the invocation ran in [`ExecutionMode::CapturedSilent`].
    pub stdout: String,
}

#[allow(async_fn_in_trait)]
pub trait Runner {
    async fn run(&self, invocation: &Invocation, mode: ExecutionMode) -> Result<Output, Error>;
}

pub struct AwsCli {
    binary: Option<PathBuf>,
}

impl AwsCli {
    pub fn new(binary: Option<PathBuf>) -> Self {
        return Self { binary };
    }

    fn command(&self, invocation: &Invocation) -> Command {
        let mut command = match &self.binary {
            Some(binary) => Command::new(binary),
            None => Command::new(invocation.program()),
        };
        command.args(invocation.arguments());
        command.stdin(Stdio::null());
        command.stderr(Stdio::inherit());
        return command;
    }

    fn program_name(&self, invocation: &Invocation) -> String {
        return match &self.binary {
            Some(binary) => binary.display().to_string(),
            None => String::from(invocation.program()),
        };
    }
}

impl Runner for AwsCli {
    async fn run(&self, invocation: &Invocation, mode: ExecutionMode) -> Result<Output, Error> {
        tracing::debug!(command = %invocation, ?mode, "running aws cli");

        let mut command = self.command(invocation);
        let spawn_error = |error: std::io::Error| Error::SpawnFailed {
            program: self.program_name(invocation),
            message: error.to_string(),
        };

        let (status, stdout) = match mode {
            ExecutionMode::Visible => {
                command.stdout(Stdio::inherit());
                let status = command.status().await.map_err(spawn_error)?;
                (status, String::new())
            }
            ExecutionMode::CapturedSilent => {
                command.stdout(Stdio::piped());
                let output = command.output().await.map_err(spawn_error)?;
                let stdout = String::from_utf8_lossy(&output.stdout).to_string();
                (output.status, stdout)
            }
        };

        if !status.success() {
            return Err(Error::CommandFailed {
                command: invocation.to_string(),
                code: status.code(),
            });
        }

        return Ok(Output { stdout });
    }
}

#[cfg(test)]
pub mod testing {
    use std::cell::RefCell;

    use super::{Error, ExecutionMode, Invocation, Output, Runner};

    /// Records every invocation and answers captured runs with canned stdout.
    pub struct RecordingRunner {
        stdout: String,
        failure: Option<i32>,
        pub calls: RefCell<Vec<(Invocation, ExecutionMode)>>,
    }

    impl RecordingRunner {
        pub fn new() -> Self {
            Self::with_stdout("")
        }

        pub fn with_stdout(stdout: &str) -> Self {
            Self {
                stdout: String::from(stdout),
                failure: None,
                calls: RefCell::new(Vec::new()),
            }
        }

        pub fn failing(code: i32) -> Self {
            Self {
                stdout: String::new(),
                failure: Some(code),
                calls: RefCell::new(Vec::new()),
            }
        }

        pub fn only_call(&self) -> (Invocation, ExecutionMode) {
            let calls = self.calls.borrow();
            assert_eq!(1, calls.len(), "expected exactly one invocation");
            calls[0].clone()
        }
    }

    impl Runner for RecordingRunner {
        async fn run(&self, invocation: &Invocation, mode: ExecutionMode) -> Result<Output, Error> {
            self.calls.borrow_mut().push((invocation.clone(), mode));
            if let Some(code) = self.failure {
                return Err(Error::CommandFailed {
                    command: invocation.to_string(),
                    code: Some(code),
                });
            }
            let stdout = match mode {
                ExecutionMode::CapturedSilent => self.stdout.clone(),
                ExecutionMode::Visible => String::new(),
            };
            Ok(Output { stdout })
        }
    }
}
