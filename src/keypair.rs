use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::invocation::{self, ExecutionMode, Invocation, Runner};
use crate::writer;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Invocation(#[from] invocation::Error),

    #[error("Unable to parse the create-key-pair response: {0}")]
    ParsingError(String),

    #[error("Unable to write {path}: {message}")]
    WriteError { path: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyPair {
    pub key_name: String,
    pub key_pair_id: String,
    pub key_fingerprint: String,
    pub key_material: String,
}

impl KeyPair {
    pub fn render(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "{} = {}", self.key_name, self.key_pair_id)?;
        writeln!(out, "{}", self.key_fingerprint)?;
        return Ok(());
    }
}

pub fn create_invocation(name: &str) -> Invocation {
    return Invocation::aws("ec2", "create-key-pair").arg("--key-name", name);
}

pub fn delete_invocation(name: &str) -> Invocation {
    return Invocation::aws("ec2", "delete-key-pair").arg("--key-name", name);
}

pub async fn create<R: Runner>(
    runner: &R,
    name: &str,
    dir: &Path,
) -> Result<(KeyPair, PathBuf), Error> {
    let output = runner
        .run(&create_invocation(name), ExecutionMode::CapturedSilent)
        .await?;

    let keypair: KeyPair = match serde_json::from_str(&output.stdout) {
        Ok(data) => data,
        Err(error) => return Err(Error::ParsingError(error.to_string())),
    };

    let path = match writer::write_key_material(dir, name, &keypair.key_material) {
        Ok(path) => path,
        Err(error) => {
            return Err(Error::WriteError {
                path: dir.join(format!("{}.pem", name)).display().to_string(),
                message: error.to_string(),
            })
        }
    };
    tracing::info!(path = %path.display(), "wrote private key");

    return Ok((keypair, path));
}

pub async fn destroy<R: Runner>(runner: &R, name: &str) -> Result<(), Error> {
    runner
        .run(&delete_invocation(name), ExecutionMode::Visible)
        .await?;
    return Ok(());
}
