use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::invocation::{self, ExecutionMode, Invocation, Runner};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Invocation(#[from] invocation::Error),

    #[error("Unable to parse the secret {name}: {message}")]
    ParsingError { name: String, message: String },

    #[error("Unable to serialize the secret: {0}")]
    SerializingError(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbCredentials {
    pub username: String,
    pub password: String,
}

impl DbCredentials {
    pub fn render(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "Username: {}", self.username)?;
        writeln!(out, "Password: {}", self.password)?;
        return Ok(());
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetSecretValueResponse {
    secret_string: String,
}

pub fn list_invocation() -> Invocation {
    return Invocation::aws("secretsmanager", "list-secrets");
}

pub fn create_invocation(name: &str, credentials: &DbCredentials) -> Result<Invocation, Error> {
    let secret_string = match serde_json::to_string(credentials) {
        Ok(data) => data,
        Err(error) => return Err(Error::SerializingError(error.to_string())),
    };

    return Ok(Invocation::aws("secretsmanager", "create-secret")
        .arg("--name", name)
        .sensitive_arg("--secret-string", secret_string));
}

pub fn get_invocation(name: &str) -> Invocation {
    return Invocation::aws("secretsmanager", "get-secret-value").arg("--secret-id", name);
}

pub fn delete_invocation(name: &str) -> Invocation {
    return Invocation::aws("secretsmanager", "delete-secret").arg("--secret-id", name);
}

pub async fn list<R: Runner>(runner: &R) -> Result<(), Error> {
    runner
        .run(&list_invocation(), ExecutionMode::Visible)
        .await?;
    return Ok(());
}

pub async fn create<R: Runner>(
    runner: &R,
    name: &str,
    credentials: &DbCredentials,
) -> Result<(), Error> {
    let invocation = create_invocation(name, credentials)?;
    runner.run(&invocation, ExecutionMode::Visible).await?;
    return Ok(());
}

pub async fn get<R: Runner>(runner: &R, name: &str) -> Result<DbCredentials, Error> {
    let output = runner
        .run(&get_invocation(name), ExecutionMode::CapturedSilent)
        .await?;

    let parsing_error = |error: serde_json::Error| Error::ParsingError {
        name: String::from(name),
        message: error.to_string(),
    };

    let response: GetSecretValueResponse =
        serde_json::from_str(&output.stdout).map_err(parsing_error)?;
    let credentials: DbCredentials =
        serde_json::from_str(&response.secret_string).map_err(parsing_error)?;

    return Ok(credentials);
}

pub async fn destroy<R: Runner>(runner: &R, name: &str) -> Result<(), Error> {
    runner
        .run(&delete_invocation(name), ExecutionMode::Visible)
        .await?;
    return Ok(());
}

#[cfg(test)]
mod tests {
    use super::{create, create_invocation, destroy, get, list, DbCredentials, Error};
    use crate::invocation::testing::RecordingRunner;
    use crate::invocation::ExecutionMode;

    fn credentials() -> DbCredentials {
        DbCredentials {
            username: String::from("admin"),
            password: String::from("s3cr3t pass"),
        }
    }

    #[test]
    fn create_passes_secret_as_one_json_token() {
        let invocation = create_invocation("pg-serverless-db", &credentials()).unwrap();

        assert_eq!(
            vec![
                "aws",
                "secretsmanager",
                "create-secret",
                "--name",
                "pg-serverless-db",
                "--secret-string",
                r#"{"username":"admin","password":"s3cr3t pass"}"#
            ],
            invocation.tokens()
        );
        assert!(!invocation.to_string().contains("s3cr3t"));
    }

    #[tokio::test]
    async fn write_operations_are_visible() {
        let runner = RecordingRunner::new();
        list(&runner).await.unwrap();
        destroy(&runner, "pg-serverless-db").await.unwrap();
        create(&runner, "pg-serverless-db", &credentials())
            .await
            .unwrap();

        let calls = runner.calls.borrow();
        assert_eq!(vec!["aws", "secretsmanager", "list-secrets"], calls[0].0.tokens());
        assert_eq!(
            vec![
                "aws",
                "secretsmanager",
                "delete-secret",
                "--secret-id",
                "pg-serverless-db"
            ],
            calls[1].0.tokens()
        );
        assert!(calls.iter().all(|(_, mode)| *mode == ExecutionMode::Visible));
    }

    #[tokio::test]
    async fn get_parses_the_secret_string() {
        let runner = RecordingRunner::with_stdout(
            r#"{"Name":"pg-serverless-db","SecretString":"{\"username\": \"admin\", \"password\": \"hunter2\"}"}"#,
        );

        let credentials = get(&runner, "pg-serverless-db").await.unwrap();
        let mut out = Vec::new();
        credentials.render(&mut out).unwrap();

        assert_eq!(
            "Username: admin\nPassword: hunter2\n",
            String::from_utf8(out).unwrap()
        );
        let (invocation, mode) = runner.only_call();
        assert_eq!(ExecutionMode::CapturedSilent, mode);
        assert_eq!(
            vec![
                "aws",
                "secretsmanager",
                "get-secret-value",
                "--secret-id",
                "pg-serverless-db"
            ],
            invocation.tokens()
        );
    }

    #[tokio::test]
    async fn get_with_missing_password_fails() {
        let runner = RecordingRunner::with_stdout(r#"{"SecretString":"{\"username\":\"admin\"}"}"#);

        match get(&runner, "pg-serverless-db").await.err().unwrap() {
            Error::ParsingError { name, .. } => assert_eq!("pg-serverless-db", name),
            _ => panic!("Expected `ParsingError` error"),
        }
    }
}
