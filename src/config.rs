use aws_config::meta::region::RegionProviderChain;
use aws_types::region::Region;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use validator::{Validate, ValidationError};

pub const DEFAULT_CONFIG_PATH: &str = "cfn-tasks.yaml";
pub const DEFAULT_REGION: &str = "eu-west-1";

const TEMPLATE_EXTENSIONS: [&str; 4] = ["yml", "yaml", "json", "template"];

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("File {0} not found")]
    FileNotFound(String),

    #[error("Parsing error: {0}")]
    ParsingError(String),

    #[error("Validation errors: {0}")]
    ValidationError(String),

    #[error("Unknown error occurred: {0}")]
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Templates {
    #[validate(custom = "validate_template")]
    pub vpc: PathBuf,

    #[validate(custom = "validate_template")]
    pub database: PathBuf,

    #[validate(custom = "validate_template")]
    pub ec2: PathBuf,
}

impl Default for Templates {
    fn default() -> Self {
        return Self {
            vpc: PathBuf::from("cftemplates/vpc_3az.yml"),
            database: PathBuf::from("cftemplates/pg_serverless.yml"),
            ec2: PathBuf::from("cftemplates/ec2_on_pub_subnet.yml"),
        };
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    #[validate(length(min = 1))]
    pub region: Option<String>,

    pub aws_cli: Option<PathBuf>,

    #[validate]
    pub templates: Templates,
}

pub fn load(path: Option<&Path>) -> Result<Config, Error> {
    if let Some(path) = path {
        return parse(path);
    }

    let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
    if default_path.exists() {
        return parse(&default_path);
    }
    tracing::debug!("no {} found, using defaults", DEFAULT_CONFIG_PATH);
    return Ok(Config::default());
}

pub fn parse(path: &Path) -> Result<Config, Error> {
    let contents = match fs::read_to_string(path) {
        Ok(raw_contents) => Ok(raw_contents),
        Err(error) => match error.kind() {
            io::ErrorKind::NotFound => Err(Error::FileNotFound(path.display().to_string())),
            _ => Err(Error::Unknown(error.to_string())),
        },
    }?;

    let config: Config = match serde_yaml::from_str(&contents) {
        Ok(data) => Ok(data),
        Err(error) => Err(Error::ParsingError(error.to_string())),
    }?;

    match config.validate() {
        Ok(_) => (),
        Err(error) => return Err(Error::ValidationError(error.to_string())),
    }

    tracing::debug!(path = %path.display(), "loaded configuration");
    return Ok(config);
}

/// Picks the region for a stack operation: the flag, then the config file, then `eu-west-1`.
pub async fn resolve_region(explicit: Option<String>, config: &Config) -> Region {
    let region = RegionProviderChain::first_try(explicit.map(Region::new))
        .or_else(config.region.clone().map(Region::new))
        .or_else(Region::from_static(DEFAULT_REGION))
        .region()
        .await;

    return region.unwrap_or_else(|| Region::from_static(DEFAULT_REGION));
}

fn validate_template(template: &PathBuf) -> Result<(), ValidationError> {
    let file_extension = match template.extension().and_then(|extension| extension.to_str()) {
        Some(extension) => extension,
        None => {
            return Err(ValidationError::new(
                "Unable to parse the extension of the template location",
            ))
        }
    };
    if !TEMPLATE_EXTENSIONS.contains(&file_extension) {
        return Err(ValidationError::new(
            "The template location has to end with `.yml`, `.yaml`, `.json` or `.template`",
        ));
    }

    return Ok(());
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;

    use super::load;
    use super::parse;
    use super::resolve_region;
    use super::Config;
    use super::Error;
    use super::Templates;
    use tempfile::tempdir;

    #[test]
    fn file_does_not_exist() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("cfn-tasks.yaml");

        let result = parse(&file_path);
        assert_eq!(true, result.is_err());
        match result.err().unwrap() {
            Error::FileNotFound(_) => {}
            _ => panic!("Expected `FileNotFound` error"),
        }
    }

    #[test]
    fn missing_default_file_falls_back_to_defaults() {
        // tests run from the package root, which ships no cfn-tasks.yaml
        assert_eq!(false, PathBuf::from("cfn-tasks.yaml").exists());

        let config = load(None).unwrap();
        assert_eq!(Config::default(), config);
        assert_eq!(
            PathBuf::from("cftemplates/pg_serverless.yml"),
            config.templates.database
        );
    }

    #[test]
    fn explicit_missing_file_is_not_replaced_by_defaults() {
        let dir = tempdir().unwrap();

        match load(Some(&dir.path().join("missing.yaml"))).err().unwrap() {
            Error::FileNotFound(_) => {}
            _ => panic!("Expected `FileNotFound` error"),
        }
    }

    #[test]
    fn file_wrong_format() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("cfn-tasks.yaml");

        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "- Not a mapping").unwrap();

        let result = parse(&file_path);
        assert_eq!(true, result.is_err());
        match result.err().unwrap() {
            Error::ParsingError(_) => {}
            _ => panic!("Expected `ParsingError` error"),
        }
    }

    #[test]
    fn template_with_wrong_extension() {
        let config = Config {
            templates: Templates {
                vpc: PathBuf::from("cftemplates/vpc_3az.txt"),
                ..Templates::default()
            },
            ..Config::default()
        };
        let config_contents = serde_yaml::to_string(&config).unwrap();

        let dir = tempdir().unwrap();
        let file_path = dir.path().join("cfn-tasks.yaml");

        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "{}", config_contents).unwrap();

        let result = parse(&file_path);
        match result.err().unwrap() {
            Error::ValidationError(_) => {}
            _ => panic!("Expected `ValidationError` error"),
        }
    }

    #[test]
    fn empty_region_is_rejected() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("cfn-tasks.yaml");

        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "region: ''").unwrap();

        match parse(&file_path).err().unwrap() {
            Error::ValidationError(_) => {}
            _ => panic!("Expected `ValidationError` error"),
        }
    }

    #[test]
    fn partial_file_keeps_default_templates() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("cfn-tasks.yaml");

        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "region: us-east-1\ntemplates:\n  ec2: infra/ec2.yaml").unwrap();

        let config = parse(&file_path).unwrap();
        assert_eq!(Some(String::from("us-east-1")), config.region);
        assert_eq!(PathBuf::from("infra/ec2.yaml"), config.templates.ec2);
        assert_eq!(
            PathBuf::from("cftemplates/vpc_3az.yml"),
            config.templates.vpc
        );
    }

    #[tokio::test]
    async fn region_defaults_to_eu_west_1() {
        let region = resolve_region(None, &Config::default()).await;
        assert_eq!("eu-west-1", region.to_string());
    }

    #[tokio::test]
    async fn explicit_region_wins_over_config() {
        let config = Config {
            region: Some(String::from("us-east-1")),
            ..Config::default()
        };

        let from_config = resolve_region(None, &config).await;
        assert_eq!("us-east-1", from_config.to_string());

        let explicit = resolve_region(Some(String::from("ap-south-1")), &config).await;
        assert_eq!("ap-south-1", explicit.to_string());
    }
}
