use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ReportError {
    #[error("missing config file obis-charts.json (pass --config or create one)")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid configuration: {0}")]
    #[diagnostic(help("credentials can be given in the config file or via --url/--user/--password"))]
    InvalidConfig(String),

    #[error("openBIS request failed: {0}")]
    OpenBisHttp(String),

    #[error("openBIS returned status {status}: {message}")]
    OpenBisStatus { status: u16, message: String },

    #[error("openBIS call {method} failed: {message}")]
    OpenBisRpc { method: String, message: String },

    #[error("openBIS login rejected for user {0}")]
    OpenBisAuth(String),

    #[error("unexpected openBIS response: {0}")]
    OpenBisResponse(String),

    #[error("taxonomy request failed: {0}")]
    TaxonomyHttp(String),

    #[error("taxonomy service returned status {status}: {message}")]
    TaxonomyStatus { status: u16, message: String },

    #[error("malformed taxonomy document: {0}")]
    TaxonomyXml(String),

    #[error("GitHub request failed: {0}")]
    GithubHttp(String),

    #[error("GitHub returned status {status}: {message}")]
    GithubStatus { status: u16, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to serialize chart configuration: {0}")]
    Yaml(String),
}
