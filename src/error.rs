use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, GenError>;

/// Error types for the generator
#[derive(Debug, Error)]
pub enum GenError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("parse error in {}: {message}", file.display())]
    Parse { file: PathBuf, message: String },

    #[error("type alias `{name}` not found in {}", file.display())]
    MissingAppType { file: PathBuf, name: String },

    #[error("malformed app type: {0}")]
    MalformedAppType(String),

    #[error("unsupported route type shape ({kind}): {text}")]
    UnsupportedRouteShape { kind: String, text: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for GenError {
    fn from(err: serde_json::Error) -> Self {
        GenError::Serialization(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for GenError {
    fn from(err: serde_yaml::Error) -> Self {
        GenError::Serialization(format!("YAML: {}", err))
    }
}
