use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindError {
    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Sub-key '{0}' is already bound")]
    DuplicateSubKey(String),

    #[error("Object bound to '{0}' has no serializer")]
    NotSerializable(String),

    #[error("Object bound to '{0}' has no version table")]
    MissingVersionTable(String),

    #[error("Object bound to '{0}' declares no deserialize procedures")]
    IncompleteVersionTable(String),

    #[error("Object bound to '{0}' has no latest version tag")]
    NoLatestVersion(String),

    #[error("Latest version '{latest}' of '{sub_key}' has no deserialize procedure")]
    LatestVersionNotFound { sub_key: String, latest: String },

    #[error("Stored version '{tag}' of '{sub_key}' is not known to this object")]
    UnknownVersion { sub_key: String, tag: String },

    #[error("Deserialize error: {0}")]
    Deserialize(String),

    #[error("Binding '{0}' has not been retrieved yet")]
    NotRetrieved(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("No Tokio runtime available: {0}")]
    NoRuntime(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, BindError>;

impl From<serde_json::Error> for BindError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for BindError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
