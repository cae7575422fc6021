use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Error during file I/O operations
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// Error during JSON serialization or deserialization
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// Error when user input fails.
    #[error("prompt error: {0}")]
    Prompt(#[from] inquire::InquireError),
    /// Profile name contains a path separator or the extension character
    #[error("invalid profile name '{0}': use alphanumeric characters, hyphens, and underscores only")]
    InvalidName(String),
    /// Profile directory already present
    #[error("profile '{0}' already exists")]
    ProfileExists(String),
    /// Profile directory missing
    #[error("profile '{0}' does not exist")]
    ProfileNotFound(String),
    /// Deleting the default profile without override
    #[error("cannot delete the '{0}' profile")]
    ProtectedProfile(String),
    /// No namespaced credential file in any lookup location
    #[error("no configuration found for {0}")]
    CredentialFileNotFound(String),
    /// No lookup layer supplied a credential value
    #[error("{key} could not be resolved for {chain}")]
    MissingCredential { key: String, chain: String },
    /// Legacy migration stopped partway; already moved files stay moved.
    #[error("migration failed after moving {moved} file(s): {source}")]
    Migration {
        moved: usize,
        #[source]
        source: std::io::Error,
    },
    /// Error during input validation.
    #[error("validation error: {0}")]
    Validation(String),
    /// Operator declined a confirmation
    #[error("aborted")]
    Aborted,
    /// Home directory could not be determined
    #[error("failed to find the home directory")]
    HomeDirNotFound,
}

impl AppError {
    /// Follow-up advice printed under the error line
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            AppError::Migration { .. } => {
                Some("Please manually backup your configurations before retrying.")
            }
            _ => None,
        }
    }
}
