use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploaderError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration file could not be parsed: {0}")]
    ConfigParse(#[from] ini::ParseError),

    #[error("Credential file not usable ({path}): {reason}")]
    Credentials { path: String, reason: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Drive API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Upload pass aborted: {0}")]
    PassAborted(String),
}

impl UploaderError {
    /// Build an `ApiError` from a non-success response, consuming its body.
    pub async fn from_response(context: &str, response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let error_text = response.text().await.unwrap_or_default();
        UploaderError::ApiError {
            status,
            message: format!("{}: {}", context, error_text),
        }
    }
}

pub type Result<T> = std::result::Result<T, UploaderError>;
