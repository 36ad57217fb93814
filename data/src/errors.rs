use cas_client::CasClientError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataClientError {
    #[error("CAS service error: {0}")]
    CasClientError(#[from] CasClientError),

    #[error("unable to parse string as a hash value: {0}")]
    HashStringParsingFailure(#[from] xethash::CasHashParseError),

    #[error("token exchange failed: {0}")]
    TokenExchangeError(String),

    #[error("parameter error: {0}")]
    ParameterError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("subtask scheduling error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, DataClientError>;

impl From<reqwest::Error> for DataClientError {
    fn from(e: reqwest::Error) -> Self {
        DataClientError::CasClientError(e.into())
    }
}

impl From<reqwest_middleware::Error> for DataClientError {
    fn from(e: reqwest_middleware::Error) -> Self {
        DataClientError::CasClientError(e.into())
    }
}
