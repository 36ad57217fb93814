use reqwest::StatusCode;
use xethash::CasHash;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CasClientError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("invalid byte range")]
    InvalidRange,

    #[error("no reconstruction available for file {0}")]
    ReconstructionUnavailable(CasHash),

    #[error("no fetch info for xorb {0}")]
    MissingFetchInfo(CasHash),

    #[error("no fetch info for xorb {0} covers the requested chunk range")]
    NoMatchingFetchInfo(CasHash),

    #[error("term {index} produced {actual} bytes, expected {expected}")]
    TermSizeMismatch {
        index: usize,
        expected: u64,
        actual: u64,
    },

    #[error("reconstruction terms ended {0} bytes short of the requested range")]
    SizeMismatch(u64),

    #[error("first-range offset {offset} exceeds the {available} bytes covered by the terms")]
    OffsetTooLarge { offset: u64, available: u64 },

    #[error("no result recorded for term {0}")]
    MissingTermResult(usize),

    #[error("request failed with status {0}")]
    HttpError(StatusCode),

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("invalid response body: {0}")]
    InvalidResponse(String),

    #[error("xorb format error: {0}")]
    XorbFormatError(#[from] xorb_format::error::XorbFormatError),

    #[error("shard format error: {0}")]
    ShardFormatError(#[from] shard_format::error::ShardFormatError),

    #[error("hash parse error: {0}")]
    HashParseError(#[from] xethash::CasHashParseError),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),

    #[error("internal error: {0}")]
    InternalError(String),
}

pub type Result<T> = std::result::Result<T, CasClientError>;

impl CasClientError {
    /// The transport classification callers use to decide whether to retry
    /// the whole operation. Everything outside the transport layer is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            CasClientError::HttpError(status) => matches!(
                *status,
                StatusCode::TOO_MANY_REQUESTS
                    | StatusCode::INTERNAL_SERVER_ERROR
                    | StatusCode::SERVICE_UNAVAILABLE
                    | StatusCode::GATEWAY_TIMEOUT
            ),
            CasClientError::NetworkError(_) => true,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for CasClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return CasClientError::InvalidResponse(e.to_string());
        }
        match e.status() {
            Some(status) => CasClientError::HttpError(status),
            None => CasClientError::NetworkError(e.to_string()),
        }
    }
}

impl From<reqwest_middleware::Error> for CasClientError {
    fn from(e: reqwest_middleware::Error) -> Self {
        match e {
            reqwest_middleware::Error::Reqwest(e) => e.into(),
            reqwest_middleware::Error::Middleware(e) => CasClientError::NetworkError(e.to_string()),
        }
    }
}
