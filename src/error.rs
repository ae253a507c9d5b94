use thiserror::Error;

/// Failures from talking to Flickr or decoding what it sent back
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed with HTTP status {0}")]
    Status(reqwest::StatusCode),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("malformed search response: {0}")]
    Parse(String),

    #[error("Flickr API error {code}: {message}")]
    Api { code: String, message: String },

    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl FetchError {
    pub(crate) fn parse(msg: impl std::fmt::Display) -> Self {
        FetchError::Parse(msg.to_string())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControllerError {
    #[error("photo {index} is not part of the current results")]
    NotInResult { index: usize },

    #[error("no cancellation prompt is pending")]
    NoPendingConfirmation,
}
