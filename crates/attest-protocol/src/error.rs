use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid base64: {0}")]
    InvalidEncoding(String),

    #[error("empty input")]
    EmptyInput,

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}
