use thiserror::Error;

/// Failure of one round trip against the remote status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("endpoint answered with status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("request timed out")]
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown device '{0}', expected one of fan, ac, light")]
    UnknownDevice(String),
    #[error("unknown action '{0}', expected one of on, off, auto")]
    UnknownAction(String),
}
