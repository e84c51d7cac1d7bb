use crate::smtp::{Response, Stage};

type BoxError = Box<dyn core::error::Error + Send + Sync>;

/// Failures to establish, or to keep, the transport connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Connection to {address} timed out.")]
    TimedOut { address: String },
    #[error("Could not connect to {address}. Error: {source}")]
    Refused {
        address: String,
        source: std::io::Error,
    },
    #[error("Server did not send 220 greeting. Received: {response}")]
    Greeting { response: Response },
    #[error("Server did not send a greeting in time.")]
    GreetingTimedOut,
    #[error("Connection lost: {0}")]
    Lost(#[source] BoxError),
    #[error("Connection already closed")]
    Closed,
}

impl ConnectionError {
    pub(crate) fn lost<E: core::error::Error + Send + Sync + 'static>(err: E) -> Self {
        ConnectionError::Lost(Box::new(err))
    }
}

/// The server answered a command with a status code other than the one
/// expected for that stage.
#[derive(Debug, thiserror::Error)]
#[error("{stage}. Server responded: {response}")]
pub struct ProtocolError {
    pub stage: Stage,
    pub response: Response,
}

/// Every way a session can end without the message being confirmed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error("Server did not respond in time.")]
    Timeout,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// A caller-supplied value would have spilled into another command line or
    /// header. Raised before anything is sent.
    #[error("Invalid {field}: line breaks are not allowed.")]
    InvalidParameter { field: &'static str },
}
