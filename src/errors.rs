//! Error hierarchy for the configuration-sync client.
//!
//! Errors are categorized by where they originate: the transport (network,
//! timeouts), the wire protocol (malformed responses), the server (non-success
//! result codes) and local configuration. None of them are fatal to the
//! owning process; the background loops log them and carry on.

use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network or timeout failure on any call
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Response could not be understood
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Server answered with a non-success result code
    #[error("Server rejected request with code {code}: {message}")]
    Rejected { code: String, message: String },

    /// Server does not know this instance (heartbeat renew)
    #[error("Instance not found on server: {0}")]
    NotFound(String),

    /// Configuration loading failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration validation failures
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Local system failure (signal handlers, sockets)
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Cooperative shutdown was requested
    #[error("Client is shutting down")]
    Shutdown,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Request could not be sent or the connection broke
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server did not answer within the read timeout
    #[error("Request to {url} timed out after {duration:?}")]
    Timeout { url: String, duration: Duration },

    /// Server answered with an HTTP status outside 2xx
    #[error("Request to {url} returned HTTP status {status}")]
    HttpStatus { url: String, status: u16 },

    /// No server address configured
    #[error("No server address available")]
    NoServerAvailable,

    /// Client construction failed
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A changed-key line did not split into 2 or 3 fields
    #[error("Invalid changed-key line: {0:?}")]
    InvalidLine(String),

    /// A group key did not split into 3 fields
    #[error("Invalid group key: {0:?}")]
    InvalidGroupKey(String),

    /// Identifier contains a reserved delimiter character
    #[error("Identifier {0:?} contains a reserved delimiter")]
    ReservedDelimiter(String),

    /// Response body was not valid JSON of the expected shape
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Response body was missing the data field
    #[error("Response from {0} carried no data")]
    MissingData(String),
}

impl Error {
    /// Transport failures flip the server health flag; everything else does not.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}
