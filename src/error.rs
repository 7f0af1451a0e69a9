//! Error types for the trivia room client.

use thiserror::Error;

/// Errors that can occur when using the trivia room client.
#[derive(Debug, Error)]
pub enum TriviaError {
    /// Failed to reach the game API (connection refused, DNS, TLS, …).
    #[error("http error: {0}")]
    Http(String),

    /// The game API answered with a non-success status.
    #[error("api error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the server.
        status: u16,
        /// Human-readable error message from the response body.
        message: String,
    },

    /// Failed to serialize or deserialize an API payload.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The client handle was used after `shutdown()` or after the session
    /// loop exited.
    #[error("client closed")]
    ClientClosed,

    /// Attempted a game operation but the client is not in a game.
    #[error("not in a game")]
    NotInGame,

    /// A command was rejected before any network call was made.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for trivia room client operations.
pub type Result<T> = std::result::Result<T, TriviaError>;
