use std::{io, num::ParseIntError};

use thiserror::Error;

use crate::connection::Address;

/// Failures a single REPL command can report inline.
///
/// None of these end the session. `Connection` and an end-of-stream `Framing`
/// error drop the active connection; every other variant leaves it open.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("No open connection, please use 'conn' to create one")]
    NotConnected,

    #[error("invalid number '{input}': {source}")]
    Parse {
        input: String,
        #[source]
        source: ParseIntError,
    },

    #[error("'{command}' expects {expected}")]
    Usage {
        command: &'static str,
        expected: &'static str,
    },

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Framing(#[from] FramingError),
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("dial {address}: {source}")]
    Dial {
        address: Address,
        #[source]
        source: io::Error,
    },

    #[error("connection lost: {0}")]
    Io(#[from] io::Error),
}

/// The server reply did not have the shape the sent command requires.
#[derive(Debug, Error)]
pub enum FramingError {
    #[error("server closed the connection while a reply was expected")]
    Closed,

    #[error("expected an integer line, got '{line}'")]
    InvalidInteger {
        line: String,
        #[source]
        source: ParseIntError,
    },

    #[error("expected {expected} message lines, stream ended after {received}")]
    Truncated { expected: usize, received: usize },
}

impl FramingError {
    /// The server hung up mid-reply rather than sending a malformed line.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, FramingError::Closed | FramingError::Truncated { .. })
    }
}

/// Error produced while decoding a reply from the wire.
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Framing(#[from] FramingError),
}

impl ClientError {
    pub fn loses_connection(&self) -> bool {
        match self {
            ClientError::Connection(_) => true,
            ClientError::Framing(err) => err.is_end_of_stream(),
            _ => false,
        }
    }
}

impl From<ResponseError> for ClientError {
    fn from(err: ResponseError) -> Self {
        match err {
            ResponseError::Io(err) => ClientError::Connection(ConnectionError::Io(err)),
            ResponseError::Framing(err) => ClientError::Framing(err),
        }
    }
}

impl From<io::Error> for ClientError {
    fn from(err: io::Error) -> Self {
        ClientError::Connection(ConnectionError::Io(err))
    }
}
