//! Terminal connection errors and translator-internal failures.

use thiserror::Error;
use tocgate_core::ServiceError;
use tocgate_proto::{FlapError, WireError};

/// Why a connection's task group collapsed.
///
/// Three groups, matching which side of the gateway failed: the client's
/// read path, the server's write path, or TOC processing in between.
/// Expected terminations (client signoff, rate-limit rejection) are not
/// errors; the handler returns `Ok` for those.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Failure reading from the client.
    #[error("client read: {0}")]
    ClientRead(#[source] FlapError),

    /// Failure writing to the client.
    #[error("server write: {0}")]
    ServerWrite(#[source] FlapError),

    /// Failure between the two: translation, backend signals, limits.
    #[error("TOC processing: {0}")]
    TocProcessing(#[source] SessionEnd),
}

/// Terminal conditions surfaced through the TOC-processing group.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionEnd {
    /// Another login took this user's slot; the backend closed the session.
    #[error("disconnect: another login replaced this session")]
    Disconnect,

    /// The server is shutting down.
    #[error("server shutting down")]
    Shutdown,

    /// Inbound data frame above the protocol ceiling.
    #[error("data frame of {len} bytes exceeds the maximum length of {max} bytes")]
    FrameTooLong {
        /// Payload length after trailing-NUL stripping
        len: usize,
        /// Protocol maximum
        max: usize,
    },

    /// Inbound data frame with no payload.
    #[error("empty data frame")]
    EmptyFrame,

    /// The outbound queue's consumer is gone.
    #[error("outbound queue closed")]
    QueueClosed,
}

/// Failure inside one command handler.
///
/// Handlers never surface these to the client directly; the dispatcher logs
/// them and answers with the generic internal-service error line.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Fewer arguments than the verb requires.
    #[error("missing arguments")]
    MissingArgs,

    /// An argument failed to parse (number, UUID, base64).
    #[error("bad argument: {0}")]
    BadArg(String),

    /// SNAC construction or parsing failed.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// A backend call failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The backend answered with an unexpected SNAC.
    #[error("unexpected backend reply")]
    UnexpectedReply,

    /// Verb outside the supported set.
    #[error("unknown command {0:?}")]
    UnknownVerb(String),
}
