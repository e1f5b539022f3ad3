//! Error type shared by the backend contracts.

use thiserror::Error;
use tocgate_proto::WireError;

/// Failure of a backend service call.
///
/// The gateway maps all of these to the generic TOC internal-service error
/// unless a SNAC error body says otherwise; the variants exist for logging
/// and for backend implementations to be precise.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The backend could not be reached or is shutting down.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The backend refused the request (bad cookie, unknown session).
    #[error("backend rejected the request: {0}")]
    Rejected(String),

    /// A SNAC failed to marshal or unmarshal on the way through.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// Unexpected backend-side failure.
    #[error("internal backend error: {0}")]
    Internal(String),
}
