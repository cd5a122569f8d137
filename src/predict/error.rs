//! Prediction request errors.

use thiserror::Error;

/// Shown when a non-2xx response carries no usable `error` message
pub const GENERIC_SERVER_ERROR: &str = "Something went wrong";

/// Shown for every transport or parse failure
pub const CONNECTION_FAILED: &str = "Failed to connect to server";

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PredictError {
    /// The service answered with a non-2xx status.
    #[error("{message}")]
    ServerRejected { status: u16, message: String },

    /// The request never completed, or the response was unreadable.
    #[error("{}", CONNECTION_FAILED)]
    Transport { detail: String },
}
