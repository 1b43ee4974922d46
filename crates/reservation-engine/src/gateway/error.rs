//! Error types for the External Inventory Gateway.

use crate::model::Sku;
use thiserror::Error;

/// A failed gateway call. None of these mean "zero stock": callers keep the last known value.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    /// The request never produced a response (connect, timeout, TLS).
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The API answered with something other than 200.
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    /// The body was not a `{ "data": [...] }` envelope of the expected shape.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The inventory system has no record of the SKU.
    #[error("Unknown SKU: {0}")]
    UnknownSku(Sku),

    #[error("Inventory system unavailable")]
    Unavailable,
}
