//! Error types for the client library

use thiserror::Error;

/// Errors raised by the REST client and the local predictors.
#[derive(Error, Debug)]
pub enum Error {
    /// Identifier is not of the form `<kind>/<24 hex chars>`.
    #[error("Invalid resource id '{0}'")]
    InvalidResourceId(String),

    /// The resource kind does not match what the caller asked for.
    #[error("Expected a {expected} resource, got '{id}'")]
    WrongKind { expected: String, id: String },

    /// The service answered 404.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Any other non-success answer from the service.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No username or API key were configured.
    #[error("Missing credentials: set BIGML_USERNAME and BIGML_API_KEY")]
    MissingCredentials,

    /// The resource exists but has not finished building.
    #[error("Resource {id} is not ready (status code {code})")]
    NotReady { id: String, code: i32 },

    /// The service reports that the resource failed to build.
    #[error("Resource {id} is faulty: {message}")]
    Faulty { id: String, message: String },

    /// Resource JSON lacks something a local predictor needs.
    #[error("Invalid model structure: {0}")]
    InvalidModel(String),

    /// The feature mapping cannot be used with this artifact.
    #[error("Invalid input data: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, Error>;
