use thiserror::Error;

/// Boxed error type used for request body failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by [`HandlerService`](crate::HandlerService).
#[derive(Debug, Error)]
pub enum ServeError {
    /// Reading the request body failed.
    #[error("failed to read request body: {0}")]
    Body(#[source] BoxError),
    /// The handler task ended without producing a response head.
    #[error("handler finished without a response")]
    Aborted,
}
