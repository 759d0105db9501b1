#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Handler could not be converted into an app")]
    InvalidHandler,
    #[error("Malformed location: {0}")]
    MalformedLocation(#[from] url::ParseError),
    #[error("Response body stream was destroyed before it ended")]
    StreamDestroyed,
    #[error("Response body stream ended before it could be collected")]
    StreamConsumed,
    #[error("App dropped its callback without responding")]
    Canceled,
}
