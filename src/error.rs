use thiserror::Error;

/// Errors surfaced by the remote data service.
///
/// Both boundary operations ([`fetch_metadata`] and [`fetch_block`]) fail
/// with this taxonomy. The variants are `Clone` because a failed block keeps
/// its error around so a renderer can display it long after the fetch task
/// has finished.
///
/// [`fetch_metadata`]: crate::source::DataSource::fetch_metadata
/// [`fetch_block`]: crate::source::DataSource::fetch_block
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Network or server failure while talking to the data service
    #[error("transport error: {0}")]
    Transport(String),

    /// The resource or object path does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The slice string was rejected by the data service
    #[error("invalid slice: {0}")]
    InvalidSlice(String),

    /// The requested sub-range exceeds the slice's visible shape
    #[error("sub-range out of bounds: {0}")]
    OutOfRange(String),
}
