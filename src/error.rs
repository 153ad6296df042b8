use thiserror::Error;

/// Failures while paging through the product archive.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid Sentinel host: {0}")]
    InvalidHost(String),
    #[error("Request to fetch products failed with {status}.\n{body}")]
    Status { status: u16, body: String },
    #[error("Request to {url} timed out")]
    Timeout { url: String },
    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

impl FetchError {
    /// HTTP status carried by the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CollectionError {
    #[error("Could not match product {0} to a collection name")]
    UnknownCollection(String),
}
