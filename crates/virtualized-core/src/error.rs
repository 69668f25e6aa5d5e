use thiserror::Error;

use crate::ViewId;

/// Failures reported by host capabilities. The virtualization layer never
/// surfaces these to its caller; it logs them and degrades.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("node {0} is not attached to the document")]
    Detached(ViewId),
    #[error("node {0} has no measurable box")]
    NoBox(ViewId),
    #[error("proximity detection unavailable: {0}")]
    ProximityUnavailable(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
