//! Error taxonomy shared by both containers and their cursors.

use thiserror::Error;

/// Failure of a container or cursor operation.
///
/// Every variant is reported synchronously to the caller. The container
/// is left exactly as it was before the rejected call.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum ContainerError {
    /// Rejected construction parameter (capacity, bucket count, load factor).
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Index outside the valid range for the attempted operation.
    #[error("index {index} out of range for length {len}")]
    OutOfRange { index: usize, len: usize },

    /// Cursor removal without a preceding successful `next`.
    #[error("cursor has no yielded element to remove")]
    IllegalState,

    /// The container was structurally modified behind the cursor.
    #[error("container was structurally modified during iteration")]
    ConcurrentModification,

    /// The cursor was handed a container other than the one that created it.
    #[error("cursor used with a container that did not create it")]
    ForeignContainer,
}
