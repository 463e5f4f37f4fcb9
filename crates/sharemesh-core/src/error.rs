//! Error types for Sharemesh core operations

use crate::types::ShareId;
use thiserror::Error;

/// Result type alias for Sharemesh core operations
pub type Result<T> = std::result::Result<T, ShareError>;

/// Errors raised while constructing or mutating a share
///
/// Chain admission never surfaces here: rejected and deferred shares are
/// reported through `ShareChain::add_share`'s boolean contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShareError {
    /// A reference list entry appears more than once
    #[error("duplicate reference to share {0}")]
    DuplicateReference(ShareId),

    /// A non-empty reference list does not contain the declared parent
    #[error("parent {parent} missing from reference list")]
    ParentNotReferenced { parent: ShareId },
}
