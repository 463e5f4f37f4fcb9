//! Share - one signed work-unit in the sharechain DAG
//!
//! A share names its creator, a creation timestamp, a single canonical
//! parent, and the full set of DAG references it creates (the chosen tips,
//! parent included). Everything is immutable after construction except the
//! reference list, which grows through one explicit append operation.

use crate::error::{Result, ShareError};
use crate::types::{NodeId, ShareId, SimTime};
use serde::{Deserialize, Serialize};

/// One share in the DAG
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Share {
    id: ShareId,
    creator: NodeId,
    timestamp: SimTime,
    parent: ShareId,
    references: Vec<ShareId>,
}

impl Share {
    /// Create a new share
    ///
    /// The reference list must be duplicate-free and, when non-empty, must
    /// contain `parent`.
    pub fn new(
        id: ShareId,
        creator: NodeId,
        timestamp: SimTime,
        parent: ShareId,
        references: Vec<ShareId>,
    ) -> Result<Self> {
        for (i, reference) in references.iter().enumerate() {
            if references[..i].contains(reference) {
                return Err(ShareError::DuplicateReference(*reference));
            }
        }
        if !references.is_empty() && !references.contains(&parent) {
            return Err(ShareError::ParentNotReferenced { parent });
        }

        Ok(Self {
            id,
            creator,
            timestamp,
            parent,
            references,
        })
    }

    /// The genesis share that seeds every chain
    ///
    /// Reserved id, pool creator, time zero, no parent, no references.
    pub fn genesis() -> Self {
        Self {
            id: ShareId::GENESIS,
            creator: NodeId::POOL,
            timestamp: SimTime::ZERO,
            parent: ShareId::NONE,
            references: Vec::new(),
        }
    }

    pub fn id(&self) -> ShareId {
        self.id
    }

    pub fn creator(&self) -> NodeId {
        self.creator
    }

    pub fn timestamp(&self) -> SimTime {
        self.timestamp
    }

    /// The reference designated as the canonical predecessor
    pub fn parent(&self) -> ShareId {
        self.parent
    }

    /// All DAG edges this share creates, parent included
    pub fn references(&self) -> &[ShareId] {
        &self.references
    }

    pub fn is_genesis(&self) -> bool {
        self.id.is_genesis()
    }

    /// Append one reference
    ///
    /// The only mutation a share supports. Rejects duplicates, and rejects a
    /// first reference other than the declared parent, which would leave the
    /// parent outside the reference list.
    pub fn add_reference(&mut self, reference: ShareId) -> Result<()> {
        if self.references.contains(&reference) {
            return Err(ShareError::DuplicateReference(reference));
        }
        if self.references.is_empty() && reference != self.parent {
            return Err(ShareError::ParentNotReferenced {
                parent: self.parent,
            });
        }
        self.references.push(reference);
        Ok(())
    }

    /// Non-parent references, i.e. how many uncles this share names
    pub fn uncle_references(&self) -> u32 {
        self.references.len().saturating_sub(1) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u32]) -> Vec<ShareId> {
        raw.iter().copied().map(ShareId::new).collect()
    }

    #[test]
    fn test_genesis_share() {
        let genesis = Share::genesis();

        assert!(genesis.is_genesis());
        assert_eq!(genesis.parent(), ShareId::NONE);
        assert!(genesis.references().is_empty());
        assert_eq!(genesis.creator(), NodeId::POOL);
        assert_eq!(genesis.timestamp(), SimTime::ZERO);
    }

    #[test]
    fn test_share_construction() {
        let share = Share::new(
            ShareId::new(2),
            NodeId::new(1),
            SimTime::from_secs(1.0),
            ShareId::GENESIS,
            ids(&[1]),
        )
        .unwrap();

        assert_eq!(share.id(), ShareId::new(2));
        assert_eq!(share.parent(), ShareId::GENESIS);
        assert_eq!(share.references(), &[ShareId::GENESIS]);
        assert_eq!(share.uncle_references(), 0);
    }

    #[test]
    fn test_duplicate_reference_rejected() {
        let result = Share::new(
            ShareId::new(4),
            NodeId::new(1),
            SimTime::from_secs(1.0),
            ShareId::new(2),
            ids(&[2, 3, 2]),
        );

        assert_eq!(result, Err(ShareError::DuplicateReference(ShareId::new(2))));
    }

    #[test]
    fn test_parent_must_be_referenced() {
        let result = Share::new(
            ShareId::new(4),
            NodeId::new(1),
            SimTime::from_secs(1.0),
            ShareId::new(2),
            ids(&[3]),
        );

        assert_eq!(
            result,
            Err(ShareError::ParentNotReferenced {
                parent: ShareId::new(2)
            })
        );
    }

    #[test]
    fn test_add_reference() {
        let mut share = Share::new(
            ShareId::new(4),
            NodeId::new(1),
            SimTime::from_secs(1.0),
            ShareId::new(2),
            ids(&[2]),
        )
        .unwrap();

        share.add_reference(ShareId::new(3)).unwrap();
        assert_eq!(share.references(), &[ShareId::new(2), ShareId::new(3)]);
        assert_eq!(share.uncle_references(), 1);

        // appending the same id again is refused
        assert_eq!(
            share.add_reference(ShareId::new(3)),
            Err(ShareError::DuplicateReference(ShareId::new(3)))
        );
    }

    #[test]
    fn test_first_reference_must_be_parent() {
        let mut share = Share::new(
            ShareId::new(4),
            NodeId::new(1),
            SimTime::from_secs(1.0),
            ShareId::new(2),
            Vec::new(),
        )
        .unwrap();

        assert!(share.add_reference(ShareId::new(3)).is_err());
        share.add_reference(ShareId::new(2)).unwrap();
        share.add_reference(ShareId::new(3)).unwrap();
    }
}
