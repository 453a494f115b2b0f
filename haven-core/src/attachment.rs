//! Attachment ownership.
//!
//! Each entity kind that carries images has its own child table of
//! `(parent_id, image_url)` rows.

use serde::{Deserialize, Serialize};

use crate::RecordId;

/// Entity kinds that own image attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentOwner {
    Pet,
    Shelter,
    Fund,
    Network,
    Feed,
    FoundHome,
}

impl AttachmentOwner {
    pub const ALL: [AttachmentOwner; 6] = [
        AttachmentOwner::Pet,
        AttachmentOwner::Shelter,
        AttachmentOwner::Fund,
        AttachmentOwner::Network,
        AttachmentOwner::Feed,
        AttachmentOwner::FoundHome,
    ];

    /// Child table holding the owner's image rows.
    pub fn table(&self) -> &'static str {
        match self {
            AttachmentOwner::Pet => "\"PetsImages\"",
            AttachmentOwner::Shelter => "\"ShelterImages\"",
            AttachmentOwner::Fund => "\"FundImages\"",
            AttachmentOwner::Network => "\"NetworkImages\"",
            AttachmentOwner::Feed => "\"FeedImages\"",
            AttachmentOwner::FoundHome => "\"FoundImages\"",
        }
    }

    /// Foreign key column in the child table.
    pub fn parent_column(&self) -> &'static str {
        match self {
            AttachmentOwner::Pet => "pets_id",
            AttachmentOwner::Shelter => "shelter_id",
            AttachmentOwner::Fund => "fund_id",
            AttachmentOwner::Network => "network_id",
            AttachmentOwner::Feed => "feed_id",
            AttachmentOwner::FoundHome => "found_home_id",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AttachmentOwner::Pet => "pet",
            AttachmentOwner::Shelter => "shelter",
            AttachmentOwner::Fund => "fund",
            AttachmentOwner::Network => "network",
            AttachmentOwner::Feed => "feed",
            AttachmentOwner::FoundHome => "found_home",
        }
    }
}

/// One image row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attachment {
    pub owner: AttachmentOwner,
    pub parent_id: RecordId,
    pub image_url: String,
}

impl Attachment {
    pub fn new(owner: AttachmentOwner, parent_id: RecordId, image_url: impl Into<String>) -> Self {
        Self {
            owner,
            parent_id,
            image_url: image_url.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_child_tables_are_distinct() {
        let tables: HashSet<_> = AttachmentOwner::ALL.iter().map(|o| o.table()).collect();
        assert_eq!(tables.len(), AttachmentOwner::ALL.len());
    }

    #[test]
    fn test_found_home_mapping() {
        assert_eq!(AttachmentOwner::FoundHome.table(), "\"FoundImages\"");
        assert_eq!(AttachmentOwner::FoundHome.parent_column(), "found_home_id");
    }
}
