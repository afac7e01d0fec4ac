// ============================================================================
// Staged Change Tracking
// ============================================================================
//
// Each Change is one staged mutation of the context. A save writes the
// whole batch as a single journal frame and then applies it in order;
// a rollback simply discards it.
//
// ============================================================================

use crate::core::{ObjectId, Record};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Change {
    /// Insert a new record
    Insert { record: Record },

    /// Replace the attributes of an existing record
    Update { record: Record },

    /// Delete a record and nullify references to it
    Delete { entity: String, id: ObjectId },
}

impl Change {
    pub fn entity_name(&self) -> &str {
        match self {
            Change::Insert { record } | Change::Update { record } => &record.entity,
            Change::Delete { entity, .. } => entity,
        }
    }

    pub fn object_id(&self) -> ObjectId {
        match self {
            Change::Insert { record } | Change::Update { record } => record.id,
            Change::Delete { id, .. } => *id,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Change::Delete { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_change_identity() {
        let id = ObjectId::new();
        let insert = Change::Insert {
            record: Record::new(id, "Person", BTreeMap::new()),
        };
        assert_eq!(insert.entity_name(), "Person");
        assert_eq!(insert.object_id(), id);
        assert!(!insert.is_delete());

        let delete = Change::Delete {
            entity: "Person".to_string(),
            id,
        };
        assert!(delete.is_delete());
        assert_eq!(delete.object_id(), id);
    }
}
