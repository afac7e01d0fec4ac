use super::Change;
use crate::core::{DbError, ObjectId, Record, Result};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Committed records of one entity. Rows are keyed by a store-wide insertion
/// sequence, which is the store-defined fetch order.
#[derive(Debug, Clone, Default)]
struct EntityTable {
    rows: BTreeMap<u64, Record>,
    index: HashMap<ObjectId, u64>,
}

/// Committed state of the whole store, grouped by entity name.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    tables: BTreeMap<String, EntityTable>,
    next_seq: u64,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(entities: BTreeMap<String, Vec<Record>>) -> Self {
        let mut store = Self::new();
        for record in entities.into_values().flatten() {
            store.put(record);
        }
        store
    }

    pub fn to_snapshot(&self) -> BTreeMap<String, Vec<Record>> {
        self.tables
            .iter()
            .map(|(name, table)| (name.clone(), table.rows.values().cloned().collect()))
            .collect()
    }

    /// Records of `entity` in store order.
    pub fn records(&self, entity: &str) -> Vec<&Record> {
        self.tables
            .get(entity)
            .map(|table| table.rows.values().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, entity: &str, id: ObjectId) -> Option<&Record> {
        let table = self.tables.get(entity)?;
        let seq = table.index.get(&id)?;
        table.rows.get(seq)
    }

    pub fn contains(&self, entity: &str, id: ObjectId) -> bool {
        self.get(entity, id).is_some()
    }

    pub fn record_count(&self) -> usize {
        self.tables.values().map(|table| table.rows.len()).sum()
    }

    /// Checks a batch against the committed state without touching it, so
    /// a rejected batch leaves both the store and the batch intact.
    pub fn validate(&self, changes: &[Change]) -> Result<()> {
        let mut inserted: HashSet<ObjectId> = HashSet::new();
        let mut deleted: HashSet<ObjectId> = HashSet::new();

        for change in changes {
            let id = change.object_id();
            let entity = change.entity_name();
            match change {
                Change::Insert { .. } => {
                    if self.contains(entity, id) || !inserted.insert(id) {
                        return Err(DbError::SaveError(format!(
                            "{} {} is inserted twice",
                            entity, id
                        )));
                    }
                }
                Change::Update { .. } | Change::Delete { .. } => {
                    let live = (self.contains(entity, id) || inserted.contains(&id))
                        && !deleted.contains(&id);
                    if !live {
                        return Err(DbError::SaveError(format!(
                            "{} {} is not in the store",
                            entity, id
                        )));
                    }
                    if change.is_delete() {
                        deleted.insert(id);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn apply(&mut self, change: &Change) -> Result<()> {
        match change {
            Change::Insert { record } => {
                self.put(record.clone());
                Ok(())
            }
            Change::Update { record } => {
                // A stale copy may still name objects deleted since it was read.
                let mut fields = record.fields.clone();
                for value in fields.values_mut() {
                    value.retain_references(|id| self.is_live(id));
                }
                let row = self
                    .tables
                    .get_mut(&record.entity)
                    .and_then(|table| {
                        let seq = *table.index.get(&record.id)?;
                        table.rows.get_mut(&seq)
                    })
                    .ok_or(DbError::ObjectNotFound(record.id))?;
                row.fields = fields;
                Ok(())
            }
            Change::Delete { entity, id } => {
                let table = self
                    .tables
                    .get_mut(entity)
                    .ok_or(DbError::ObjectNotFound(*id))?;
                let seq = table.index.remove(id).ok_or(DbError::ObjectNotFound(*id))?;
                table.rows.remove(&seq);
                self.nullify_references_to(*id);
                Ok(())
            }
        }
    }

    /// Whether `id` names a committed record of any entity.
    pub fn is_live(&self, id: ObjectId) -> bool {
        self.tables.values().any(|table| table.index.contains_key(&id))
    }

    fn put(&mut self, record: Record) {
        let seq = self.next_seq;
        self.next_seq += 1;

        let table = self.tables.entry(record.entity.clone()).or_default();
        table.index.insert(record.id, seq);
        table.rows.insert(seq, record);
    }

    fn nullify_references_to(&mut self, target: ObjectId) {
        for table in self.tables.values_mut() {
            for record in table.rows.values_mut() {
                record.nullify_references_to(target);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;
    use crate::model::{Dog, Entity, Person, Walk};

    #[test]
    fn test_store_order_is_insertion_order() {
        let mut store = RecordStore::new();
        for name in ["Ann", "Bob", "Cid"] {
            store
                .apply(&Change::Insert {
                    record: Person::new(name).to_record(ObjectId::new()),
                })
                .unwrap();
        }

        let names: Vec<String> = store
            .records("Person")
            .iter()
            .map(|r| r.text("name").unwrap())
            .collect();
        assert_eq!(names, ["Ann", "Bob", "Cid"]);
    }

    #[test]
    fn test_delete_nullifies_references() {
        let mut store = RecordStore::new();
        let dog_id = ObjectId::new();
        let walk_a = ObjectId::new();
        let walk_b = ObjectId::new();

        let mut dog = Dog::new("Fido");
        dog.walks = vec![walk_a, walk_b];
        let walk = Walk {
            date: None,
            dog: Some(dog_id),
        };

        for change in [
            Change::Insert { record: dog.to_record(dog_id) },
            Change::Insert { record: walk.to_record(walk_a) },
            Change::Insert { record: walk.to_record(walk_b) },
        ] {
            store.apply(&change).unwrap();
        }

        store
            .apply(&Change::Delete {
                entity: "Walk".to_string(),
                id: walk_a,
            })
            .unwrap();
        let dog_record = store.get("Dog", dog_id).unwrap();
        assert_eq!(dog_record.get("walks"), &Value::ReferenceList(vec![walk_b]));

        store
            .apply(&Change::Delete {
                entity: "Dog".to_string(),
                id: dog_id,
            })
            .unwrap();
        assert!(store.get("Walk", walk_b).unwrap().get("dog").is_null());
    }

    #[test]
    fn test_stale_update_does_not_restore_deleted_reference() {
        let mut store = RecordStore::new();
        let dog_id = ObjectId::new();
        let walk_id = ObjectId::new();

        let mut dog = Dog::new("Fido");
        dog.walks = vec![walk_id];
        let walk = Walk {
            date: None,
            dog: Some(dog_id),
        };
        for change in [
            Change::Insert { record: dog.to_record(dog_id) },
            Change::Insert { record: walk.to_record(walk_id) },
        ] {
            store.apply(&change).unwrap();
        }

        store
            .apply(&Change::Delete {
                entity: "Walk".to_string(),
                id: walk_id,
            })
            .unwrap();

        // `dog` was read before the delete and still lists the walk.
        dog.name = "Rex".to_string();
        store
            .apply(&Change::Update { record: dog.to_record(dog_id) })
            .unwrap();

        let dog_record = store.get("Dog", dog_id).unwrap();
        assert_eq!(dog_record.text("name").unwrap(), "Rex");
        assert_eq!(dog_record.get("walks"), &Value::ReferenceList(Vec::new()));
        assert!(!store.is_live(walk_id));
    }

    #[test]
    fn test_validate_rejects_unknown_targets() {
        let store = RecordStore::new();
        let id = ObjectId::new();
        let record = Person::new("Ghost").to_record(id);

        let err = store
            .validate(&[Change::Update { record: record.clone() }])
            .unwrap_err();
        assert!(matches!(err, DbError::SaveError(_)));

        // insert then delete in one batch is fine, a second delete is not
        let batch = vec![
            Change::Insert { record },
            Change::Delete {
                entity: "Person".to_string(),
                id,
            },
        ];
        assert!(store.validate(&batch).is_ok());

        let mut twice = batch;
        twice.push(Change::Delete {
            entity: "Person".to_string(),
            id,
        });
        assert!(store.validate(&twice).is_err());
    }

    #[test]
    fn test_snapshot_round_trip_keeps_order() {
        let mut store = RecordStore::new();
        let ids: Vec<ObjectId> = (0..3).map(|_| ObjectId::new()).collect();
        for (i, id) in ids.iter().enumerate() {
            store
                .apply(&Change::Insert {
                    record: Person::new(format!("p{}", i)).to_record(*id),
                })
                .unwrap();
        }

        let restored = RecordStore::from_snapshot(store.to_snapshot());
        let restored_ids: Vec<ObjectId> =
            restored.records("Person").iter().map(|r| r.id).collect();
        assert_eq!(restored_ids, ids);
        assert_eq!(restored.record_count(), 3);
    }
}
