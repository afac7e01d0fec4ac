use super::{Change, JournalEntry, PersistenceManager, RecordStore};
use crate::core::{DbError, ObjectId, Record, Result};
use crate::facade::{StackConfig, StoreType};
use crate::model::{Entity, Stored};
use crate::query::{AggregateRequest, AggregateResult, FetchRequest, sort_records};
use tracing::{debug, info_span, warn};

/// Counters describing what the context has done since it was opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextStats {
    /// Saves that wrote a journal frame (or, in memory, applied a batch).
    pub writes: u64,
    /// Checkpoints that rewrote the snapshot.
    pub checkpoints: u64,
    /// Saves that found nothing to write.
    pub clean_saves: u64,
}

/// The mutable staging area in front of the store.
///
/// Fetches, counts and aggregates read committed records only; inserts,
/// updates and deletes are staged until [`Context::save`] commits them.
pub struct Context {
    store: RecordStore,
    pending: Vec<Change>,
    persistence: Option<PersistenceManager>,
    stats: ContextStats,
}

impl Context {
    /// A context over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self {
            store: RecordStore::new(),
            pending: Vec::new(),
            persistence: None,
            stats: ContextStats::default(),
        }
    }

    /// Opens the backing store described by `config` and loads it.
    pub fn open(config: &StackConfig) -> Result<Self> {
        let _span = info_span!("open_store", store = %config.store_name).entered();

        let open_error = |err: DbError| DbError::StoreOpen {
            store: config.store_name.clone(),
            reason: err.to_string(),
        };

        match config.store_type {
            StoreType::InMemory => Ok(Self::in_memory()),
            StoreType::Persistent => {
                let mut persistence = PersistenceManager::open(
                    &config.data_dir,
                    &config.store_name,
                    config.model_version,
                    config.durability_mode,
                    config.checkpoint_threshold,
                )
                .map_err(open_error)?;
                let store = persistence.recover().map_err(open_error)?;
                debug!(records = store.record_count(), "store loaded");

                Ok(Self {
                    store,
                    pending: Vec::new(),
                    persistence: Some(persistence),
                    stats: ContextStats::default(),
                })
            }
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn fetch<E: Entity>(&self, request: &FetchRequest<E>) -> Result<Vec<Stored<E>>> {
        self.matching(request)?
            .into_iter()
            .map(Stored::from_record)
            .collect::<Result<Vec<_>>>()
            .map_err(fetch_error)
    }

    /// Count-only fetch; honours the request's offset and limit.
    pub fn count<E: Entity>(&self, request: &FetchRequest<E>) -> Result<usize> {
        let mut count: usize = 0;
        for record in self.store.records(E::ENTITY_NAME) {
            if request.matches(record).map_err(fetch_error)? {
                count += 1;
            }
        }
        let count = count.saturating_sub(request.fetch_offset);
        Ok(request.fetch_limit.map_or(count, |limit| count.min(limit)))
    }

    pub fn aggregate<E: Entity>(&self, request: &AggregateRequest<E>) -> Result<AggregateResult> {
        let mut records = Vec::new();
        for record in self.store.records(E::ENTITY_NAME) {
            if request.matches(record).map_err(fetch_error)? {
                records.push(record);
            }
        }
        request.evaluate(&records).map_err(fetch_error)
    }

    /// Looks up one committed object by identity.
    pub fn existing<E: Entity>(&self, id: ObjectId) -> Result<Option<Stored<E>>> {
        self.store
            .get(E::ENTITY_NAME, id)
            .map(Stored::from_record)
            .transpose()
            .map_err(fetch_error)
    }

    fn matching<E: Entity>(&self, request: &FetchRequest<E>) -> Result<Vec<&Record>> {
        let mut records = Vec::new();
        for record in self.store.records(E::ENTITY_NAME) {
            if request.matches(record).map_err(fetch_error)? {
                records.push(record);
            }
        }
        sort_records(&mut records, &request.sort_descriptors).map_err(fetch_error)?;

        let limit = request.fetch_limit.unwrap_or(usize::MAX);
        Ok(records
            .into_iter()
            .skip(request.fetch_offset)
            .take(limit)
            .collect())
    }

    // ------------------------------------------------------------------
    // Staged mutations
    // ------------------------------------------------------------------

    pub fn insert<E: Entity>(&mut self, entity: E) -> Stored<E> {
        let id = ObjectId::new();
        self.pending.push(Change::Insert {
            record: entity.to_record(id),
        });
        Stored::new(id, entity)
    }

    pub fn update<E: Entity>(&mut self, object: &Stored<E>) {
        self.pending.push(Change::Update {
            record: object.to_record(object.id()),
        });
    }

    pub fn delete<E: Entity>(&mut self, object: &Stored<E>) {
        self.pending.push(Change::Delete {
            entity: E::ENTITY_NAME.to_string(),
            id: object.id(),
        });
    }

    pub fn has_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_changes(&self) -> &[Change] {
        &self.pending
    }

    /// Discards every staged change.
    pub fn rollback(&mut self) {
        self.pending.clear();
    }

    // ------------------------------------------------------------------
    // Commit
    // ------------------------------------------------------------------

    /// Commits the staged batch. Returns `Ok(false)` without touching the
    /// store when nothing is staged. On error nothing is applied and the
    /// batch stays staged.
    pub fn save(&mut self) -> Result<bool> {
        if self.pending.is_empty() {
            self.stats.clean_saves += 1;
            return Ok(false);
        }
        let _span = info_span!("save", changes = self.pending.len()).entered();

        self.store.validate(&self.pending)?;

        if let Some(persistence) = self.persistence.as_mut() {
            let entry = JournalEntry::new(self.pending.clone());
            persistence
                .log(&entry)
                .map_err(|err| DbError::SaveError(err.to_string()))?;
        }

        for change in self.pending.drain(..) {
            self.store.apply(&change)?;
        }
        self.stats.writes += 1;

        self.maybe_checkpoint();
        Ok(true)
    }

    /// A failed checkpoint only costs a longer replay; the journal still
    /// holds every committed frame.
    fn maybe_checkpoint(&mut self) {
        let Some(persistence) = self.persistence.as_mut() else {
            return;
        };
        if !persistence.needs_checkpoint() {
            return;
        }
        match persistence.checkpoint(&self.store) {
            Ok(()) => {
                self.stats.checkpoints += 1;
                debug!(records = self.store.record_count(), "checkpoint written");
            }
            Err(err) => warn!(error = %err, "checkpoint failed"),
        }
    }

    /// Forces a snapshot of the committed state and truncates the journal.
    pub fn checkpoint(&mut self) -> Result<()> {
        if let Some(persistence) = self.persistence.as_mut() {
            persistence.checkpoint(&self.store)?;
            self.stats.checkpoints += 1;
        }
        Ok(())
    }

    pub fn stats(&self) -> ContextStats {
        self.stats
    }

    pub fn is_persistent(&self) -> bool {
        self.persistence.is_some()
    }
}

fn fetch_error(err: DbError) -> DbError {
    match err {
        DbError::FetchError(_) => err,
        other => DbError::FetchError(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Person, PersonField, PriceCategory, Venue, VenueField};
    use crate::query::{Predicate, SortDescriptor};

    #[test]
    fn test_inserts_are_invisible_until_saved() {
        let mut ctx = Context::in_memory();
        ctx.insert(Person::new("Ann"));
        assert!(ctx.has_changes());
        assert!(ctx.fetch(&FetchRequest::<Person>::new()).unwrap().is_empty());

        assert!(ctx.save().unwrap());
        assert!(!ctx.has_changes());
        assert_eq!(ctx.fetch(&FetchRequest::<Person>::new()).unwrap().len(), 1);
    }

    #[test]
    fn test_second_save_is_a_no_op() {
        let mut ctx = Context::in_memory();
        ctx.insert(Person::new("Ann"));
        assert!(ctx.save().unwrap());
        assert!(!ctx.save().unwrap());

        let stats = ctx.stats();
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.clean_saves, 1);
    }

    #[test]
    fn test_update_replaces_fields() {
        let mut ctx = Context::in_memory();
        let mut person = ctx.insert(Person::new("Ann"));
        ctx.save().unwrap();

        person.name = "Anne".to_string();
        ctx.update(&person);
        ctx.save().unwrap();

        let fetched: Stored<Person> = ctx.existing(person.id()).unwrap().unwrap();
        assert_eq!(fetched.name, "Anne");
    }

    #[test]
    fn test_invalid_batch_stays_pending() {
        let mut ctx = Context::in_memory();
        let ann = ctx.insert(Person::new("Ann"));
        ctx.rollback();
        ctx.delete(&ann);

        assert!(matches!(ctx.save(), Err(DbError::SaveError(_))));
        assert_eq!(ctx.pending_changes().len(), 1);
        assert_eq!(ctx.stats().writes, 0);
    }

    #[test]
    fn test_fetch_paging_and_count_agree() {
        let mut ctx = Context::in_memory();
        for (name, price) in [
            ("a", PriceCategory::Cheap),
            ("b", PriceCategory::Moderate),
            ("c", PriceCategory::Cheap),
            ("d", PriceCategory::Cheap),
        ] {
            ctx.insert(Venue::new(name, price));
        }
        ctx.save().unwrap();

        let request = FetchRequest::<Venue>::new()
            .filter(Predicate::<Venue>::equals(VenueField::PriceCategory, PriceCategory::Cheap).unwrap())
            .sort_by(SortDescriptor::<Venue>::descending(VenueField::Name).unwrap())
            .offset(1)
            .limit(5);

        let names: Vec<String> = ctx
            .fetch(&request)
            .unwrap()
            .into_iter()
            .map(|v| v.into_inner().name)
            .collect();
        assert_eq!(names, ["c", "a"]);
        assert_eq!(ctx.count(&request).unwrap(), 2);
    }

    #[test]
    fn test_existing_with_wrong_entity_is_none() {
        let mut ctx = Context::in_memory();
        let ann = ctx.insert(Person::new("Ann"));
        ctx.save().unwrap();

        let as_venue: Option<Stored<Venue>> = ctx.existing(ann.id()).unwrap();
        assert!(as_venue.is_none());
        let by_name = FetchRequest::<Person>::new()
            .filter(Predicate::<Person>::equals(PersonField::Name, "Ann").unwrap());
        assert_eq!(ctx.count(&by_name).unwrap(), 1);
    }
}
