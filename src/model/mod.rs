// ============================================================================
// Entity Models
// ============================================================================
//
// Plain record types plus the glue that maps them to and from the untyped
// `Record` form held by the store. Each entity declares a field enum whose
// variants are the only key paths predicates and sort descriptors can name.
//
// ============================================================================

pub mod dog;
pub mod person;
pub mod venue;

pub use dog::{Dog, DogField, Walk, WalkField};
pub use person::{Person, PersonField};
pub use venue::{Location, PriceCategory, PriceInfo, Stats, Venue, VenueField};

use crate::core::{DataType, ObjectId, Record, Result, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Typed reference to one attribute of an entity.
pub trait EntityField: Copy + fmt::Debug + PartialEq + 'static {
    /// Key path of the attribute inside the stored record.
    fn key(&self) -> &'static str;

    fn data_type(&self) -> DataType;
}

/// A type the store can persist.
pub trait Entity: Clone + fmt::Debug + PartialEq + Sized + 'static {
    const ENTITY_NAME: &'static str;

    type Field: EntityField;

    fn to_fields(&self) -> BTreeMap<String, Value>;

    fn from_record(record: &Record) -> Result<Self>;

    fn to_record(&self, id: ObjectId) -> Record {
        Record::new(id, Self::ENTITY_NAME, self.to_fields())
    }
}

/// An entity value paired with the identity of the record it was read
/// from (or staged as). Mutate it through `DerefMut`, then stage the change
/// with `Context::update`.
#[derive(Debug, Clone, PartialEq)]
pub struct Stored<E: Entity> {
    id: ObjectId,
    entity: E,
}

impl<E: Entity> Stored<E> {
    pub(crate) fn new(id: ObjectId, entity: E) -> Self {
        Self { id, entity }
    }

    pub(crate) fn from_record(record: &Record) -> Result<Self> {
        Ok(Self::new(record.id, E::from_record(record)?))
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn entity(&self) -> &E {
        &self.entity
    }

    pub fn into_inner(self) -> E {
        self.entity
    }
}

impl<E: Entity> Deref for Stored<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.entity
    }
}

impl<E: Entity> DerefMut for Stored<E> {
    fn deref_mut(&mut self) -> &mut E {
        &mut self.entity
    }
}
