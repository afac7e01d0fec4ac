//! Everything an app screen usually needs, in one import.

pub use crate::apps::{DogWalkLog, FilterChoice, FilterRow, FilterScreen, HitList};
pub use crate::core::{DbError, ObjectId, Result, Value};
pub use crate::facade::{LifecycleEvent, PersistenceStack, StackConfig};
pub use crate::model::{
    Dog, DogField, Entity, Person, PersonField, PriceCategory, Stored, Venue, VenueField, Walk,
    WalkField,
};
pub use crate::query::{
    AggregateRequest, ExpressionDescription, FetchRequest, Predicate, SortDescriptor, count_where,
    fetch_all, sum_field,
};
pub use crate::storage::Context;
