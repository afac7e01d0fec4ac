// ============================================================================
// MemoStack Library
// ============================================================================

pub mod apps;
pub mod core;
pub mod facade;
pub mod model;
pub mod prelude;
pub mod query;
pub mod storage;

// Re-export main types for convenience
pub use core::{DataType, DbError, ObjectId, Record, Result, Value};
pub use facade::{LifecycleEvent, PersistenceStack, StackConfig, StoreType};
pub use model::{Entity, EntityField, Stored};
pub use query::{FetchRequest, Predicate, SortDescriptor};
pub use storage::Context;

/// Opens an in-memory stack with a single context.
///
/// # Examples
///
/// ```
/// use memostack::model::{Person, PersonField};
/// use memostack::query::{Predicate, count_where};
///
/// # fn main() -> memostack::Result<()> {
/// let mut stack = memostack::open_in_memory("HitList");
/// let ctx = stack.context()?;
///
/// ctx.insert(Person::new("Ann"));
/// ctx.save()?;
///
/// let named_ann = Predicate::<Person>::equals(PersonField::Name, "Ann")?;
/// assert_eq!(count_where(ctx, &named_ann)?, 1);
/// # Ok(())
/// # }
/// ```
pub fn open_in_memory(store_name: &str) -> PersistenceStack {
    PersistenceStack::new(StackConfig::in_memory(store_name))
}
