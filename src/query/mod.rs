// ============================================================================
// Query / Command Layer
// ============================================================================
//
// Typed predicates, sort descriptors and requests, plus the generic
// operations every screen is built from. These propagate errors; the app
// modules decide whether to log and carry on.
//
// ============================================================================

pub mod predicate;
pub mod request;
pub mod sort;

pub use predicate::{CompareOp, Comparison, Predicate};
pub use request::{
    AggregateFunction, AggregateRequest, AggregateResult, ExpressionDescription, FetchRequest,
};
pub use sort::{NullOrdering, RecordComparator, SortDescriptor, sort_records};

use crate::core::{Result, Value};
use crate::model::{Entity, Stored};
use crate::storage::Context;

/// Count-only fetch of the committed records matching `predicate`.
pub fn count_where<E: Entity>(ctx: &Context, predicate: &Predicate<E>) -> Result<usize> {
    ctx.count(&FetchRequest::new().filter(predicate.clone()))
}

/// Sum of `field` over every committed record of `E`.
pub fn sum_field<E: Entity>(ctx: &Context, field: E::Field) -> Result<Value> {
    const NAME: &str = "sum";
    let request = AggregateRequest::<E>::new(vec![ExpressionDescription::<E>::sum(NAME, field)?]);
    let mut result = ctx.aggregate(&request)?;
    Ok(result.remove(NAME).unwrap_or(Value::Null))
}

pub fn fetch_all<E: Entity>(
    ctx: &Context,
    predicate: Option<&Predicate<E>>,
    sort: Option<&SortDescriptor<E>>,
) -> Result<Vec<Stored<E>>> {
    let mut request = FetchRequest::new().filter_opt(predicate.cloned());
    if let Some(sort) = sort {
        request = request.sort_by(sort.clone());
    }
    ctx.fetch(&request)
}

/// Stages a new record; it is visible to queries once the context is saved.
pub fn insert<E: Entity>(ctx: &mut Context, entity: E) -> Stored<E> {
    ctx.insert(entity)
}

/// Stages removal of `object`; committed by the next save.
pub fn delete<E: Entity>(ctx: &mut Context, object: &Stored<E>) {
    ctx.delete(object)
}
