// ============================================================================
// src/query/sort.rs - Sort Descriptors
// ============================================================================
//
// - Multi-descriptor sorting, compared left to right
// - Stable sort (records that compare equal keep store order)
// - NULLS LAST for ascending, NULLS FIRST for descending
//
// ============================================================================

use crate::core::{DbError, Record, Result};
use crate::model::{Entity, EntityField};
use std::cmp::Ordering;

// ============================================================================
// NULL HANDLING STRATEGY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullOrdering {
    /// NULL values appear first
    NullsFirst,
    /// NULL values appear last
    NullsLast,
}

impl NullOrdering {
    /// - ascending → NULLS LAST
    /// - descending → NULLS FIRST
    pub fn default_for_direction(ascending: bool) -> Self {
        if ascending {
            Self::NullsLast
        } else {
            Self::NullsFirst
        }
    }
}

// ============================================================================
// SORT DESCRIPTOR
// ============================================================================

/// A field plus a direction. Only fields whose type has an order can be
/// sorted on.
#[derive(Debug, Clone, PartialEq)]
pub struct SortDescriptor<E: Entity> {
    field: E::Field,
    ascending: bool,
    null_ordering: NullOrdering,
}

impl<E: Entity> SortDescriptor<E> {
    pub fn new(field: E::Field, ascending: bool) -> Result<Self> {
        let data_type = field.data_type();
        if !data_type.is_ordered() {
            return Err(DbError::TypeMismatch(format!(
                "{}.{} of type {} cannot be sorted",
                E::ENTITY_NAME,
                field.key(),
                data_type
            )));
        }

        Ok(Self {
            field,
            ascending,
            null_ordering: NullOrdering::default_for_direction(ascending),
        })
    }

    pub fn ascending(field: E::Field) -> Result<Self> {
        Self::new(field, true)
    }

    pub fn descending(field: E::Field) -> Result<Self> {
        Self::new(field, false)
    }

    pub fn with_null_ordering(mut self, null_ordering: NullOrdering) -> Self {
        self.null_ordering = null_ordering;
        self
    }

    pub fn field(&self) -> E::Field {
        self.field
    }

    pub fn is_ascending(&self) -> bool {
        self.ascending
    }

    pub fn null_ordering(&self) -> NullOrdering {
        self.null_ordering
    }

    /// NULL placement follows `null_ordering` regardless of direction;
    /// only non-NULL comparisons are reversed for descending order.
    fn compare(&self, a: &Record, b: &Record) -> Result<Ordering> {
        let key = self.field.key();
        let (a, b) = (a.get(key), b.get(key));

        let ordering = match (a.is_null(), b.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => match self.null_ordering {
                NullOrdering::NullsFirst => Ordering::Less,
                NullOrdering::NullsLast => Ordering::Greater,
            },
            (false, true) => match self.null_ordering {
                NullOrdering::NullsFirst => Ordering::Greater,
                NullOrdering::NullsLast => Ordering::Less,
            },
            (false, false) => {
                let ordering = a.compare(b)?;
                if self.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            }
        };
        Ok(ordering)
    }
}

// ============================================================================
// RECORD COMPARATOR
// ============================================================================

pub struct RecordComparator<'a, E: Entity> {
    descriptors: &'a [SortDescriptor<E>],
}

impl<'a, E: Entity> RecordComparator<'a, E> {
    pub fn new(descriptors: &'a [SortDescriptor<E>]) -> Self {
        Self { descriptors }
    }

    pub fn compare(&self, a: &Record, b: &Record) -> Result<Ordering> {
        for descriptor in self.descriptors {
            let ordering = descriptor.compare(a, b)?;

            if ordering != Ordering::Equal {
                return Ok(ordering);
            }
        }
        Ok(Ordering::Equal)
    }
}

/// Sorts records in place. Unlike a plain `sort_by`, a comparison failure is
/// reported instead of being treated as equality.
pub fn sort_records<E: Entity>(
    records: &mut [&Record],
    descriptors: &[SortDescriptor<E>],
) -> Result<()> {
    if records.len() < 2 || descriptors.is_empty() {
        return Ok(());
    }

    let comparator = RecordComparator::new(descriptors);
    let mut failure: Option<DbError> = None;

    records.sort_by(|a, b| match comparator.compare(a, b) {
        Ok(ordering) => ordering,
        Err(err) => {
            failure.get_or_insert(err);
            Ordering::Equal
        }
    });

    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
