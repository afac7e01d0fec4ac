use super::{Predicate, SortDescriptor};
use crate::core::{DbError, Record, Result, Value};
use crate::model::{Entity, EntityField};
use std::collections::BTreeMap;

// ============================================================================
// Fetch Request
// ============================================================================

/// What to fetch: an optional predicate, sort descriptors, and paging.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest<E: Entity> {
    pub predicate: Option<Predicate<E>>,
    pub sort_descriptors: Vec<SortDescriptor<E>>,
    pub fetch_limit: Option<usize>,
    pub fetch_offset: usize,
}

impl<E: Entity> FetchRequest<E> {
    pub fn new() -> Self {
        Self {
            predicate: None,
            sort_descriptors: Vec::new(),
            fetch_limit: None,
            fetch_offset: 0,
        }
    }

    pub fn filter(mut self, predicate: Predicate<E>) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn filter_opt(mut self, predicate: Option<Predicate<E>>) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn sort_by(mut self, descriptor: SortDescriptor<E>) -> Self {
        self.sort_descriptors.push(descriptor);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.fetch_limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.fetch_offset = offset;
        self
    }

    pub(crate) fn matches(&self, record: &Record) -> Result<bool> {
        match &self.predicate {
            Some(predicate) => predicate.evaluate(record),
            None => Ok(true),
        }
    }
}

impl<E: Entity> Default for FetchRequest<E> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Aggregates
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Sum,
    Average,
    Min,
    Max,
    Count,
}

impl AggregateFunction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sum => "sum:",
            Self::Average => "average:",
            Self::Min => "min:",
            Self::Max => "max:",
            Self::Count => "count:",
        }
    }
}

/// A named aggregate over one field, e.g. `sumDeals = sum:(specialCount)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionDescription<E: Entity> {
    pub name: String,
    pub function: AggregateFunction,
    pub field: E::Field,
}

impl<E: Entity> ExpressionDescription<E> {
    pub fn new(name: impl Into<String>, function: AggregateFunction, field: E::Field) -> Result<Self> {
        let data_type = field.data_type();
        let supported = match function {
            AggregateFunction::Sum | AggregateFunction::Average => data_type.is_numeric(),
            AggregateFunction::Min | AggregateFunction::Max => data_type.is_ordered(),
            AggregateFunction::Count => true,
        };
        if !supported {
            return Err(DbError::TypeMismatch(format!(
                "{}({}.{}) is not defined for {}",
                function.name(),
                E::ENTITY_NAME,
                field.key(),
                data_type
            )));
        }

        Ok(Self {
            name: name.into(),
            function,
            field,
        })
    }

    pub fn sum(name: impl Into<String>, field: E::Field) -> Result<Self> {
        Self::new(name, AggregateFunction::Sum, field)
    }

    /// NULL attributes are skipped. Sums over an empty set are zero; the
    /// other functions yield NULL, except `Count` which yields 0.
    pub(crate) fn evaluate(&self, records: &[&Record]) -> Result<Value> {
        let key = self.field.key();
        let values: Vec<&Value> = records
            .iter()
            .map(|record| record.get(key))
            .filter(|value| !value.is_null())
            .collect();

        match self.function {
            AggregateFunction::Count => Ok(Value::Integer(values.len() as i64)),
            AggregateFunction::Sum => self.sum_values(&values),
            AggregateFunction::Average => {
                if values.is_empty() {
                    return Ok(Value::Null);
                }
                let total: f64 = values.iter().filter_map(|v| v.as_f64()).sum();
                Ok(Value::Float(total / values.len() as f64))
            }
            AggregateFunction::Min | AggregateFunction::Max => {
                let mut best: Option<&Value> = None;
                for value in values {
                    best = match best {
                        None => Some(value),
                        Some(current) => {
                            let ordering = value.compare(current)?;
                            let replace = match self.function {
                                AggregateFunction::Min => ordering.is_lt(),
                                _ => ordering.is_gt(),
                            };
                            Some(if replace { value } else { current })
                        }
                    };
                }
                Ok(best.cloned().unwrap_or(Value::Null))
            }
        }
    }

    fn sum_values(&self, values: &[&Value]) -> Result<Value> {
        if self.field.data_type() == crate::core::DataType::Integer {
            let mut total: i64 = 0;
            for value in values {
                let n = value.as_i64().ok_or_else(|| self.not_numeric(value))?;
                total = total.checked_add(n).ok_or_else(|| {
                    DbError::FetchError(format!("{} overflowed", self.name))
                })?;
            }
            Ok(Value::Integer(total))
        } else {
            let mut total = 0.0;
            for value in values {
                total += value.as_f64().ok_or_else(|| self.not_numeric(value))?;
            }
            Ok(Value::Float(total))
        }
    }

    fn not_numeric(&self, value: &Value) -> DbError {
        DbError::TypeMismatch(format!(
            "{} expects numbers in {}, found {}",
            self.name,
            self.field.key(),
            value.type_name()
        ))
    }
}

/// Aggregate results keyed by expression name.
pub type AggregateResult = BTreeMap<String, Value>;

/// A dictionary-result fetch: aggregates over the records matching an
/// optional predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRequest<E: Entity> {
    pub predicate: Option<Predicate<E>>,
    pub expressions: Vec<ExpressionDescription<E>>,
}

impl<E: Entity> AggregateRequest<E> {
    pub fn new(expressions: Vec<ExpressionDescription<E>>) -> Self {
        Self {
            predicate: None,
            expressions,
        }
    }

    pub fn filter(mut self, predicate: Predicate<E>) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub(crate) fn matches(&self, record: &Record) -> Result<bool> {
        match &self.predicate {
            Some(predicate) => predicate.evaluate(record),
            None => Ok(true),
        }
    }

    pub(crate) fn evaluate(&self, records: &[&Record]) -> Result<AggregateResult> {
        let mut result = AggregateResult::new();
        for expression in &self.expressions {
            result.insert(expression.name.clone(), expression.evaluate(records)?);
        }
        Ok(result)
    }
}
