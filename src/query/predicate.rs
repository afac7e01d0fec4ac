use crate::core::{DbError, Record, Result, Value};
use crate::model::{Entity, EntityField};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }

    fn is_ordering(&self) -> bool {
        !matches!(self, Self::Eq | Self::Ne)
    }

    fn matches(&self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Lte => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Gte => ordering != Ordering::Less,
        }
    }
}

///
/// Comparison
///
/// One type-checked `field op value` leaf. Only [`Predicate::compare`] and
/// its shorthands build one.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Comparison<E: Entity> {
    field: E::Field,
    op: CompareOp,
    value: Value,
}

impl<E: Entity> Comparison<E> {
    pub fn field(&self) -> E::Field {
        self.field
    }

    pub fn op(&self) -> CompareOp {
        self.op
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    fn evaluate(&self, record: &Record) -> Result<bool> {
        let Self { field, op, value } = self;
        let actual = record.get(field.key());
        match (actual.is_null(), value.is_null()) {
            (true, true) => Ok(*op == CompareOp::Eq),
            (true, false) | (false, true) => Ok(*op == CompareOp::Ne),
            (false, false) => {
                if let (Value::ReferenceList(a), Value::ReferenceList(b)) = (actual, value) {
                    return Ok(op.matches(if a == b {
                        Ordering::Equal
                    } else {
                        Ordering::Less
                    }));
                }
                Ok(op.matches(actual.compare(value)?))
            }
        }
    }
}

impl<E: Entity> fmt::Display for Comparison<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field.key(), self.op.symbol(), self.value)
    }
}

///
/// Predicate
///
/// Boolean condition over the typed fields of one entity. Comparison leaves
/// are checked against the field's declared type when they are built, so an
/// evaluated predicate never compares incompatible values.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate<E: Entity> {
    True,
    Compare(Comparison<E>),
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
}

impl<E: Entity> Predicate<E> {
    pub fn compare(field: E::Field, op: CompareOp, value: impl Into<Value>) -> Result<Self> {
        let value = value.into();
        let data_type = field.data_type();

        if value.is_null() {
            if op.is_ordering() {
                return Err(DbError::TypeMismatch(format!(
                    "{}.{} {} NULL is not a valid comparison",
                    E::ENTITY_NAME,
                    field.key(),
                    op.symbol()
                )));
            }
        } else if !data_type.is_compatible(&value) {
            return Err(DbError::TypeMismatch(format!(
                "{}.{} is {}, cannot compare with {}",
                E::ENTITY_NAME,
                field.key(),
                data_type,
                value.type_name()
            )));
        }

        if op.is_ordering() && !data_type.is_ordered() {
            return Err(DbError::TypeMismatch(format!(
                "{}.{} of type {} does not support '{}'",
                E::ENTITY_NAME,
                field.key(),
                data_type,
                op.symbol()
            )));
        }

        Ok(Self::Compare(Comparison { field, op, value }))
    }

    pub fn equals(field: E::Field, value: impl Into<Value>) -> Result<Self> {
        Self::compare(field, CompareOp::Eq, value)
    }

    pub fn not_equals(field: E::Field, value: impl Into<Value>) -> Result<Self> {
        Self::compare(field, CompareOp::Ne, value)
    }

    pub fn less_than(field: E::Field, value: impl Into<Value>) -> Result<Self> {
        Self::compare(field, CompareOp::Lt, value)
    }

    pub fn less_or_equal(field: E::Field, value: impl Into<Value>) -> Result<Self> {
        Self::compare(field, CompareOp::Lte, value)
    }

    pub fn greater_than(field: E::Field, value: impl Into<Value>) -> Result<Self> {
        Self::compare(field, CompareOp::Gt, value)
    }

    pub fn greater_or_equal(field: E::Field, value: impl Into<Value>) -> Result<Self> {
        Self::compare(field, CompareOp::Gte, value)
    }

    pub fn all(predicates: Vec<Self>) -> Self {
        Self::And(predicates)
    }

    pub fn any(predicates: Vec<Self>) -> Self {
        Self::Or(predicates)
    }

    pub fn evaluate(&self, record: &Record) -> Result<bool> {
        match self {
            Self::True => Ok(true),
            Self::Compare(comparison) => comparison.evaluate(record),
            Self::And(predicates) => {
                for predicate in predicates {
                    if !predicate.evaluate(record)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Or(predicates) => {
                for predicate in predicates {
                    if predicate.evaluate(record)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::Not(inner) => Ok(!inner.evaluate(record)?),
        }
    }
}

impl<E: Entity> Default for Predicate<E> {
    fn default() -> Self {
        Self::True
    }
}

impl<E: Entity> BitAnd for Predicate<E> {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        match self {
            Self::And(mut predicates) => {
                predicates.push(rhs);
                Self::And(predicates)
            }
            lhs => Self::And(vec![lhs, rhs]),
        }
    }
}

impl<E: Entity> BitOr for Predicate<E> {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        match self {
            Self::Or(mut predicates) => {
                predicates.push(rhs);
                Self::Or(predicates)
            }
            lhs => Self::Or(vec![lhs, rhs]),
        }
    }
}

impl<E: Entity> Not for Predicate<E> {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other)),
        }
    }
}

impl<E: Entity> fmt::Display for Predicate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join<E: Entity>(
            f: &mut fmt::Formatter<'_>,
            predicates: &[Predicate<E>],
            separator: &str,
        ) -> fmt::Result {
            write!(f, "(")?;
            for (i, predicate) in predicates.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", separator)?;
                }
                write!(f, "{}", predicate)?;
            }
            write!(f, ")")
        }

        match self {
            Self::True => write!(f, "TRUEPREDICATE"),
            Self::Compare(comparison) => write!(f, "{}", comparison),
            Self::And(predicates) => join(f, predicates, "AND"),
            Self::Or(predicates) => join(f, predicates, "OR"),
            Self::Not(inner) => write!(f, "NOT {}", inner),
        }
    }
}
