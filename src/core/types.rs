use super::{DbError, Result, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

static NULL_VALUE: Value = Value::Null;

// ============================================================================
// Data Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Integer,
    Float,
    Text,
    Boolean,
    Timestamp,
    Reference,
    ReferenceList,
}

impl DataType {
    pub fn is_compatible(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Integer, Value::Integer(_)) => true,
            (Self::Float, Value::Float(_)) => true,
            (Self::Float, Value::Integer(_)) => true, // Integer widens to Float
            (Self::Integer, Value::Float(_)) => true, // compared numerically
            (Self::Text, Value::Text(_)) => true,
            (Self::Boolean, Value::Boolean(_)) => true,
            (Self::Timestamp, Value::Timestamp(_)) => true,
            (Self::Reference, Value::Reference(_)) => true,
            (Self::ReferenceList, Value::ReferenceList(_)) => true,
            _ => false,
        }
    }

    /// Whether `<`, `<=`, `>` and `>=` are meaningful for this type.
    pub fn is_ordered(&self) -> bool {
        matches!(
            self,
            Self::Integer | Self::Float | Self::Text | Self::Timestamp
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "INTEGER"),
            Self::Float => write!(f, "FLOAT"),
            Self::Text => write!(f, "TEXT"),
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Timestamp => write!(f, "TIMESTAMP"),
            Self::Reference => write!(f, "REFERENCE"),
            Self::ReferenceList => write!(f, "REFERENCE LIST"),
        }
    }
}

// ============================================================================
// Object Identity
// ============================================================================

/// Store-wide identity of a record, assigned once at insert time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(Uuid);

impl ObjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Record
// ============================================================================

/// Untyped stored form of an entity: its identity, entity name and
/// attribute values keyed by key path (`"location.distance"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: ObjectId,
    pub entity: String,
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(id: ObjectId, entity: impl Into<String>, fields: BTreeMap<String, Value>) -> Self {
        Self {
            id,
            entity: entity.into(),
            fields,
        }
    }

    /// Missing attributes read as NULL.
    pub fn get(&self, key: &str) -> &Value {
        self.fields.get(key).unwrap_or(&NULL_VALUE)
    }

    pub fn text(&self, key: &str) -> Result<String> {
        match self.get(key) {
            Value::Text(s) => Ok(s.clone()),
            Value::Null => Ok(String::new()),
            other => Err(self.mismatch(key, DataType::Text, other)),
        }
    }

    pub fn integer(&self, key: &str) -> Result<i64> {
        match self.get(key) {
            Value::Null => Ok(0),
            other => other
                .as_i64()
                .ok_or_else(|| self.mismatch(key, DataType::Integer, other)),
        }
    }

    pub fn float(&self, key: &str) -> Result<f64> {
        match self.get(key) {
            Value::Null => Ok(0.0),
            other => other
                .as_f64()
                .ok_or_else(|| self.mismatch(key, DataType::Float, other)),
        }
    }

    pub fn timestamp(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        match self.get(key) {
            Value::Null => Ok(None),
            Value::Timestamp(ts) => Ok(Some(*ts)),
            other => Err(self.mismatch(key, DataType::Timestamp, other)),
        }
    }

    pub fn reference(&self, key: &str) -> Result<Option<ObjectId>> {
        match self.get(key) {
            Value::Null => Ok(None),
            Value::Reference(id) => Ok(Some(*id)),
            other => Err(self.mismatch(key, DataType::Reference, other)),
        }
    }

    pub fn references(&self, key: &str) -> Result<Vec<ObjectId>> {
        match self.get(key) {
            Value::Null => Ok(Vec::new()),
            Value::ReferenceList(ids) => Ok(ids.clone()),
            other => Err(self.mismatch(key, DataType::ReferenceList, other)),
        }
    }

    /// Removes every reference to `target`; returns whether the record changed.
    pub(crate) fn nullify_references_to(&mut self, target: ObjectId) -> bool {
        let mut changed = false;
        for value in self.fields.values_mut() {
            changed |= value.nullify_reference(target);
        }
        changed
    }

    fn mismatch(&self, key: &str, expected: DataType, got: &Value) -> DbError {
        DbError::TypeMismatch(format!(
            "{}.{} expects type {}, got {}",
            self.entity,
            key,
            expected,
            got.type_name()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn venue_record() -> Record {
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), Value::from("Boba Bar"));
        fields.insert("location.distance".to_string(), Value::Float(120.5));
        Record::new(ObjectId::new(), "Venue", fields)
    }

    #[test]
    fn test_missing_field_reads_as_null() {
        let record = venue_record();
        assert!(record.get("stats.tipCount").is_null());
        assert_eq!(record.integer("stats.tipCount").unwrap(), 0);
    }

    #[test]
    fn test_typed_accessors() {
        let record = venue_record();
        assert_eq!(record.text("name").unwrap(), "Boba Bar");
        assert_eq!(record.float("location.distance").unwrap(), 120.5);
    }

    #[test]
    fn test_accessor_type_mismatch() {
        let record = venue_record();
        let err = record.timestamp("name").unwrap_err();
        assert!(matches!(err, DbError::TypeMismatch(_)));
    }

    #[test]
    fn test_type_compatibility() {
        assert!(DataType::Integer.is_compatible(&Value::Integer(42)));
        assert!(DataType::Integer.is_compatible(&Value::Null));
        assert!(!DataType::Integer.is_compatible(&Value::Text("hello".into())));
        assert!(DataType::Float.is_compatible(&Value::Integer(500)));
        assert!(!DataType::Boolean.is_ordered());
    }
}
