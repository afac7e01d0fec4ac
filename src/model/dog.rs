use super::{Entity, EntityField};
use crate::core::{DataType, ObjectId, Record, Result, Value};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// A dog and its walks, in the order they were logged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dog {
    pub name: String,
    pub walks: Vec<ObjectId>,
}

impl Dog {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            walks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DogField {
    Name,
    Walks,
}

impl EntityField for DogField {
    fn key(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Walks => "walks",
        }
    }

    fn data_type(&self) -> DataType {
        match self {
            Self::Name => DataType::Text,
            Self::Walks => DataType::ReferenceList,
        }
    }
}

impl Entity for Dog {
    const ENTITY_NAME: &'static str = "Dog";

    type Field = DogField;

    fn to_fields(&self) -> BTreeMap<String, Value> {
        let mut fields = BTreeMap::new();
        fields.insert(DogField::Name.key().to_string(), Value::from(self.name.as_str()));
        fields.insert(
            DogField::Walks.key().to_string(),
            Value::ReferenceList(self.walks.clone()),
        );
        fields
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            name: record.text(DogField::Name.key())?,
            walks: record.references(DogField::Walks.key())?,
        })
    }
}

/// One logged walk. `dog` points back at the owning [`Dog`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Walk {
    pub date: Option<DateTime<Utc>>,
    pub dog: Option<ObjectId>,
}

impl Walk {
    pub fn at(date: DateTime<Utc>) -> Self {
        Self {
            date: Some(date),
            dog: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkField {
    Date,
    Dog,
}

impl EntityField for WalkField {
    fn key(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Dog => "dog",
        }
    }

    fn data_type(&self) -> DataType {
        match self {
            Self::Date => DataType::Timestamp,
            Self::Dog => DataType::Reference,
        }
    }
}

impl Entity for Walk {
    const ENTITY_NAME: &'static str = "Walk";

    type Field = WalkField;

    fn to_fields(&self) -> BTreeMap<String, Value> {
        let mut fields = BTreeMap::new();
        fields.insert(WalkField::Date.key().to_string(), Value::from(self.date));
        fields.insert(WalkField::Dog.key().to_string(), Value::from(self.dog));
        fields
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            date: record.timestamp(WalkField::Date.key())?,
            dog: record.reference(WalkField::Dog.key())?,
        })
    }
}
