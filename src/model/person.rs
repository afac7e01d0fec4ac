use super::{Entity, EntityField};
use crate::core::{DataType, Record, Result, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Person {
    pub name: String,
}

impl Person {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonField {
    Name,
}

impl EntityField for PersonField {
    fn key(&self) -> &'static str {
        match self {
            Self::Name => "name",
        }
    }

    fn data_type(&self) -> DataType {
        DataType::Text
    }
}

impl Entity for Person {
    const ENTITY_NAME: &'static str = "Person";

    type Field = PersonField;

    fn to_fields(&self) -> BTreeMap<String, Value> {
        let mut fields = BTreeMap::new();
        fields.insert(PersonField::Name.key().to_string(), Value::from(self.name.as_str()));
        fields
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            name: record.text(PersonField::Name.key())?,
        })
    }
}
