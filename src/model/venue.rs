use super::{Entity, EntityField};
use crate::core::{DataType, DbError, Record, Result, Value};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum PriceCategory {
    #[default]
    Cheap,
    Moderate,
    Expensive,
}

impl PriceCategory {
    pub const ALL: [PriceCategory; 3] = [Self::Cheap, Self::Moderate, Self::Expensive];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cheap => "$",
            Self::Moderate => "$$",
            Self::Expensive => "$$$",
        }
    }

    pub fn parse(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.as_str() == symbol)
    }
}

impl fmt::Display for PriceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<PriceCategory> for Value {
    fn from(category: PriceCategory) -> Self {
        Value::Text(category.as_str().to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PriceInfo {
    pub price_category: PriceCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Location {
    /// Metres from the user.
    pub distance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Stats {
    pub tip_count: i64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Venue {
    pub name: String,
    pub price_info: PriceInfo,
    pub special_count: i64,
    pub location: Location,
    pub stats: Stats,
}

impl Venue {
    pub fn new(name: impl Into<String>, price_category: PriceCategory) -> Self {
        Self {
            name: name.into(),
            price_info: PriceInfo { price_category },
            ..Self::default()
        }
    }

    pub fn with_specials(mut self, special_count: i64) -> Self {
        self.special_count = special_count;
        self
    }

    pub fn with_distance(mut self, distance: f64) -> Self {
        self.location.distance = distance;
        self
    }

    pub fn with_tips(mut self, tip_count: i64) -> Self {
        self.stats.tip_count = tip_count;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VenueField {
    Name,
    PriceCategory,
    SpecialCount,
    Distance,
    TipCount,
}

impl EntityField for VenueField {
    fn key(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::PriceCategory => "priceInfo.priceCategory",
            Self::SpecialCount => "specialCount",
            Self::Distance => "location.distance",
            Self::TipCount => "stats.tipCount",
        }
    }

    fn data_type(&self) -> DataType {
        match self {
            Self::Name | Self::PriceCategory => DataType::Text,
            Self::SpecialCount | Self::TipCount => DataType::Integer,
            Self::Distance => DataType::Float,
        }
    }
}

impl Entity for Venue {
    const ENTITY_NAME: &'static str = "Venue";

    type Field = VenueField;

    fn to_fields(&self) -> BTreeMap<String, Value> {
        let mut fields = BTreeMap::new();
        fields.insert(VenueField::Name.key().to_string(), Value::from(self.name.as_str()));
        fields.insert(
            VenueField::PriceCategory.key().to_string(),
            Value::from(self.price_info.price_category),
        );
        fields.insert(
            VenueField::SpecialCount.key().to_string(),
            Value::Integer(self.special_count),
        );
        fields.insert(
            VenueField::Distance.key().to_string(),
            Value::Float(self.location.distance),
        );
        fields.insert(
            VenueField::TipCount.key().to_string(),
            Value::Integer(self.stats.tip_count),
        );
        fields
    }

    fn from_record(record: &Record) -> Result<Self> {
        let symbol = record.text(VenueField::PriceCategory.key())?;
        let price_category = PriceCategory::parse(&symbol).ok_or_else(|| {
            DbError::TypeMismatch(format!("Unknown price category '{}'", symbol))
        })?;

        Ok(Self {
            name: record.text(VenueField::Name.key())?,
            price_info: PriceInfo { price_category },
            special_count: record.integer(VenueField::SpecialCount.key())?,
            location: Location {
                distance: record.float(VenueField::Distance.key())?,
            },
            stats: Stats {
                tip_count: record.integer(VenueField::TipCount.key())?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ObjectId;

    #[test]
    fn test_price_category_symbols() {
        assert_eq!(PriceCategory::Moderate.as_str(), "$$");
        assert_eq!(PriceCategory::parse("$$$"), Some(PriceCategory::Expensive));
        assert_eq!(PriceCategory::parse("$$$$"), None);
    }

    #[test]
    fn test_nested_fields_use_key_paths() {
        let venue = Venue::new("Tapioca Express", PriceCategory::Moderate)
            .with_distance(320.0)
            .with_tips(4);
        let record = venue.to_record(ObjectId::new());

        assert_eq!(record.get("priceInfo.priceCategory"), &Value::from("$$"));
        assert_eq!(record.get("location.distance"), &Value::Float(320.0));
        assert_eq!(record.get("stats.tipCount"), &Value::Integer(4));
        assert_eq!(Venue::from_record(&record).unwrap(), venue);
    }

    #[test]
    fn test_unknown_price_category_is_rejected() {
        let mut record = Venue::default().to_record(ObjectId::new());
        record
            .fields
            .insert("priceInfo.priceCategory".to_string(), Value::from("€"));
        assert!(Venue::from_record(&record).is_err());
    }
}
