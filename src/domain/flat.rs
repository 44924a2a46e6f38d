// src/domain/flat.rs

use crate::domain::identity::listing_id;
use crate::domain::listing::{Feature, FeatureFlags, ListingRecord, MarketType, BATCH_COLUMNS};
use rusqlite::types::Value;

/// A `ListingRecord` enriched with the columns only the store carries.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRow {
    pub id: i64,
    pub record: ListingRecord,
    pub rent_per_sq_m: Option<f64>,
    pub features: FeatureFlags,
    pub is_primary: Option<bool>,
    pub date_scraped: Option<String>,
}

impl FlatRow {
    pub fn from_record(record: ListingRecord, date_scraped: Option<&str>) -> Self {
        let rent_per_sq_m = match (record.rent, record.area) {
            (Some(rent), Some(area)) if area > 0.0 => Some(rent / area),
            _ => None,
        };

        Self {
            id: listing_id(&record.url),
            rent_per_sq_m,
            features: record.features(),
            is_primary: record.market_type.map(|m| m == MarketType::Primary),
            date_scraped: date_scraped.map(str::to_string),
            record,
        }
    }

    /// Column names in the order of `values()`.
    pub fn columns() -> Vec<&'static str> {
        let mut cols = vec!["id"];
        cols.extend(BATCH_COLUMNS);
        cols.push("rent_per_sq_m");
        cols.extend(Feature::ALL.iter().map(|f| f.column()));
        cols.push("is_primary");
        cols.push("date_scraped");
        cols
    }

    pub fn values(&self) -> Vec<Value> {
        let r = &self.record;
        let mut values = vec![
            Value::Integer(self.id),
            real(r.price),
            real(r.rent),
            real(r.area),
            text(r.extras.as_deref()),
            real(r.price_per_sq_m),
            integer(r.no_rooms),
            text(r.market_type.map(|m| m.as_str())),
            text(r.building_type.as_deref()),
            integer(r.no_floor),
            integer(r.building_floors_num),
            text(r.windows_type.as_deref()),
            text(r.construction_status.as_deref()),
            text(r.building_ownership.as_deref()),
            real(r.lat),
            real(r.long),
            Value::Text(r.district.clone()),
            integer(r.built_year),
            Value::Text(r.url.clone()),
            real(self.rent_per_sq_m),
        ];
        values.extend(self.features.iter().map(|(_, flag)| flag_value(flag)));
        values.push(flag_value(self.is_primary));
        values.push(text(self.date_scraped.as_deref()));
        values
    }
}

fn real(v: Option<f64>) -> Value {
    v.map_or(Value::Null, Value::Real)
}

fn integer(v: Option<i64>) -> Value {
    v.map_or(Value::Null, Value::Integer)
}

fn text(v: Option<&str>) -> Value {
    v.map_or(Value::Null, |s| Value::Text(s.to_string()))
}

fn flag_value(v: Option<bool>) -> Value {
    v.map_or(Value::Null, |b| Value::Integer(b as i64))
}
