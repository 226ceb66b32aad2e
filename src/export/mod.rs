//! Renders the final record sequence for export collaborators.
//!
//! The engine performs no file I/O. It hands collaborators two in-memory
//! shapes: row-oriented cells for CSV-like artifacts and a flat, null-safe
//! JSON array for structured ones. Field order is the fixed schema order
//! in both.

use crate::schema::{FieldName, PropertyRecord};
use serde_json::Value;

/// Column headers in fixed schema order.
pub fn header() -> [&'static str; FieldName::COUNT] {
    let mut names = [""; FieldName::COUNT];
    for (i, field) in FieldName::ALL.iter().enumerate() {
        names[i] = field.as_str();
    }
    names
}

/// One row of flat cells per record, schema order, empty cell for null.
pub fn record_rows(records: &[PropertyRecord]) -> Vec<Vec<String>> {
    records
        .iter()
        .map(|record| record.iter().map(|(_, value)| value.to_cell()).collect())
        .collect()
}

/// Records as a JSON array of flat objects, nulls preserved.
pub fn records_json(records: &[PropertyRecord]) -> Value {
    serde_json::to_value(records).unwrap_or(Value::Array(Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldValue, PropertyRecord};
    use assert_json_diff::assert_json_include;
    use serde_json::json;

    fn sample() -> PropertyRecord {
        let mut record = PropertyRecord::new();
        record.set(
            FieldName::PropertyAddress,
            FieldValue::Text("123 Main St".into()),
        );
        record.set(FieldName::ParcelId, FieldValue::Text("00-11-22".into()));
        record.set(FieldName::PropertyValue, FieldValue::Money(450000.0));
        record.set(FieldName::Bathrooms, FieldValue::Count(2.5));
        record
    }

    #[test]
    fn header_follows_schema_order() {
        let header = header();
        assert_eq!(header[0], "property_address");
        assert_eq!(header[7], "parcel_id");
        assert_eq!(header[17], "record_url");
    }

    #[test]
    fn rows_are_fixed_width_and_null_safe() {
        let rows = record_rows(&[sample()]);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.len(), FieldName::COUNT);
        assert_eq!(row[0], "123 Main St");
        assert_eq!(row[2], "450000");
        assert_eq!(row[13], "2.5");
        // Unset owner renders as an empty cell, not a missing column.
        assert_eq!(row[1], "");
    }

    #[test]
    fn json_objects_are_flat_with_nulls() {
        let value = records_json(&[sample()]);
        assert_json_include!(
            actual: value,
            expected: json!([{
                "property_address": "123 Main St",
                "parcel_id": "00-11-22",
                "property_value": 450000.0,
                "bathrooms": 2.5,
                "owner_name": null,
            }])
        );
        let first = &value[0];
        assert_eq!(first.as_object().unwrap().len(), FieldName::COUNT);
    }
}
