//! The canonical 18-field record schema and its configuration table.
//!
//! Every record, whatever page layout it came from, is mapped into the same
//! fixed-width shape. Field recognition is driven by a configuration table
//! ([`field_specs`]) rather than per-field types: a new field is added by
//! appending a spec entry.

pub mod labels;
pub mod normalize;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

// ─── Field names ──────────────────────────────────────────────────────────────

/// The canonical output fields, in fixed export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FieldName {
    PropertyAddress = 0,
    OwnerName = 1,
    PropertyValue = 2,
    AssessedValue = 3,
    MarketValue = 4,
    SquareFootage = 5,
    PropertyType = 6,
    ParcelId = 7,
    SalePrice = 8,
    SaleDate = 9,
    YearBuilt = 10,
    LotSize = 11,
    Bedrooms = 12,
    Bathrooms = 13,
    Municipality = 14,
    Zoning = 15,
    TaxAmount = 16,
    RecordUrl = 17,
}

impl FieldName {
    /// Total number of fields in the schema.
    pub const COUNT: usize = 18;

    /// All fields in fixed schema order.
    pub const ALL: [FieldName; Self::COUNT] = [
        Self::PropertyAddress,
        Self::OwnerName,
        Self::PropertyValue,
        Self::AssessedValue,
        Self::MarketValue,
        Self::SquareFootage,
        Self::PropertyType,
        Self::ParcelId,
        Self::SalePrice,
        Self::SaleDate,
        Self::YearBuilt,
        Self::LotSize,
        Self::Bedrooms,
        Self::Bathrooms,
        Self::Municipality,
        Self::Zoning,
        Self::TaxAmount,
        Self::RecordUrl,
    ];

    /// Snake-case field name as it appears in exported artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PropertyAddress => "property_address",
            Self::OwnerName => "owner_name",
            Self::PropertyValue => "property_value",
            Self::AssessedValue => "assessed_value",
            Self::MarketValue => "market_value",
            Self::SquareFootage => "square_footage",
            Self::PropertyType => "property_type",
            Self::ParcelId => "parcel_id",
            Self::SalePrice => "sale_price",
            Self::SaleDate => "sale_date",
            Self::YearBuilt => "year_built",
            Self::LotSize => "lot_size",
            Self::Bedrooms => "bedrooms",
            Self::Bathrooms => "bathrooms",
            Self::Municipality => "municipality",
            Self::Zoning => "zoning",
            Self::TaxAmount => "tax_amount",
            Self::RecordUrl => "record_url",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Field values ─────────────────────────────────────────────────────────────

/// Unit tag for area-like fields, inferred from trailing label text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AreaUnit {
    SquareFeet,
    Acres,
}

impl fmt::Display for AreaUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SquareFeet => f.write_str("sq ft"),
            Self::Acres => f.write_str("ac"),
        }
    }
}

/// One normalized field value. Unset fields are `Null`, never absent —
/// the schema is fixed-width.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    /// Free text, or the raw trimmed fallback when normalization failed.
    Text(String),
    /// Monetary amount in plain decimal form (symbols and separators gone).
    Money(f64),
    /// Integer-like count; fractional values ("2.5" bathrooms) preserved.
    Count(f64),
    /// Four-digit year.
    Year(i32),
    /// Canonical calendar date.
    Date(chrono::NaiveDate),
    /// Area with its inferred unit.
    Area { value: f64, unit: AreaUnit },
    /// Resolved hyperlink.
    Url(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Render as a flat cell for row-oriented export. `Null` renders empty.
    pub fn to_cell(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Text(s) | Self::Url(s) => s.clone(),
            Self::Money(v) | Self::Count(v) => format_number(*v),
            Self::Year(y) => y.to_string(),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::Area { value, unit } => format!("{} {unit}", format_number(*value)),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Text(s) | Self::Url(s) => serializer.serialize_str(s),
            Self::Money(v) | Self::Count(v) => serializer.serialize_f64(*v),
            Self::Year(y) => serializer.serialize_i32(*y),
            Self::Date(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
            // Areas stay flat in exports: value plus unit suffix in one string.
            Self::Area { .. } => serializer.serialize_str(&self.to_cell()),
        }
    }
}

/// Trim a trailing `.0` so whole-number amounts export as integers.
fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

// ─── Property records ─────────────────────────────────────────────────────────

/// One extracted record: a fixed-width mapping from field name to value.
///
/// Immutable once the field mapper hands it over. Validity requires a
/// non-empty `parcel_id` or `property_address`.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRecord {
    values: [FieldValue; FieldName::COUNT],
}

impl PropertyRecord {
    pub fn new() -> Self {
        Self {
            values: std::array::from_fn(|_| FieldValue::Null),
        }
    }

    pub fn get(&self, field: FieldName) -> &FieldValue {
        &self.values[field as usize]
    }

    pub fn set(&mut self, field: FieldName, value: FieldValue) {
        self.values[field as usize] = value;
    }

    /// Iterate `(field, value)` pairs in fixed schema order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldName, &FieldValue)> {
        FieldName::ALL.iter().map(|f| (*f, self.get(*f)))
    }

    /// Text content of a field, empty string when null or non-textual.
    pub fn text(&self, field: FieldName) -> &str {
        match self.get(field) {
            FieldValue::Text(s) | FieldValue::Url(s) => s.as_str(),
            _ => "",
        }
    }

    /// A record is valid when at least one key field is present.
    pub fn has_key_field(&self) -> bool {
        !self.text(FieldName::ParcelId).trim().is_empty()
            || !self.text(FieldName::PropertyAddress).trim().is_empty()
    }
}

impl Default for PropertyRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for PropertyRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FieldName::COUNT))?;
        for (field, value) in self.iter() {
            map.serialize_entry(field.as_str(), value)?;
        }
        map.end()
    }
}

// ─── Field specification table ────────────────────────────────────────────────

/// Which normalizer a field's raw values run through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizerKind {
    Text,
    Currency,
    Date,
    Area,
    Count,
    Year,
    Url,
}

/// One entry of the recognition table: a field, the labels that announce it
/// in markup, and the normalizer for its values.
///
/// `primary` labels are matched in both strict and fuzzy modes; `aliases`
/// (abbreviations, portal-specific jargon) only in fuzzy mode.
pub struct FieldSpec {
    pub name: FieldName,
    pub primary: &'static [&'static str],
    pub aliases: &'static [&'static str],
    pub kind: NormalizerKind,
}

/// The full recognition table, defined once at process start.
pub fn field_specs() -> &'static [FieldSpec; FieldName::COUNT] {
    static SPECS: [FieldSpec; FieldName::COUNT] = [
        FieldSpec {
            name: FieldName::PropertyAddress,
            primary: &["property address", "address"],
            aliases: &["site address", "property location", "situs", "location", "street"],
            kind: NormalizerKind::Text,
        },
        FieldSpec {
            name: FieldName::OwnerName,
            primary: &["owner name", "owner"],
            aliases: &["taxpayer name", "taxpayer", "name"],
            kind: NormalizerKind::Text,
        },
        FieldSpec {
            name: FieldName::PropertyValue,
            primary: &["property value", "total value"],
            aliases: &["just value", "appraised value", "value"],
            kind: NormalizerKind::Currency,
        },
        FieldSpec {
            name: FieldName::AssessedValue,
            primary: &["assessed value"],
            aliases: &["assessed", "assessment"],
            kind: NormalizerKind::Currency,
        },
        FieldSpec {
            name: FieldName::MarketValue,
            primary: &["market value"],
            aliases: &["fair market", "market"],
            kind: NormalizerKind::Currency,
        },
        FieldSpec {
            name: FieldName::SquareFootage,
            primary: &["square footage", "square feet"],
            aliases: &["bldg sqft", "building area", "living area", "sq ft", "sqft", "footage"],
            kind: NormalizerKind::Area,
        },
        FieldSpec {
            name: FieldName::PropertyType,
            primary: &["property type"],
            aliases: &["property use", "classification", "type", "use"],
            kind: NormalizerKind::Text,
        },
        FieldSpec {
            name: FieldName::ParcelId,
            primary: &["parcel id", "parcel number", "parcel"],
            aliases: &["pcn", "folio", "account number", "account"],
            kind: NormalizerKind::Text,
        },
        FieldSpec {
            name: FieldName::SalePrice,
            primary: &["sale price"],
            aliases: &["last sale", "sold", "sale", "price"],
            kind: NormalizerKind::Currency,
        },
        FieldSpec {
            name: FieldName::SaleDate,
            primary: &["sale date"],
            aliases: &["last sale date", "sold date", "date"],
            kind: NormalizerKind::Date,
        },
        FieldSpec {
            name: FieldName::YearBuilt,
            primary: &["year built"],
            aliases: &["year constructed", "built", "construction"],
            kind: NormalizerKind::Year,
        },
        FieldSpec {
            name: FieldName::LotSize,
            primary: &["lot size"],
            aliases: &["lot area", "lot sqft", "land sqft", "acreage", "acres", "lot", "land"],
            kind: NormalizerKind::Area,
        },
        FieldSpec {
            name: FieldName::Bedrooms,
            primary: &["bedrooms"],
            aliases: &["bedroom", "beds", "bed", "br"],
            kind: NormalizerKind::Count,
        },
        FieldSpec {
            name: FieldName::Bathrooms,
            primary: &["bathrooms"],
            aliases: &["bathroom", "full baths", "baths", "bath", "ba"],
            kind: NormalizerKind::Count,
        },
        FieldSpec {
            name: FieldName::Municipality,
            primary: &["municipality"],
            aliases: &["jurisdiction", "city"],
            kind: NormalizerKind::Text,
        },
        FieldSpec {
            name: FieldName::Zoning,
            primary: &["zoning"],
            aliases: &["zone"],
            kind: NormalizerKind::Text,
        },
        FieldSpec {
            name: FieldName::TaxAmount,
            primary: &["tax amount"],
            aliases: &["annual tax", "taxes", "tax"],
            kind: NormalizerKind::Currency,
        },
        FieldSpec {
            name: FieldName::RecordUrl,
            primary: &["record url"],
            aliases: &["details", "link", "url"],
            kind: NormalizerKind::Url,
        },
    ];
    &SPECS
}

/// Look up the spec entry for a field.
pub fn spec_for(field: FieldName) -> &'static FieldSpec {
    &field_specs()[field as usize]
}
