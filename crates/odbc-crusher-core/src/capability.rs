//! Driver capability snapshot: attributes, function support and types.

mod lookup;
mod registry;

pub use lookup::*;
pub use registry::*;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::gateway::{CatalogFilter, CatalogKind, OdbcConnection};
use crate::types::{AttributeValue, Row, Value};

/// Where a function support flag came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SupportProvenance {
    /// Read from the driver's SQLGetFunctions bitmap
    Verified,
    /// The bitmap was unavailable; only the binding's existence was checked
    #[default]
    Assumed,
}

/// SQL_NULLABLE tri-state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Nullability {
    NoNulls,
    Nullable,
    #[default]
    Unknown,
}

impl Nullability {
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(0) => Nullability::NoNulls,
            Some(1) => Nullability::Nullable,
            _ => Nullability::Unknown,
        }
    }
}

/// One row of the driver's SQLGetTypeInfo result, read positionally.
///
/// Columns the driver did not return are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub type_name: Option<String>,
    pub data_type: Option<i64>,
    pub column_size: Option<i64>,
    pub literal_prefix: Option<String>,
    pub literal_suffix: Option<String>,
    pub create_params: Option<String>,
    pub nullable: Nullability,
    pub case_sensitive: Option<bool>,
    pub searchable: Option<i64>,
    pub unsigned: Option<bool>,
    pub fixed_prec_scale: Option<bool>,
    pub auto_increment: Option<bool>,
    pub local_type_name: Option<String>,
    pub minimum_scale: Option<i64>,
    pub maximum_scale: Option<i64>,
}

fn text_at(row: &Row, index: usize) -> Option<String> {
    row.text(index)
}

fn int_at(row: &Row, index: usize) -> Option<i64> {
    row.get(index).and_then(Value::as_i64)
}

fn flag_at(row: &Row, index: usize) -> Option<bool> {
    int_at(row, index).map(|v| v != 0)
}

impl TypeDescriptor {
    pub fn from_row(row: &Row) -> Self {
        Self {
            type_name: text_at(row, 0),
            data_type: int_at(row, 1),
            column_size: int_at(row, 2),
            literal_prefix: text_at(row, 3),
            literal_suffix: text_at(row, 4),
            create_params: text_at(row, 5),
            nullable: Nullability::from_code(int_at(row, 6)),
            case_sensitive: flag_at(row, 7),
            searchable: int_at(row, 8),
            unsigned: flag_at(row, 9),
            fixed_prec_scale: flag_at(row, 10),
            auto_increment: flag_at(row, 11),
            local_type_name: text_at(row, 12),
            minimum_scale: int_at(row, 13),
            maximum_scale: int_at(row, 14),
        }
    }

    pub fn display_name(&self) -> &str {
        self.type_name.as_deref().unwrap_or("<unnamed>")
    }
}

/// Everything the capability probe learned about a driver.
///
/// Built once before the dependent suites run and only read afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapabilitySnapshot {
    /// Registry key to value; `None` when the query failed
    pub attributes: IndexMap<String, Option<AttributeValue>>,
    /// Function name to support flag
    pub functions: IndexMap<String, bool>,
    pub function_provenance: SupportProvenance,
    pub types: Vec<TypeDescriptor>,
    /// Why the type catalog could not be read, if it could not
    pub type_catalog_error: Option<String>,
}

impl CapabilitySnapshot {
    pub fn attribute(&self, info: InfoType) -> Option<&AttributeValue> {
        self.attributes.get(info.name()).and_then(Option::as_ref)
    }

    pub fn text(&self, info: InfoType) -> Option<&str> {
        self.attribute(info).and_then(AttributeValue::as_text)
    }

    pub fn integer(&self, info: InfoType) -> Option<i64> {
        self.attribute(info).and_then(AttributeValue::as_integer)
    }

    /// Support flag and its provenance, `None` when the function was not probed
    pub fn function_support(&self, function: OdbcFunction) -> Option<(bool, SupportProvenance)> {
        self.functions
            .get(function.name())
            .map(|supported| (*supported, self.function_provenance))
    }

    /// Whether the driver is known not to implement `function`. Only a
    /// verified bitmap can say so.
    pub fn verifiably_unsupported(&self, function: OdbcFunction) -> bool {
        matches!(
            self.function_support(function),
            Some((false, SupportProvenance::Verified))
        )
    }

    /// Attributes that could be read
    pub fn collected_count(&self) -> usize {
        self.attributes.values().filter(|v| v.is_some()).count()
    }
}

/// Collects a [`CapabilitySnapshot`] from a live connection.
pub struct CapabilityProbe;

impl CapabilityProbe {
    /// Query every registered attribute, the function support flags and the
    /// type catalog. A failure in any single query is recorded and the probe
    /// moves on.
    pub fn collect(conn: &dyn OdbcConnection) -> CapabilitySnapshot {
        let mut snapshot = CapabilitySnapshot::default();

        for info in InfoType::iter() {
            let value = match conn.get_info(info) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::debug!(attribute = info.name(), sqlstate = %e.sqlstate, "Attribute unavailable");
                    None
                }
            };
            snapshot.attributes.insert(info.name().to_string(), value);
        }

        let bitmap = match conn.function_bitmap() {
            Ok(bitmap) => bitmap,
            Err(e) => {
                tracing::debug!(error = %e, "SQLGetFunctions failed, falling back to binding checks");
                None
            }
        };
        snapshot.function_provenance = if bitmap.is_some() {
            SupportProvenance::Verified
        } else {
            SupportProvenance::Assumed
        };
        for function in OdbcFunction::iter() {
            let supported = match &bitmap {
                Some(bitmap) => bitmap.is_set(function),
                None => conn.has_binding(function),
            };
            snapshot
                .functions
                .insert(function.name().to_string(), supported);
        }

        match conn.catalog(CatalogKind::TypeInfo, &CatalogFilter::default()) {
            Ok(mut cursor) => {
                snapshot.types = cursor
                    .fetch_all()
                    .iter()
                    .map(TypeDescriptor::from_row)
                    .collect();
            }
            Err(e) => {
                tracing::debug!(error = %e, "Type catalog unavailable");
                snapshot.type_catalog_error = Some(e.to_string());
            }
        }

        tracing::info!(
            attributes = snapshot.collected_count(),
            functions = snapshot.functions.values().filter(|s| **s).count(),
            provenance = %snapshot.function_provenance,
            types = snapshot.types.len(),
            "Capability snapshot collected"
        );
        snapshot
    }
}
