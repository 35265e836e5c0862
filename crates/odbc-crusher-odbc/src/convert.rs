//! Conversions between `odbc-api` and battery types

use odbc_api::parameter::InputParameter;
use odbc_api::{DataType, IntoParameter, Nullable};
use odbc_crusher_core::{Cursor, GatewayError, GatewayResult, Value};

pub(crate) fn map_error(error: odbc_api::Error) -> GatewayError {
    match error {
        odbc_api::Error::Diagnostics { record, function } => {
            let message = String::from_utf8_lossy(&record.message)
                .trim_end_matches('\0')
                .to_string();
            tracing::debug!(function, sqlstate = record.state.as_str(), "ODBC call failed");
            GatewayError::new(record.state.as_str(), message).with_native_code(record.native_error)
        }
        other => GatewayError::general(other.to_string()),
    }
}

/// Owned parameter buffers for one execution.
///
/// Temporal and decimal values travel as text; every driver accepts a
/// string for `CAST(? AS ...)`.
pub(crate) fn bind(params: &[Value]) -> Vec<Box<dyn InputParameter>> {
    params
        .iter()
        .map(|value| -> Box<dyn InputParameter> {
            match value {
                Value::Null => Box::new(Nullable::<i32>::null()),
                Value::Bool(v) => Box::new(i32::from(*v)),
                Value::Int32(v) => Box::new(*v),
                Value::Int64(v) => Box::new(*v),
                Value::Float64(v) => Box::new(*v),
                Value::Bytes(v) => Box::new(v.clone().into_parameter()),
                Value::String(v) | Value::Decimal(v) => Box::new(v.clone().into_parameter()),
                Value::Date(_) | Value::Time(_) | Value::DateTime(_) => {
                    Box::new(value.to_string().into_parameter())
                }
            }
        })
        .collect()
}

/// How a column is read back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Integer,
    Float,
    Decimal,
    Binary,
    Text,
}

impl From<DataType> for ColumnKind {
    fn from(data_type: DataType) -> Self {
        match data_type {
            DataType::TinyInt | DataType::SmallInt | DataType::Integer | DataType::BigInt => {
                ColumnKind::Integer
            }
            DataType::Real | DataType::Float { .. } | DataType::Double => ColumnKind::Float,
            DataType::Decimal { .. } | DataType::Numeric { .. } => ColumnKind::Decimal,
            DataType::Binary { .. } | DataType::Varbinary { .. } | DataType::LongVarbinary { .. } => {
                ColumnKind::Binary
            }
            _ => ColumnKind::Text,
        }
    }
}

/// Fetch every row of an `odbc-api` cursor into a battery [`Cursor`].
pub(crate) fn drain(mut cursor: impl odbc_api::Cursor) -> GatewayResult<Cursor> {
    let count = u16::try_from(cursor.num_result_cols().map_err(map_error)?).unwrap_or(0);
    let mut columns = Vec::with_capacity(count.into());
    let mut kinds = Vec::with_capacity(count.into());
    for index in 1..=count {
        columns.push(cursor.col_name(index).map_err(map_error)?);
        kinds.push(ColumnKind::from(cursor.col_data_type(index).map_err(map_error)?));
    }

    let mut rows = Vec::new();
    let mut buf = Vec::new();
    while let Some(mut row) = cursor.next_row().map_err(map_error)? {
        let mut values = Vec::with_capacity(kinds.len());
        for (index, kind) in (1..=count).zip(&kinds) {
            buf.clear();
            let value = if *kind == ColumnKind::Binary {
                match row.get_binary(index, &mut buf).map_err(map_error)? {
                    true => Value::Bytes(buf.clone()),
                    false => Value::Null,
                }
            } else if row.get_text(index, &mut buf).map_err(map_error)? {
                text_value(*kind, decode_text(&buf))
            } else {
                Value::Null
            };
            values.push(value);
        }
        rows.push(values);
    }
    Ok(Cursor::new(columns, rows))
}

/// UTF-8 when valid, otherwise one character per byte so binary data read
/// through a text buffer keeps every byte value
fn decode_text(buf: &[u8]) -> String {
    match std::str::from_utf8(buf) {
        Ok(text) => text.to_string(),
        Err(_) => buf.iter().copied().map(char::from).collect(),
    }
}

fn text_value(kind: ColumnKind, text: String) -> Value {
    match kind {
        ColumnKind::Integer => text
            .trim()
            .parse::<i64>()
            .map(Value::Int64)
            .unwrap_or(Value::String(text)),
        ColumnKind::Float => text
            .trim()
            .parse::<f64>()
            .map(Value::Float64)
            .unwrap_or(Value::String(text)),
        ColumnKind::Decimal => Value::Decimal(text),
        ColumnKind::Binary | ColumnKind::Text => Value::String(text),
    }
}
