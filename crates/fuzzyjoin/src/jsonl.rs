//! JSON-lines row files
//!
//! A row file starts with a schema line followed by one JSON array per row:
//!
//! ```text
//! {"schema":[{"name":"id","type":"integer"},{"name":"name","type":"string","encoding":"opaque-binary"}]}
//! [1,"Q2F0cmluZQ=="]
//! [2,null]
//! ```
//!
//! Opaque-binary and `binary` cells are base64 strings. Dates are written as
//! `YYYY-MM-DDTHH:MM:SS.fff`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use chrono::NaiveDateTime;
use fuzzyjoin_core::{FieldMeta, LogicalType, Row, RowSchema, Value};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
];

#[derive(Debug, Serialize, Deserialize)]
struct SchemaLine {
    schema: RowSchema,
}

/// Parse the first line of a row file
pub fn parse_schema(line: &str) -> serde_json::Result<RowSchema> {
    serde_json::from_str::<SchemaLine>(line).map(|l| l.schema)
}

/// Render a schema as the first line of a row file
pub fn schema_line(schema: &RowSchema) -> serde_json::Result<String> {
    serde_json::to_string(&SchemaLine {
        schema: schema.clone(),
    })
}

/// Parse one row line against `schema`
pub fn parse_row(schema: &RowSchema, line: &str) -> Result<Row, String> {
    let json: Json = serde_json::from_str(line).map_err(|e| e.to_string())?;
    let Json::Array(cells) = json else {
        return Err("row is not a JSON array".to_string());
    };
    if cells.len() != schema.len() {
        return Err(format!(
            "row has {} cells, schema has {} fields",
            cells.len(),
            schema.len()
        ));
    }

    schema
        .fields()
        .iter()
        .zip(cells)
        .map(|(field, cell)| cell_from_json(field, cell))
        .collect::<Result<Vec<_>, _>>()
        .map(Row::new)
}

/// Render a row as a JSON array
pub fn row_to_json(row: &Row) -> Json {
    Json::Array(row.values().iter().map(cell_to_json).collect())
}

fn cell_from_json(field: &FieldMeta, cell: Json) -> Result<Value, String> {
    if cell.is_null() {
        return Ok(Value::Null);
    }
    if field.is_opaque() || field.logical_type == LogicalType::Binary {
        return match cell {
            Json::String(s) => STANDARD
                .decode(s.as_bytes())
                .map(|b| Value::Binary(Bytes::from(b)))
                .map_err(|e| format!("field '{}': invalid base64: {e}", field.name)),
            other => Err(mismatch(field, &other)),
        };
    }

    match (field.logical_type, cell) {
        (LogicalType::String, Json::String(s)) => Ok(Value::String(s)),
        (LogicalType::Integer, Json::Number(n)) if n.is_i64() => {
            Ok(Value::Integer(n.as_i64().unwrap_or_default()))
        }
        (LogicalType::Number, Json::Number(n)) => n
            .as_f64()
            .map(Value::Number)
            .ok_or_else(|| format!("field '{}': number out of range", field.name)),
        (LogicalType::Boolean, Json::Bool(b)) => Ok(Value::Boolean(b)),
        (LogicalType::Date, Json::String(s)) => DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&s, fmt).ok())
            .map(Value::Date)
            .ok_or_else(|| format!("field '{}': unrecognised date '{s}'", field.name)),
        (_, other) => Err(mismatch(field, &other)),
    }
}

fn cell_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::String(s) => Json::String(s.clone()),
        Value::Integer(n) => Json::from(*n),
        Value::Number(n) => serde_json::Number::from_f64(*n).map_or(Json::Null, Json::Number),
        Value::Boolean(b) => Json::Bool(*b),
        Value::Date(d) => Json::String(d.format(DATE_FORMAT).to_string()),
        Value::Binary(b) => Json::String(STANDARD.encode(b)),
    }
}

fn mismatch(field: &FieldMeta, cell: &Json) -> String {
    let found = match cell {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    };
    format!(
        "field '{}' expects {:?}, found {found}",
        field.name, field.logical_type
    )
}
