//! Output row assembly
//!
//! Output layout, fixed at setup:
//!
//! ```text
//! [ main row cells... | match flag | value? | distance? | lookup fields... ]
//! ```
//!
//! Optional slots only exist when configured. Every emitted row has the same
//! width; slots without data are null.

use std::sync::Arc;

use crate::config::MatchConfig;
use crate::error::{ConfigError, Side};
use crate::resolver::MatchResult;
use crate::row::{FieldMeta, LogicalType, Row, RowSchema, Value};
use crate::similarity::{Family, Score};

/// Builds output rows from main rows and match results
#[derive(Debug, Clone)]
pub struct RowAssembler {
    schema: Arc<RowSchema>,
    input_width: usize,
    value_slot: bool,
    distance_slot: bool,
    lookup_indices: Vec<usize>,
    separator: String,
}

impl RowAssembler {
    /// Compute the output layout. Fails when a configured lookup field is
    /// missing from the lookup schema or an output name collides with a main
    /// field.
    pub fn new(
        main_schema: &RowSchema,
        lookup_schema: &RowSchema,
        config: &MatchConfig,
        family: Family,
    ) -> Result<Self, ConfigError> {
        for name in config.output_field_names() {
            if main_schema.contains(name) {
                return Err(ConfigError::DuplicateOutputField(name.to_string()));
            }
        }

        let mut schema = main_schema.clone();
        schema.push(FieldMeta::new(&config.match_flag_field, LogicalType::Boolean));

        if let Some(name) = config.value_field() {
            schema.push(FieldMeta::string(name));
        }
        if let Some(name) = config.distance_field() {
            let logical_type = match family {
                Family::SimilarityRatio => LogicalType::Number,
                Family::EditDistance | Family::Phonetic => LogicalType::Integer,
            };
            schema.push(FieldMeta::new(name, logical_type));
        }

        let mut lookup_indices = Vec::with_capacity(config.lookup_fields.len());
        for field in &config.lookup_fields {
            let idx = lookup_schema
                .index_of(&field.name)
                .ok_or_else(|| ConfigError::MissingField {
                    side: Side::Lookup,
                    field: field.name.clone(),
                })?;
            // Copied cells keep their storage encoding
            let mut meta = lookup_schema.fields()[idx].clone();
            meta.name = field.output_name().to_string();
            schema.push(meta);
            lookup_indices.push(idx);
        }

        Ok(Self {
            schema: Arc::new(schema),
            input_width: main_schema.len(),
            value_slot: config.value_field().is_some(),
            distance_slot: config.distance_field().is_some(),
            lookup_indices,
            separator: config.value_separator.clone(),
        })
    }

    pub fn output_schema(&self) -> &Arc<RowSchema> {
        &self.schema
    }

    /// Width of every output row
    pub fn width(&self) -> usize {
        self.schema.len()
    }

    pub fn assemble(&self, row: &Row, result: &MatchResult<'_>) -> Row {
        let mut cells = Vec::with_capacity(self.width());
        cells.extend(row.values().iter().take(self.input_width).cloned());
        cells.resize(self.input_width, Value::Null);

        let best = result.best();
        cells.push(Value::Boolean(best.is_some()));

        if self.value_slot {
            let value = match best {
                Some(_) if !result.accepted().is_empty() => Value::String(
                    result
                        .accepted()
                        .iter()
                        .map(|e| e.key())
                        .collect::<Vec<_>>()
                        .join(&self.separator),
                ),
                Some(entry) => Value::String(entry.key().to_string()),
                None => Value::Null,
            };
            cells.push(value);
        }

        if self.distance_slot {
            let distance = match (best, result.score()) {
                (Some(_), Some(score)) => score_value(score),
                _ => Value::Null,
            };
            cells.push(distance);
        }

        match best {
            Some(entry) => cells.extend(
                self.lookup_indices
                    .iter()
                    .map(|&i| entry.row().get(i).cloned().unwrap_or(Value::Null)),
            ),
            None => cells.resize(self.width(), Value::Null),
        }

        Row::new(cells)
    }
}

fn score_value(score: Score) -> Value {
    match score {
        Score::Distance(d) => Value::Integer(i64::try_from(d).unwrap_or(i64::MAX)),
        Score::Ratio(r) => Value::Number(r),
        Score::Phonetic(true) => Value::Integer(0),
        Score::Phonetic(false) => Value::Null,
    }
}
