//! Lookup index
//!
//! The index is the lookup stream drained into memory: one [`LookupEntry`]
//! per lookup row with a usable key. Entries keep insertion order, which is
//! also the tie-break order used by the resolver.

use std::borrow::Cow;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::channel::RowReceiver;
use crate::codec::decode_key;
use crate::error::{ConfigError, DecodeError, ErrorSender, RowError, Side};
use crate::row::{FieldMeta, Row, RowSchema};
use crate::similarity::fold_case;

/// A decoded lookup key and the row it came from
#[derive(Debug, Clone)]
pub struct LookupEntry {
    key: String,
    folded: Option<Box<str>>,
    row: Row,
}

impl LookupEntry {
    /// Key as decoded from the lookup row
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Key after case folding, as handed to the similarity algorithm
    pub fn match_key(&self) -> &str {
        self.folded.as_deref().unwrap_or(&self.key)
    }

    pub fn row(&self) -> &Row {
        &self.row
    }
}

/// Immutable, insertion-ordered set of lookup entries
#[derive(Debug, Clone, Default)]
pub struct LookupIndex {
    entries: Vec<LookupEntry>,
    schema: Arc<RowSchema>,
}

impl LookupIndex {
    /// Schema of the lookup rows held by the entries
    pub fn schema(&self) -> &Arc<RowSchema> {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LookupEntry> {
        self.entries.iter()
    }

    /// Drain `lookup` to end-of-stream and index every row.
    ///
    /// Rows whose key cannot be decoded are skipped and reported on `errors`
    /// when given. Rows with a null key are skipped.
    pub async fn build(
        lookup: &mut RowReceiver,
        key_field: &str,
        case_sensitive: bool,
        errors: Option<&ErrorSender>,
    ) -> Result<(Self, BuildStats), ConfigError> {
        let mut builder =
            IndexBuilder::new(Arc::clone(lookup.schema()), key_field, case_sensitive)?;
        while let Some(row) = lookup.recv().await {
            builder.push_or_report(row, errors);
        }
        Ok(builder.finish())
    }
}

impl<'a> IntoIterator for &'a LookupIndex {
    type Item = &'a LookupEntry;
    type IntoIter = std::slice::Iter<'a, LookupEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Counters collected while building an index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub rows_read: u64,
    pub null_keys: u64,
    pub decode_errors: u64,
}

/// Incremental index construction, one lookup row at a time
#[derive(Debug)]
pub struct IndexBuilder {
    schema: Arc<RowSchema>,
    key_index: usize,
    key_meta: FieldMeta,
    case_sensitive: bool,
    entries: Vec<LookupEntry>,
    stats: BuildStats,
}

impl IndexBuilder {
    /// Fails when `key_field` is not part of `schema`
    pub fn new(
        schema: Arc<RowSchema>,
        key_field: &str,
        case_sensitive: bool,
    ) -> Result<Self, ConfigError> {
        let key_index = schema
            .index_of(key_field)
            .ok_or_else(|| ConfigError::MissingField {
                side: Side::Lookup,
                field: key_field.to_string(),
            })?;
        let key_meta = schema.fields()[key_index].clone();

        Ok(Self {
            schema,
            key_index,
            key_meta,
            case_sensitive,
            entries: Vec::new(),
            stats: BuildStats::default(),
        })
    }

    /// Index one row. Returns `Ok(false)` when the key is null and the row
    /// was skipped.
    pub fn push(&mut self, row: Row) -> Result<bool, DecodeError> {
        self.stats.rows_read += 1;

        let decoded = row
            .get(self.key_index)
            .map(|cell| decode_key(cell, &self.key_meta))
            .transpose();
        let key = match decoded {
            Ok(Some(Some(key))) => key.into_owned(),
            Ok(_) => {
                self.stats.null_keys += 1;
                return Ok(false);
            }
            Err(e) => {
                self.stats.decode_errors += 1;
                return Err(e);
            }
        };

        let folded = if self.case_sensitive {
            None
        } else {
            match fold_case(&key) {
                Cow::Owned(lower) => Some(lower.into_boxed_str()),
                Cow::Borrowed(_) => None,
            }
        };

        self.entries.push(LookupEntry { key, folded, row });
        Ok(true)
    }

    /// Like [`push`](Self::push), forwarding decode failures to `errors`
    pub fn push_or_report(&mut self, row: Row, errors: Option<&ErrorSender>) {
        match self.push(row.clone()) {
            Ok(true) => {}
            Ok(false) => debug!(field = %self.key_meta.name, "Skipping lookup row with null key"),
            Err(e) => match errors {
                Some(tx) => {
                    if tx.send(RowError::decode(Side::Lookup, row, &e)).is_err() {
                        warn!(error = %e, "Error channel closed; dropping lookup row");
                    }
                }
                None => debug!(error = %e, "Skipping lookup row with undecodable key"),
            },
        }
    }

    pub fn finish(self) -> (LookupIndex, BuildStats) {
        (
            LookupIndex {
                entries: self.entries,
                schema: self.schema,
            },
            self.stats,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::row_channel;
    use crate::row;
    use crate::row::{Charset, Value};
    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    fn schema() -> Arc<RowSchema> {
        Arc::new(RowSchema::new(vec![
            FieldMeta::string("id"),
            FieldMeta::string("field1"),
        ]))
    }

    fn keys(index: &LookupIndex) -> Vec<&str> {
        index.iter().map(LookupEntry::key).collect()
    }

    #[test]
    fn test_missing_key_field_is_fatal() {
        let err = IndexBuilder::new(schema(), "nope", true).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingField {
                side: Side::Lookup,
                field: "nope".into()
            }
        );
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let mut builder = IndexBuilder::new(schema(), "field1", true).unwrap();
        for name in ["John", "Catriny", "Anna", "John"] {
            builder.push(row!["x", name]).unwrap();
        }
        let (index, stats) = builder.finish();

        assert_eq!(keys(&index), vec!["John", "Catriny", "Anna", "John"]);
        assert_eq!(stats.rows_read, 4);
    }

    #[test]
    fn test_null_keys_are_skipped() {
        let mut builder = IndexBuilder::new(schema(), "field1", true).unwrap();
        assert!(!builder.push(row!["1", Value::Null]).unwrap());
        // Row shorter than the schema has no key either
        assert!(!builder.push(row!["2"]).unwrap());
        assert!(builder.push(row!["3", "John"]).unwrap());

        let (index, stats) = builder.finish();
        assert_eq!(index.len(), 1);
        assert_eq!(stats.null_keys, 2);
    }

    #[test]
    fn test_case_folding_precomputed() {
        let mut builder = IndexBuilder::new(schema(), "field1", false).unwrap();
        builder.push(row!["1", "John"]).unwrap();
        builder.push(row!["2", "anna"]).unwrap();
        builder.push(row!["3", "ǅemal"]).unwrap();
        let (index, _) = builder.finish();

        let entries: Vec<(&str, &str)> = index.iter().map(|e| (e.key(), e.match_key())).collect();
        assert_eq!(
            entries,
            vec![("John", "john"), ("anna", "anna"), ("ǅemal", "ǆemal")]
        );
    }

    #[test]
    fn test_undecodable_row_is_reported_and_skipped() {
        let schema = Arc::new(RowSchema::new(vec![
            FieldMeta::string("field1").opaque(Charset::Utf8)
        ]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut builder = IndexBuilder::new(schema, "field1", true).unwrap();

        builder.push_or_report(row![Bytes::from_static(b"\xff")], Some(&tx));
        builder.push_or_report(row![Bytes::from_static(b"John")], Some(&tx));
        let (index, stats) = builder.finish();

        assert_eq!(keys(&index), vec!["John"]);
        assert_eq!(stats.decode_errors, 1);
        let reported = rx.try_recv().unwrap();
        assert_eq!(reported.side, Side::Lookup);
        assert_eq!(reported.field, "field1");
    }

    #[tokio::test]
    async fn test_build_drains_channel() {
        let (tx, mut rx) = row_channel(schema(), 2);
        let producer = tokio::spawn(async move {
            for name in ["John", "Catriny", "Anna"] {
                tx.send(row!["x", name]).await.unwrap();
            }
        });

        let (index, stats) = LookupIndex::build(&mut rx, "field1", true, None).await.unwrap();
        producer.await.unwrap();

        assert_eq!(keys(&index), vec!["John", "Catriny", "Anna"]);
        assert_eq!(stats.rows_read, 3);
        assert_eq!(index.schema().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_channel_gives_empty_index() {
        let (tx, mut rx) = row_channel(schema(), 1);
        drop(tx);
        let (index, _) = LookupIndex::build(&mut rx, "field1", true, None).await.unwrap();
        assert!(index.is_empty());
    }
}
