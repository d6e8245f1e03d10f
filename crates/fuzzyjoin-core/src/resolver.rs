//! Match resolution
//!
//! For each main row the resolver scores the decoded key against every
//! lookup entry, keeps the closest one, and accepts it only when its score
//! lies within the configured inclusive bounds.
//!
//! Selection depends on the algorithm family only:
//! - edit distance: minimum score
//! - similarity ratio: maximum score
//! - phonetic: first entry with an equal code
//!
//! Ties go to the entry inserted first.

use std::borrow::Cow;

use crate::codec::decode_key;
use crate::config::MatchConfig;
use crate::error::{ConfigError, DecodeError, Side};
use crate::index::{LookupEntry, LookupIndex};
use crate::row::{FieldMeta, Row, RowSchema};
use crate::similarity::{Family, Score, SimilarityEngine};

/// Outcome of resolving one main row
#[derive(Debug, Clone, Default)]
pub struct MatchResult<'i> {
    best: Option<&'i LookupEntry>,
    score: Option<Score>,
    accepted: Vec<&'i LookupEntry>,
}

impl<'i> MatchResult<'i> {
    /// Result for a row that was not matched without scoring anything
    pub fn unmatched() -> Self {
        Self::default()
    }

    pub fn is_match(&self) -> bool {
        self.best.is_some()
    }

    /// Accepted entry, present iff matched
    pub fn best(&self) -> Option<&'i LookupEntry> {
        self.best
    }

    /// Raw score of the closest candidate, whether accepted or not
    pub fn score(&self) -> Option<Score> {
        self.score
    }

    /// Every entry within bounds, in index order. Only filled when the
    /// resolver collects all matches.
    pub fn accepted(&self) -> &[&'i LookupEntry] {
        &self.accepted
    }
}

/// Resolves main rows against a lookup index
#[derive(Debug, Clone)]
pub struct MatchResolver {
    engine: SimilarityEngine,
    key_index: usize,
    key_meta: FieldMeta,
    min_distance: f64,
    max_distance: f64,
    collect_all: bool,
}

impl MatchResolver {
    pub fn new(
        engine: SimilarityEngine,
        main_schema: &RowSchema,
        config: &MatchConfig,
    ) -> Result<Self, ConfigError> {
        let key_index = main_schema
            .index_of(&config.main_key_field)
            .ok_or_else(|| ConfigError::MissingField {
                side: Side::Main,
                field: config.main_key_field.clone(),
            })?;

        Ok(Self {
            key_meta: main_schema.fields()[key_index].clone(),
            engine,
            key_index,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            collect_all: !config.closer_value,
        })
    }

    pub fn engine(&self) -> &SimilarityEngine {
        &self.engine
    }

    pub fn family(&self) -> Family {
        self.engine.family()
    }

    /// Decoded main key of `row`; `None` when null or missing
    pub fn key_of<'r>(&self, row: &'r Row) -> Result<Option<Cow<'r, str>>, DecodeError> {
        match row.get(self.key_index) {
            Some(cell) => decode_key(cell, &self.key_meta),
            None => Ok(None),
        }
    }

    /// Decode the key of `row` and resolve it
    pub fn resolve<'i>(
        &self,
        row: &Row,
        index: &'i LookupIndex,
    ) -> Result<MatchResult<'i>, DecodeError> {
        let key = self.key_of(row)?;
        Ok(self.resolve_key(key.as_deref(), index))
    }

    /// Resolve an already decoded key
    pub fn resolve_key<'i>(&self, key: Option<&str>, index: &'i LookupIndex) -> MatchResult<'i> {
        let key = match key {
            Some(key) if !index.is_empty() => self.engine.fold(key),
            _ => return MatchResult::unmatched(),
        };

        let family = self.family();
        let mut closest: Option<(&'i LookupEntry, Score)> = None;
        let mut accepted = Vec::new();

        for entry in index {
            let score = self.engine.score_folded(&key, entry.match_key());

            if self.collect_all {
                if self.accepts(score) {
                    accepted.push(entry);
                    if closest.map_or(true, |(_, s)| score.is_closer_than(&s)) {
                        closest = Some((entry, score));
                    }
                }
                continue;
            }

            match closest {
                None if family != Family::Phonetic || score == Score::Phonetic(true) => {
                    closest = Some((entry, score));
                }
                Some((_, best)) if score.is_closer_than(&best) => {
                    closest = Some((entry, score));
                }
                _ => {}
            }

            // Equal codes cannot be improved on
            if family == Family::Phonetic && closest.is_some() {
                break;
            }
        }

        match closest {
            Some((entry, score)) if self.accepts(score) => MatchResult {
                best: Some(entry),
                score: Some(score),
                accepted,
            },
            Some((_, score)) => MatchResult {
                best: None,
                score: Some(score),
                accepted,
            },
            None => MatchResult::unmatched(),
        }
    }

    /// Whether `score` lies within the inclusive bounds
    pub fn accepts(&self, score: Score) -> bool {
        match score {
            Score::Phonetic(equal) => equal,
            Score::Distance(_) | Score::Ratio(_) => score
                .as_f64()
                .is_some_and(|s| self.min_distance <= s && s <= self.max_distance),
        }
    }
}
