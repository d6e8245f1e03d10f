//! Similarity trait, algorithm catalog and the case-folding engine

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::algorithms;
use crate::error::ConfigError;

/// Comparison family of an algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Family {
    EditDistance,
    SimilarityRatio,
    Phonetic,
}

/// Raw output of a similarity algorithm
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    /// Number of edit operations
    Distance(usize),
    /// Closeness in `[0, 1]`
    Ratio(f64),
    /// Whether the phonetic codes are equal
    Phonetic(bool),
}

impl Score {
    pub fn family(&self) -> Family {
        match self {
            Score::Distance(_) => Family::EditDistance,
            Score::Ratio(_) => Family::SimilarityRatio,
            Score::Phonetic(_) => Family::Phonetic,
        }
    }

    /// Numeric form of the score. Equal phonetic codes have distance 0;
    /// differing codes have no numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Score::Distance(d) => Some(d as f64),
            Score::Ratio(r) => Some(r),
            Score::Phonetic(true) => Some(0.0),
            Score::Phonetic(false) => None,
        }
    }

    /// Whether `self` is strictly closer than `other`.
    ///
    /// Phonetic scores carry no grading: an equal code beats a differing one
    /// and nothing else is ordered.
    pub fn is_closer_than(&self, other: &Score) -> bool {
        match (*self, *other) {
            (Score::Distance(a), Score::Distance(b)) => a < b,
            (Score::Ratio(a), Score::Ratio(b)) => a > b,
            (Score::Phonetic(a), Score::Phonetic(b)) => a && !b,
            _ => false,
        }
    }
}

/// A string comparison algorithm.
///
/// Implementations must not panic on any pair of strings, including empty
/// ones, and must always return a score of their own [`Family`].
pub trait Similarity: Send + Sync {
    /// Catalog name, e.g. `"levenshtein"`
    fn name(&self) -> &'static str;

    fn family(&self) -> Family;

    fn score(&self, a: &str, b: &str) -> Score;
}

/// Named collection of algorithms, open for extension.
///
/// Names are matched case-insensitively and `_` or spaces are treated as `-`,
/// so `"Jaro_Winkler"` finds `jaro-winkler`.
#[derive(Clone)]
pub struct AlgorithmCatalog {
    entries: Vec<Arc<dyn Similarity>>,
}

impl AlgorithmCatalog {
    /// Catalog without any algorithm
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add an algorithm, replacing any entry with the same name
    pub fn register<S: Similarity + 'static>(&mut self, algorithm: S) -> &mut Self {
        self.register_shared(Arc::new(algorithm))
    }

    pub fn register_shared(&mut self, algorithm: Arc<dyn Similarity>) -> &mut Self {
        let name = normalize_name(algorithm.name());
        match self
            .entries
            .iter()
            .position(|a| normalize_name(a.name()) == name)
        {
            Some(pos) => self.entries[pos] = algorithm,
            None => self.entries.push(algorithm),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Similarity>> {
        let name = normalize_name(name);
        self.entries
            .iter()
            .find(|a| normalize_name(a.name()) == name)
            .cloned()
    }

    /// Names in registration order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|a| a.name())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for AlgorithmCatalog {
    fn default() -> Self {
        let mut catalog = Self::empty();
        catalog
            .register(algorithms::Levenshtein)
            .register(algorithms::DamerauLevenshtein)
            .register(algorithms::OptimalStringAlignment)
            .register(algorithms::NeedlemanWunsch::default())
            .register(algorithms::Jaro)
            .register(algorithms::JaroWinkler)
            .register(algorithms::PairLetters)
            .register(algorithms::NormalizedLevenshtein)
            .register(algorithms::Metaphone::default())
            .register(algorithms::DoubleMetaphone::default())
            .register(algorithms::Soundex::default())
            .register(algorithms::RefinedSoundex::default());
        catalog
    }
}

impl fmt::Debug for AlgorithmCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

fn normalize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '_' | ' ' => '-',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// One algorithm plus the case-sensitivity policy applied to its inputs
#[derive(Clone)]
pub struct SimilarityEngine {
    algorithm: Arc<dyn Similarity>,
    case_sensitive: bool,
}

impl SimilarityEngine {
    pub fn new(algorithm: Arc<dyn Similarity>, case_sensitive: bool) -> Self {
        Self {
            algorithm,
            case_sensitive,
        }
    }

    /// Look up `name` in the catalog
    pub fn from_catalog(
        catalog: &AlgorithmCatalog,
        name: &str,
        case_sensitive: bool,
    ) -> Result<Self, ConfigError> {
        catalog
            .get(name)
            .map(|algorithm| Self::new(algorithm, case_sensitive))
            .ok_or_else(|| ConfigError::UnknownAlgorithm(name.to_string()))
    }

    pub fn name(&self) -> &'static str {
        self.algorithm.name()
    }

    pub fn family(&self) -> Family {
        self.algorithm.family()
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Normalize a string the way [`score`](Self::score) does before comparing
    pub fn fold<'a>(&self, s: &'a str) -> Cow<'a, str> {
        if self.case_sensitive {
            Cow::Borrowed(s)
        } else {
            fold_case(s)
        }
    }

    /// Compare two strings under this engine's case policy
    pub fn score(&self, a: &str, b: &str) -> Score {
        self.score_folded(&self.fold(a), &self.fold(b))
    }

    /// Compare two strings that have already been through [`fold`](Self::fold)
    #[inline]
    pub fn score_folded(&self, a: &str, b: &str) -> Score {
        self.algorithm.score(a, b)
    }
}

/// Lowercase `s`, borrowing when no character changes.
///
/// Every case-insensitive comparison folds both sides through here, so
/// titlecase and other non-uppercase letters fold the same everywhere.
pub(crate) fn fold_case(s: &str) -> Cow<'_, str> {
    if s.chars().all(|c| c.to_lowercase().eq(std::iter::once(c))) {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(s.to_lowercase())
    }
}

impl fmt::Debug for SimilarityEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimilarityEngine")
            .field("algorithm", &self.algorithm.name())
            .field("family", &self.algorithm.family())
            .field("case_sensitive", &self.case_sensitive)
            .finish()
    }
}
