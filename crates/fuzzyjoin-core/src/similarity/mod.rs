//! String similarity
//!
//! Algorithms are values implementing [`Similarity`]. Each one reports a
//! [`Family`], which is all the resolver needs to know to order and bound
//! scores:
//!
//! - **Edit distance**: integer count of edits, lower is closer
//! - **Similarity ratio**: real value in `[0, 1]`, higher is closer
//! - **Phonetic**: codes equal or not
//!
//! # Built-in algorithms
//!
//! | name | family |
//! |---|---|
//! | `levenshtein` | edit distance |
//! | `damerau-levenshtein` | edit distance |
//! | `osa` | edit distance |
//! | `needleman-wunsch` | edit distance |
//! | `jaro` | ratio |
//! | `jaro-winkler` | ratio |
//! | `pair-letters` | ratio |
//! | `normalized-levenshtein` | ratio |
//! | `metaphone` | phonetic |
//! | `double-metaphone` | phonetic |
//! | `soundex` | phonetic |
//! | `refined-soundex` | phonetic |
//!
//! # Example
//!
//! ```rust
//! use fuzzyjoin_core::similarity::{AlgorithmCatalog, Score, SimilarityEngine};
//!
//! let catalog = AlgorithmCatalog::default();
//! let engine = SimilarityEngine::from_catalog(&catalog, "levenshtein", false).unwrap();
//! assert_eq!(engine.score("Catrine", "CATRINY"), Score::Distance(1));
//! ```

mod algorithms;
mod engine;

pub use algorithms::{
    DamerauLevenshtein, DoubleMetaphone, Jaro, JaroWinkler, Levenshtein, Metaphone,
    NeedlemanWunsch, NormalizedLevenshtein, OptimalStringAlignment, PairLetters, RefinedSoundex,
    Soundex,
};
pub use engine::{AlgorithmCatalog, Family, Score, Similarity, SimilarityEngine};
pub(crate) use engine::fold_case;
