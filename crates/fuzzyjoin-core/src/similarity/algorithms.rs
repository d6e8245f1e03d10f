//! Built-in similarity algorithms

use rphonetic::Encoder;
use strsim::{
    damerau_levenshtein, jaro, jaro_winkler, levenshtein, normalized_levenshtein, osa_distance,
};

use super::engine::{Family, Score, Similarity};

/// Insertions, deletions and substitutions
#[derive(Debug, Clone, Copy, Default)]
pub struct Levenshtein;

impl Similarity for Levenshtein {
    fn name(&self) -> &'static str {
        "levenshtein"
    }

    fn family(&self) -> Family {
        Family::EditDistance
    }

    #[inline]
    fn score(&self, a: &str, b: &str) -> Score {
        Score::Distance(levenshtein(a, b))
    }
}

/// Levenshtein plus transpositions of adjacent characters
#[derive(Debug, Clone, Copy, Default)]
pub struct DamerauLevenshtein;

impl Similarity for DamerauLevenshtein {
    fn name(&self) -> &'static str {
        "damerau-levenshtein"
    }

    fn family(&self) -> Family {
        Family::EditDistance
    }

    #[inline]
    fn score(&self, a: &str, b: &str) -> Score {
        Score::Distance(damerau_levenshtein(a, b))
    }
}

/// Damerau-Levenshtein where no substring is edited more than once
#[derive(Debug, Clone, Copy, Default)]
pub struct OptimalStringAlignment;

impl Similarity for OptimalStringAlignment {
    fn name(&self) -> &'static str {
        "osa"
    }

    fn family(&self) -> Family {
        Family::EditDistance
    }

    #[inline]
    fn score(&self, a: &str, b: &str) -> Score {
        Score::Distance(osa_distance(a, b))
    }
}

/// Global alignment cost with separate gap and substitution costs
#[derive(Debug, Clone, Copy)]
pub struct NeedlemanWunsch {
    pub gap_cost: usize,
    pub substitution_cost: usize,
}

impl Default for NeedlemanWunsch {
    fn default() -> Self {
        Self {
            gap_cost: 2,
            substitution_cost: 1,
        }
    }
}

impl NeedlemanWunsch {
    fn alignment_cost(&self, a: &str, b: &str) -> usize {
        let b: Vec<char> = b.chars().collect();

        // Single rolling row over b
        let mut row: Vec<usize> = (0..=b.len()).map(|j| j * self.gap_cost).collect();
        for (i, ca) in a.chars().enumerate() {
            let mut diagonal = row[0];
            row[0] = (i + 1) * self.gap_cost;
            for (j, cb) in b.iter().enumerate() {
                let substitution = if ca == *cb { 0 } else { self.substitution_cost };
                let cost = (diagonal + substitution)
                    .min(row[j] + self.gap_cost)
                    .min(row[j + 1] + self.gap_cost);
                diagonal = row[j + 1];
                row[j + 1] = cost;
            }
        }
        row[b.len()]
    }
}

impl Similarity for NeedlemanWunsch {
    fn name(&self) -> &'static str {
        "needleman-wunsch"
    }

    fn family(&self) -> Family {
        Family::EditDistance
    }

    fn score(&self, a: &str, b: &str) -> Score {
        Score::Distance(self.alignment_cost(a, b))
    }
}

/// Jaro matching-window similarity
#[derive(Debug, Clone, Copy, Default)]
pub struct Jaro;

impl Similarity for Jaro {
    fn name(&self) -> &'static str {
        "jaro"
    }

    fn family(&self) -> Family {
        Family::SimilarityRatio
    }

    #[inline]
    fn score(&self, a: &str, b: &str) -> Score {
        Score::Ratio(jaro(a, b))
    }
}

/// Jaro with a bonus for a shared prefix
#[derive(Debug, Clone, Copy, Default)]
pub struct JaroWinkler;

impl Similarity for JaroWinkler {
    fn name(&self) -> &'static str {
        "jaro-winkler"
    }

    fn family(&self) -> Family {
        Family::SimilarityRatio
    }

    #[inline]
    fn score(&self, a: &str, b: &str) -> Score {
        Score::Ratio(jaro_winkler(a, b))
    }
}

/// Dice coefficient over adjacent letter pairs, taken per whitespace word
#[derive(Debug, Clone, Copy, Default)]
pub struct PairLetters;

impl PairLetters {
    fn letter_pairs(s: &str) -> Vec<(char, char)> {
        let mut pairs = Vec::new();
        for word in s.split_whitespace() {
            let chars: Vec<char> = word.chars().collect();
            pairs.extend(chars.windows(2).map(|w| (w[0], w[1])));
        }
        pairs
    }
}

impl Similarity for PairLetters {
    fn name(&self) -> &'static str {
        "pair-letters"
    }

    fn family(&self) -> Family {
        Family::SimilarityRatio
    }

    fn score(&self, a: &str, b: &str) -> Score {
        if a == b {
            return Score::Ratio(1.0);
        }

        let pairs_a = Self::letter_pairs(a);
        let mut pairs_b = Self::letter_pairs(b);
        let total = pairs_a.len() + pairs_b.len();
        if total == 0 {
            return Score::Ratio(0.0);
        }

        // Each pair in b can be matched at most once
        let mut shared = 0usize;
        for pair in &pairs_a {
            if let Some(pos) = pairs_b.iter().position(|p| p == pair) {
                pairs_b.swap_remove(pos);
                shared += 1;
            }
        }

        Score::Ratio((2 * shared) as f64 / total as f64)
    }
}

/// Levenshtein distance scaled into `[0, 1]` by the longer length
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedLevenshtein;

impl Similarity for NormalizedLevenshtein {
    fn name(&self) -> &'static str {
        "normalized-levenshtein"
    }

    fn family(&self) -> Family {
        Family::SimilarityRatio
    }

    #[inline]
    fn score(&self, a: &str, b: &str) -> Score {
        Score::Ratio(normalized_levenshtein(a, b))
    }
}

/// Codes match only when both are non-empty and equal
#[inline]
fn codes_match(a: &str, b: &str) -> bool {
    !a.is_empty() && a == b
}

/// The phonetic encoders only accept ASCII input; anything else has no code
#[inline]
fn encodable(a: &str, b: &str) -> bool {
    a.is_ascii() && b.is_ascii()
}

/// Original Metaphone code equality
#[derive(Default)]
pub struct Metaphone {
    encoder: rphonetic::Metaphone,
}

impl Similarity for Metaphone {
    fn name(&self) -> &'static str {
        "metaphone"
    }

    fn family(&self) -> Family {
        Family::Phonetic
    }

    fn score(&self, a: &str, b: &str) -> Score {
        if !encodable(a, b) {
            return Score::Phonetic(false);
        }
        Score::Phonetic(codes_match(&self.encoder.encode(a), &self.encoder.encode(b)))
    }
}

/// Double Metaphone; a primary code matching the other side's primary or
/// alternate code counts as equal
#[derive(Default)]
pub struct DoubleMetaphone {
    encoder: rphonetic::DoubleMetaphone,
}

impl Similarity for DoubleMetaphone {
    fn name(&self) -> &'static str {
        "double-metaphone"
    }

    fn family(&self) -> Family {
        Family::Phonetic
    }

    fn score(&self, a: &str, b: &str) -> Score {
        if !encodable(a, b) {
            return Score::Phonetic(false);
        }
        let a = self.encoder.double_metaphone(a);
        let b = self.encoder.double_metaphone(b);
        let (a_primary, a_alternate) = (a.primary(), a.alternate());
        let (b_primary, b_alternate) = (b.primary(), b.alternate());

        let equal = codes_match(&a_primary, &b_primary)
            || codes_match(&a_alternate, &b_primary)
            || codes_match(&a_primary, &b_alternate);
        Score::Phonetic(equal)
    }
}

/// American Soundex code equality
#[derive(Default)]
pub struct Soundex {
    encoder: rphonetic::Soundex,
}

impl Similarity for Soundex {
    fn name(&self) -> &'static str {
        "soundex"
    }

    fn family(&self) -> Family {
        Family::Phonetic
    }

    fn score(&self, a: &str, b: &str) -> Score {
        if !encodable(a, b) {
            return Score::Phonetic(false);
        }
        Score::Phonetic(codes_match(&self.encoder.encode(a), &self.encoder.encode(b)))
    }
}

/// Refined Soundex code equality
#[derive(Default)]
pub struct RefinedSoundex {
    encoder: rphonetic::RefinedSoundex,
}

impl Similarity for RefinedSoundex {
    fn name(&self) -> &'static str {
        "refined-soundex"
    }

    fn family(&self) -> Family {
        Family::Phonetic
    }

    fn score(&self, a: &str, b: &str) -> Score {
        if !encodable(a, b) {
            return Score::Phonetic(false);
        }
        Score::Phonetic(codes_match(&self.encoder.encode(a), &self.encoder.encode(b)))
    }
}
