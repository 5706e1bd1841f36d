use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A source→target language pair, identified as "xx-yy" (e.g. "es-en").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

impl LanguagePair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Pack identifier, e.g. "es-en"
    pub fn id(&self) -> String {
        format!("{}-{}", self.source, self.target)
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.source, self.target)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid language pair id: {0} (expected \"xx-yy\")")]
pub struct InvalidPairId(pub String);

impl FromStr for LanguagePair {
    type Err = InvalidPairId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('-') {
            Some((source, target)) if !source.is_empty() && !target.is_empty() => {
                Ok(Self::new(source, target))
            }
            _ => Err(InvalidPairId(s.to_string())),
        }
    }
}

/// Arena index of a word group within one generated lexicon.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct WordGroupId(pub u32);

/// Arena index of a meaning within one generated lexicon.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct MeaningId(pub u32);

impl fmt::Display for WordGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MeaningId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cluster of all surface forms sharing one lemma, part of speech and pair.
///
/// `word_forms` is non-empty and always starts with `base_word`; the remaining
/// forms keep first-seen order so regenerating from the same source is
/// byte-identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordGroup {
    pub id: WordGroupId,
    pub base_word: String,
    pub word_forms: Vec<String>,
    pub part_of_speech: Option<String>,
    pub pair: LanguagePair,
    pub created_at: DateTime<Utc>,
}

/// One discrete sense of a word group, orderable for cycling.
///
/// `meaning_order` values within a group are contiguous from 1; exactly one
/// meaning per non-empty group is primary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meaning {
    pub id: MeaningId,
    pub word_group_id: WordGroupId,
    pub meaning_order: u32,
    pub target_meaning: String,
    pub usage_context: Option<String>,
    pub part_of_speech: Option<String>,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

/// Derived reverse-index row: target-language word back to the source group
/// and meaning that produced it. References are plain arena indices, never
/// owning. For a fixed `target_word`, `lookup_order` runs 1..N with
/// `quality_score` non-increasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverseLookupEntry {
    pub id: u32,
    pub target_word: String,
    pub source_word_group: WordGroupId,
    pub source_meaning: MeaningId,
    pub lookup_order: u32,
    pub quality_score: i32,
    pub created_at: DateTime<Utc>,
}

/// Catalog entry describing one pack to generate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairSpec {
    pub id: String,
    pub name: String,
    pub source_language: String,
    pub target_language: String,
    #[serde(default)]
    pub url: Option<String>,
    /// Expected total entries, used for the coverage threshold.
    pub expected_entries: u64,
}

impl PairSpec {
    pub fn pair(&self) -> LanguagePair {
        LanguagePair::new(self.source_language.clone(), self.target_language.clone())
    }
}

/// Distribution metadata for one published pack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackManifest {
    pub id: String,
    pub name: String,
    pub source_language: String,
    pub target_language: String,
    pub version: String,
    pub schema_version: String,
    pub total_entries: u64,
    pub forward_entries: u64,
    pub reverse_entries: u64,
    pub size_bytes: u64,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

/// Verification check categories, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerifyCategory {
    Structural,
    Referential,
    Coverage,
    Functional,
}

impl fmt::Display for VerifyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VerifyCategory::Structural => "structural",
            VerifyCategory::Referential => "referential",
            VerifyCategory::Coverage => "coverage",
            VerifyCategory::Functional => "functional",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_id_round_trip() {
        let pair: LanguagePair = "es-en".parse().unwrap();
        assert_eq!(pair.source, "es");
        assert_eq!(pair.target, "en");
        assert_eq!(pair.id(), "es-en");
    }

    #[test]
    fn pair_id_rejects_garbage() {
        assert!("es".parse::<LanguagePair>().is_err());
        assert!("-en".parse::<LanguagePair>().is_err());
        assert!("es-".parse::<LanguagePair>().is_err());
    }
}
