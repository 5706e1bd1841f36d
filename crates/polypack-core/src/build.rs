use chrono::{DateTime, Utc};

use polypack_config::{ScoringConfig, SourceConfig};
use polypack_types::{LanguagePair, Meaning, MeaningId, ReverseLookupEntry, WordGroup, WordGroupId};

use crate::group::{GroupDraft, WordGroupBuilder};
use crate::meaning::MeaningAssigner;
use crate::normalize::{Normalizer, SourceQualityError};
use crate::reverse::ReverseIndexBuilder;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    SourceQuality(#[from] SourceQualityError),
    #[error("build invariant violated: {0}")]
    Invariant(String),
}

/// A fully built, validated in-memory pack: arenas of word groups and
/// meanings plus the derived reverse index.
#[derive(Debug)]
pub struct Lexicon {
    pub pair: LanguagePair,
    pub word_groups: Vec<WordGroup>,
    pub meanings: Vec<Meaning>,
    pub reverse: Vec<ReverseLookupEntry>,
}

impl Lexicon {
    /// Validates the structural invariants before accepting the arenas.
    pub fn new(
        pair: LanguagePair,
        word_groups: Vec<WordGroup>,
        meanings: Vec<Meaning>,
        reverse: Vec<ReverseLookupEntry>,
    ) -> Result<Self, BuildError> {
        validate(&word_groups, &meanings, &reverse)?;
        Ok(Self {
            pair,
            word_groups,
            meanings,
            reverse,
        })
    }

    /// Meanings of one group in cycling order.
    pub fn meanings_of(&self, id: WordGroupId) -> Vec<&Meaning> {
        self.meanings
            .iter()
            .filter(|m| m.word_group_id == id)
            .collect()
    }

    /// Forward plus reverse entry count, the unit the coverage check uses.
    pub fn total_entries(&self) -> u64 {
        self.meanings.len() as u64 + self.reverse.len() as u64
    }
}

/// Turns group drafts into id-bearing arenas. Groups whose glosses all
/// collapse to nothing are dropped rather than stored empty.
pub fn assemble(
    pair: &LanguagePair,
    drafts: Vec<GroupDraft>,
    created_at: DateTime<Utc>,
) -> Result<(Vec<WordGroup>, Vec<Meaning>), BuildError> {
    let mut word_groups = Vec::new();
    let mut meanings = Vec::new();

    for draft in drafts {
        let assigned = MeaningAssigner::assign(&draft.glosses);
        if assigned.is_empty() {
            tracing::debug!(base_word = %draft.base_word, "dropping group with no usable meanings");
            continue;
        }

        let group_id = WordGroupId(word_groups.len() as u32);
        for m in assigned {
            meanings.push(Meaning {
                id: MeaningId(meanings.len() as u32),
                word_group_id: group_id,
                meaning_order: m.order,
                target_meaning: m.target_meaning,
                usage_context: m.usage_context,
                part_of_speech: m.part_of_speech,
                is_primary: m.is_primary,
                created_at,
            });
        }
        word_groups.push(WordGroup {
            id: group_id,
            base_word: draft.base_word,
            word_forms: draft.word_forms,
            part_of_speech: draft.part_of_speech,
            pair: pair.clone(),
            created_at,
        });
    }

    Ok((word_groups, meanings))
}

fn validate(
    word_groups: &[WordGroup],
    meanings: &[Meaning],
    reverse: &[ReverseLookupEntry],
) -> Result<(), BuildError> {
    for (i, group) in word_groups.iter().enumerate() {
        if group.id.0 as usize != i {
            return Err(BuildError::Invariant(format!(
                "word group id {} out of arena position {i}",
                group.id
            )));
        }
        if group.word_forms.is_empty() || group.word_forms[0] != group.base_word {
            return Err(BuildError::Invariant(format!(
                "word group {} forms must start with its base word",
                group.base_word
            )));
        }
    }

    let mut orders: Vec<Vec<(u32, bool)>> = vec![Vec::new(); word_groups.len()];
    for (i, meaning) in meanings.iter().enumerate() {
        if meaning.id.0 as usize != i {
            return Err(BuildError::Invariant(format!(
                "meaning id {} out of arena position {i}",
                meaning.id
            )));
        }
        let gid = meaning.word_group_id.0 as usize;
        if gid >= word_groups.len() {
            return Err(BuildError::Invariant(format!(
                "meaning {} references missing group {}",
                meaning.id, meaning.word_group_id
            )));
        }
        orders[gid].push((meaning.meaning_order, meaning.is_primary));
    }

    for (gid, group_orders) in orders.iter().enumerate() {
        if group_orders.is_empty() {
            return Err(BuildError::Invariant(format!(
                "word group {} has no meanings",
                word_groups[gid].base_word
            )));
        }
        let contiguous = group_orders
            .iter()
            .enumerate()
            .all(|(i, &(order, _))| order == i as u32 + 1);
        if !contiguous {
            return Err(BuildError::Invariant(format!(
                "word group {} meaning orders are not contiguous from 1",
                word_groups[gid].base_word
            )));
        }
        let primaries = group_orders.iter().filter(|&&(_, p)| p).count();
        if primaries != 1 {
            return Err(BuildError::Invariant(format!(
                "word group {} has {primaries} primary meanings",
                word_groups[gid].base_word
            )));
        }
    }

    for entry in reverse {
        if entry.source_word_group.0 as usize >= word_groups.len()
            || entry.source_meaning.0 as usize >= meanings.len()
        {
            return Err(BuildError::Invariant(format!(
                "reverse entry {} references missing source",
                entry.id
            )));
        }
    }

    Ok(())
}

/// One-shot builder running the whole chain: normalize, group, assign,
/// invert, validate. The pipeline drives the stages individually to report
/// progress; this wrapper is for tests and embedders.
pub struct LexiconBuilder {
    pair: LanguagePair,
    normalizer: Normalizer,
    groups: WordGroupBuilder,
    scoring: ScoringConfig,
}

impl LexiconBuilder {
    pub fn new(pair: LanguagePair, source: &SourceConfig, scoring: ScoringConfig) -> Self {
        Self {
            normalizer: Normalizer::new(pair.clone(), source.malformed_tolerance),
            pair,
            groups: WordGroupBuilder::new(),
            scoring,
        }
    }

    pub fn push_line(&mut self, line: &str) {
        if let Some(record) = self.normalizer.normalize_line(line) {
            self.groups.push(record);
        }
    }

    pub fn finish(self) -> Result<Lexicon, BuildError> {
        self.normalizer.finish()?;
        let created_at = Utc::now();
        let (word_groups, meanings) = assemble(&self.pair, self.groups.finish(), created_at)?;
        let reverse =
            ReverseIndexBuilder::new(self.scoring).build(&word_groups, &meanings, created_at);
        Lexicon::new(self.pair, word_groups, meanings, reverse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> LexiconBuilder {
        LexiconBuilder::new(
            LanguagePair::new("es", "en"),
            &SourceConfig::default(),
            ScoringConfig::default(),
        )
    }

    fn sample_lexicon() -> Lexicon {
        let mut b = builder();
        b.push_line(r#"{"headword":"agua","forms":["aguas"],"gloss":"water","pos":"noun"}"#);
        b.push_line(r#"{"headword":"agua","gloss":"rain, drizzle","pos":"noun"}"#);
        b.push_line(r#"{"headword":"lluvia","gloss":"rain","pos":"noun"}"#);
        b.push_line(r#"{"headword":"correr","gloss":"to run","pos":"verb"}"#);
        b.finish().unwrap()
    }

    #[test]
    fn builds_groups_meanings_and_reverse() {
        let lex = sample_lexicon();
        assert_eq!(lex.word_groups.len(), 3);
        assert_eq!(lex.meanings.len(), 4);
        assert!(!lex.reverse.is_empty());
        assert_eq!(lex.total_entries(), 4 + lex.reverse.len() as u64);
    }

    #[test]
    fn agua_cycles_through_both_meanings() {
        let lex = sample_lexicon();
        let agua = lex
            .word_groups
            .iter()
            .find(|g| g.base_word == "agua")
            .unwrap();
        let meanings = lex.meanings_of(agua.id);
        assert_eq!(meanings.len(), 2);
        assert_eq!(meanings[0].target_meaning, "water");
        assert!(meanings[0].is_primary);
        assert_eq!(meanings[1].target_meaning, "rain, drizzle");
        assert_eq!(meanings[1].meaning_order, 2);
    }

    #[test]
    fn reverse_rain_prefers_the_primary_source() {
        let lex = sample_lexicon();
        let rain: Vec<_> = lex
            .reverse
            .iter()
            .filter(|e| e.target_word == "rain")
            .collect();
        assert_eq!(rain.len(), 2);
        let first_group = &lex.word_groups[rain[0].source_word_group.0 as usize];
        assert_eq!(first_group.base_word, "lluvia");
    }

    #[test]
    fn groups_with_only_qualifier_glosses_are_dropped() {
        let mut b = builder();
        b.push_line(r#"{"headword":"che","gloss":"(interjection)"}"#);
        b.push_line(r#"{"headword":"agua","gloss":"water"}"#);
        let lex = b.finish().unwrap();
        assert_eq!(lex.word_groups.len(), 1);
        assert_eq!(lex.word_groups[0].base_word, "agua");
    }

    #[test]
    fn water_prefers_its_primary_source() {
        let mut b = builder();
        b.push_line(r#"{"headword":"agua","gloss":"water","pos":"noun"}"#);
        b.push_line(r#"{"headword":"mar","gloss":"sea","pos":"noun"}"#);
        b.push_line(r#"{"headword":"mar","gloss":"water, expanse of it","pos":"noun"}"#);
        let lex = b.finish().unwrap();

        let water: Vec<_> = lex
            .reverse
            .iter()
            .filter(|e| e.target_word == "water")
            .collect();
        assert_eq!(water.len(), 2);
        // agua's primary meaning outranks mar's secondary one
        assert_eq!(
            lex.word_groups[water[0].source_word_group.0 as usize].base_word,
            "agua"
        );
        assert_eq!(
            lex.word_groups[water[1].source_word_group.0 as usize].base_word,
            "mar"
        );
    }

    #[test]
    fn build_survives_tolerated_corruption() {
        let mut b = builder();
        for i in 0..100 {
            if i % 10 == 0 {
                b.push_line("{{corrupt");
            } else {
                b.push_line(&format!(
                    r#"{{"headword":"palabra{i}","gloss":"word {i}"}}"#
                ));
            }
        }
        let lex = b.finish().unwrap();
        assert_eq!(lex.word_groups.len(), 90);
    }

    #[test]
    fn build_fails_on_excess_corruption() {
        let mut b = builder();
        for i in 0..100 {
            if i < 60 {
                b.push_line("{{corrupt");
            } else {
                b.push_line(&format!(
                    r#"{{"headword":"palabra{i}","gloss":"word {i}"}}"#
                ));
            }
        }
        assert!(matches!(b.finish(), Err(BuildError::SourceQuality(_))));
    }

    #[test]
    fn validation_rejects_orphan_meaning() {
        let created_at = Utc::now();
        let pair = LanguagePair::new("es", "en");
        let groups = vec![WordGroup {
            id: WordGroupId(0),
            base_word: "agua".to_string(),
            word_forms: vec!["agua".to_string()],
            part_of_speech: None,
            pair: pair.clone(),
            created_at,
        }];
        let meanings = vec![Meaning {
            id: MeaningId(0),
            word_group_id: WordGroupId(7),
            meaning_order: 1,
            target_meaning: "water".to_string(),
            usage_context: None,
            part_of_speech: None,
            is_primary: true,
            created_at,
        }];
        assert!(matches!(
            Lexicon::new(pair, groups, meanings, Vec::new()),
            Err(BuildError::Invariant(_))
        ));
    }

    #[test]
    fn validation_rejects_group_without_meanings() {
        let created_at = Utc::now();
        let pair = LanguagePair::new("es", "en");
        let groups = vec![WordGroup {
            id: WordGroupId(0),
            base_word: "agua".to_string(),
            word_forms: vec!["agua".to_string()],
            part_of_speech: None,
            pair: pair.clone(),
            created_at,
        }];
        assert!(matches!(
            Lexicon::new(pair, groups, Vec::new(), Vec::new()),
            Err(BuildError::Invariant(_))
        ));
    }

    #[test]
    fn rebuilding_from_same_source_is_identical() {
        let a = sample_lexicon();
        let b = sample_lexicon();
        assert_eq!(a.word_groups.len(), b.word_groups.len());
        for (ga, gb) in a.word_groups.iter().zip(&b.word_groups) {
            assert_eq!(ga.base_word, gb.base_word);
            assert_eq!(ga.word_forms, gb.word_forms);
        }
        for (ma, mb) in a.meanings.iter().zip(&b.meanings) {
            assert_eq!(ma.target_meaning, mb.target_meaning);
            assert_eq!(ma.meaning_order, mb.meaning_order);
        }
        for (ra, rb) in a.reverse.iter().zip(&b.reverse) {
            assert_eq!(ra.target_word, rb.target_word);
            assert_eq!(ra.quality_score, rb.quality_score);
            assert_eq!(ra.lookup_order, rb.lookup_order);
        }
    }
}
