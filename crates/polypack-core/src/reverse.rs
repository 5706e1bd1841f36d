use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use polypack_config::ScoringConfig;
use polypack_types::{Meaning, MeaningId, ReverseLookupEntry, WordGroup, WordGroupId};

/// Derives the reverse index from finished word groups and meanings.
///
/// Every entry references its source group and meaning by arena index, so the
/// index can be rebuilt from scratch at any time without touching forward data.
pub struct ReverseIndexBuilder {
    scoring: ScoringConfig,
}

impl ReverseIndexBuilder {
    pub fn new(scoring: ScoringConfig) -> Self {
        Self { scoring }
    }

    pub fn build(
        &self,
        groups: &[WordGroup],
        meanings: &[Meaning],
        created_at: DateTime<Utc>,
    ) -> Vec<ReverseLookupEntry> {
        let mut meaning_counts: HashMap<WordGroupId, u32> = HashMap::new();
        for meaning in meanings {
            *meaning_counts.entry(meaning.word_group_id).or_insert(0) += 1;
        }

        // BTreeMap keeps target words ordered so entry ids are deterministic
        let mut buckets: BTreeMap<String, Vec<(i32, WordGroupId, MeaningId)>> = BTreeMap::new();

        for meaning in meanings {
            let Some(group) = groups.get(meaning.word_group_id.0 as usize) else {
                continue;
            };
            let Some(target_word) = head_token(&meaning.target_meaning) else {
                continue;
            };
            // a reverse entry pointing back at its own headword is useless
            if target_word == group.base_word.to_lowercase() {
                continue;
            }

            let count = meaning_counts.get(&meaning.word_group_id).copied().unwrap_or(1);
            let score = self.score(meaning, count);
            buckets
                .entry(target_word)
                .or_default()
                .push((score, meaning.word_group_id, meaning.id));
        }

        let mut entries = Vec::new();
        let mut next_id: u32 = 1;
        for (target_word, mut candidates) in buckets {
            // stable: equal scores keep meaning arena order
            candidates.sort_by(|a, b| b.0.cmp(&a.0));
            for (order, (score, group_id, meaning_id)) in candidates.into_iter().enumerate() {
                entries.push(ReverseLookupEntry {
                    id: next_id,
                    target_word: target_word.clone(),
                    source_word_group: group_id,
                    source_meaning: meaning_id,
                    lookup_order: order as u32 + 1,
                    quality_score: score,
                    created_at,
                });
                next_id += 1;
            }
        }
        entries
    }

    fn score(&self, meaning: &Meaning, group_meaning_count: u32) -> i32 {
        let s = &self.scoring;
        let mut score = s.base_score;
        if meaning.is_primary {
            score += s.primary_bonus;
        }
        let ambiguity = s
            .ambiguity_penalty
            .saturating_mul(group_meaning_count.saturating_sub(1) as i32)
            .min(s.ambiguity_penalty_cap);
        score -= ambiguity;
        if let Some(ctx) = &meaning.usage_context {
            if s.is_restricted(ctx) {
                score -= s.restricted_penalty;
            }
        }
        score
    }
}

/// Extracts the representative target-language word from a gloss: strip
/// markup, take the first comma/semicolon part, then its first word trimmed
/// of punctuation. Falls back to the whole cleaned gloss when no single word
/// qualifies. Always lowercased.
fn head_token(gloss: &str) -> Option<String> {
    let cleaned = strip_tags(gloss);
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }

    let first_part = cleaned
        .split([',', ';'])
        .next()
        .unwrap_or(cleaned)
        .trim();

    if let Some(word) = first_part.split_whitespace().next() {
        let word = word.trim_matches(|c: char| !c.is_alphanumeric());
        if word.chars().count() > 2 && word.chars().all(wordlike) {
            return Some(word.to_lowercase());
        }
    }

    Some(cleaned.to_lowercase())
}

fn wordlike(c: char) -> bool {
    c.is_alphabetic() || c == '-' || c == '\''
}

/// Drops `<...>` markup spans, keeping everything between them.
fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}
