use std::collections::HashMap;

use crate::normalize::IntermediateRecord;

/// Chooses the canonical base word for a record.
///
/// Implementations must be pure: the same record always yields the same
/// canonical form, otherwise grouping stops being idempotent.
pub trait LemmaPolicy: Send + Sync {
    fn canonical(&self, record: &IntermediateRecord) -> String;
}

/// Default policy: the headword as given, falling back to the first
/// alternate form when the source omitted a headword.
pub struct FirstSeen;

impl LemmaPolicy for FirstSeen {
    fn canonical(&self, record: &IntermediateRecord) -> String {
        if !record.headword.is_empty() {
            record.headword.clone()
        } else {
            record.forms.first().cloned().unwrap_or_default()
        }
    }
}

/// One gloss attached to a group, before meaning assignment.
#[derive(Debug, Clone)]
pub struct RawGloss {
    pub text: String,
    pub usage: Option<String>,
    pub part_of_speech: Option<String>,
}

/// A word group under construction: canonical word, merged surface forms,
/// and every gloss seen for it, in source order.
#[derive(Debug, Clone)]
pub struct GroupDraft {
    pub base_word: String,
    pub word_forms: Vec<String>,
    pub part_of_speech: Option<String>,
    pub glosses: Vec<RawGloss>,
}

/// Folds intermediate records into word groups keyed on
/// (canonical word, part of speech), case-insensitively.
pub struct WordGroupBuilder {
    groups: Vec<GroupDraft>,
    index: HashMap<(String, Option<String>), usize>,
    policy: Box<dyn LemmaPolicy>,
}

impl WordGroupBuilder {
    pub fn new() -> Self {
        Self::with_policy(Box::new(FirstSeen))
    }

    pub fn with_policy(policy: Box<dyn LemmaPolicy>) -> Self {
        Self {
            groups: Vec::new(),
            index: HashMap::new(),
            policy,
        }
    }

    pub fn push(&mut self, record: IntermediateRecord) {
        let canonical = self.policy.canonical(&record);
        if canonical.is_empty() {
            return;
        }

        let key = (
            canonical.to_lowercase(),
            record.part_of_speech.as_deref().map(str::to_lowercase),
        );

        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                let idx = self.groups.len();
                self.groups.push(GroupDraft {
                    base_word: canonical.clone(),
                    word_forms: vec![canonical.clone()],
                    part_of_speech: record.part_of_speech.clone(),
                    glosses: Vec::new(),
                });
                self.index.insert(key, idx);
                idx
            }
        };

        let group = &mut self.groups[idx];
        merge_form(&mut group.word_forms, &record.headword);
        for form in &record.forms {
            merge_form(&mut group.word_forms, form);
        }
        group.glosses.push(RawGloss {
            text: record.gloss,
            usage: record.usage_context,
            part_of_speech: record.part_of_speech,
        });
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Yields groups in first-seen order.
    pub fn finish(self) -> Vec<GroupDraft> {
        self.groups
    }
}

impl Default for WordGroupBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered set union on surface forms, exact-string dedupe.
fn merge_form(forms: &mut Vec<String>, form: &str) {
    if form.is_empty() {
        return;
    }
    if !forms.iter().any(|f| f == form) {
        forms.push(form.to_string());
    }
}
