use std::collections::HashSet;

use crate::group::RawGloss;

/// An ordered meaning for a word group, before it gets an arena id.
#[derive(Debug, Clone)]
pub struct MeaningDraft {
    pub target_meaning: String,
    pub usage_context: Option<String>,
    pub part_of_speech: Option<String>,
    pub is_primary: bool,
    pub order: u32,
}

/// Turns a group's raw glosses into a deduplicated, ordered meaning list.
pub struct MeaningAssigner;

impl MeaningAssigner {
    /// First occurrence wins; order is 1-based and the first meaning is
    /// primary. Duplicate detection ignores case and whitespace runs.
    pub fn assign(glosses: &[RawGloss]) -> Vec<MeaningDraft> {
        let mut seen = HashSet::new();
        let mut drafts = Vec::new();

        for gloss in glosses {
            let (context, body) = split_usage_context(&gloss.text);
            if body.is_empty() {
                continue;
            }
            if !seen.insert(dedupe_key(&body)) {
                continue;
            }
            let order = drafts.len() as u32 + 1;
            drafts.push(MeaningDraft {
                target_meaning: body,
                // inline parenthetical context beats the source usage field
                usage_context: context.or_else(|| gloss.usage.clone()),
                part_of_speech: gloss.part_of_speech.clone(),
                is_primary: order == 1,
                order,
            });
        }

        drafts
    }
}

/// Splits a leading `(ctx) body` or trailing `body (ctx)` parenthetical off
/// the gloss. A gloss that is nothing but a qualifier yields an empty body,
/// which the assigner drops.
fn split_usage_context(gloss: &str) -> (Option<String>, String) {
    let gloss = gloss.trim();

    if let Some(rest) = gloss.strip_prefix('(') {
        if let Some(close) = rest.find(')') {
            let ctx = rest[..close].trim();
            let body = rest[close + 1..].trim();
            if !ctx.is_empty() {
                return (Some(ctx.to_string()), body.to_string());
            }
        }
    }

    if gloss.ends_with(')') {
        if let Some(open) = gloss.rfind('(') {
            let ctx = gloss[open + 1..gloss.len() - 1].trim();
            let body = gloss[..open].trim();
            if !ctx.is_empty() && !body.is_empty() {
                return (Some(ctx.to_string()), body.to_string());
            }
        }
    }

    (None, gloss.to_string())
}

fn dedupe_key(body: &str) -> String {
    body.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
