use serde::Deserialize;
use unicode_normalization::UnicodeNormalization;

use polypack_types::LanguagePair;

// JSON structure of one raw source line
#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    headword: String,
    #[serde(default)]
    forms: Vec<String>,
    gloss: String,
    #[serde(default)]
    pos: Option<String>,
    #[serde(default)]
    usage: Option<String>,
}

/// Uniform record emitted per usable source entry. Ephemeral: consumed by the
/// word-group builder, never persisted.
#[derive(Debug, Clone)]
pub struct IntermediateRecord {
    pub headword: String,
    pub forms: Vec<String>,
    /// Raw gloss text, passed through verbatim. May contain markup.
    pub gloss: String,
    pub part_of_speech: Option<String>,
    pub usage_context: Option<String>,
    pub pair: LanguagePair,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("source quality below tolerance: {malformed}/{total} records malformed")]
pub struct SourceQualityError {
    pub malformed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct NormalizeReport {
    pub total: usize,
    pub malformed: usize,
}

/// Parses a raw source dump (JSON lines) into intermediate records.
///
/// Individual malformed entries are counted and skipped; `finish` fails with
/// `SourceQualityError` only when the malformed ratio exceeds the tolerance.
pub struct Normalizer {
    pair: LanguagePair,
    tolerance: f64,
    total: usize,
    malformed: usize,
}

impl Normalizer {
    pub fn new(pair: LanguagePair, tolerance: f64) -> Self {
        Self {
            pair,
            tolerance,
            total: 0,
            malformed: 0,
        }
    }

    /// Consumes one source line, emitting zero or one record.
    /// Blank lines are ignored and not counted.
    pub fn normalize_line(&mut self, line: &str) -> Option<IntermediateRecord> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        self.total += 1;

        let raw: RawEntry = match serde_json::from_str(line) {
            Ok(raw) => raw,
            Err(e) => {
                self.malformed += 1;
                tracing::debug!(error = %e, "skipping malformed source line");
                return None;
            }
        };

        let headword = clean(&raw.headword);
        let forms: Vec<String> = raw
            .forms
            .iter()
            .map(|f| clean(f))
            .filter(|f| !f.is_empty())
            .collect();
        let gloss = raw.gloss.trim();

        // An entry needs a gloss and at least one surface form to be usable
        if gloss.is_empty() || (headword.is_empty() && forms.is_empty()) {
            self.malformed += 1;
            tracing::debug!("skipping source line without headword/gloss");
            return None;
        }

        Some(IntermediateRecord {
            headword,
            forms,
            gloss: gloss.to_string(),
            part_of_speech: raw
                .pos
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            usage_context: raw
                .usage
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string),
            pair: self.pair.clone(),
        })
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn malformed(&self) -> usize {
        self.malformed
    }

    /// Final quality gate over the whole ingestion.
    pub fn finish(self) -> Result<NormalizeReport, SourceQualityError> {
        if self.total > 0 {
            let ratio = self.malformed as f64 / self.total as f64;
            if ratio > self.tolerance {
                return Err(SourceQualityError {
                    malformed: self.malformed,
                    total: self.total,
                });
            }
        }
        Ok(NormalizeReport {
            total: self.total,
            malformed: self.malformed,
        })
    }
}

/// NFC-normalize and trim a surface form
fn clean(s: &str) -> String {
    s.trim().nfc().collect()
}
