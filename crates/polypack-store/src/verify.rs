use rusqlite::params;

use polypack_config::VerifyConfig;
use polypack_types::VerifyCategory;

use crate::StoreError;
use crate::reader::PackStore;

const REQUIRED_TABLES: &[&str] = &[
    "word_groups",
    "word_forms",
    "meanings",
    "reverse_lookup_entries",
    "pack_metadata",
];

const REQUIRED_INDEXES: &[&str] = &[
    "idx_groups_base_word",
    "idx_forms_form",
    "idx_meanings_group",
    "idx_reverse_target",
];

/// Counts reported by a successful verification.
#[derive(Debug, Clone, Copy)]
pub struct VerifyReport {
    pub word_groups: u64,
    pub meanings: u64,
    pub reverse_entries: u64,
    pub total_entries: u64,
    pub probes_run: usize,
    pub probes_failed: usize,
}

/// Runs the post-write checks against a store, in order: structural,
/// referential, coverage, functional. The first failing category aborts
/// the run.
pub struct IntegrityVerifier {
    config: VerifyConfig,
}

impl IntegrityVerifier {
    pub fn new(config: VerifyConfig) -> Self {
        Self { config }
    }

    pub fn verify(
        &self,
        store: &PackStore,
        expected_entries: u64,
    ) -> Result<VerifyReport, StoreError> {
        self.check_structure(store)?;
        self.check_references(store)?;

        let word_groups = store.word_group_count()?;
        let meanings = store.meaning_count()?;
        let reverse_entries = store.reverse_entry_count()?;
        let total_entries = meanings + reverse_entries;
        self.check_coverage(total_entries, expected_entries)?;

        let (probes_run, probes_failed) = self.check_lookups(store)?;

        tracing::info!(
            pair = %store.pair(),
            word_groups,
            total_entries,
            probes_run,
            probes_failed,
            "store verified"
        );
        Ok(VerifyReport {
            word_groups,
            meanings,
            reverse_entries,
            total_entries,
            probes_run,
            probes_failed,
        })
    }

    fn check_structure(&self, store: &PackStore) -> Result<(), StoreError> {
        for table in REQUIRED_TABLES {
            if !object_exists(store, "table", table)? {
                return Err(fail(
                    VerifyCategory::Structural,
                    format!("missing table {table}"),
                ));
            }
        }
        for index in REQUIRED_INDEXES {
            if !object_exists(store, "index", index)? {
                return Err(fail(
                    VerifyCategory::Structural,
                    format!("missing index {index}"),
                ));
            }
        }
        Ok(())
    }

    fn check_references(&self, store: &PackStore) -> Result<(), StoreError> {
        let checks = [
            (
                "meanings referencing missing word groups",
                "SELECT COUNT(*) FROM meanings m
                 LEFT JOIN word_groups g ON g.id = m.word_group_id
                 WHERE g.id IS NULL",
            ),
            (
                "reverse entries referencing missing word groups",
                "SELECT COUNT(*) FROM reverse_lookup_entries r
                 LEFT JOIN word_groups g ON g.id = r.source_word_group
                 WHERE g.id IS NULL",
            ),
            (
                "reverse entries referencing missing meanings",
                "SELECT COUNT(*) FROM reverse_lookup_entries r
                 LEFT JOIN meanings m ON m.id = r.source_meaning
                 WHERE m.id IS NULL",
            ),
            (
                "word groups without meanings",
                "SELECT COUNT(*) FROM word_groups g
                 LEFT JOIN meanings m ON m.word_group_id = g.id
                 WHERE m.id IS NULL",
            ),
        ];
        for (what, sql) in checks {
            let orphans: u64 = store.conn.query_row(sql, [], |row| row.get(0))?;
            if orphans > 0 {
                return Err(fail(
                    VerifyCategory::Referential,
                    format!("{orphans} {what}"),
                ));
            }
        }
        Ok(())
    }

    fn check_coverage(&self, total: u64, expected: u64) -> Result<(), StoreError> {
        if expected == 0 {
            return Ok(());
        }
        let required = (expected as f64 * self.config.min_coverage).ceil() as u64;
        if total < required {
            return Err(fail(
                VerifyCategory::Coverage,
                format!("{total} entries, need at least {required} of {expected} expected"),
            ));
        }
        Ok(())
    }

    /// Samples stored words at a fixed stride and replays real lookups
    /// against them.
    fn check_lookups(&self, store: &PackStore) -> Result<(usize, usize), StoreError> {
        let mut run = 0usize;
        let mut failed = 0usize;

        for word in sample(
            store,
            "SELECT COUNT(*) FROM word_groups",
            "SELECT base_word FROM word_groups ORDER BY id",
            self.config.forward_probes,
        )? {
            run += 1;
            if !forward_probe_ok(store, &word)? {
                tracing::warn!(word, "forward probe failed");
                failed += 1;
            }
        }

        for word in sample(
            store,
            "SELECT COUNT(DISTINCT target_word) FROM reverse_lookup_entries",
            "SELECT DISTINCT target_word FROM reverse_lookup_entries ORDER BY target_word",
            self.config.reverse_probes,
        )? {
            run += 1;
            if !reverse_probe_ok(store, &word)? {
                tracing::warn!(word, "reverse probe failed");
                failed += 1;
            }
        }

        if run > 0 {
            let ratio = failed as f64 / run as f64;
            if ratio > self.config.probe_failure_tolerance {
                return Err(fail(
                    VerifyCategory::Functional,
                    format!("{failed}/{run} lookup probes failed"),
                ));
            }
        }
        Ok((run, failed))
    }
}

fn fail(category: VerifyCategory, detail: String) -> StoreError {
    StoreError::Verification { category, detail }
}

fn object_exists(store: &PackStore, kind: &str, name: &str) -> Result<bool, StoreError> {
    let n: u64 = store.conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = ?1 AND name = ?2",
        params![kind, name],
        |row| row.get(0),
    )?;
    Ok(n > 0)
}

/// Deterministic stride sampling: up to `limit` evenly spaced rows. Streams
/// the cursor keeping only every stride-th row, so memory stays bounded by
/// `limit` regardless of pack size.
fn sample(
    store: &PackStore,
    count_sql: &str,
    select_sql: &str,
    limit: usize,
) -> Result<Vec<String>, StoreError> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    let total: u64 = store.conn.query_row(count_sql, [], |row| row.get(0))?;
    if total == 0 {
        return Ok(Vec::new());
    }
    let stride = (total as usize).div_ceil(limit).max(1);

    let mut stmt = store.conn.prepare(select_sql)?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut sampled = Vec::new();
    for (i, row) in rows.enumerate() {
        let word = row?;
        if i % stride == 0 {
            sampled.push(word);
            if sampled.len() == limit {
                break;
            }
        }
    }
    Ok(sampled)
}

fn forward_probe_ok(store: &PackStore, word: &str) -> Result<bool, StoreError> {
    let hits = store.forward_lookup(word)?;
    if hits.is_empty() {
        return Ok(false);
    }
    for hit in &hits {
        if hit.meanings.is_empty() {
            return Ok(false);
        }
        let contiguous = hit
            .meanings
            .iter()
            .enumerate()
            .all(|(i, m)| m.meaning_order == i as u32 + 1);
        let primaries = hit.meanings.iter().filter(|m| m.is_primary).count();
        if !contiguous || primaries != 1 {
            return Ok(false);
        }
    }
    Ok(true)
}

fn reverse_probe_ok(store: &PackStore, word: &str) -> Result<bool, StoreError> {
    let candidates = store.reverse_lookup(word)?;
    if candidates.is_empty() {
        return Ok(false);
    }
    let ranked = candidates
        .windows(2)
        .all(|w| w[0].entry.quality_score >= w[1].entry.quality_score);
    Ok(ranked)
}
