use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, params};

use polypack_types::{
    LanguagePair, Meaning, MeaningId, ReverseLookupEntry, WordGroup, WordGroupId,
};

use crate::StoreError;
use crate::cache::{LookupCache, NoCache};
use crate::writer::unpack_forms;

/// A word group with its full meaning cycle, as served to lookups.
#[derive(Debug, Clone)]
pub struct ForwardLookup {
    pub group: WordGroup,
    /// Ordered by `meaning_order`
    pub meanings: Vec<Meaning>,
}

/// One ranked reverse-lookup hit.
#[derive(Debug, Clone)]
pub struct ReverseCandidate {
    pub entry: ReverseLookupEntry,
    pub base_word: String,
}

/// Read-only view over a written pack store.
pub struct PackStore {
    pub(crate) conn: Connection,
    pair: LanguagePair,
    cache: Box<dyn LookupCache>,
}

impl PackStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::open_with_cache(path, Box::new(NoCache))
    }

    pub fn open_with_cache(
        path: &Path,
        cache: Box<dyn LookupCache>,
    ) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let source = read_metadata(&conn, "source_language")?.unwrap_or_default();
        let target = read_metadata(&conn, "target_language")?.unwrap_or_default();
        Ok(Self {
            conn,
            pair: LanguagePair::new(source, target),
            cache,
        })
    }

    pub fn pair(&self) -> &LanguagePair {
        &self.pair
    }

    pub fn metadata(&self, key: &str) -> Result<Option<String>, StoreError> {
        read_metadata(&self.conn, key)
    }

    /// Looks a source-language word up by any of its surface forms,
    /// case-insensitively. A form shared by several groups (homographs
    /// across parts of speech) yields every group, ordered by group id.
    pub fn forward_lookup(&self, word: &str) -> Result<Vec<ForwardLookup>, StoreError> {
        let folded = word.trim().to_lowercase();
        if folded.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(hits) = self.cache.get(&folded) {
            return Ok(hits);
        }

        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT word_group_id FROM word_forms
             WHERE form = ?1 ORDER BY word_group_id",
        )?;
        let ids = stmt.query_map(params![folded], |row| row.get::<_, u32>(0))?;
        let mut hits = Vec::new();
        for id in ids {
            let id = id?;
            hits.push(ForwardLookup {
                group: self.read_group(id)?,
                meanings: self.meanings_of(id)?,
            });
        }
        self.cache.put(&folded, hits.clone());
        Ok(hits)
    }

    /// All ranked hits for a target-language word, best first.
    pub fn reverse_lookup(&self, word: &str) -> Result<Vec<ReverseCandidate>, StoreError> {
        let folded = word.trim().to_lowercase();
        if folded.is_empty() {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.target_word, r.source_word_group, r.source_meaning,
                    r.lookup_order, r.quality_score, r.created_at, g.base_word
             FROM reverse_lookup_entries r
             JOIN word_groups g ON g.id = r.source_word_group
             WHERE r.target_word = ?1
             ORDER BY r.lookup_order",
        )?;
        let rows = stmt.query_map(params![folded], |row| {
            Ok(ReverseCandidate {
                entry: ReverseLookupEntry {
                    id: row.get(0)?,
                    target_word: row.get(1)?,
                    source_word_group: WordGroupId(row.get(2)?),
                    source_meaning: MeaningId(row.get(3)?),
                    lookup_order: row.get(4)?,
                    quality_score: row.get(5)?,
                    created_at: parse_timestamp(row.get::<_, String>(6)?),
                },
                base_word: row.get(7)?,
            })
        })?;
        let mut candidates = Vec::new();
        for row in rows {
            candidates.push(row?);
        }
        Ok(candidates)
    }

    pub fn word_group_count(&self) -> Result<u64, StoreError> {
        self.count("word_groups")
    }

    pub fn meaning_count(&self) -> Result<u64, StoreError> {
        self.count("meanings")
    }

    pub fn reverse_entry_count(&self) -> Result<u64, StoreError> {
        self.count("reverse_lookup_entries")
    }

    fn count(&self, table: &str) -> Result<u64, StoreError> {
        let n: u64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
        Ok(n)
    }

    fn read_group(&self, id: u32) -> Result<WordGroup, StoreError> {
        let group = self.conn.query_row(
            "SELECT id, base_word, word_forms, part_of_speech,
                    source_language, target_language, created_at
             FROM word_groups WHERE id = ?1",
            params![id],
            row_to_group,
        )?;
        Ok(group)
    }

    fn meanings_of(&self, group_id: u32) -> Result<Vec<Meaning>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, word_group_id, meaning_order, target_meaning,
                    usage_context, part_of_speech, is_primary, created_at
             FROM meanings WHERE word_group_id = ?1 ORDER BY meaning_order",
        )?;
        let rows = stmt.query_map(params![group_id], row_to_meaning)?;
        let mut meanings = Vec::new();
        for row in rows {
            meanings.push(row?);
        }
        Ok(meanings)
    }
}

fn row_to_group(row: &Row<'_>) -> rusqlite::Result<WordGroup> {
    Ok(WordGroup {
        id: WordGroupId(row.get(0)?),
        base_word: row.get(1)?,
        word_forms: unpack_forms(&row.get::<_, String>(2)?),
        part_of_speech: row.get(3)?,
        pair: LanguagePair::new(row.get::<_, String>(4)?, row.get::<_, String>(5)?),
        created_at: parse_timestamp(row.get::<_, String>(6)?),
    })
}

fn row_to_meaning(row: &Row<'_>) -> rusqlite::Result<Meaning> {
    Ok(Meaning {
        id: MeaningId(row.get(0)?),
        word_group_id: WordGroupId(row.get(1)?),
        meaning_order: row.get(2)?,
        target_meaning: row.get(3)?,
        usage_context: row.get(4)?,
        part_of_speech: row.get(5)?,
        is_primary: row.get::<_, i32>(6)? != 0,
        created_at: parse_timestamp(row.get::<_, String>(7)?),
    })
}

fn read_metadata(conn: &Connection, key: &str) -> Result<Option<String>, StoreError> {
    let value = conn
        .query_row(
            "SELECT value FROM pack_metadata WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

fn parse_timestamp(raw: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
