use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, params};

use polypack_core::Lexicon;

use crate::{SCHEMA_VERSION, StoreError};

/// Separator for the packed `word_forms` column. Unit separator, cannot
/// appear in normalized text.
const FORM_SEP: char = '\u{1f}';

/// Writes a finished lexicon into a fresh SQLite store.
///
/// Everything lands in a `.tmp` sibling first; the final path only ever
/// holds a complete store.
pub struct StoreWriter;

impl StoreWriter {
    pub fn write(lexicon: &Lexicon, path: &Path) -> Result<PathBuf, StoreError> {
        let tmp = tmp_path(path);
        if tmp.exists() {
            fs::remove_file(&tmp)?;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut conn = Connection::open(&tmp)?;
        // the store is rebuilt from source on any failure, durability
        // mid-write buys nothing
        conn.pragma_update(None, "journal_mode", "MEMORY")?;
        conn.pragma_update(None, "synchronous", "OFF")?;

        create_schema(&conn)?;
        insert_all(&mut conn, lexicon)?;
        conn.close().map_err(|(_, e)| e)?;

        fs::rename(&tmp, path)?;
        tracing::info!(
            pair = %lexicon.pair,
            word_groups = lexicon.word_groups.len(),
            meanings = lexicon.meanings.len(),
            reverse_entries = lexicon.reverse.len(),
            path = %path.display(),
            "store written"
        );
        Ok(path.to_path_buf())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}

fn create_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE word_groups (
            id INTEGER PRIMARY KEY,
            base_word TEXT NOT NULL,
            word_forms TEXT NOT NULL,
            part_of_speech TEXT,
            source_language TEXT NOT NULL,
            target_language TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE TABLE word_forms (
            form TEXT NOT NULL,
            word_group_id INTEGER NOT NULL
        );
        CREATE TABLE meanings (
            id INTEGER PRIMARY KEY,
            word_group_id INTEGER NOT NULL,
            meaning_order INTEGER NOT NULL,
            target_meaning TEXT NOT NULL,
            usage_context TEXT,
            part_of_speech TEXT,
            is_primary INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE TABLE reverse_lookup_entries (
            id INTEGER PRIMARY KEY,
            target_word TEXT NOT NULL,
            source_word_group INTEGER NOT NULL,
            source_meaning INTEGER NOT NULL,
            lookup_order INTEGER NOT NULL,
            quality_score INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE TABLE pack_metadata (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        CREATE INDEX idx_groups_base_word ON word_groups(base_word, part_of_speech);
        CREATE INDEX idx_forms_form ON word_forms(form);
        CREATE INDEX idx_meanings_group ON meanings(word_group_id, meaning_order);
        CREATE INDEX idx_reverse_target ON reverse_lookup_entries(target_word, lookup_order);",
    )?;
    Ok(())
}

fn insert_all(conn: &mut Connection, lexicon: &Lexicon) -> Result<(), StoreError> {
    let tx = conn.unchecked_transaction()?;

    {
        let mut group_stmt = tx.prepare(
            "INSERT INTO word_groups (id, base_word, word_forms, part_of_speech,
                                      source_language, target_language, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        let mut form_stmt =
            tx.prepare("INSERT INTO word_forms (form, word_group_id) VALUES (?1, ?2)")?;
        for group in &lexicon.word_groups {
            let packed: String = group
                .word_forms
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(&FORM_SEP.to_string());
            group_stmt.execute(params![
                group.id.0,
                group.base_word,
                packed,
                group.part_of_speech,
                group.pair.source,
                group.pair.target,
                group.created_at.to_rfc3339(),
            ])?;
            for form in &group.word_forms {
                form_stmt.execute(params![form.to_lowercase(), group.id.0])?;
            }
        }

        let mut meaning_stmt = tx.prepare(
            "INSERT INTO meanings (id, word_group_id, meaning_order, target_meaning,
                                   usage_context, part_of_speech, is_primary, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for meaning in &lexicon.meanings {
            meaning_stmt.execute(params![
                meaning.id.0,
                meaning.word_group_id.0,
                meaning.meaning_order,
                meaning.target_meaning,
                meaning.usage_context,
                meaning.part_of_speech,
                meaning.is_primary as i32,
                meaning.created_at.to_rfc3339(),
            ])?;
        }

        let mut reverse_stmt = tx.prepare(
            "INSERT INTO reverse_lookup_entries (id, target_word, source_word_group,
                                                 source_meaning, lookup_order, quality_score, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for entry in &lexicon.reverse {
            reverse_stmt.execute(params![
                entry.id,
                entry.target_word,
                entry.source_word_group.0,
                entry.source_meaning.0,
                entry.lookup_order,
                entry.quality_score,
                entry.created_at.to_rfc3339(),
            ])?;
        }

        let mut meta_stmt =
            tx.prepare("INSERT INTO pack_metadata (key, value) VALUES (?1, ?2)")?;
        let metadata = [
            ("pack_id", lexicon.pair.id()),
            ("source_language", lexicon.pair.source.clone()),
            ("target_language", lexicon.pair.target.clone()),
            ("pack_type", "bidirectional".to_string()),
            ("schema_version", SCHEMA_VERSION.to_string()),
            ("created_at", chrono::Utc::now().to_rfc3339()),
            ("word_group_count", lexicon.word_groups.len().to_string()),
            ("meaning_count", lexicon.meanings.len().to_string()),
            (
                "reverse_entry_count",
                lexicon.reverse.len().to_string(),
            ),
        ];
        for (key, value) in metadata {
            meta_stmt.execute(params![key, value])?;
        }
    }

    tx.commit()?;
    Ok(())
}

pub(crate) fn unpack_forms(packed: &str) -> Vec<String> {
    packed.split(FORM_SEP).map(str::to_string).collect()
}
