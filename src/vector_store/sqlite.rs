//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity. Each source
//! has a row in `sources`; its chunks live in `chunks`, keyed by `(source_id, id)`.

use super::{rank, IndexedSource, Record, ScoredRecord, SourceInfo, VectorStore};
use crate::chunking::Chunk;
use crate::error::{Result, SitatError};
use crate::source::{SourceKind, SourcePosition};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS sources (
        source_id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        kind TEXT NOT NULL,
        origin TEXT NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS chunks (
        source_id TEXT NOT NULL,
        id TEXT NOT NULL,
        chunk_index INTEGER NOT NULL,
        content TEXT NOT NULL,
        char_start INTEGER NOT NULL,
        char_end INTEGER NOT NULL,
        position_kind TEXT NOT NULL,
        position_seconds REAL,
        position_document TEXT,
        position_line INTEGER,
        embedding BLOB NOT NULL,
        PRIMARY KEY (source_id, id)
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_source_index ON chunks(source_id, chunk_index);
    CREATE INDEX IF NOT EXISTS idx_sources_indexed_at ON sources(indexed_at);
"#;

const SELECT_RECORD: &str = r#"
    SELECT id, source_id, chunk_index, content, char_start, char_end,
           position_kind, position_seconds, position_document, position_line, embedding
    FROM chunks
    WHERE source_id = ?1
    ORDER BY chunk_index
"#;

const SELECT_SOURCE: &str = r#"
    SELECT s.source_id, s.title, s.kind, s.origin, s.indexed_at, COUNT(c.id)
    FROM sources s
    LEFT JOIN chunks c ON c.source_id = s.source_id
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Create a new SQLite vector store.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL lets readers keep going while a replace is in flight
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SitatError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding
            .iter()
            .flat_map(|f| f.to_le_bytes())
            .collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn parse_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<Record> {
        let position_kind: String = row.get(6)?;
        let source_position = match position_kind.as_str() {
            "timestamp" => SourcePosition::timestamp(row.get::<_, Option<f64>>(7)?.unwrap_or(0.0)),
            "line" => SourcePosition::line(
                row.get::<_, Option<String>>(8)?.unwrap_or_default(),
                row.get::<_, Option<u32>>(9)?.unwrap_or(1),
            ),
            _ => {
                return Err(rusqlite::Error::InvalidColumnType(
                    6,
                    "position_kind".to_string(),
                    Type::Text,
                ))
            }
        };
        let embedding_bytes: Vec<u8> = row.get(10)?;

        Ok(Record {
            chunk: Chunk {
                id: row.get(0)?,
                source_id: row.get(1)?,
                chunk_index: row.get::<_, i64>(2)? as usize,
                text: row.get(3)?,
                char_start: row.get::<_, i64>(4)? as usize,
                char_end: row.get::<_, i64>(5)? as usize,
                source_position,
            },
            embedding: Self::bytes_to_embedding(&embedding_bytes),
        })
    }

    fn row_to_source(row: &Row<'_>) -> rusqlite::Result<IndexedSource> {
        let kind: String = row.get(2)?;
        let indexed_at: String = row.get(4)?;
        Ok(IndexedSource {
            source_id: row.get(0)?,
            title: row.get(1)?,
            kind: kind.parse::<SourceKind>().map_err(|_| {
                rusqlite::Error::InvalidColumnType(2, "kind".to_string(), Type::Text)
            })?,
            origin: row.get(3)?,
            indexed_at: Self::parse_time(&indexed_at),
            chunk_count: row.get(5)?,
        })
    }

    fn load_records(conn: &Connection, source_id: &str) -> Result<Vec<Record>> {
        let mut stmt = conn.prepare(SELECT_RECORD)?;
        let rows = stmt.query_map(params![source_id], Self::row_to_record)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Write the source row and its chunks inside an open transaction.
    fn write_source(tx: &Transaction<'_>, source: &SourceInfo, records: &[Record]) -> Result<()> {
        tx.execute(
            "DELETE FROM chunks WHERE source_id = ?1",
            params![source.source_id],
        )?;
        tx.execute(
            r#"
            INSERT OR REPLACE INTO sources (source_id, title, kind, origin, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                source.source_id,
                source.title,
                source.kind.to_string(),
                source.origin,
                Utc::now().to_rfc3339(),
            ],
        )?;

        let mut stmt = tx.prepare(
            r#"
            INSERT INTO chunks
            (source_id, id, chunk_index, content, char_start, char_end,
             position_kind, position_seconds, position_document, position_line, embedding)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )?;

        for record in records {
            let chunk = &record.chunk;
            if chunk.source_id != source.source_id {
                return Err(SitatError::InvalidInput(format!(
                    "Chunk {} belongs to {}, not {}",
                    chunk.id, chunk.source_id, source.source_id
                )));
            }

            let (kind, seconds, document, line) = match &chunk.source_position {
                SourcePosition::Timestamp { seconds } => ("timestamp", Some(*seconds), None, None),
                SourcePosition::Line { document, line } => {
                    ("line", None, Some(document.as_str()), Some(*line))
                }
            };

            stmt.execute(params![
                source.source_id,
                chunk.id,
                chunk.chunk_index as i64,
                chunk.text,
                chunk.char_start as i64,
                chunk.char_end as i64,
                kind,
                seconds,
                document,
                line,
                Self::embedding_to_bytes(&record.embedding),
            ])?;
        }

        Ok(())
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, source, records), fields(source_id = %source.source_id))]
    async fn replace_source(&self, source: &SourceInfo, records: &[Record]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        Self::write_source(&tx, source, records)?;
        tx.commit()?;

        info!("Replaced {} with {} records", source.source_id, records.len());
        Ok(records.len())
    }

    #[instrument(skip(self, source, records), fields(source_id = %source.source_id))]
    async fn insert_source(&self, source: &SourceInfo, records: &[Record]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT source_id FROM sources WHERE source_id = ?1",
                params![source.source_id],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(SitatError::ReingestConflict(source.source_id.clone()));
        }

        Self::write_source(&tx, source, records)?;
        tx.commit()?;

        info!("Inserted {} with {} records", source.source_id, records.len());
        Ok(records.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn query(
        &self,
        source_id: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredRecord>> {
        let conn = self.lock()?;
        let records = Self::load_records(&conn, source_id)?;
        let results = rank(&records, query_embedding, limit);

        debug!("Found {} matching records", results.len());
        Ok(results)
    }

    async fn source_exists(&self, source_id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sources WHERE source_id = ?1",
            params![source_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    #[instrument(skip(self))]
    async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{} GROUP BY s.source_id ORDER BY s.indexed_at DESC, s.source_id",
            SELECT_SOURCE
        ))?;
        let rows = stmt.query_map([], Self::row_to_source)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    #[instrument(skip(self))]
    async fn get_source(&self, source_id: &str) -> Result<Option<IndexedSource>> {
        let conn = self.lock()?;
        let source = conn
            .query_row(
                &format!("{} WHERE s.source_id = ?1 GROUP BY s.source_id", SELECT_SOURCE),
                params![source_id],
                Self::row_to_source,
            )
            .optional()?;
        Ok(source)
    }

    #[instrument(skip(self))]
    async fn get_by_source(&self, source_id: &str) -> Result<Vec<Record>> {
        let conn = self.lock()?;
        let records = Self::load_records(&conn, source_id)?;
        debug!("Found {} records for source {}", records.len(), source_id);
        Ok(records)
    }

    #[instrument(skip(self))]
    async fn delete_source(&self, source_id: &str) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let deleted = tx.execute("DELETE FROM chunks WHERE source_id = ?1", params![source_id])?;
        tx.execute("DELETE FROM sources WHERE source_id = ?1", params![source_id])?;
        tx.commit()?;

        info!("Deleted {} records for source {}", deleted, source_id);
        Ok(deleted)
    }

    async fn record_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::test_support::{info, record};

    #[tokio::test]
    async fn test_sqlite_vector_store() {
        let store = SqliteVectorStore::in_memory().unwrap();

        store
            .replace_source(&info("video1"), &[record("video1", 0, 0.0, vec![1.0, 0.0, 0.0])])
            .await
            .unwrap();

        let sources = store.list_sources().await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].source_id, "video1");
        assert_eq!(sources[0].kind, SourceKind::Transcript);
        assert_eq!(sources[0].chunk_count, 1);

        let results = store.query("video1", &[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].score - 1.0).abs() < 0.001);

        let deleted = store.delete_source("video1").await.unwrap();
        assert_eq!(deleted, 1);

        assert!(store.list_sources().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_positions_round_trip_through_columns() {
        let store = SqliteVectorStore::in_memory().unwrap();
        let mut doc = record("docs_notes", 0, 0.0, vec![0.25, -0.5]);
        doc.chunk.source_position = SourcePosition::line("sub/notes.md", 42);
        let clip = record("docs_notes", 1, 12.5, vec![0.5, 0.5]);

        store
            .replace_source(&info("docs_notes"), &[doc.clone(), clip.clone()])
            .await
            .unwrap();

        let stored = store.get_by_source("docs_notes").await.unwrap();
        assert_eq!(stored, vec![doc, clip]);
    }

    #[tokio::test]
    async fn test_replace_is_whole_collection() {
        let store = SqliteVectorStore::in_memory().unwrap();
        let old: Vec<Record> = (0..4).map(|i| record("v", i, i as f64, vec![1.0])).collect();
        store.replace_source(&info("v"), &old).await.unwrap();

        let new = vec![record("v", 0, 0.0, vec![1.0])];
        store.replace_source(&info("v"), &new).await.unwrap();

        assert_eq!(store.record_count().await.unwrap(), 1);
        assert_eq!(store.get_source("v").await.unwrap().unwrap().chunk_count, 1);
    }

    #[tokio::test]
    async fn test_insert_conflict_and_failed_write_leave_data_untouched() {
        let store = SqliteVectorStore::in_memory().unwrap();
        store
            .insert_source(&info("v"), &[record("v", 0, 0.0, vec![1.0])])
            .await
            .unwrap();

        let err = store
            .insert_source(&info("v"), &[record("v", 0, 0.0, vec![2.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, SitatError::ReingestConflict(_)));

        // A record for another source aborts the whole transaction
        let bad = vec![record("v", 0, 0.0, vec![3.0]), record("other", 1, 0.0, vec![3.0])];
        assert!(store.replace_source(&info("v"), &bad).await.is_err());

        let kept = store.get_by_source("v").await.unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].embedding, vec![1.0]);
    }

    #[tokio::test]
    async fn test_on_disk_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("index.db");

        {
            let store = SqliteVectorStore::new(&path).unwrap();
            store
                .replace_source(&info("v"), &[record("v", 0, 5.0, vec![1.0, 2.0])])
                .await
                .unwrap();
        }

        let store = SqliteVectorStore::new(&path).unwrap();
        assert!(store.source_exists("v").await.unwrap());
        assert_eq!(store.record_count().await.unwrap(), 1);
    }
}
