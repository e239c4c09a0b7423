//! SQLite block store.
//!
//! Blocks live in a single insert-only table keyed by index:
//! - WAL journal mode with `synchronous=NORMAL` for crash recovery
//! - payload stored as its canonical JSON; text that does not decode back to
//!   the same bytes loads as `BlockPayload::Unreadable` and fails verification
//! - no UPDATE or DELETE statements are ever issued

use crate::block::{Block, BlockPayload};
use crate::store::{BlockStore, Result, StoreError};
use rusqlite::{params, Connection, OpenFlags};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub struct SqliteBlockStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteBlockStore {
    /// Create or open a block store at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Opening ledger block store");

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Volatile store for tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn, path: None })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS ledger_blocks (
                idx INTEGER PRIMARY KEY,
                timestamp INTEGER NOT NULL,
                payload TEXT NOT NULL,
                previous_hash TEXT NOT NULL,
                hash TEXT NOT NULL,
                nonce INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_block_hash ON ledger_blocks(hash);
            "#,
        )?;
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Execute raw SQL for testing purposes only.
    ///
    /// Bypasses every ledger guarantee; used to simulate tampering at rest.
    #[doc(hidden)]
    pub fn __test_execute_raw_sql(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<usize> {
        Ok(self.conn.execute(sql, params)?)
    }
}

impl BlockStore for SqliteBlockStore {
    fn load(&self) -> Result<Vec<Block>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT idx, timestamp, payload, previous_hash, hash, nonce
            FROM ledger_blocks
            ORDER BY idx ASC
            "#,
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)? as u64,
                    row.get::<_, i64>(1)? as u64,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i64>(5)? as u64,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .map(|(index, timestamp, payload, previous_hash, hash, nonce)| {
                let payload = BlockPayload::from_stored(&payload);
                if !payload.is_readable() {
                    warn!(index = index, "Stored payload is not canonical");
                }
                Block {
                    index,
                    timestamp,
                    payload,
                    previous_hash,
                    hash,
                    nonce,
                }
            })
            .collect())
    }

    fn store(&mut self, block: &Block) -> Result<()> {
        let payload = block.payload.canonical()?;
        let inserted = self.conn.execute(
            r#"
            INSERT INTO ledger_blocks (idx, timestamp, payload, previous_hash, hash, nonce)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                block.index as i64,
                block.timestamp as i64,
                payload,
                block.previous_hash,
                block.hash,
                block.nonce as i64,
            ],
        );

        match inserted {
            Ok(_) => {
                debug!(index = block.index, hash = %block.hash, "Block persisted");
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateIndex(block.index))
            }
            Err(e) => Err(e.into()),
        }
    }
}
