//! Database connection and pool management.

use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

/// Name of the table holding index entries.
pub const TABLE_NAME: &str = "prism_data";
// One writer at a time anyway; the rest serve concurrent reads.
const MAX_CONNECTIONS: u32 = 4;

/// Connection pool over the index's backing file.
///
/// Opening the database always ensures the schema exists, so a `Database`
/// value is only ever handed out once `prism_data` is ready for use.
#[derive(Debug)]
pub(crate) struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn new(options: SqliteConnectOptions, max: Option<u32>) -> std::result::Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            // Apply the query-based PRAGMAs to EVERY connection, not only the
            // first one handed out by the pool.
            .after_connect(|conn, meta| Box::pin(async move { Self::apply_pragmas(conn, meta).await }))
            .max_connections(max.unwrap_or(MAX_CONNECTIONS))
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Open the database file at the given path, creating it if missing, and
    /// ensure the schema exists.
    ///
    /// Paths that can never name a database file (directories, `.`, `..`,
    /// files under a missing parent) are rejected before SQLite sees them.
    pub(crate) async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !is_usable_path(path) {
            exn::bail!(ErrorKind::Open(path.to_path_buf()));
        }
        let options = Self::base_options().filename(path).create_if_missing(true);
        let db = Self::new(options, None).await.or_raise(|| ErrorKind::Open(path.to_path_buf()))?;
        db.ensure_schema().await?;
        Ok(db)
    }

    /// Connect to an in-memory database.
    ///
    /// In-memory databases are destroyed when the connection closes, so the
    /// pool is limited to one connection; parallel connections would each see
    /// a different database.
    pub(crate) async fn connect_in_memory() -> Result<Self> {
        let options = Self::base_options().filename(":memory:");
        let db = Self::new(options, Some(1)).await.map_err(ErrorKind::backend)?;
        db.ensure_schema().await?;
        Ok(db)
    }

    /// Base connection options shared between file and in-memory databases.
    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            // WAL lets readers snapshot the table while an insert is evicting.
            .journal_mode(SqliteJournalMode::Wal)
            // Committed inserts and evictions must survive power loss.
            .synchronous(SqliteSynchronous::Full)
            // PRAGMA busy_timeout; other handles on the same file serialize
            // their writes through SQLite's own locks.
            .busy_timeout(std::time::Duration::from_millis(1500))
            .auto_vacuum(sqlx::sqlite::SqliteAutoVacuum::None)
    }

    /// Per-connection tuning for the small, hot `prism_data` table: a modest
    /// page cache and in-memory scratch space for the eviction-order sorts.
    async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA locking_mode = NORMAL;
                PRAGMA cache_size = -2048;
                PRAGMA temp_store = MEMORY;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Create the entry table and its eviction-order index if absent.
    ///
    /// Runs on every open. Never alters or clears existing rows.
    #[instrument("ensuring index schema", skip(self))]
    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(include_str!("../queries/create_table.sql"))
            .execute(&self.pool)
            .await
            .map_err(ErrorKind::backend)?;
        sqlx::query(include_str!("../queries/create_eviction_index.sql"))
            .execute(&self.pool)
            .await
            .map_err(ErrorKind::backend)?;
        Ok(())
    }

    /// Get a reference to the underlying connection pool.
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    ///
    /// Waits for all connections to be returned to the pool and then closes
    /// them. The backing file and its rows are left in place.
    pub(crate) async fn close(&self) {
        // Refresh statistics for the eviction-order index before the handle goes away.
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}

/// Whether `path` could name a database file at all.
fn is_usable_path(path: &Path) -> bool {
    if path.as_os_str().is_empty() || path.file_name().is_none() || path.is_dir() {
        return false;
    }
    match path.parent() {
        // A bare file name resolves against the working directory.
        Some(parent) if parent.as_os_str().is_empty() => true,
        Some(parent) => parent.is_dir(),
        None => false,
    }
}
