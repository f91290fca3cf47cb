//! The priority index handle.

use crate::db::Database;
use crate::error::{ErrorKind, Result};
use crate::evict;
use crate::models::{Entry, EntryRow, Insertion, NewEntryRow};
use exn::ResultExt;
use prism_config::IndexConfig;
use std::path::Path;
use tracing::instrument;

/// Size-bounded index of cache entries.
///
/// Every insert runs in a single transaction that writes the new row and then
/// evicts low-priority entries until the retained total fits the budget again.
/// Eviction is the only way entries ever leave the index.
///
/// The handle exclusively owns its connection pool. Dropping it (or calling
/// [`close`](Self::close)) releases the pool but leaves the backing file and
/// its rows in place for the next [`open`](Self::open).
///
/// # Examples
///
/// ```no_run
/// use prism_index::Index;
///
/// # async fn example() -> prism_index::error::Result<()> {
/// let index = Index::open(100_000_000, "/var/cache/prism/prism.db").await?;
/// if let Some(insertion) = index.insert(3, "hashbrowns", 10, true).await? {
///     for entry in insertion.evicted {
///         // Delete the evicted object's bytes from the content store.
///         # let _ = entry;
///     }
/// }
/// index.close().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Index {
    db: Database,
    max_size: i64,
}

impl Index {
    /// Open (or create) the index at `path` with a budget of `max_size` bytes.
    ///
    /// The budget is validated before anything else; an unusable path fails
    /// with [`ErrorKind::Open`]. Reopening an existing file with a smaller
    /// budget does not evict anything; see
    /// [`shrink_to_budget`](Self::shrink_to_budget).
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub async fn open(max_size: u64, path: impl AsRef<Path>) -> Result<Self> {
        let max_size = Self::validate_max_size(max_size)?;
        let db = Database::connect(path.as_ref()).await?;
        tracing::info!("Opened priority index");
        Ok(Self { db, max_size })
    }

    /// Open an index backed by an in-memory database.
    ///
    /// Nothing outlives the handle. Meant for callers that want the eviction
    /// behavior without a backing file, such as the tests of the content
    /// store built on top of the index.
    pub async fn open_in_memory(max_size: u64) -> Result<Self> {
        let max_size = Self::validate_max_size(max_size)?;
        let db = Database::connect_in_memory().await?;
        Ok(Self { db, max_size })
    }

    /// Open the index described by a loaded configuration.
    pub async fn from_config(config: &IndexConfig) -> Result<Self> {
        Self::open(config.max_size, &config.path).await
    }

    fn validate_max_size(max_size: u64) -> Result<i64> {
        if max_size == 0 {
            exn::bail!(ErrorKind::Config);
        }
        i64::try_from(max_size).or_raise(|| ErrorKind::InvalidData("max size"))
    }

    /// The budget this handle enforces, in bytes.
    pub fn max_size(&self) -> u64 {
        // Validated positive on construction.
        self.max_size.unsigned_abs()
    }

    // =========================================================================
    // Insert
    // =========================================================================

    /// Record a new entry and evict whatever no longer fits.
    ///
    /// An empty `hash` is silently ignored: nothing is written and `Ok(None)`
    /// is returned. Otherwise the write and the evictions it triggers commit
    /// atomically; on error none of them are visible. The new entry itself
    /// is evicted if it has the lowest priority of everything retained.
    ///
    /// Storage engine failures are returned as [`ErrorKind::Backend`] and are
    /// not retried.
    #[instrument(skip(self, hash), fields(hash = hash.as_ref()))]
    pub async fn insert(
        &self,
        priority: i64,
        hash: impl AsRef<str>,
        size: u64,
        on_disk: bool,
    ) -> Result<Option<Insertion>> {
        let hash = hash.as_ref();
        if hash.is_empty() {
            tracing::trace!("Ignoring entry with empty hash");
            return Ok(None);
        }
        let row = NewEntryRow::new(priority, hash, size, on_disk)?;
        // Dropping the transaction on any error below rolls it back.
        let mut tx = self.db.pool().begin().await.map_err(ErrorKind::backend)?;
        // Write first: the statement takes the write lock before the
        // enforcer reads the totals.
        let id: i64 = sqlx::query_scalar(include_str!("../queries/insert_entry.sql"))
            .bind(row.priority)
            .bind(row.hash)
            .bind(row.size)
            .bind(row.on_disk)
            .fetch_one(&mut *tx)
            .await
            .map_err(ErrorKind::backend)?;
        let evicted = evict::enforce(&mut tx, self.max_size).await?;
        tx.commit().await.map_err(ErrorKind::backend)?;
        let id = u64::try_from(id).or_raise(|| ErrorKind::InvalidData("id"))?;
        tracing::debug!(id, evicted = evicted.len(), "Inserted entry");
        Ok(Some(Insertion { id, evicted }))
    }

    /// Run the capacity enforcer against the current contents.
    ///
    /// Opening an existing file with a smaller budget leaves it over budget
    /// until the next insert; call this to reconcile right away. Returns the
    /// evicted entries in eviction order.
    #[instrument(skip(self), fields(max_size = self.max_size))]
    pub async fn shrink_to_budget(&self) -> Result<Vec<Entry>> {
        let mut tx = self.db.pool().begin().await.map_err(ErrorKind::backend)?;
        let evicted = evict::enforce(&mut tx, self.max_size).await?;
        tx.commit().await.map_err(ErrorKind::backend)?;
        Ok(evicted)
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// Snapshot of every retained entry, ascending by id.
    pub async fn list(&self) -> Result<Vec<Entry>> {
        let rows: Vec<EntryRow> = sqlx::query_as(include_str!("../queries/list_entries.sql"))
            .fetch_all(self.db.pool())
            .await
            .map_err(ErrorKind::backend)?;
        rows.into_iter().map(Entry::try_from).collect()
    }

    /// All retained entries with the given fingerprint, ascending by id.
    ///
    /// Fingerprints are not unique; inserting the same hash twice yields two
    /// independent entries.
    pub async fn find(&self, hash: impl AsRef<str>) -> Result<Vec<Entry>> {
        let rows: Vec<EntryRow> = sqlx::query_as(include_str!("../queries/find_by_hash.sql"))
            .bind(hash.as_ref())
            .fetch_all(self.db.pool())
            .await
            .map_err(ErrorKind::backend)?;
        rows.into_iter().map(Entry::try_from).collect()
    }

    // =========================================================================
    // Counts
    // =========================================================================

    async fn usage(&self) -> Result<(u64, u64)> {
        let mut conn = self.db.pool().acquire().await.map_err(ErrorKind::backend)?;
        let (count, total) = evict::usage(&mut conn).await?;
        Ok((
            u64::try_from(count).or_raise(|| ErrorKind::InvalidData("count"))?,
            u64::try_from(total).or_raise(|| ErrorKind::InvalidData("total size"))?,
        ))
    }

    /// Number of retained entries.
    pub async fn len(&self) -> Result<u64> {
        Ok(self.usage().await?.0)
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Sum of the sizes of all retained entries, in bytes.
    pub async fn total_size(&self) -> Result<u64> {
        Ok(self.usage().await?.1)
    }

    /// Release the connection pool.
    ///
    /// Waits for in-flight statements to finish. The backing file and its rows
    /// stay on disk.
    pub async fn close(self) {
        self.db.close().await;
    }
}
