//! Capacity enforcement.
//!
//! Restores `sum(size) <= max_size` by repeatedly deleting the entry with the
//! lowest priority, oldest id first among equals. The order is a pure function
//! of the table contents: no clocks, no randomness.
//!
//! A single remaining entry is never evicted, even when it alone exceeds the
//! budget. It stays until an insert of equal or higher priority displaces it.

use crate::error::{ErrorKind, Result};
use crate::models::{Entry, EntryRow};
use sqlx::SqliteConnection;

/// Number of retained entries and the sum of their sizes.
///
/// Summed in `i128`: every size fits in an `i64`, but an oversized entry plus
/// the newcomer that should displace it does not have to.
pub(crate) async fn usage(conn: &mut SqliteConnection) -> Result<(usize, i128)> {
    let sizes: Vec<i64> = sqlx::query_scalar(include_str!("../queries/list_sizes.sql"))
        .fetch_all(&mut *conn)
        .await
        .map_err(ErrorKind::backend)?;
    Ok((sizes.len(), sizes.into_iter().map(i128::from).sum()))
}

/// Evict entries until the retained total fits in `max_size`.
///
/// Must run on the connection of the caller's open transaction so that the
/// evictions commit or roll back together with whatever preceded them.
/// Returns the evicted entries in eviction order.
pub(crate) async fn enforce(conn: &mut SqliteConnection, max_size: i64) -> Result<Vec<Entry>> {
    let (mut count, mut total) = usage(conn).await?;
    let budget = i128::from(max_size);
    let mut evicted = Vec::new();
    while total > budget && count > 1 {
        let candidate: EntryRow = sqlx::query_as(include_str!("../queries/select_eviction_candidate.sql"))
            .fetch_one(&mut *conn)
            .await
            .map_err(ErrorKind::backend)?;
        sqlx::query(include_str!("../queries/delete_by_id.sql"))
            .bind(candidate.id)
            .execute(&mut *conn)
            .await
            .map_err(ErrorKind::backend)?;
        total -= i128::from(candidate.size);
        count -= 1;
        let entry = Entry::try_from(candidate)?;
        tracing::debug!(
            id = entry.id,
            priority = entry.priority,
            hash = %entry.hash,
            size = entry.size,
            remaining = %total,
            "Evicted entry to restore size budget"
        );
        evicted.push(entry);
    }
    if total > budget {
        tracing::warn!(total = %total, max_size, "Single retained entry exceeds the size budget on its own");
    }
    Ok(evicted)
}
