use crate::error::{Error, ErrorKind};
use exn::ResultExt;

/// Metadata of one cached object.
///
/// The bytes themselves live elsewhere; the index only tracks enough to decide
/// what to evict when the budget is exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Assigned on insert, strictly increasing for the lifetime of the
    /// backing file. Never reused, even after eviction.
    pub id: u64,
    /// Lower values are evicted first.
    pub priority: i64,
    /// Content fingerprint. Never empty.
    pub hash: String,
    /// Size of the cached object in bytes.
    pub size: u64,
    /// Whether the object's bytes currently sit in the slower storage tier.
    pub on_disk: bool,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EntryRow {
    pub(crate) id: i64,
    pub(crate) priority: i64,
    pub(crate) hash: String,
    pub(crate) size: i64,
    pub(crate) on_disk: bool,
}
impl TryFrom<EntryRow> for Entry {
    type Error = Error;
    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: u64::try_from(row.id).or_raise(|| ErrorKind::InvalidData("id"))?,
            priority: row.priority,
            hash: row.hash,
            size: u64::try_from(row.size).or_raise(|| ErrorKind::InvalidData("size"))?,
            on_disk: row.on_disk,
        })
    }
}

/// Column values for a row that has not been assigned an id yet.
#[derive(Debug)]
pub(crate) struct NewEntryRow<'a> {
    pub(crate) priority: i64,
    pub(crate) hash: &'a str,
    pub(crate) size: i64,
    pub(crate) on_disk: bool,
}
impl<'a> NewEntryRow<'a> {
    pub(crate) fn new(priority: i64, hash: &'a str, size: u64, on_disk: bool) -> Result<Self, Error> {
        Ok(Self {
            priority,
            hash,
            size: i64::try_from(size).or_raise(|| ErrorKind::InvalidData("size"))?,
            on_disk,
        })
    }
}

/// Outcome of an insert that wrote a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    /// Id assigned to the new entry.
    pub id: u64,
    /// Entries removed to get back under budget, in eviction order. May
    /// include the new entry itself when it had the lowest priority.
    pub evicted: Vec<Entry>,
}

impl Insertion {
    /// Returns `true` if the inserted entry survived its own eviction pass.
    pub fn retained(&self) -> bool {
        !self.evicted.iter().any(|entry| entry.id == self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn row(id: i64, size: i64) -> EntryRow {
        EntryRow {
            id,
            priority: -3,
            hash: "9f86d081884c7d659a2feaa0c55ad015".to_string(),
            size,
            on_disk: true,
        }
    }

    #[test]
    fn test_row_to_model() {
        let entry = Entry::try_from(row(7, 4096)).unwrap();
        assert_eq!(
            entry,
            Entry {
                id: 7,
                priority: -3,
                hash: "9f86d081884c7d659a2feaa0c55ad015".to_string(),
                size: 4096,
                on_disk: true,
            }
        );
    }

    #[rstest]
    #[case::negative_id(row(-1, 10), "id")]
    #[case::negative_size(row(1, -10), "size")]
    fn test_row_out_of_range(#[case] input: EntryRow, #[case] field: &'static str) {
        let err = Entry::try_from(input).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidData(field));
    }

    #[test]
    fn test_new_row_rejects_oversized_values() {
        assert!(NewEntryRow::new(0, "hash", i64::MAX as u64, false).is_ok());
        let err = NewEntryRow::new(0, "hash", u64::MAX, false).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidData("size"));
    }

    #[test]
    fn test_insertion_retained() {
        let evicted = Entry::try_from(row(1, 10)).unwrap();
        let kept = Insertion { id: 2, evicted: vec![evicted.clone()] };
        assert!(kept.retained());
        let dropped = Insertion { id: 1, evicted: vec![evicted] };
        assert!(!dropped.retained());
    }
}
