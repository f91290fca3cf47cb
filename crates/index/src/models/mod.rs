mod entry;

pub use self::entry::{Entry, Insertion};
pub(crate) use self::entry::{EntryRow, NewEntryRow};
