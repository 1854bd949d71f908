//! Ordering of listing entries

use std::cmp::Ordering;

use crate::listing::file_status::FileStatus;

/// Field a listing is sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Size,
    MTime,
    Attributes,
    Uid,
    Gid,
    Link,
    Id,
}

impl SortKey {
    fn compare(self, a: &FileStatus, b: &FileStatus) -> Ordering {
        match self {
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::Size => a.size.cmp(&b.size),
            SortKey::MTime => a.mtime.cmp(&b.mtime),
            SortKey::Attributes => a.attributes.cmp(&b.attributes),
            SortKey::Uid => a.uid.cmp(&b.uid),
            SortKey::Gid => a.gid.cmp(&b.gid),
            SortKey::Link => a.link.cmp(&b.link),
            SortKey::Id => a.id.cmp(&b.id),
        }
    }
}

/// Rank of `.` (0), `..` (1) and everything else (2)
fn dot_rank(entry: &FileStatus) -> u8 {
    match entry.name.as_str() {
        "." => 0,
        ".." => 1,
        _ => 2,
    }
}

/// Sort `entries` in place (stable).
///
/// With `dirs_first`, `.` and `..` come first, then directories, then
/// everything else; `ascending` only applies within those groups.
pub fn sort_listing(entries: &mut [FileStatus], key: SortKey, ascending: bool, dirs_first: bool) {
    entries.sort_by(|a, b| {
        if dirs_first {
            let grouped = dot_rank(a)
                .cmp(&dot_rank(b))
                .then_with(|| b.cwd_possible.cmp(&a.cwd_possible));
            if grouped != Ordering::Equal {
                return grouped;
            }
        }

        let ordering = key.compare(a, b);
        if ascending { ordering } else { ordering.reverse() }
    });
}
