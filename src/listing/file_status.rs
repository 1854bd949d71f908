//! One entry of a parsed directory listing

use chrono::{DateTime, Utc};

/// How trustworthy the size field is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeType {
    #[default]
    Unknown,
    Binary,
    Ascii,
}

/// Precision of the modification time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MTimeType {
    #[default]
    Unknown,
    /// Exact local time, e.g. from EPLF
    Local,
    /// Time zone unknown, precise to the minute
    RemoteMinute,
    /// Time zone unknown, precise to the day
    RemoteDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdType {
    #[default]
    Unknown,
    Full,
}

/// Status of a remote file as reported by `LIST` or `NLST`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    pub name: String,
    /// Directory the listing was requested for
    pub path: String,
    pub cwd_possible: bool,
    pub retr_possible: bool,
    pub size_type: SizeType,
    /// -1 when unknown
    pub size: i64,
    pub mtime_type: MTimeType,
    /// Seconds since the Unix epoch
    pub mtime: i64,
    pub attributes: String,
    pub uid: String,
    pub gid: String,
    pub link: String,
    pub id_type: IdType,
    pub id: String,
}

impl Default for FileStatus {
    fn default() -> Self {
        Self {
            name: String::new(),
            path: String::new(),
            cwd_possible: false,
            retr_possible: false,
            size_type: SizeType::Unknown,
            size: -1,
            mtime_type: MTimeType::Unknown,
            mtime: 0,
            attributes: String::new(),
            uid: String::new(),
            gid: String::new(),
            link: String::new(),
            id_type: IdType::Unknown,
            id: String::new(),
        }
    }
}

impl FileStatus {
    /// Entry that only knows its name, as produced by `NLST`
    pub fn from_name(path: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            ..Self::default()
        }
    }

    /// `.` or `..`
    pub fn is_dot(&self) -> bool {
        self.name == "." || self.name == ".."
    }

    pub fn has_size(&self) -> bool {
        self.size_type != SizeType::Unknown && self.size >= 0
    }

    pub fn modified(&self) -> Option<DateTime<Utc>> {
        match self.mtime_type {
            MTimeType::Unknown => None,
            _ => DateTime::from_timestamp(self.mtime, 0),
        }
    }
}
