//! Directory listing model and parsers

pub mod calendar;
pub mod file_status;
pub mod parser;
pub mod sort;

pub use file_status::{FileStatus, IdType, MTimeType, SizeType};
pub use parser::{FileListParser, ListParser};
pub use sort::{SortKey, sort_listing};
