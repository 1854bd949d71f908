//! Local end points of a transfer
//!
//! The engine never touches local storage itself. Each upload or download is
//! given a [`TransferNotification`] that receives the downloaded bytes or
//! supplies the bytes to upload.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Local side of one data-channel transfer
pub trait TransferNotification {
    /// Name used in observer events, usually a path
    fn local_stream_name(&self) -> String;

    /// Current size of the local stream in bytes
    fn local_stream_size(&self) -> u64;

    /// Position the stream for a resumed upload
    fn set_local_stream_offset(&mut self, offset: u64) -> io::Result<()>;

    /// Bytes arrived on the data channel
    fn on_bytes_received(&mut self, data: &[u8]) -> io::Result<()>;

    /// Fill `buf` with the next bytes to upload. Returns 0 at the end.
    fn on_pre_bytes_send(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Local file used as download target or upload source
pub struct FileStream {
    name: String,
    file: File,
}

impl FileStream {
    /// Open `path` as a download target.
    ///
    /// With `append`, existing content is kept and new bytes go to the end,
    /// which is what a resumed download needs.
    pub fn create(path: &Path, append: bool) -> io::Result<Self> {
        let mut options = OpenOptions::new();
        if append {
            options.append(true).create(true);
        } else {
            options.write(true).create(true).truncate(true);
        }
        let file = options.open(path)?;
        Ok(Self {
            name: path.display().to_string(),
            file,
        })
    }

    /// Open `path` as an upload source
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            name: path.display().to_string(),
            file,
        })
    }
}

impl TransferNotification for FileStream {
    fn local_stream_name(&self) -> String {
        self.name.clone()
    }

    fn local_stream_size(&self) -> u64 {
        self.file.metadata().map(|m| m.len()).unwrap_or(0)
    }

    fn set_local_stream_offset(&mut self, offset: u64) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn on_bytes_received(&mut self, data: &[u8]) -> io::Result<()> {
        self.file.write_all(data)
    }

    fn on_pre_bytes_send(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

/// In-memory stream, used for listings and small uploads
#[derive(Debug, Default)]
pub struct MemoryStream {
    name: String,
    data: Vec<u8>,
    position: usize,
}

impl MemoryStream {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Stream that uploads `data`
    pub fn with_data(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
            position: 0,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Non-empty lines of the received text, split on `\n` with a trailing
    /// `\r` removed
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.data)
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl TransferNotification for MemoryStream {
    fn local_stream_name(&self) -> String {
        self.name.clone()
    }

    fn local_stream_size(&self) -> u64 {
        self.data.len() as u64
    }

    fn set_local_stream_offset(&mut self, offset: u64) -> io::Result<()> {
        self.position = usize::try_from(offset)
            .unwrap_or(usize::MAX)
            .min(self.data.len());
        Ok(())
    }

    fn on_bytes_received(&mut self, data: &[u8]) -> io::Result<()> {
        self.data.extend_from_slice(data);
        Ok(())
    }

    fn on_pre_bytes_send(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = &self.data[self.position..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n;
        Ok(n)
    }
}
