//! Directory listings over the data channel

use log::debug;

use crate::client::{DataMode, RaxFtpClient};
use crate::commands::Command;
use crate::error::Result;
use crate::listing::FileStatus;
use crate::transfer::MemoryStream;
use crate::types::Representation;

impl RaxFtpClient {
    /// `LIST path`, parsed. Lines no parser understands are skipped.
    pub fn list(&mut self, path: &str, mode: DataMode) -> Option<Vec<FileStatus>> {
        let result = self.fetch_listing(Command::List, path, mode).map(|lines| {
            let total = lines.len();
            let entries: Vec<FileStatus> = lines
                .iter()
                .filter_map(|line| self.parser.parse(line))
                .map(|mut status| {
                    status.path = path.to_string();
                    status
                })
                .collect();
            debug!("Parsed {} of {} listing lines", entries.len(), total);
            entries
        });
        self.settle(result, file!(), line!()).ok()
    }

    /// `NLST path`; every line becomes a name-only entry
    pub fn name_list(&mut self, path: &str, mode: DataMode) -> Option<Vec<FileStatus>> {
        let result = self.fetch_listing(Command::Nlst, path, mode).map(|lines| {
            lines
                .iter()
                .map(|name| FileStatus::from_name(path, name))
                .collect()
        });
        self.settle(result, file!(), line!()).ok()
    }

    /// `LIST path` lines, each prefixed with `path`
    pub fn list_raw(&mut self, path: &str, mode: DataMode) -> Option<Vec<String>> {
        let result = self.fetch_listing(Command::List, path, mode);
        self.settle(prefixed(result, path), file!(), line!()).ok()
    }

    /// `NLST path` lines, each prefixed with `path`
    pub fn name_list_raw(&mut self, path: &str, mode: DataMode) -> Option<Vec<String>> {
        let result = self.fetch_listing(Command::Nlst, path, mode);
        self.settle(prefixed(result, path), file!(), line!()).ok()
    }

    fn fetch_listing(&mut self, command: Command, path: &str, mode: DataMode) -> Result<Vec<String>> {
        let mut output = MemoryStream::new(command.verb());
        self.run_data_channel_command(command, path, Representation::ascii(), mode, 0, &mut output)?;
        Ok(output.lines())
    }
}

fn prefixed(lines: Result<Vec<String>>, path: &str) -> Result<Vec<String>> {
    lines.map(|lines| lines.into_iter().map(|line| format!("{}{}", path, line)).collect())
}
