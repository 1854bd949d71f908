//! File upload functionality

use log::{info, warn};
use std::path::Path;

use crate::client::{DataMode, RaxFtpClient};
use crate::commands::Command;
use crate::error::Result;
use crate::transfer::{FileStream, TransferNotification};
use crate::types::Representation;

impl RaxFtpClient {
    /// Upload the local file `local` to `remote`.
    ///
    /// `store_unique` uses `STOU` so the server picks a free name.
    pub fn upload_file(
        &mut self,
        local: &Path,
        remote: &str,
        store_unique: bool,
        representation: Representation,
        mode: DataMode,
    ) -> bool {
        let mut source = match FileStream::open(local) {
            Ok(source) => source,
            Err(err) => {
                warn!("Cannot open local file '{}': {}", local.display(), err);
                let message = format!("Cannot open '{}': {}", local.display(), err);
                self.report_error(&message, file!(), line!());
                return false;
            }
        };
        self.upload_from(&mut source, remote, store_unique, representation, mode)
    }

    /// Upload from any transfer source.
    ///
    /// In resume mode a non-empty remote file is continued with `APPE`,
    /// starting the source at the remote size.
    pub fn upload_from(
        &mut self,
        source: &mut dyn TransferNotification,
        remote: &str,
        store_unique: bool,
        representation: Representation,
        mode: DataMode,
    ) -> bool {
        let result = self.run_upload(source, remote, store_unique, representation, mode);
        self.settle(result, file!(), line!()).is_ok()
    }

    fn run_upload(
        &mut self,
        source: &mut dyn TransferNotification,
        remote: &str,
        store_unique: bool,
        representation: Representation,
        mode: DataMode,
    ) -> Result<()> {
        let remote_size = if self.resume {
            self.remote_size(remote)?.unwrap_or(0)
        } else {
            0
        };

        let command = if remote_size > 0 {
            Command::Appe
        } else if store_unique {
            Command::Stou
        } else {
            Command::Stor
        };

        let local_size = source.local_stream_size();
        source.set_local_stream_offset(remote_size)?;
        let local_name = source.local_stream_name();
        info!("Uploading '{}' to '{}' with {}", local_name, remote, command);

        for observer in &self.observers {
            observer.on_pre_send_file(&local_name, remote, local_size);
        }

        let result =
            self.run_data_channel_command(command, remote, representation, mode, 0, source);

        for observer in &self.observers {
            observer.on_post_send_file(&local_name, remote, local_size);
        }
        result
    }
}
