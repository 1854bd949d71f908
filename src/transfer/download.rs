//! File download functionality

use log::{info, warn};
use std::path::Path;

use crate::client::{DataMode, RaxFtpClient};
use crate::commands::Command;
use crate::error::Result;
use crate::transfer::{FileStream, TransferNotification};
use crate::types::Representation;

impl RaxFtpClient {
    /// Download `remote` into the local file `local`.
    ///
    /// In resume mode the local file is appended to and its current size is
    /// requested as restart offset.
    pub fn download_file(
        &mut self,
        remote: &str,
        local: &Path,
        representation: Representation,
        mode: DataMode,
    ) -> bool {
        let mut target = match FileStream::create(local, self.resume) {
            Ok(target) => target,
            Err(err) => {
                warn!("Cannot open local file '{}': {}", local.display(), err);
                let message = format!("Cannot open '{}': {}", local.display(), err);
                self.report_error(&message, file!(), line!());
                return false;
            }
        };
        self.download_to(remote, &mut target, representation, mode)
    }

    /// Download `remote` into any transfer target
    pub fn download_to(
        &mut self,
        remote: &str,
        target: &mut dyn TransferNotification,
        representation: Representation,
        mode: DataMode,
    ) -> bool {
        let result = self.run_download(remote, target, representation, mode);
        self.settle(result, file!(), line!()).is_ok()
    }

    fn run_download(
        &mut self,
        remote: &str,
        target: &mut dyn TransferNotification,
        representation: Representation,
        mode: DataMode,
    ) -> Result<()> {
        let remote_size = self.remote_size(remote)?;
        let local_name = target.local_stream_name();
        info!("Downloading '{}' to '{}'", remote, local_name);

        for observer in &self.observers {
            observer.on_pre_receive_file(remote, &local_name, remote_size);
        }

        let offset = if self.resume {
            target.local_stream_size()
        } else {
            0
        };
        let result =
            self.run_data_channel_command(Command::Retr, remote, representation, mode, offset, target);

        for observer in &self.observers {
            observer.on_post_receive_file(remote, &local_name, remote_size);
        }
        result
    }
}
