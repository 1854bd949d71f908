//! Server-to-server (FXP) transfers
//!
//! One server is put into passive mode and the other is told to connect to
//! it with `PORT`. The file then moves directly between the two servers.

use log::info;

use crate::client::{RaxFtpClient, expect_reply, require};
use crate::commands::{Arguments, Command};
use crate::error::Result;
use crate::responses::Reply;
use crate::types::Representation;

impl RaxFtpClient {
    /// Copy `source_file` on `source` to `target_file` on `target`.
    ///
    /// `source_passive` selects which side listens. Failures are reported
    /// through the observers of `source`.
    pub fn transfer_file(
        source: &mut RaxFtpClient,
        source_file: &str,
        target: &mut RaxFtpClient,
        target_file: &str,
        representation: Representation,
        source_passive: bool,
    ) -> bool {
        let result = run_transfer_file(
            source,
            source_file,
            target,
            target_file,
            representation,
            source_passive,
        );
        source.settle(result, file!(), line!()).is_ok()
    }

    /// Send `file` from this server to `target`. With `passive` this server
    /// listens.
    pub fn fxp_download(
        &mut self,
        file: &str,
        target: &mut RaxFtpClient,
        target_file: &str,
        representation: Representation,
        passive: bool,
    ) -> bool {
        RaxFtpClient::transfer_file(self, file, target, target_file, representation, passive)
    }

    /// Fetch `source_file` from `source` onto this server. With `passive`
    /// this server listens.
    pub fn fxp_upload(
        &mut self,
        source: &mut RaxFtpClient,
        source_file: &str,
        file: &str,
        representation: Representation,
        passive: bool,
    ) -> bool {
        RaxFtpClient::transfer_file(source, source_file, self, file, representation, !passive)
    }
}

fn run_transfer_file(
    source: &mut RaxFtpClient,
    source_file: &str,
    target: &mut RaxFtpClient,
    target_file: &str,
    representation: Representation,
    source_passive: bool,
) -> Result<()> {
    require(Command::Type, source.negotiate_representation(representation)?)?;
    require(Command::Type, target.negotiate_representation(representation)?)?;

    {
        let (listening, connecting) = if source_passive {
            (&mut *source, &mut *target)
        } else {
            (&mut *target, &mut *source)
        };
        let addr = listening.request_passive()?;
        info!("Server-to-server transfer through {}", addr);
        require(Command::Port, connecting.request_data_port(addr)?)?;
    }

    source.send_command(Command::Retr, &Arguments::from(source_file))?;

    let reply = target.execute(Command::Stor, &Arguments::from(target_file))?;
    expect_reply(&reply, Command::Stor, Reply::is_positive_preliminary, "1yz transfer start")?;

    let reply = source.get_response()?;
    expect_reply(&reply, Command::Retr, Reply::is_positive_preliminary, "1yz transfer start")?;

    let reply = source.get_response()?;
    expect_reply(&reply, Command::Retr, Reply::is_positive_completion, "2yz transfer completion")?;

    let reply = target.get_response()?;
    expect_reply(&reply, Command::Stor, Reply::is_positive_completion, "2yz transfer completion")
}
