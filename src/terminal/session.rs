//! Interactive session for the `rax-ftp` binary
//!
//! Reads prompt commands, drives the engine and prints what the server says.

use log::{debug, error, info};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::client::{DataMode, RaxFtpClient};
use crate::commands::{UserCommand, get_help_text, parse_user_command};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::responses::{CommandOutcome, Reply};
use crate::terminal::listing::format_directory_listing;
use crate::terminal::progress::ConsoleProgress;
use crate::transfer::{Observer, ProgressObserver};
use crate::types::Representation;

/// Prints every server reply and internal failure
struct ReplyPrinter;

impl Observer for ReplyPrinter {
    fn on_response(&self, reply: &Reply) {
        println!("{}", reply);
    }

    fn on_internal_error(&self, message: &str, _file: &str, _line: u32) {
        println!("Error: {}", message);
    }
}

/// Terminal handler for interactive FTP sessions
pub struct Terminal {
    client: RaxFtpClient,
    config: ClientConfig,
    mode: DataMode,
}

impl Terminal {
    /// Create a new terminal around a logged-on client
    pub fn new(mut client: RaxFtpClient, config: ClientConfig) -> Self {
        info!(
            "Creating terminal session for server: {}",
            config.display_name()
        );
        client.attach_observer(Arc::new(ReplyPrinter));
        client.attach_observer(Arc::new(ProgressObserver::new(ConsoleProgress)));

        let mode = DataMode::from_passive(config.client.passive);
        Self {
            client,
            config,
            mode,
        }
    }

    /// Run the interactive FTP session until QUIT or end of input
    pub fn run_interactive(&mut self) -> Result<()> {
        println!("RAX FTP Client - Interactive Session");
        println!("Connected to: {}", self.config.display_name());
        println!("Type 'HELP' for available commands or 'QUIT' to exit");
        println!();

        let stdin = io::stdin();
        loop {
            print!("rax-ftp ({})> ", self.config.display_name());
            io::stdout().flush()?;

            let mut input = String::new();
            match stdin.read_line(&mut input) {
                Ok(0) => break,
                Ok(_) => {
                    let line = input.trim();
                    if line.is_empty() {
                        continue;
                    }
                    debug!("User entered command: {}", line);

                    if !self.handle_command(parse_user_command(line)) {
                        break;
                    }
                    if !self.client.is_connected() {
                        println!("Connection closed. Closing session...");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to read input: {}", e);
                    return Err(e.into());
                }
            }
        }

        if self.client.is_connected() {
            self.client.logout();
        }
        Ok(())
    }

    /// Execute one prompt command. Returns false when the session should end.
    fn handle_command(&mut self, command: UserCommand) -> bool {
        match command {
            UserCommand::List(path) => {
                let path = path.unwrap_or_default();
                if let Some(entries) = self.client.list(&path, self.mode) {
                    print!("{}", format_directory_listing(&entries));
                    if entries.is_empty() {
                        println!();
                    }
                }
            }
            UserCommand::NameList(path) => {
                let path = path.unwrap_or_default();
                if let Some(entries) = self.client.name_list(&path, self.mode) {
                    for entry in entries {
                        println!("{}", entry.name);
                    }
                }
            }
            UserCommand::Get { remote, local } => {
                let local = self.local_path(local.as_deref().unwrap_or_else(|| file_name(&remote)));
                let done =
                    self.client
                        .download_file(&remote, &local, Representation::image(), self.mode);
                report_transfer(done, &remote, &local);
            }
            UserCommand::Put { local, remote } => {
                let remote = remote.unwrap_or_else(|| file_name(&local).to_string());
                let local = self.local_path(&local);
                let done = self.client.upload_file(
                    &local,
                    &remote,
                    false,
                    Representation::image(),
                    self.mode,
                );
                report_transfer(done, &remote, &local);
            }
            UserCommand::Cd(directory) => report(self.client.cwd(&directory)),
            UserCommand::Cdup => report(self.client.cdup()),
            UserCommand::Pwd => {
                if let Ok(directory) = self.client.pwd() {
                    println!("Current directory: {}", directory);
                }
            }
            UserCommand::Mkd(directory) => report(self.client.mkd(&directory)),
            UserCommand::Rmd(directory) => report(self.client.rmd(&directory)),
            UserCommand::Dele(file) => report(self.client.dele(&file)),
            UserCommand::Rename { from, to } => report(self.client.rename(&from, &to)),
            UserCommand::Size(file) => {
                if let Ok(size) = self.client.size(&file) {
                    println!("{}: {} bytes", file, size);
                }
            }
            UserCommand::Mdtm(file) => {
                if let Ok(modified) = self.client.mdtm(&file) {
                    println!("{}: {}", file, modified.format("%Y-%m-%d %H:%M:%S"));
                }
            }
            UserCommand::Syst => report(self.client.syst()),
            UserCommand::Noop => report(self.client.noop()),
            UserCommand::Help => {
                println!("{}", get_help_text());
                println!();
                println!("Current server: {}", self.config.display_name());
                println!("Local directory: {}", self.config.client.local_directory);
            }
            UserCommand::Quit => {
                println!("Disconnecting from server...");
                self.client.logout();
                return false;
            }
            UserCommand::Invalid(message) => println!("Error: {}", message),
        }
        true
    }

    fn local_path(&self, name: &str) -> PathBuf {
        Path::new(&self.config.client.local_directory).join(name)
    }
}

/// Last path component of a remote or local name
fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn report(outcome: CommandOutcome) {
    if outcome != CommandOutcome::Ok {
        println!("Command result: {}", outcome);
    }
}

fn report_transfer(done: bool, remote: &str, local: &Path) {
    if done {
        info!("Transfer of '{}' ({}) finished", remote, local.display());
    } else {
        println!("Transfer of '{}' failed", remote);
    }
}
