//! FTP command definitions
//!
//! Every command the engine can send, with the metadata needed to drive the
//! control and data channels.

use std::fmt;
use std::str::FromStr;

/// FTP commands understood by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Abor,
    Acct,
    Allo,
    Appe,
    Cdup,
    Cwd,
    Dele,
    Help,
    List,
    Mdtm,
    Mkd,
    Mode,
    Nlst,
    Noop,
    /// Firewall verb, not part of any RFC
    Open,
    Pass,
    Pasv,
    Port,
    Pwd,
    Quit,
    Rein,
    Rest,
    Retr,
    Rmd,
    Rnfr,
    Rnto,
    Site,
    Size,
    Smnt,
    Stat,
    Stor,
    Stou,
    Stru,
    Syst,
    Type,
    User,
}

/// How a command uses the data channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataChannel {
    None,
    Read,
    Write,
}

/// Document defining a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standard {
    Unknown,
    Rfc959,
    Rfc3659,
}

/// Static description of one command
#[derive(Debug)]
pub struct CommandInfo {
    pub command: Command,
    pub verb: &'static str,
    pub syntax: &'static str,
    pub parameters: u8,
    pub optional_parameters: u8,
    pub standard: Standard,
    pub data_channel: DataChannel,
}

const fn info(
    command: Command,
    verb: &'static str,
    syntax: &'static str,
    parameters: u8,
    optional_parameters: u8,
    standard: Standard,
    data_channel: DataChannel,
) -> CommandInfo {
    CommandInfo {
        command,
        verb,
        syntax,
        parameters,
        optional_parameters,
        standard,
        data_channel,
    }
}

use DataChannel as D;
use Standard as S;

/// Metadata table, in declaration order of [`Command`]
static COMMAND_TABLE: [CommandInfo; 36] = [
    info(Command::Abor, "ABOR", "ABOR <CRLF>", 0, 0, S::Rfc959, D::None),
    info(Command::Acct, "ACCT", "ACCT <SP> <account-information> <CRLF>", 1, 0, S::Rfc959, D::None),
    info(
        Command::Allo,
        "ALLO",
        "ALLO <SP> <decimal-integer> [<SP> R <SP> <decimal-integer>] <CRLF>",
        3,
        2,
        S::Rfc959,
        D::None,
    ),
    info(Command::Appe, "APPE", "APPE <SP> <pathname> <CRLF>", 1, 0, S::Rfc959, D::Write),
    info(Command::Cdup, "CDUP", "CDUP <CRLF>", 0, 0, S::Rfc959, D::None),
    info(Command::Cwd, "CWD", "CWD <SP> <pathname> <CRLF>", 1, 0, S::Rfc959, D::None),
    info(Command::Dele, "DELE", "DELE <SP> <pathname> <CRLF>", 1, 0, S::Rfc959, D::None),
    info(Command::Help, "HELP", "HELP [<SP> <string>] <CRLF>", 1, 1, S::Rfc959, D::None),
    info(Command::List, "LIST", "LIST [<SP> <pathname>] <CRLF>", 1, 1, S::Rfc959, D::Read),
    info(Command::Mdtm, "MDTM", "MDTM <SP> <pathname> <CRLF>", 1, 0, S::Rfc3659, D::None),
    info(Command::Mkd, "MKD", "MKD <SP> <pathname> <CRLF>", 1, 0, S::Rfc959, D::None),
    info(Command::Mode, "MODE", "MODE <SP> <mode-code> <CRLF>", 1, 0, S::Rfc959, D::None),
    info(Command::Nlst, "NLST", "NLST [<SP> <pathname>] <CRLF>", 1, 1, S::Rfc959, D::Read),
    info(Command::Noop, "NOOP", "NOOP <CRLF>", 0, 0, S::Rfc959, D::None),
    info(Command::Open, "OPEN", "OPEN <SP> <string> <CRLF>", 1, 0, S::Unknown, D::None),
    info(Command::Pass, "PASS", "PASS <SP> <password> <CRLF>", 1, 0, S::Rfc959, D::None),
    info(Command::Pasv, "PASV", "PASV <CRLF>", 0, 0, S::Rfc959, D::None),
    info(Command::Port, "PORT", "PORT <SP> <host-port> <CRLF>", 1, 0, S::Rfc959, D::None),
    info(Command::Pwd, "PWD", "PWD <CRLF>", 0, 0, S::Rfc959, D::None),
    info(Command::Quit, "QUIT", "QUIT <CRLF>", 0, 0, S::Rfc959, D::None),
    info(Command::Rein, "REIN", "REIN <CRLF>", 0, 0, S::Rfc959, D::None),
    info(Command::Rest, "REST", "REST <SP> <marker> <CRLF>", 1, 0, S::Rfc959, D::None),
    info(Command::Retr, "RETR", "RETR <SP> <pathname> <CRLF>", 1, 0, S::Rfc959, D::Read),
    info(Command::Rmd, "RMD", "RMD <SP> <pathname> <CRLF>", 1, 0, S::Rfc959, D::None),
    info(Command::Rnfr, "RNFR", "RNFR <SP> <pathname> <CRLF>", 1, 0, S::Rfc959, D::None),
    info(Command::Rnto, "RNTO", "RNTO <SP> <pathname> <CRLF>", 1, 0, S::Rfc959, D::None),
    info(Command::Site, "SITE", "SITE <SP> <string> <CRLF>", 1, 0, S::Rfc959, D::None),
    info(Command::Size, "SIZE", "SIZE <SP> <pathname> <CRLF>", 1, 0, S::Rfc3659, D::None),
    info(Command::Smnt, "SMNT", "SMNT <SP> <pathname> <CRLF>", 1, 0, S::Rfc959, D::None),
    info(Command::Stat, "STAT", "STAT [<SP> <pathname>] <CRLF>", 1, 1, S::Rfc959, D::None),
    info(Command::Stor, "STOR", "STOR <SP> <pathname> <CRLF>", 1, 0, S::Rfc959, D::Write),
    info(Command::Stou, "STOU", "STOU <CRLF>", 0, 0, S::Rfc959, D::Write),
    info(Command::Stru, "STRU", "STRU <SP> <structure-code> <CRLF>", 1, 0, S::Rfc959, D::None),
    info(Command::Syst, "SYST", "SYST <CRLF>", 0, 0, S::Rfc959, D::None),
    info(Command::Type, "TYPE", "TYPE <SP> <type-code> <CRLF>", 1, 0, S::Rfc959, D::None),
    info(Command::User, "USER", "USER <SP> <username> <CRLF>", 1, 0, S::Rfc959, D::None),
];

impl Command {
    /// All commands, in table order
    pub fn all() -> impl Iterator<Item = Command> {
        COMMAND_TABLE.iter().map(|info| info.command)
    }

    pub fn info(self) -> &'static CommandInfo {
        &COMMAND_TABLE[self as usize]
    }

    /// Verb sent to the server, e.g. `RETR`
    pub fn verb(self) -> &'static str {
        self.info().verb
    }

    /// Usage syntax in RFC notation
    pub fn syntax(self) -> &'static str {
        self.info().syntax
    }

    pub fn parameter_count(self) -> u8 {
        self.info().parameters
    }

    pub fn optional_parameter_count(self) -> u8 {
        self.info().optional_parameters
    }

    pub fn standard(self) -> Standard {
        self.info().standard
    }

    pub fn is_data_channel_read(self) -> bool {
        self.info().data_channel == DataChannel::Read
    }

    pub fn is_data_channel_write(self) -> bool {
        self.info().data_channel == DataChannel::Write
    }

    pub fn is_non_data_channel(self) -> bool {
        self.info().data_channel == DataChannel::None
    }

    /// Command line without the trailing CRLF
    pub fn line(self, args: &Arguments) -> String {
        format!("{}{}", self.verb(), args)
    }

    /// Same as [`Command::line`] but safe to log
    pub fn masked_line(self, args: &Arguments) -> String {
        match self {
            Command::Pass if !args.is_empty() => format!("{} ****", self.verb()),
            _ => self.line(args),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        COMMAND_TABLE
            .iter()
            .find(|info| info.verb.eq_ignore_ascii_case(s))
            .map(|info| info.command)
            .ok_or_else(|| format!("Unknown FTP command: {s}"))
    }
}

/// Arguments of one command line.
///
/// Empty arguments are skipped; every other one is preceded by a single
/// space when formatted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments(Vec<String>);

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.0.push(arg.into());
        self
    }

    /// True when no non-empty argument is present
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(String::is_empty)
    }
}

impl From<&str> for Arguments {
    fn from(arg: &str) -> Self {
        Self::new().arg(arg)
    }
}

impl From<String> for Arguments {
    fn from(arg: String) -> Self {
        Self::new().arg(arg)
    }
}

impl fmt::Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for arg in self.0.iter().filter(|arg| !arg.is_empty()) {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
