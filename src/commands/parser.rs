//! Parsing of interactive user input

/// One line typed at the `rax-ftp` prompt
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    List(Option<String>),
    NameList(Option<String>),
    Get { remote: String, local: Option<String> },
    Put { local: String, remote: Option<String> },
    Cd(String),
    Cdup,
    Pwd,
    Mkd(String),
    Rmd(String),
    Dele(String),
    Rename { from: String, to: String },
    Size(String),
    Mdtm(String),
    Syst,
    Noop,
    Help,
    Quit,
    /// Unknown verb or missing argument, with a message for the user
    Invalid(String),
}

/// Parse user input into a [`UserCommand`]
pub fn parse_user_command(input: &str) -> UserCommand {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return UserCommand::Invalid("Empty command".to_string());
    }

    let mut parts = trimmed.split_whitespace();
    let cmd = parts.next().unwrap_or("").to_uppercase();
    let args: Vec<String> = parts.map(str::to_string).collect();
    let first = args.first().cloned();
    let second = args.get(1).cloned();

    match cmd.as_str() {
        "LS" | "LIST" | "DIR" => UserCommand::List(first),
        "NLST" => UserCommand::NameList(first),
        "GET" | "RETR" => match first {
            Some(remote) => UserCommand::Get {
                remote,
                local: second,
            },
            None => UserCommand::Invalid("GET requires a remote file name".to_string()),
        },
        "PUT" | "STOR" => match first {
            Some(local) => UserCommand::Put {
                local,
                remote: second,
            },
            None => UserCommand::Invalid("PUT requires a local file name".to_string()),
        },
        "CD" | "CWD" => required(first, "CD", "a directory", UserCommand::Cd),
        "CDUP" => UserCommand::Cdup,
        "PWD" => UserCommand::Pwd,
        "MKD" | "MKDIR" => required(first, "MKD", "a directory name", UserCommand::Mkd),
        "RMD" | "RMDIR" => required(first, "RMD", "a directory name", UserCommand::Rmd),
        "DELE" | "DEL" => required(first, "DELE", "a file name", UserCommand::Dele),
        "RENAME" => match (first, second) {
            (Some(from), Some(to)) => UserCommand::Rename { from, to },
            _ => UserCommand::Invalid("RENAME requires a source and a target".to_string()),
        },
        "SIZE" => required(first, "SIZE", "a file name", UserCommand::Size),
        "MDTM" => required(first, "MDTM", "a file name", UserCommand::Mdtm),
        "SYST" => UserCommand::Syst,
        "NOOP" => UserCommand::Noop,
        "HELP" | "?" => UserCommand::Help,
        "QUIT" | "EXIT" | "BYE" => UserCommand::Quit,
        _ => UserCommand::Invalid(format!("Unknown command: {cmd}")),
    }
}

fn required(
    arg: Option<String>,
    name: &str,
    what: &str,
    build: fn(String) -> UserCommand,
) -> UserCommand {
    match arg {
        Some(arg) => build(arg),
        None => UserCommand::Invalid(format!("{name} requires {what}")),
    }
}
