//! Logon sequences for direct and firewalled connections
//!
//! Each [`FirewallType`] owns an ordered list of steps. A step names the
//! command to send and where to continue after a 2yz or a 3yz reply.

use crate::commands::{Arguments, Command};
use crate::types::{FirewallType, LogonInfo};

/// Command sent by one logon step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogonCommand {
    /// `USER user`
    User,
    /// `PASS pass`
    Pass,
    /// `ACCT account`
    Acct,
    /// `USER fwuser`
    FwUser,
    /// `PASS fwpass`
    FwPass,
    /// `SITE host[:port]`
    SiteHost,
    /// `OPEN host[:port]`
    OpenHost,
    /// `USER user@host[:port]`
    UserAtHost,
    /// `USER fwuser@host[:port]`
    FwUserAtHost,
    /// `USER user@host[:port] fwuser`
    UserAtHostFwUser,
    /// `USER user@fwuser@host[:port]`
    UserAtFwUserAtHost,
    /// `PASS pass@fwpass`
    PassAtFwPass,
}

impl LogonCommand {
    /// Command and arguments for `logon`
    pub fn render(self, logon: &LogonInfo) -> (Command, Arguments) {
        let host = logon.host_port();
        match self {
            LogonCommand::User => (Command::User, logon.user().into()),
            LogonCommand::Pass => (Command::Pass, logon.password().into()),
            LogonCommand::Acct => (Command::Acct, logon.account().into()),
            LogonCommand::FwUser => (Command::User, logon.firewall_user().into()),
            LogonCommand::FwPass => (Command::Pass, logon.firewall_password().into()),
            LogonCommand::SiteHost => (Command::Site, host.into()),
            LogonCommand::OpenHost => (Command::Open, host.into()),
            LogonCommand::UserAtHost => (Command::User, format!("{}@{}", logon.user(), host).into()),
            LogonCommand::FwUserAtHost => (
                Command::User,
                format!("{}@{}", logon.firewall_user(), host).into(),
            ),
            LogonCommand::UserAtHostFwUser => (
                Command::User,
                format!("{}@{} {}", logon.user(), host, logon.firewall_user()).into(),
            ),
            LogonCommand::UserAtFwUserAtHost => (
                Command::User,
                format!("{}@{}@{}", logon.user(), logon.firewall_user(), host).into(),
            ),
            LogonCommand::PassAtFwPass => (
                Command::Pass,
                format!("{}@{}", logon.password(), logon.firewall_password()).into(),
            ),
        }
    }
}

/// Where the sequence continues after a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Send the step of this sequence that issues the command
    Then(LogonCommand),
    LoggedOn,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogonStep {
    pub command: LogonCommand,
    /// Successor after a 2yz reply
    pub on_completion: Next,
    /// Successor after a 3yz reply
    pub on_intermediate: Next,
}

const fn step(command: LogonCommand, on_completion: Next, on_intermediate: Next) -> LogonStep {
    LogonStep {
        command,
        on_completion,
        on_intermediate,
    }
}

use LogonCommand::*;
use Next::{Failed as ER, LoggedOn as LO, Then as S};

static NO_FIREWALL: [LogonStep; 3] = [
    step(User, LO, S(Pass)),
    step(Pass, LO, S(Acct)),
    step(Acct, LO, ER),
];

static SITE_HOST_NAME: [LogonStep; 6] = [
    step(FwUser, S(SiteHost), S(FwPass)),
    step(FwPass, S(SiteHost), ER),
    step(SiteHost, ER, S(User)),
    step(User, LO, S(Pass)),
    step(Pass, LO, S(Acct)),
    step(Acct, LO, ER),
];

static USER_AFTER_LOGON: [LogonStep; 5] = [
    step(FwUser, S(UserAtHost), S(FwPass)),
    step(FwPass, S(UserAtHost), ER),
    step(UserAtHost, LO, S(Pass)),
    step(Pass, LO, S(Acct)),
    step(Acct, LO, ER),
];

static PROXY_OPEN: [LogonStep; 4] = [
    step(OpenHost, S(User), S(User)),
    step(User, LO, S(Pass)),
    step(Pass, LO, S(Acct)),
    step(Acct, LO, ER),
];

static TRANSPARENT: [LogonStep; 5] = [
    step(FwUser, S(User), S(FwPass)),
    step(FwPass, S(User), ER),
    step(User, LO, S(Pass)),
    step(Pass, LO, S(Acct)),
    step(Acct, LO, ER),
];

static USER_WITH_NO_LOGON: [LogonStep; 3] = [
    step(UserAtHost, LO, S(Pass)),
    step(Pass, LO, S(Acct)),
    step(Acct, LO, ER),
];

static USER_FIRE_ID_AT_REMOTE_HOST: [LogonStep; 5] = [
    step(FwUserAtHost, S(User), S(FwPass)),
    step(FwPass, S(User), ER),
    step(User, LO, S(Pass)),
    step(Pass, LO, S(Acct)),
    step(Acct, LO, ER),
];

static USER_REMOTE_ID_AT_REMOTE_HOST_FIRE_ID: [LogonStep; 3] = [
    step(UserAtHostFwUser, ER, S(Pass)),
    step(Pass, LO, S(Acct)),
    step(Acct, LO, ER),
];

static USER_REMOTE_ID_AT_FIRE_ID_AT_REMOTE_HOST: [LogonStep; 3] = [
    step(UserAtFwUserAtHost, LO, S(PassAtFwPass)),
    step(PassAtFwPass, LO, S(Acct)),
    step(Acct, LO, ER),
];

/// Step of `steps` that sends `command`
pub fn find_step(steps: &[LogonStep], command: LogonCommand) -> Option<LogonStep> {
    steps.iter().find(|s| s.command == command).copied()
}

/// Steps for `firewall`; the first one starts the logon
pub fn logon_sequence(firewall: FirewallType) -> &'static [LogonStep] {
    match firewall {
        FirewallType::None => &NO_FIREWALL,
        FirewallType::SiteHostName => &SITE_HOST_NAME,
        FirewallType::UserAfterLogon => &USER_AFTER_LOGON,
        FirewallType::ProxyOpen => &PROXY_OPEN,
        FirewallType::Transparent => &TRANSPARENT,
        FirewallType::UserWithNoLogon => &USER_WITH_NO_LOGON,
        FirewallType::UserFireIdAtRemoteHost => &USER_FIRE_ID_AT_REMOTE_HOST,
        FirewallType::UserRemoteIdAtRemoteHostFireId => &USER_REMOTE_ID_AT_REMOTE_HOST_FIRE_ID,
        FirewallType::UserRemoteIdAtFireIdAtRemoteHost => &USER_REMOTE_ID_AT_FIRE_ID_AT_REMOTE_HOST,
    }
}
