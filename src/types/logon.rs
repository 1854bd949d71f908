//! Logon parameters

use crate::types::FirewallType;

pub const DEFAULT_FTP_PORT: u16 = 21;
pub const ANONYMOUS_USER: &str = "anonymous";
pub const ANONYMOUS_PASSWORD: &str = "anonymous@user.com";

/// Everything needed to log on to a server, optionally through a firewall
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogonInfo {
    host: String,
    port: u16,
    user: String,
    password: String,
    account: String,
    firewall_host: String,
    firewall_port: u16,
    firewall_user: String,
    firewall_password: String,
    firewall_type: FirewallType,
}

impl Default for LogonInfo {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_FTP_PORT,
            user: ANONYMOUS_USER.to_string(),
            password: ANONYMOUS_PASSWORD.to_string(),
            account: String::new(),
            firewall_host: String::new(),
            firewall_port: DEFAULT_FTP_PORT,
            firewall_user: String::new(),
            firewall_password: String::new(),
            firewall_type: FirewallType::None,
        }
    }
}

impl LogonInfo {
    /// Direct connection without firewall
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        account: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            account: account.into(),
            ..Self::default()
        }
    }

    /// Connection through a firewall
    #[allow(clippy::too_many_arguments)]
    pub fn with_firewall(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        account: impl Into<String>,
        firewall_host: impl Into<String>,
        firewall_port: u16,
        firewall_user: impl Into<String>,
        firewall_password: impl Into<String>,
        firewall_type: FirewallType,
    ) -> Self {
        Self {
            firewall_host: firewall_host.into(),
            firewall_port,
            firewall_user: firewall_user.into(),
            firewall_password: firewall_password.into(),
            firewall_type,
            ..Self::new(host, port, user, password, account)
        }
    }

    /// Anonymous logon to `host` on the default port
    pub fn anonymous(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn firewall_host(&self) -> &str {
        &self.firewall_host
    }

    pub fn firewall_port(&self) -> u16 {
        self.firewall_port
    }

    pub fn firewall_user(&self) -> &str {
        &self.firewall_user
    }

    pub fn firewall_password(&self) -> &str {
        &self.firewall_password
    }

    pub fn firewall_type(&self) -> FirewallType {
        self.firewall_type
    }

    /// `host`, or `host:port` when the port is not 21
    pub fn host_port(&self) -> String {
        if self.port == DEFAULT_FTP_PORT {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Host and port of the first control connection
    pub fn connect_target(&self) -> (&str, u16) {
        match self.firewall_type {
            FirewallType::None => (&self.host, self.port),
            _ => (&self.firewall_host, self.firewall_port),
        }
    }
}
