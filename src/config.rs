//! Configuration for the RAX FTP engine
//!
//! Values come from an optional TOML file, overridden by `RAX_FTP_*`
//! environment variables (`RAX_FTP_SERVER__HOST`, `RAX_FTP_CLIENT__TIMEOUT`,
//! ...), then validated.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use crate::error::{RaxFtpError, Result};
use crate::types::logon::{ANONYMOUS_PASSWORD, ANONYMOUS_USER, DEFAULT_FTP_PORT};
use crate::types::{FirewallType, LogonInfo};

const ENV_PREFIX: &str = "RAX_FTP";

/// Configuration for the RAX FTP client
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server to log on to
    pub server: ServerConfig,

    /// Firewall between us and the server, if any
    pub firewall: Option<FirewallConfig>,

    /// Engine settings
    pub client: ClientSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// FTP server hostname or IP address
    pub host: String,

    /// FTP server port number
    pub port: u16,

    pub user: String,
    pub password: String,
    pub account: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FirewallConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,

    /// Storage name of the firewall type, e.g. `USER_AFTER_LOGON`
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Timeout of every socket call, in seconds
    pub timeout: u64,

    /// Size of the transfer buffer in bytes
    pub buffer_size: usize,

    /// Root directory entered after logon
    pub remote_separator: String,

    /// Use PASV instead of PORT for data connections
    pub passive: bool,

    /// Resume interrupted transfers where possible
    pub resume: bool,

    /// Local directory path for file operations
    pub local_directory: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_FTP_PORT,
            user: ANONYMOUS_USER.to_string(),
            password: ANONYMOUS_PASSWORD.to_string(),
            account: String::new(),
        }
    }
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_FTP_PORT,
            user: String::new(),
            password: String::new(),
            kind: FirewallType::None.storage_name().to_string(),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout: 10,
            buffer_size: 2048,
            remote_separator: "/".to_string(),
            passive: true,
            resume: true,
            local_directory: ".".to_string(),
        }
    }
}

impl ClientSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl ClientConfig {
    /// Load from an optional TOML file plus environment overrides, then validate
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: ClientConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Firewall type, `None` when no firewall section is present
    pub fn firewall_type(&self) -> Result<FirewallType> {
        match &self.firewall {
            Some(firewall) => firewall.kind.parse().map_err(|_| {
                RaxFtpError::Config(format!("Unknown firewall type '{}'", firewall.kind))
            }),
            None => Ok(FirewallType::None),
        }
    }

    /// Logon parameters for the configured server
    pub fn logon_info(&self) -> Result<LogonInfo> {
        let server = &self.server;
        let info = match &self.firewall {
            Some(firewall) => LogonInfo::with_firewall(
                server.host.as_str(),
                server.port,
                server.user.as_str(),
                server.password.as_str(),
                server.account.as_str(),
                firewall.host.as_str(),
                firewall.port,
                firewall.user.as_str(),
                firewall.password.as_str(),
                self.firewall_type()?,
            ),
            None => LogonInfo::new(
                server.host.as_str(),
                server.port,
                server.user.as_str(),
                server.password.as_str(),
                server.account.as_str(),
            ),
        };
        Ok(info)
    }

    /// Server name for display (host, or host:port off the default port)
    pub fn display_name(&self) -> String {
        if self.server.port == DEFAULT_FTP_PORT {
            self.server.host.clone()
        } else {
            format!("{}:{}", self.server.host, self.server.port)
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(RaxFtpError::Config("Host cannot be empty".to_string()));
        }

        if self.server.port == 0 {
            return Err(RaxFtpError::Config("Port cannot be 0".to_string()));
        }

        if self.client.timeout == 0 {
            return Err(RaxFtpError::Config("Timeout cannot be 0".to_string()));
        }

        if self.client.buffer_size == 0 {
            return Err(RaxFtpError::Config("Buffer size cannot be 0".to_string()));
        }

        let firewall_type = self.firewall_type()?;
        if let Some(firewall) = &self.firewall {
            if firewall_type != FirewallType::None && firewall.host.is_empty() {
                return Err(RaxFtpError::Config(format!(
                    "Firewall type {} needs a firewall host",
                    firewall_type.storage_name()
                )));
            }
        }

        Ok(())
    }
}

impl fmt::Display for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let firewall = self
            .firewall_type()
            .map(|kind| kind.display_name())
            .unwrap_or("invalid");
        write!(
            f,
            "RAX FTP Config - Server: {}, User: {}, Firewall: {}, Timeout: {}s, Buffer: {} bytes, Mode: {}, Resume: {}, Local Dir: {}",
            self.display_name(),
            self.server.user,
            firewall,
            self.client.timeout,
            self.client.buffer_size,
            if self.client.passive { "passive" } else { "active" },
            self.client.resume,
            self.client.local_directory
        )
    }
}
