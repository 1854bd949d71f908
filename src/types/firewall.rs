//! Firewall traversal schemes

use std::fmt;
use std::str::FromStr;

/// How the logon sequence reaches the remote host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirewallType {
    #[default]
    None,
    SiteHostName,
    UserAfterLogon,
    ProxyOpen,
    Transparent,
    UserWithNoLogon,
    UserFireIdAtRemoteHost,
    UserRemoteIdAtRemoteHostFireId,
    UserRemoteIdAtFireIdAtRemoteHost,
}

const ALL: [FirewallType; 9] = [
    FirewallType::None,
    FirewallType::SiteHostName,
    FirewallType::UserAfterLogon,
    FirewallType::ProxyOpen,
    FirewallType::Transparent,
    FirewallType::UserWithNoLogon,
    FirewallType::UserFireIdAtRemoteHost,
    FirewallType::UserRemoteIdAtRemoteHostFireId,
    FirewallType::UserRemoteIdAtFireIdAtRemoteHost,
];

impl FirewallType {
    pub fn all() -> &'static [FirewallType] {
        &ALL
    }

    /// Human readable name
    pub fn display_name(self) -> &'static str {
        match self {
            FirewallType::None => "no firewall",
            FirewallType::SiteHostName => "SITE hostname",
            FirewallType::UserAfterLogon => "USER after logon",
            FirewallType::ProxyOpen => "proxy OPEN",
            FirewallType::Transparent => "Transparent",
            FirewallType::UserWithNoLogon => "USER with no logon",
            FirewallType::UserFireIdAtRemoteHost => "USER fireID@remotehost",
            FirewallType::UserRemoteIdAtRemoteHostFireId => "USER remoteID@remotehost fireID",
            FirewallType::UserRemoteIdAtFireIdAtRemoteHost => "USER remoteID@fireID@remotehost",
        }
    }

    /// Name used in configuration files
    pub fn storage_name(self) -> &'static str {
        match self {
            FirewallType::None => "NO_FIREWALL",
            FirewallType::SiteHostName => "SITE_HOSTNAME",
            FirewallType::UserAfterLogon => "USER_AFTER_LOGON",
            FirewallType::ProxyOpen => "PROXY_OPEN",
            FirewallType::Transparent => "TRANSPARENT",
            FirewallType::UserWithNoLogon => "USER_WITH_NO_LOGON",
            FirewallType::UserFireIdAtRemoteHost => "USER_FIREID@REMOTEHOST",
            FirewallType::UserRemoteIdAtRemoteHostFireId => "USER_REMOTEID@REMOTEHOST_FIREID",
            FirewallType::UserRemoteIdAtFireIdAtRemoteHost => "USER_REMOTEID@FIREID@REMOTEHOST",
        }
    }
}

impl fmt::Display for FirewallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for FirewallType {
    type Err = String;

    /// Accepts the storage name, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL.iter()
            .copied()
            .find(|fw| fw.storage_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown firewall type: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_names_round_trip() {
        for fw in FirewallType::all() {
            assert_eq!(fw.storage_name().parse::<FirewallType>(), Ok(*fw));
        }
        assert_eq!(
            "user_after_logon".parse::<FirewallType>(),
            Ok(FirewallType::UserAfterLogon)
        );
        assert!("USER after logon".parse::<FirewallType>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(FirewallType::default().to_string(), "no firewall");
        assert_eq!(
            FirewallType::UserRemoteIdAtRemoteHostFireId.to_string(),
            "USER remoteID@remotehost fireID"
        );
        assert_eq!(FirewallType::all().len(), 9);
    }
}
