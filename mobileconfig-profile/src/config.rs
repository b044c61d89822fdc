// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Profile configuration.

A [ProfileConfig] describes the DNS settings a profile installs. It can
be deserialized from YAML:

```yaml
profile-name: Office DNS
organization-name: Example Corp
profile-identifier: com.example.office.dns
dns-protocol: HTTPS
server-url: https://dns.example.com/dns-query
server-ips:
  - 192.0.2.1
encrypted-only: true
payload-scope: System
```

Every key is optional at the deserialization layer so a file can be
completed by command line flags. [ProfileConfig::validate] enforces what
a usable profile needs.
*/

use {
    crate::{FieldError, ProfileError},
    once_cell::sync::Lazy,
    regex::Regex,
    serde::{Deserialize, Serialize},
    std::{fmt::Display, net::IpAddr, path::Path, str::FromStr},
};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9.-]*$").expect("identifier regex is valid"));

/// Transport used to reach the encrypted DNS server.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum DnsProtocol {
    /// DNS over HTTPS.
    #[serde(rename = "HTTPS")]
    Https,
    /// DNS over TLS.
    #[serde(rename = "TLS")]
    Tls,
}

impl Default for DnsProtocol {
    fn default() -> Self {
        Self::Https
    }
}

impl DnsProtocol {
    /// Value of the `DNSProtocol` plist key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Https => "HTTPS",
            Self::Tls => "TLS",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Https => "DNS over HTTPS",
            Self::Tls => "DNS over TLS",
        }
    }
}

impl Display for DnsProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DnsProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "https" | "doh" => Ok(Self::Https),
            "tls" | "dot" => Ok(Self::Tls),
            _ => Err(format!("{} is not a DNS protocol", s)),
        }
    }
}

/// Whether a profile applies to the whole device or the current user.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum PayloadScope {
    System,
    User,
}

impl Default for PayloadScope {
    fn default() -> Self {
        Self::System
    }
}

impl PayloadScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "System",
            Self::User => "User",
        }
    }
}

impl Display for PayloadScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayloadScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            _ => Err(format!("{} is not a payload scope", s)),
        }
    }
}

/// Settings for an encrypted DNS configuration profile.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct ProfileConfig {
    /// Name shown to the user when installing the profile.
    pub profile_name: String,

    /// Organization shown alongside the profile. Omitted when empty.
    pub organization_name: String,

    /// Reverse-DNS identifier of the profile.
    pub profile_identifier: String,

    pub dns_protocol: DnsProtocol,

    /// DoH URL for [DnsProtocol::Https], server hostname for [DnsProtocol::Tls].
    pub server_url: String,

    /// Addresses used to bootstrap the connection to the server.
    pub server_ips: Vec<String>,

    /// Prevent the user from disabling the DNS settings.
    pub encrypted_only: bool,

    pub payload_scope: PayloadScope,
}

impl ProfileConfig {
    /// Read a configuration from a YAML file.
    pub fn from_yaml_path(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let fh = std::fs::File::open(path.as_ref())?;

        Ok(serde_yaml::from_reader(fh)?)
    }

    /// Parse a configuration from YAML text.
    pub fn from_yaml_str(s: &str) -> Result<Self, ProfileError> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Obtain a copy with surrounding whitespace removed and empty IPs dropped.
    pub fn normalized(&self) -> Self {
        Self {
            profile_name: self.profile_name.trim().to_string(),
            organization_name: self.organization_name.trim().to_string(),
            profile_identifier: self.profile_identifier.trim().to_string(),
            dns_protocol: self.dns_protocol,
            server_url: self.server_url.trim().to_string(),
            server_ips: self
                .server_ips
                .iter()
                .map(|ip| ip.trim())
                .filter(|ip| !ip.is_empty())
                .map(|ip| ip.to_string())
                .collect(),
            encrypted_only: self.encrypted_only,
            payload_scope: self.payload_scope,
        }
    }

    /// Check the configuration, reporting every problem found.
    pub fn validate(&self) -> Result<(), ProfileError> {
        let mut errors = vec![];

        if self.profile_name.trim().is_empty() {
            errors.push(FieldError::new("profile-name", "Profile name is required"));
        }

        if self.profile_identifier.trim().is_empty() {
            errors.push(FieldError::new(
                "profile-identifier",
                "Profile identifier is required",
            ));
        } else if !IDENTIFIER_RE.is_match(&self.profile_identifier) {
            errors.push(FieldError::new(
                "profile-identifier",
                "Invalid identifier format (use reverse-DNS style)",
            ));
        }

        if self.server_url.trim().is_empty() {
            errors.push(FieldError::new("server-url", "Server URL is required"));
        } else if self.dns_protocol == DnsProtocol::Https
            && !self.server_url.starts_with("https://")
        {
            errors.push(FieldError::new(
                "server-url",
                "DoH URL must start with https://",
            ));
        }

        if self
            .server_ips
            .iter()
            .map(|ip| ip.trim())
            .any(|ip| !ip.is_empty() && ip.parse::<IpAddr>().is_err())
        {
            errors.push(FieldError::new("server-ips", "Invalid IP address format"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProfileError::InvalidConfig(errors))
        }
    }
}
