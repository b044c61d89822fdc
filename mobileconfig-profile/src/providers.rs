// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Well-known public encrypted DNS services.

use crate::{DnsProtocol, ProfileConfig, ProfileError};

/// A public DNS service that can be used to fill in a [ProfileConfig].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DnsProvider {
    pub id: &'static str,
    pub name: &'static str,
    /// DNS over HTTPS endpoint.
    pub doh_url: &'static str,
    /// DNS over TLS server name.
    pub dot_hostname: &'static str,
    pub ips: &'static [&'static str],
    pub description: &'static str,
}

/// Id of the preset that carries no server settings.
pub const CUSTOM_PROVIDER_ID: &str = "custom";

pub static DNS_PROVIDERS: &[DnsProvider] = &[
    DnsProvider {
        id: "cloudflare",
        name: "Cloudflare",
        doh_url: "https://cloudflare-dns.com/dns-query",
        dot_hostname: "one.one.one.one",
        ips: &[
            "1.1.1.1",
            "1.0.0.1",
            "2606:4700:4700::1111",
            "2606:4700:4700::1001",
        ],
        description: "Fast & privacy-focused DNS by Cloudflare",
    },
    DnsProvider {
        id: "google",
        name: "Google",
        doh_url: "https://dns.google/dns-query",
        dot_hostname: "dns.google",
        ips: &[
            "8.8.8.8",
            "8.8.4.4",
            "2001:4860:4860::8888",
            "2001:4860:4860::8844",
        ],
        description: "Google Public DNS with global anycast",
    },
    DnsProvider {
        id: "quad9",
        name: "Quad9",
        doh_url: "https://dns.quad9.net/dns-query",
        dot_hostname: "dns.quad9.net",
        ips: &["9.9.9.9", "149.112.112.112", "2620:fe::fe", "2620:fe::9"],
        description: "Security-focused DNS with threat blocking",
    },
    DnsProvider {
        id: "adguard",
        name: "AdGuard",
        doh_url: "https://dns.adguard-dns.com/dns-query",
        dot_hostname: "dns.adguard-dns.com",
        ips: &["94.140.14.14", "94.140.15.15"],
        description: "Ad-blocking DNS by AdGuard",
    },
    DnsProvider {
        id: CUSTOM_PROVIDER_ID,
        name: "Custom",
        doh_url: "",
        dot_hostname: "",
        ips: &[],
        description: "Configure your own DNS server",
    },
];

/// Look up a preset by its id.
pub fn find_provider(id: &str) -> Result<&'static DnsProvider, ProfileError> {
    DNS_PROVIDERS
        .iter()
        .find(|p| p.id.eq_ignore_ascii_case(id))
        .ok_or_else(|| ProfileError::UnknownProvider(id.to_string()))
}

impl DnsProvider {
    pub fn is_custom(&self) -> bool {
        self.id == CUSTOM_PROVIDER_ID
    }

    /// The server address to use for a given protocol.
    pub fn server_for(&self, protocol: DnsProtocol) -> &'static str {
        match protocol {
            DnsProtocol::Https => self.doh_url,
            DnsProtocol::Tls => self.dot_hostname,
        }
    }

    /// Fill in a configuration from this preset.
    ///
    /// The server is chosen according to the configuration's current
    /// protocol, so set that first. The custom preset changes nothing.
    pub fn apply(&self, config: &mut ProfileConfig) {
        if self.is_custom() {
            return;
        }

        config.profile_name = self.name.to_string();
        config.profile_identifier = format!("com.{}.dns", self.id);
        config.server_url = self.server_for(config.dns_protocol).to_string();
        config.server_ips = self.ips.iter().map(|ip| ip.to_string()).collect();
    }
}
