// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Rendering of configuration profile XML.

The emitted document is an Apple property list with a single
`com.apple.dnsSettings.managed` payload wrapped in a `Configuration`
profile. Values from the [ProfileConfig] are escaped but otherwise
written as given, so callers will typically want to pass a
[ProfileConfig::normalized] configuration.
*/

use {
    crate::{DnsProtocol, ProfileConfig},
    log::debug,
    uuid::Uuid,
};

const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
"#;

/// Escape text for inclusion in XML character data or attributes.
pub fn escape_xml(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());

    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }

    escaped
}

fn uuid_string(uuid: &Uuid) -> String {
    uuid.as_hyphenated()
        .encode_upper(&mut Uuid::encode_buffer())
        .to_string()
}

/// Render a configuration profile with freshly generated payload UUIDs.
pub fn generate_mobile_config(config: &ProfileConfig) -> String {
    generate_mobile_config_with_uuids(config, Uuid::new_v4(), Uuid::new_v4())
}

/// Render a configuration profile using the given UUIDs.
///
/// `profile_uuid` identifies the outer profile and `payload_uuid` the DNS
/// settings payload.
pub fn generate_mobile_config_with_uuids(
    config: &ProfileConfig,
    profile_uuid: Uuid,
    payload_uuid: Uuid,
) -> String {
    debug!(
        "generating {} profile {}",
        config.dns_protocol, config.profile_identifier
    );

    let server_key = match config.dns_protocol {
        DnsProtocol::Https => "ServerURL",
        DnsProtocol::Tls => "ServerName",
    };

    let mut dns_settings = format!(
        "\n      <key>DNSProtocol</key>\n      <string>{}</string>\n      <key>{}</key>\n      <string>{}</string>",
        config.dns_protocol.as_str(),
        server_key,
        escape_xml(&config.server_url)
    );

    if !config.server_ips.is_empty() {
        let addresses = config
            .server_ips
            .iter()
            .map(|ip| format!("<string>{}</string>", escape_xml(ip.trim())))
            .collect::<Vec<_>>()
            .join("\n        ");

        dns_settings.push_str(&format!(
            "\n      <key>ServerAddresses</key>\n      <array>\n        {}\n      </array>",
            addresses
        ));
    }

    let organization = if config.organization_name.is_empty() {
        String::new()
    } else {
        format!(
            "\n    <key>PayloadOrganization</key>\n    <string>{}</string>",
            escape_xml(&config.organization_name)
        )
    };

    let identifier = escape_xml(&config.profile_identifier);

    format!(
        r#"{header}<plist version="1.0">
  <dict>
    <key>PayloadContent</key>
    <array>
      <dict>
        <key>DNSSettings</key>
        <dict>{dns_settings}
        </dict>
        <key>OnDemandRules</key>
        <array>
          <dict>
            <key>Action</key>
            <string>Connect</string>
          </dict>
        </array>
        <key>PayloadDisplayName</key>
        <string>DNS Settings</string>
        <key>PayloadIdentifier</key>
        <string>{identifier}.dns</string>
        <key>PayloadType</key>
        <string>com.apple.dnsSettings.managed</string>
        <key>PayloadUUID</key>
        <string>{payload_uuid}</string>
        <key>PayloadVersion</key>
        <integer>1</integer>
        <key>ProhibitDisablement</key>
        <{encrypted_only}/>
      </dict>
    </array>
    <key>PayloadDescription</key>
    <string>Configures encrypted DNS ({description}) for secure DNS resolution.</string>
    <key>PayloadDisplayName</key>
    <string>{name}</string>
    <key>PayloadIdentifier</key>
    <string>{identifier}</string>{organization}
    <key>PayloadRemovalDisallowed</key>
    <false/>
    <key>PayloadScope</key>
    <string>{scope}</string>
    <key>PayloadType</key>
    <string>Configuration</string>
    <key>PayloadUUID</key>
    <string>{profile_uuid}</string>
    <key>PayloadVersion</key>
    <integer>1</integer>
  </dict>
</plist>"#,
        header = XML_HEADER,
        dns_settings = dns_settings,
        identifier = identifier,
        payload_uuid = uuid_string(&payload_uuid),
        encrypted_only = config.encrypted_only,
        description = config.dns_protocol.description(),
        name = escape_xml(&config.profile_name),
        organization = organization,
        scope = config.payload_scope.as_str(),
        profile_uuid = uuid_string(&profile_uuid),
    )
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::{find_provider, PayloadScope},
        indoc::indoc,
    };

    const PROFILE_UUID: &str = "11111111-2222-4333-8444-555555555555";
    const PAYLOAD_UUID: &str = "aaaaaaaa-bbbb-4ccc-8ddd-eeeeeeeeeeee";

    fn uuids() -> (Uuid, Uuid) {
        (
            Uuid::parse_str(PROFILE_UUID).unwrap(),
            Uuid::parse_str(PAYLOAD_UUID).unwrap(),
        )
    }

    fn render(config: &ProfileConfig) -> String {
        let (profile, payload) = uuids();
        generate_mobile_config_with_uuids(config, profile, payload)
    }

    #[test]
    fn escaping() {
        assert_eq!(
            escape_xml(r#"Tom & Jerry's <"DNS">"#),
            "Tom &amp; Jerry&apos;s &lt;&quot;DNS&quot;&gt;"
        );
        assert_eq!(escape_xml("plain"), "plain");
        assert_eq!(escape_xml("&amp;"), "&amp;amp;");
    }

    #[test]
    fn tls_profile_layout() {
        let config = ProfileConfig {
            profile_name: "Office".into(),
            organization_name: String::new(),
            profile_identifier: "com.example.office".into(),
            dns_protocol: DnsProtocol::Tls,
            server_url: "dns.example.com".into(),
            server_ips: vec![],
            encrypted_only: false,
            payload_scope: PayloadScope::User,
        };

        let expected = indoc! {r#"
            <?xml version="1.0" encoding="UTF-8"?>
            <!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
            <plist version="1.0">
              <dict>
                <key>PayloadContent</key>
                <array>
                  <dict>
                    <key>DNSSettings</key>
                    <dict>
                  <key>DNSProtocol</key>
                  <string>TLS</string>
                  <key>ServerName</key>
                  <string>dns.example.com</string>
                    </dict>
                    <key>OnDemandRules</key>
                    <array>
                      <dict>
                        <key>Action</key>
                        <string>Connect</string>
                      </dict>
                    </array>
                    <key>PayloadDisplayName</key>
                    <string>DNS Settings</string>
                    <key>PayloadIdentifier</key>
                    <string>com.example.office.dns</string>
                    <key>PayloadType</key>
                    <string>com.apple.dnsSettings.managed</string>
                    <key>PayloadUUID</key>
                    <string>AAAAAAAA-BBBB-4CCC-8DDD-EEEEEEEEEEEE</string>
                    <key>PayloadVersion</key>
                    <integer>1</integer>
                    <key>ProhibitDisablement</key>
                    <false/>
                  </dict>
                </array>
                <key>PayloadDescription</key>
                <string>Configures encrypted DNS (DNS over TLS) for secure DNS resolution.</string>
                <key>PayloadDisplayName</key>
                <string>Office</string>
                <key>PayloadIdentifier</key>
                <string>com.example.office</string>
                <key>PayloadRemovalDisallowed</key>
                <false/>
                <key>PayloadScope</key>
                <string>User</string>
                <key>PayloadType</key>
                <string>Configuration</string>
                <key>PayloadUUID</key>
                <string>11111111-2222-4333-8444-555555555555</string>
                <key>PayloadVersion</key>
                <integer>1</integer>
              </dict>
            </plist>"#};

        assert_eq!(render(&config), expected);
    }

    #[test]
    fn https_profile() -> Result<(), crate::ProfileError> {
        let mut config = ProfileConfig {
            organization_name: "R&D".into(),
            encrypted_only: true,
            ..Default::default()
        };
        find_provider("cloudflare")?.apply(&mut config);

        let xml = render(&config);

        assert!(xml.contains(
            "<key>DNSProtocol</key>\n      <string>HTTPS</string>\n      <key>ServerURL</key>\n      <string>https://cloudflare-dns.com/dns-query</string>"
        ));
        assert!(xml.contains(
            "<key>ServerAddresses</key>\n      <array>\n        <string>1.1.1.1</string>\n        <string>1.0.0.1</string>"
        ));
        assert!(xml.contains("<string>com.cloudflare.dns.dns</string>"));
        assert!(xml.contains("<key>ProhibitDisablement</key>\n        <true/>"));
        assert!(xml.contains("(DNS over HTTPS)"));
        assert!(xml.contains(
            "<key>PayloadOrganization</key>\n    <string>R&amp;D</string>\n    <key>PayloadRemovalDisallowed</key>"
        ));
        assert!(xml.contains("<string>System</string>"));
        assert!(!xml.contains("ServerName"));

        Ok(())
    }

    #[test]
    fn user_values_escaped() {
        let config = ProfileConfig {
            profile_name: "<script>".into(),
            profile_identifier: "com.example".into(),
            server_url: "https://dns.example.com/q?a=1&b=2".into(),
            ..Default::default()
        };

        let xml = render(&config);
        assert!(xml.contains("<string>&lt;script&gt;</string>"));
        assert!(xml.contains("q?a=1&amp;b=2"));
        assert!(!xml.contains("<script>"));
        assert!(!xml.contains("PayloadOrganization"));
    }

    #[test]
    fn random_uuids() {
        let config = ProfileConfig {
            profile_name: "x".into(),
            ..Default::default()
        };

        let a = generate_mobile_config(&config);
        let b = generate_mobile_config(&config);
        assert_ne!(a, b);

        let uuid_lines = a
            .lines()
            .skip_while(|l| !l.contains("<key>PayloadUUID</key>"))
            .nth(1)
            .unwrap();
        let value = uuid_lines
            .trim()
            .trim_start_matches("<string>")
            .trim_end_matches("</string>");
        assert_eq!(value, value.to_uppercase());
        assert_eq!(Uuid::parse_str(value).unwrap().get_version_num(), 4);
    }
}
