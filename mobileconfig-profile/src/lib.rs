// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Apple encrypted DNS configuration profiles.

This crate turns a [ProfileConfig] into a `.mobileconfig` property list
that configures DNS over HTTPS or DNS over TLS on Apple devices, and
optionally signs it with [mobileconfig_signing].

```no_run
use mobileconfig_profile::{build_profile, find_provider, output_filename, write_profile, ProfileConfig};

let mut config = ProfileConfig::default();
find_provider("quad9")?.apply(&mut config);

let profile = build_profile(&config, None, false)?;
write_profile(output_filename(&config.profile_name), profile.as_bytes())?;
# Ok::<(), mobileconfig_profile::ProfileError>(())
```
*/

pub mod config;
pub use config::{DnsProtocol, PayloadScope, ProfileConfig};
mod error;
pub use error::{FieldError, ProfileError};
pub mod generator;
pub use generator::{generate_mobile_config, generate_mobile_config_with_uuids};
pub mod output;
pub use output::{output_filename, write_profile, MOBILECONFIG_MEDIA_TYPE};
pub mod providers;
pub use providers::{find_provider, DnsProvider, DNS_PROVIDERS};

pub use mobileconfig_signing::SigningMaterial;

use {
    log::{info, warn},
    mobileconfig_signing::sign_mobile_config,
};

/// A rendered profile, possibly signed.
#[derive(Clone, Debug)]
pub struct GeneratedProfile {
    /// The profile property list.
    pub xml: String,

    /// DER CMS wrapping of [Self::xml], when signing was requested and succeeded.
    pub signed: Option<Vec<u8>>,
}

impl GeneratedProfile {
    pub fn is_signed(&self) -> bool {
        self.signed.is_some()
    }

    /// The bytes to install: the signed message if present, else the XML.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.signed {
            Some(der) => der,
            None => self.xml.as_bytes(),
        }
    }
}

/// Validate, render and optionally sign a profile.
///
/// The configuration is normalized before validation. When signing fails
/// and `unsigned_on_failure` is set the unsigned profile is returned
/// instead of the error.
pub fn build_profile(
    config: &ProfileConfig,
    signing: Option<&SigningMaterial>,
    unsigned_on_failure: bool,
) -> Result<GeneratedProfile, ProfileError> {
    let config = config.normalized();
    config.validate()?;

    let xml = generate_mobile_config(&config);

    let signed = match signing {
        Some(material) => match sign_mobile_config(&xml, material) {
            Ok(der) => {
                info!("signed profile {}", config.profile_identifier);
                Some(der)
            }
            Err(e) if unsigned_on_failure => {
                warn!("{}; emitting unsigned profile", e);
                None
            }
            Err(e) => return Err(e.into()),
        },
        None => None,
    };

    Ok(GeneratedProfile { xml, signed })
}
