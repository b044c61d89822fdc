// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::ProfileError,
    log::info,
    std::path::{Path, PathBuf},
};

/// Media type to serve `.mobileconfig` files with.
pub const MOBILECONFIG_MEDIA_TYPE: &str = "application/x-apple-aspen-config";

pub const MOBILECONFIG_EXTENSION: &str = ".mobileconfig";

const DEFAULT_FILE_STEM: &str = "dns-profile";

/// Derive a file name for a profile from its display name.
pub fn output_filename(profile_name: &str) -> String {
    let stem = profile_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>();

    // Dots are sanitized too, so the extension is always appended.
    if stem.is_empty() {
        format!("{}{}", DEFAULT_FILE_STEM, MOBILECONFIG_EXTENSION)
    } else {
        format!("{}{}", stem, MOBILECONFIG_EXTENSION)
    }
}

/// Write profile bytes to a path, creating parent directories as needed.
pub fn write_profile(path: impl AsRef<Path>, data: &[u8]) -> Result<PathBuf, ProfileError> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(path, data)?;
    info!("wrote {} bytes to {}", data.len(), path.display());

    Ok(path.to_path_buf())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn filenames() {
        assert_eq!(output_filename("Cloudflare"), "Cloudflare.mobileconfig");
        assert_eq!(output_filename("Office DNS (v2)"), "Office_DNS__v2_.mobileconfig");
        assert_eq!(output_filename("my-dns_1"), "my-dns_1.mobileconfig");
        assert_eq!(output_filename(""), "dns-profile.mobileconfig");
        assert_eq!(output_filename("ünï"), "_n_.mobileconfig");
    }

    #[test]
    fn existing_extension_is_sanitized() {
        assert_eq!(
            output_filename("a.mobileconfig"),
            "a_mobileconfig.mobileconfig"
        );
        assert_eq!(
            output_filename(".mobileconfig"),
            "_mobileconfig.mobileconfig"
        );
        assert_eq!(output_filename("."), "_.mobileconfig");
    }

    #[test]
    fn filename_is_idempotent() {
        for name in ["Cloudflare", "", "x y", "../etc/passwd"] {
            let once = output_filename(name);
            let stem = once.trim_end_matches(MOBILECONFIG_EXTENSION);
            assert_eq!(output_filename(stem), once);
            assert!(!once.contains('/'));
        }
    }

    #[test]
    fn writes_files() -> Result<(), ProfileError> {
        let td = tempfile::tempdir()?;
        let path = td.path().join("nested").join(output_filename("Test"));

        let written = write_profile(&path, b"<plist/>")?;
        assert_eq!(written, path);
        assert_eq!(std::fs::read(&path)?, b"<plist/>");

        Ok(())
    }
}
