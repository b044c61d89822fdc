// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {mobileconfig_x509::X509Error, thiserror::Error};

/// Unified error type for profile signing and verification.
#[derive(Debug, Error)]
pub enum ProfileSigningError {
    #[error("Failed to sign profile: {message}")]
    SigningFailed { message: String },

    #[error("malformed signed data: {0}")]
    MalformedSignedData(String),

    #[error("content digest does not match the message-digest attribute")]
    DigestMismatch,

    #[error("signature does not verify against the signer certificate")]
    SignatureInvalid,

    #[error("signer certificate not present in signed data")]
    MissingSigner,
}

impl ProfileSigningError {
    pub fn signing_failed(message: impl ToString) -> Self {
        Self::SigningFailed {
            message: message.to_string(),
        }
    }
}

impl From<X509Error> for ProfileSigningError {
    fn from(e: X509Error) -> Self {
        Self::signing_failed(e)
    }
}

impl From<std::io::Error> for ProfileSigningError {
    fn from(e: std::io::Error) -> Self {
        Self::signing_failed(e)
    }
}
