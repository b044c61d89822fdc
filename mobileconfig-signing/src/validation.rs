// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Validation of user supplied PEM material.

These functions never fail. Problems with the input are reported as a
[ValidationResult] carrying a [ReasonCode] and a message suitable for
showing to the user.
*/

use {
    log::debug,
    mobileconfig_x509::{
        pem_codec::{self, PrivateKeyLabel},
        InMemorySigningKey, ParsedCertificate, ReasonCode, Sign, X509Certificate, X509Error,
    },
};

const NO_CERTIFICATE_BLOCK: &str = "No PEM certificate block found";
const INVALID_CERTIFICATE: &str = "Invalid PEM certificate";
const ENCRYPTED_KEY: &str =
    "Encrypted private keys are not supported. Please provide an unencrypted private key.";
const NO_PRIVATE_KEY_BLOCK: &str = "No valid private key PEM block found";
const INVALID_PRIVATE_KEY: &str = "Invalid PEM private key";

/// Outcome of validating PEM input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ValidationResult {
    Valid,
    Invalid { reason: ReasonCode, message: String },
}

impl ValidationResult {
    fn invalid(reason: ReasonCode, message: impl ToString) -> Self {
        Self::Invalid {
            reason,
            message: message.to_string(),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// The reason input was rejected, if it was.
    pub fn reason(&self) -> Option<ReasonCode> {
        match self {
            Self::Valid => None,
            Self::Invalid { reason, .. } => Some(*reason),
        }
    }

    /// The user facing message of a rejection.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Valid => None,
            Self::Invalid { message, .. } => Some(message),
        }
    }
}

/// Check that the first certificate in PEM text parses.
///
/// Additional blocks and surrounding text are ignored.
pub fn validate_certificate(pem: &str) -> ValidationResult {
    let block = match pem_codec::extract_first_certificate_block(pem) {
        Some(block) => block,
        None => return ValidationResult::invalid(ReasonCode::NoPemBlock, NO_CERTIFICATE_BLOCK),
    };

    match X509Certificate::from_pem(block) {
        Ok(_) => ValidationResult::Valid,
        Err(e) => {
            debug!("certificate validation failed: {}", e);
            ValidationResult::invalid(ReasonCode::InvalidPem, INVALID_CERTIFICATE)
        }
    }
}

/// Check that PEM text holds an unencrypted private key we can sign with.
pub fn validate_private_key(pem: &str) -> ValidationResult {
    let trimmed = pem.trim();

    if pem_codec::is_encrypted_private_key(trimmed) {
        return ValidationResult::invalid(ReasonCode::EncryptedKey, ENCRYPTED_KEY);
    }

    let block = match pem_codec::find_private_key_block(trimmed) {
        Some(block) => block,
        None => return ValidationResult::invalid(ReasonCode::NoPemBlock, NO_PRIVATE_KEY_BLOCK),
    };

    if let PrivateKeyLabel::Other(label) = &block.label {
        return ValidationResult::invalid(
            ReasonCode::UnsupportedKeyType,
            format!("Unsupported private key type: {}", label),
        );
    }

    let der = match block.decode() {
        Ok(der) => der,
        Err(e) => {
            debug!("private key validation failed: {}", e);
            return ValidationResult::invalid(ReasonCode::InvalidPem, INVALID_PRIVATE_KEY);
        }
    };

    match InMemorySigningKey::from_der_any(&block.label, &der) {
        Ok(key) => {
            debug!("private key is usable as {}", key.signature_algorithm());
            ValidationResult::Valid
        }
        Err(X509Error::UnsupportedKeyType(detail)) => ValidationResult::invalid(
            ReasonCode::UnsupportedKeyType,
            format!("Unsupported private key type: {}", detail),
        ),
        Err(e) => ValidationResult::invalid(
            ReasonCode::UnsupportedKeyType,
            format!("Unsupported private key type: {}", e),
        ),
    }
}

/// Split PEM text into its certificate blocks.
pub fn parse_certificate_chain(pem: &str) -> Vec<String> {
    pem_codec::extract_all_certificate_blocks(pem)
        .into_iter()
        .map(|block| block.to_string())
        .collect()
}

/// Describe the first certificate in PEM text.
///
/// `None` if there is no certificate or it doesn't parse.
pub fn get_certificate_info(pem: &str) -> Option<ParsedCertificate> {
    match X509Certificate::from_pem(pem) {
        Ok(cert) => Some(cert.to_parsed()),
        Err(e) => {
            debug!("unable to describe certificate: {}", e);
            None
        }
    }
}
