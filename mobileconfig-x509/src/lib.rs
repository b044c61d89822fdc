// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! X.509 certificate and private key handling for profile signing.
//!
//! This crate turns the PEM text a user hands us into something that can
//! produce signatures: certificates are parsed into [X509Certificate] and
//! private keys are imported through a [signing::CryptoProvider] into a
//! [signing::Sign] implementation matching the certificate's algorithm.
//!
//! Low-level ASN.1 primitives are defined in modules having the name of the
//! RFC in which they are defined.

pub mod algorithm;
pub use algorithm::{DigestAlgorithm, PublicKeyAlgorithm, SignatureAlgorithm};
pub mod asn1time;
mod certificate;
pub use certificate::{parse_certificate, ParsedCertificate, X509Certificate, UNKNOWN_NAME};
pub mod pem_codec;
pub mod rfc3280;
pub mod rfc4519;
pub mod rfc5280;
pub mod signing;
pub use signing::{
    import_signing_key, CryptoProvider, InMemorySigningKey, RustCryptoProvider, Sign,
};
#[cfg(any(test, feature = "test"))]
pub mod testutil;

use thiserror::Error;

/// The reason a piece of PEM input was rejected.
///
/// Validation reports these rather than failing outright.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ReasonCode {
    NoPemBlock,
    UnsupportedKeyType,
    EncryptedKey,
    InvalidPem,
}

/// Errors related to certificates and private keys.
#[derive(Debug, Error)]
pub enum X509Error {
    #[error("no PEM block found")]
    NoPemBlock,

    #[error("invalid PEM: {0}")]
    InvalidPem(String),

    #[error("unsupported private key type: {0}")]
    UnsupportedKeyType(String),

    #[error("encrypted private keys are not supported")]
    EncryptedKey,

    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("ASN.1 decode error: {0}")]
    Asn1Decode(#[from] bcder::decode::DecodeError<std::convert::Infallible>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("private key does not match certificate public key")]
    KeyMismatch,

    #[error("error when creating signature: {0}")]
    SigningError(String),

    #[error("signature verification failed")]
    SignatureVerification,
}

impl X509Error {
    /// Map input rejection errors onto a [ReasonCode].
    ///
    /// Returns `None` for errors that don't describe a problem with user input.
    pub fn reason_code(&self) -> Option<ReasonCode> {
        match self {
            Self::NoPemBlock => Some(ReasonCode::NoPemBlock),
            Self::InvalidPem(_) | Self::Asn1Decode(_) => Some(ReasonCode::InvalidPem),
            Self::UnsupportedKeyType(_) => Some(ReasonCode::UnsupportedKeyType),
            Self::EncryptedKey => Some(ReasonCode::EncryptedKey),
            _ => None,
        }
    }
}
