// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cryptographic algorithms encountered in profile signing certificates.

use {
    crate::{
        rfc5280::{AlgorithmIdentifier, AlgorithmParameter},
        X509Error,
    },
    bcder::{ConstOid, Oid},
    bytes::Bytes,
    sha2::Digest,
    std::{
        convert::TryFrom,
        fmt::{Display, Formatter},
    },
};

/// SHA-256 digest algorithm.
///
/// 2.16.840.1.101.3.4.2.1
pub const OID_SHA256: ConstOid = Oid(&[96, 134, 72, 1, 101, 3, 4, 2, 1]);

/// RSA encryption.
///
/// 1.2.840.113549.1.1.1
pub const OID_RSA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 1]);

/// RSA+SHA-256 encryption.
///
/// 1.2.840.113549.1.1.11
pub const OID_SHA256_RSA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 11]);

/// ECDSA with SHA-256.
///
/// 1.2.840.10045.4.3.2
pub const OID_ECDSA_SHA256: ConstOid = Oid(&[42, 134, 72, 206, 61, 4, 3, 2]);

/// Elliptic curve public key cryptography.
///
/// 1.2.840.10045.2.1
pub const OID_EC_PUBLIC_KEY: ConstOid = Oid(&[42, 134, 72, 206, 61, 2, 1]);

/// NIST P-256 (secp256r1).
///
/// 1.2.840.10045.3.1.7
pub const OID_EC_SECP256R1: ConstOid = Oid(&[42, 134, 72, 206, 61, 3, 1, 7]);

/// NIST P-384 (secp384r1).
///
/// 1.3.132.0.34
pub const OID_EC_SECP384R1: ConstOid = Oid(&[43, 129, 4, 0, 34]);

/// NIST P-521 (secp521r1).
///
/// 1.3.132.0.35
pub const OID_EC_SECP521R1: ConstOid = Oid(&[43, 129, 4, 0, 35]);

fn owned_oid(oid: &ConstOid) -> Oid {
    Oid(Bytes::copy_from_slice(oid.as_ref()))
}

/// A hashing algorithm used for digesting data.
///
/// Profiles are only ever digested with SHA-256, but the type gives the
/// CMS layer a single place to map to and from [AlgorithmIdentifier].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DigestAlgorithm {
    /// SHA-256.
    ///
    /// Corresponds to OID 2.16.840.1.101.3.4.2.1.
    Sha256,
}

impl DigestAlgorithm {
    /// Digest a complete message.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => sha2::Sha256::digest(data).to_vec(),
        }
    }
}

impl From<DigestAlgorithm> for Oid {
    fn from(alg: DigestAlgorithm) -> Self {
        match alg {
            DigestAlgorithm::Sha256 => owned_oid(&OID_SHA256),
        }
    }
}

impl TryFrom<&Oid> for DigestAlgorithm {
    type Error = X509Error;

    fn try_from(v: &Oid) -> Result<Self, Self::Error> {
        if v == &OID_SHA256 {
            Ok(Self::Sha256)
        } else {
            Err(X509Error::UnknownAlgorithm(format!("{}", v)))
        }
    }
}

impl TryFrom<&AlgorithmIdentifier> for DigestAlgorithm {
    type Error = X509Error;

    fn try_from(v: &AlgorithmIdentifier) -> Result<Self, Self::Error> {
        Self::try_from(&v.algorithm)
    }
}

impl From<DigestAlgorithm> for AlgorithmIdentifier {
    fn from(alg: DigestAlgorithm) -> Self {
        Self {
            algorithm: alg.into(),
            parameters: None,
        }
    }
}

/// The public key algorithm of a certificate, as read from its
/// SubjectPublicKeyInfo.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PublicKeyAlgorithm {
    Rsa,
    EcdsaP256,
    EcdsaP384,
    EcdsaP521,
    Unknown,
}

impl PublicKeyAlgorithm {
    /// The signature algorithm a key of this type produces, if we can sign with it.
    pub fn signature_algorithm(&self) -> Option<SignatureAlgorithm> {
        SignatureAlgorithm::try_from(*self).ok()
    }

    /// The curve OID stored in the algorithm parameters of an EC public key.
    pub fn curve_oid(&self) -> Option<Oid> {
        match self {
            Self::EcdsaP256 => Some(owned_oid(&OID_EC_SECP256R1)),
            Self::EcdsaP384 => Some(owned_oid(&OID_EC_SECP384R1)),
            Self::EcdsaP521 => Some(owned_oid(&OID_EC_SECP521R1)),
            Self::Rsa | Self::Unknown => None,
        }
    }

    /// The identifier placed in a SubjectPublicKeyInfo for keys of this type.
    pub fn key_algorithm_identifier(&self) -> Option<AlgorithmIdentifier> {
        match self {
            Self::Rsa => Some(AlgorithmIdentifier {
                algorithm: owned_oid(&OID_RSA),
                parameters: Some(AlgorithmParameter::null()),
            }),
            Self::Unknown => None,
            _ => Some(AlgorithmIdentifier {
                algorithm: owned_oid(&OID_EC_PUBLIC_KEY),
                parameters: self.curve_oid().map(AlgorithmParameter::from_oid),
            }),
        }
    }
}

impl Display for PublicKeyAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Rsa => "RSA",
            Self::EcdsaP256 => "ECDSA-P256",
            Self::EcdsaP384 => "ECDSA-P384",
            Self::EcdsaP521 => "ECDSA-P521",
            Self::Unknown => "Unknown",
        })
    }
}

impl From<&AlgorithmIdentifier> for PublicKeyAlgorithm {
    fn from(v: &AlgorithmIdentifier) -> Self {
        if v.algorithm == OID_EC_PUBLIC_KEY {
            let curve = v
                .parameters
                .as_ref()
                .and_then(|params| params.decode_oid().ok());

            // Named curves we don't recognize (and absent parameters) are
            // treated as P-256, the most widely deployed curve.
            match curve {
                Some(oid) if oid == OID_EC_SECP384R1 => Self::EcdsaP384,
                Some(oid) if oid == OID_EC_SECP521R1 => Self::EcdsaP521,
                _ => Self::EcdsaP256,
            }
        } else if v.algorithm == OID_RSA || v.algorithm == OID_SHA256_RSA {
            Self::Rsa
        } else {
            Self::Unknown
        }
    }
}

/// An algorithm used to digitally sign content.
///
/// Every variant digests with SHA-256. The curve of ECDSA variants is
/// carried so key import and signature verification know which group
/// to operate in.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SignatureAlgorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    Rsa,
    /// ECDSA over NIST P-256 with SHA-256.
    EcdsaP256,
    /// ECDSA over NIST P-384 with SHA-256.
    EcdsaP384,
    /// ECDSA over NIST P-521 with SHA-256.
    EcdsaP521,
}

impl SignatureAlgorithm {
    /// The digest algorithm the signature is computed over.
    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        DigestAlgorithm::Sha256
    }

    /// The public key algorithm of keys producing this signature.
    pub fn public_key_algorithm(&self) -> PublicKeyAlgorithm {
        match self {
            Self::Rsa => PublicKeyAlgorithm::Rsa,
            Self::EcdsaP256 => PublicKeyAlgorithm::EcdsaP256,
            Self::EcdsaP384 => PublicKeyAlgorithm::EcdsaP384,
            Self::EcdsaP521 => PublicKeyAlgorithm::EcdsaP521,
        }
    }

    /// Whether an encountered signature algorithm identifier is compatible.
    ///
    /// Only the OID is compared. Producers disagree on whether RSA
    /// identifiers carry NULL parameters.
    pub fn matches_identifier(&self, v: &AlgorithmIdentifier) -> bool {
        match self {
            Self::Rsa => v.algorithm == OID_SHA256_RSA || v.algorithm == OID_RSA,
            Self::EcdsaP256 | Self::EcdsaP384 | Self::EcdsaP521 => {
                v.algorithm == OID_ECDSA_SHA256
            }
        }
    }
}

impl TryFrom<PublicKeyAlgorithm> for SignatureAlgorithm {
    type Error = X509Error;

    fn try_from(v: PublicKeyAlgorithm) -> Result<Self, Self::Error> {
        match v {
            PublicKeyAlgorithm::Rsa => Ok(Self::Rsa),
            PublicKeyAlgorithm::EcdsaP256 => Ok(Self::EcdsaP256),
            PublicKeyAlgorithm::EcdsaP384 => Ok(Self::EcdsaP384),
            PublicKeyAlgorithm::EcdsaP521 => Ok(Self::EcdsaP521),
            PublicKeyAlgorithm::Unknown => Err(X509Error::UnknownAlgorithm(v.to_string())),
        }
    }
}

impl From<SignatureAlgorithm> for AlgorithmIdentifier {
    fn from(alg: SignatureAlgorithm) -> Self {
        match alg {
            SignatureAlgorithm::Rsa => Self {
                algorithm: owned_oid(&OID_SHA256_RSA),
                parameters: Some(AlgorithmParameter::null()),
            },
            SignatureAlgorithm::EcdsaP256
            | SignatureAlgorithm::EcdsaP384
            | SignatureAlgorithm::EcdsaP521 => Self {
                algorithm: owned_oid(&OID_ECDSA_SHA256),
                parameters: None,
            },
        }
    }
}

impl Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rsa => f.write_str("sha256WithRSAEncryption"),
            Self::EcdsaP256 => f.write_str("ecdsa-with-SHA256 (P-256)"),
            Self::EcdsaP384 => f.write_str("ecdsa-with-SHA256 (P-384)"),
            Self::EcdsaP521 => f.write_str("ecdsa-with-SHA256 (P-521)"),
        }
    }
}
