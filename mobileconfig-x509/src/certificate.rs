// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! High-level interface to the certificates used for profile signing.

use {
    crate::{
        algorithm::{PublicKeyAlgorithm, SignatureAlgorithm},
        pem_codec,
        rfc3280::Name,
        rfc5280::{Certificate, SubjectPublicKeyInfo},
        signing, X509Error,
    },
    bcder::{decode::Constructed, encode::Values, int::Integer, Mode},
    bytes::Bytes,
    chrono::{DateTime, Utc},
};

/// Value reported for a name lacking a usable common name.
pub const UNKNOWN_NAME: &str = "Unknown";

/// An X.509 certificate that remembers the DER it was parsed from.
///
/// Signatures embed certificates byte-for-byte, so we never re-serialize
/// a parsed certificate. The ASN.1 [Certificate] is kept alongside for
/// field access.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct X509Certificate {
    original: Vec<u8>,
    inner: Certificate,
}

impl X509Certificate {
    /// Construct an instance by parsing DER encoded ASN.1 data.
    ///
    /// BER input and trailing data are rejected.
    pub fn from_der(data: impl Into<Vec<u8>>) -> Result<Self, X509Error> {
        let original = data.into();

        let inner = Constructed::decode(original.as_slice(), Mode::Der, |cons| {
            Certificate::take_from(cons)
        })?;

        Ok(Self { original, inner })
    }

    /// Construct an instance from the first `CERTIFICATE` block in PEM text.
    ///
    /// Anything outside that block is ignored.
    pub fn from_pem(data: &str) -> Result<Self, X509Error> {
        let block =
            pem_codec::extract_first_certificate_block(data).ok_or(X509Error::NoPemBlock)?;

        Self::from_der(pem_codec::decode_base64_body(block)?)
            .map_err(|e| X509Error::InvalidPem(format!("not a DER certificate: {}", e)))
    }

    /// Construct instances from every `CERTIFICATE` block in PEM text.
    ///
    /// Fails on the first block that doesn't parse.
    pub fn from_pem_multiple(data: &str) -> Result<Vec<Self>, X509Error> {
        pem_codec::extract_all_certificate_blocks(data)
            .into_iter()
            .map(Self::from_pem)
            .collect::<Result<Vec<_>, _>>()
    }

    /// Obtain the serial number as the ASN.1 [Integer] type.
    pub fn serial_number_asn1(&self) -> &Integer {
        &self.inner.tbs_certificate.serial_number
    }

    /// Obtain the certificate's subject, as its ASN.1 [Name] type.
    pub fn subject_name(&self) -> &Name {
        &self.inner.tbs_certificate.subject
    }

    /// Obtain the certificate's issuer, as its ASN.1 [Name] type.
    pub fn issuer_name(&self) -> &Name {
        &self.inner.tbs_certificate.issuer
    }

    pub fn subject_common_name(&self) -> Option<String> {
        self.subject_name().common_name()
    }

    pub fn issuer_common_name(&self) -> Option<String> {
        self.issuer_name().common_name()
    }

    pub fn validity_not_before(&self) -> DateTime<Utc> {
        DateTime::from(&self.inner.tbs_certificate.validity.not_before)
    }

    pub fn validity_not_after(&self) -> DateTime<Utc> {
        DateTime::from(&self.inner.tbs_certificate.validity.not_after)
    }

    pub fn subject_public_key_info(&self) -> &SubjectPublicKeyInfo {
        &self.inner.tbs_certificate.subject_public_key_info
    }

    /// The algorithm of the public key this certificate binds.
    pub fn public_key_algorithm(&self) -> PublicKeyAlgorithm {
        PublicKeyAlgorithm::from(&self.subject_public_key_info().algorithm)
    }

    /// The algorithm signatures made by this certificate's key use.
    ///
    /// `None` if the key type isn't one we can sign with.
    pub fn signature_algorithm(&self) -> Option<SignatureAlgorithm> {
        self.public_key_algorithm().signature_algorithm()
    }

    /// Obtain the raw data constituting this certificate's public key.
    ///
    /// For RSA this is a PKCS#1 `RSAPublicKey`. For ECDSA it is a SEC1
    /// encoded curve point.
    pub fn public_key_data(&self) -> Bytes {
        self.subject_public_key_info()
            .subject_public_key
            .octet_bytes()
    }

    /// The DER data this instance was constructed from.
    pub fn constructed_data(&self) -> &[u8] {
        &self.original
    }

    /// Encode the original DER as PEM.
    pub fn encode_pem(&self) -> String {
        pem_codec::encode_pem("CERTIFICATE", &self.original)
    }

    /// Access the parsed ASN.1 certificate.
    pub fn as_asn1(&self) -> &Certificate {
        &self.inner
    }

    /// Re-encode the ASN.1 certificate as DER.
    pub fn encode_der(&self) -> Result<Vec<u8>, std::io::Error> {
        let mut buffer = Vec::<u8>::new();
        self.inner
            .encode_ref()
            .write_encoded(Mode::Der, &mut buffer)?;

        Ok(buffer)
    }

    /// Verify a signature over a message was made by this certificate's key.
    ///
    /// The message is digested with SHA-256 as part of verification.
    pub fn verify_signed_data(
        &self,
        message: impl AsRef<[u8]>,
        signature: impl AsRef<[u8]>,
    ) -> Result<(), X509Error> {
        let algorithm = self
            .signature_algorithm()
            .ok_or_else(|| X509Error::UnknownAlgorithm(self.public_key_algorithm().to_string()))?;

        signing::verify_sha256_signature(
            algorithm,
            &self.public_key_data(),
            message.as_ref(),
            signature.as_ref(),
        )
    }

    /// Summarize this certificate.
    pub fn to_parsed(&self) -> ParsedCertificate {
        ParsedCertificate {
            subject_common_name: self
                .subject_common_name()
                .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            issuer_common_name: self
                .issuer_common_name()
                .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            not_before: self.validity_not_before(),
            not_after: self.validity_not_after(),
            public_key_algorithm: self.public_key_algorithm(),
        }
    }
}

impl AsRef<Certificate> for X509Certificate {
    fn as_ref(&self) -> &Certificate {
        &self.inner
    }
}

impl TryFrom<Certificate> for X509Certificate {
    type Error = X509Error;

    fn try_from(cert: Certificate) -> Result<Self, Self::Error> {
        let mut original = Vec::new();
        cert.encode_ref().write_encoded(Mode::Der, &mut original)?;

        Ok(Self {
            original,
            inner: cert,
        })
    }
}

/// The human-facing fields of a certificate.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedCertificate {
    pub subject_common_name: String,
    pub issuer_common_name: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub public_key_algorithm: PublicKeyAlgorithm,
}

/// Parse DER certificate data into its human-facing fields.
pub fn parse_certificate(der: &[u8]) -> Result<ParsedCertificate, X509Error> {
    X509Certificate::from_der(der)
        .map(|cert| cert.to_parsed())
        .map_err(|e| X509Error::InvalidPem(format!("not a DER certificate: {}", e)))
}
