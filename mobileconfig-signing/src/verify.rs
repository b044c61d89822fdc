// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Verification of signed profiles.

This checks that a signed profile is internally consistent: the embedded
content matches the signed digest and the signature verifies against the
embedded signer certificate. No trust decisions are made. The certificate
chain is not validated.
*/

use {
    crate::{
        asn1::rfc5652::{
            SignedData, SignerIdentifier, SignerInfo, OID_CONTENT_TYPE, OID_ID_DATA,
            OID_MESSAGE_DIGEST, OID_SIGNING_TIME,
        },
        ProfileSigningError,
    },
    bcder::{decode::Constructed, Mode},
    chrono::{DateTime, Utc},
    log::debug,
    mobileconfig_x509::{
        asn1time::Time, CryptoProvider, DigestAlgorithm, RustCryptoProvider, SignatureAlgorithm,
        X509Certificate,
    },
};

/// A signed profile whose signature checked out.
#[derive(Clone, Debug)]
pub struct VerifiedProfile {
    /// The signed content.
    pub content: Vec<u8>,

    /// Certificate of the entity that signed the content.
    pub signer: X509Certificate,

    /// Every certificate embedded in the message, signer included.
    pub certificates: Vec<X509Certificate>,

    /// The algorithm the signature was made with.
    pub signature_algorithm: SignatureAlgorithm,

    /// The signing-time attribute, if present.
    pub signing_time: Option<DateTime<Utc>>,
}

impl VerifiedProfile {
    /// The signed content as text, if it is UTF-8.
    pub fn content_utf8(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

/// Verify a DER signed profile using the default [CryptoProvider].
pub fn verify_signed_profile(der: &[u8]) -> Result<VerifiedProfile, ProfileSigningError> {
    verify_signed_profile_with_provider(&RustCryptoProvider, der)
}

fn malformed(message: impl ToString) -> ProfileSigningError {
    ProfileSigningError::MalformedSignedData(message.to_string())
}

/// Verify a signed profile using a specific [CryptoProvider].
pub fn verify_signed_profile_with_provider(
    provider: &dyn CryptoProvider,
    der: &[u8],
) -> Result<VerifiedProfile, ProfileSigningError> {
    let signed_data = SignedData::decode_ber(der).map_err(malformed)?;

    if signed_data.content_info.content_type != OID_ID_DATA {
        return Err(malformed(format!(
            "unexpected encapsulated content type {}",
            signed_data.content_info.content_type
        )));
    }

    let content = signed_data
        .content_info
        .content
        .as_ref()
        .map(|content| content.to_bytes().to_vec())
        .ok_or_else(|| malformed("content is not attached"))?;

    let certificates = signed_data
        .certificates
        .iter()
        .flat_map(|certs| certs.iter())
        .map(|cert| X509Certificate::from_der(cert.as_slice()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(malformed)?;

    let signer_info = match signed_data.signer_infos.as_slice() {
        [signer_info] => signer_info,
        [] => return Err(ProfileSigningError::MissingSigner),
        _ => return Err(malformed("more than one signer")),
    };

    let signer = find_signer_certificate(signer_info, &certificates)
        .ok_or(ProfileSigningError::MissingSigner)?
        .clone();

    DigestAlgorithm::try_from(&signer_info.digest_algorithm).map_err(malformed)?;

    let signature_algorithm = signer
        .signature_algorithm()
        .filter(|alg| alg.matches_identifier(&signer_info.signature_algorithm))
        .ok_or_else(|| malformed("signature algorithm does not match signer certificate"))?;

    let attributes = signer_info
        .signed_attributes
        .as_ref()
        .ok_or_else(|| malformed("signed attributes are missing"))?;

    let content_type = attributes
        .find(&OID_CONTENT_TYPE)
        .and_then(|attr| attr.single_value())
        .ok_or_else(|| malformed("content-type attribute is missing"))?
        .decode_oid()
        .map_err(malformed)?;
    if content_type != signed_data.content_info.content_type {
        return Err(malformed("content-type attribute disagrees with content"));
    }

    let message_digest = attributes
        .find(&OID_MESSAGE_DIGEST)
        .and_then(|attr| attr.single_value())
        .ok_or_else(|| malformed("message-digest attribute is missing"))?
        .decode_octet_string()
        .map_err(malformed)?
        .to_bytes();

    if message_digest.as_ref() != provider.digest_sha256(&content).as_slice() {
        return Err(ProfileSigningError::DigestMismatch);
    }

    let signing_time = match attributes
        .find(&OID_SIGNING_TIME)
        .and_then(|attr| attr.single_value())
    {
        Some(value) => {
            let time = Constructed::decode(value.as_slice(), Mode::Der, |cons| {
                Time::take_from(cons)
            })
            .map_err(malformed)?;

            Some(DateTime::from(&time))
        }
        None => None,
    };

    let signed_content = signer_info
        .signed_attributes_digested_content()
        .map_err(malformed)?
        .ok_or_else(|| malformed("signed attributes are missing"))?;

    provider
        .verify(
            signature_algorithm,
            &signer.public_key_data(),
            &signed_content,
            &signer_info.signature.to_bytes(),
        )
        .map_err(|_| ProfileSigningError::SignatureInvalid)?;

    debug!(
        "verified {} signature over {} bytes of content",
        signature_algorithm,
        content.len()
    );

    Ok(VerifiedProfile {
        content,
        signer,
        certificates,
        signature_algorithm,
        signing_time,
    })
}

fn find_signer_certificate<'a>(
    signer_info: &SignerInfo,
    certificates: &'a [X509Certificate],
) -> Option<&'a X509Certificate> {
    match &signer_info.sid {
        SignerIdentifier::IssuerAndSerialNumber(sid) => certificates.iter().find(|cert| {
            cert.issuer_name() == &sid.issuer && cert.serial_number_asn1() == &sid.serial_number
        }),
        SignerIdentifier::SubjectKeyIdentifier(_) => None,
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::signing::{SignedDataBuilder, SignerBuilder},
        bcder::encode::Values,
        mobileconfig_x509::{import_signing_key, testutil::*, PublicKeyAlgorithm},
    };

    const CONTENT: &str = "<?xml version=\"1.0\"?><plist version=\"1.0\"><dict/></plist>";

    fn sign_rsa() -> Vec<u8> {
        let cert = rsa_cert();
        let key = import_signing_key(&RustCryptoProvider, RSA_PRIVATE_KEY_PEM, &cert).unwrap();

        SignedDataBuilder::default()
            .content(CONTENT)
            .signer(SignerBuilder::new(key.as_ref(), cert))
            .build_der(&RustCryptoProvider)
            .unwrap()
    }

    #[test]
    fn verify_round_trip() {
        let verified = verify_signed_profile(&sign_rsa()).unwrap();

        assert_eq!(verified.content_utf8(), Some(CONTENT));
        assert_eq!(verified.signer, rsa_cert());
        assert_eq!(verified.certificates, vec![rsa_cert()]);
        assert_eq!(verified.signature_algorithm, SignatureAlgorithm::Rsa);
        assert!(verified.signing_time.is_some());
    }

    #[test]
    fn tampered_content_detected() {
        let der = sign_rsa();
        let position = der
            .windows(CONTENT.len())
            .position(|w| w == CONTENT.as_bytes())
            .unwrap();

        let mut tampered = der.clone();
        // Flip a character inside the plist.
        tampered[position + 30] ^= 0x01;

        assert!(matches!(
            verify_signed_profile(&tampered),
            Err(ProfileSigningError::DigestMismatch)
        ));
    }

    #[test]
    fn tampered_signature_detected() {
        let mut signed_data = SignedData::decode_ber(&sign_rsa()).unwrap();
        let signature = signed_data.signer_infos[0].signature.to_bytes();
        let mut corrupted = signature.to_vec();
        corrupted[10] ^= 0xff;
        signed_data.signer_infos[0].signature =
            bcder::OctetString::new(bytes::Bytes::from(corrupted));

        let mut der = Vec::new();
        signed_data
            .encode_ref()
            .write_encoded(Mode::Der, &mut der)
            .unwrap();

        assert!(matches!(
            verify_signed_profile(&der),
            Err(ProfileSigningError::SignatureInvalid)
        ));
    }

    #[test]
    fn missing_signer_certificate() {
        let mut signed_data = SignedData::decode_ber(&sign_rsa()).unwrap();
        signed_data.certificates = None;

        let mut der = Vec::new();
        signed_data
            .encode_ref()
            .write_encoded(Mode::Der, &mut der)
            .unwrap();

        assert!(matches!(
            verify_signed_profile(&der),
            Err(ProfileSigningError::MissingSigner)
        ));
    }

    #[test]
    fn garbage_rejected() {
        assert!(matches!(
            verify_signed_profile(b"not a signature"),
            Err(ProfileSigningError::MalformedSignedData(_))
        ));
        assert!(matches!(
            verify_signed_profile(CONTENT.as_bytes()),
            Err(ProfileSigningError::MalformedSignedData(_))
        ));
    }

    #[test]
    fn ecdsa_round_trip() {
        let (cert, key_pem) = self_signed_ecdsa(PublicKeyAlgorithm::EcdsaP521, Some("p521"));
        let key = import_signing_key(&RustCryptoProvider, &key_pem, &cert).unwrap();

        let der = SignedDataBuilder::default()
            .content(CONTENT)
            .signer(SignerBuilder::new(key.as_ref(), cert.clone()))
            .build_der(&RustCryptoProvider)
            .unwrap();

        let verified = verify_signed_profile(&der).unwrap();
        assert_eq!(verified.signer, cert);
        assert_eq!(verified.signature_algorithm, SignatureAlgorithm::EcdsaP521);
    }
}
