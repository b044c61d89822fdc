// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Functionality for signing data. */

use {
    crate::{
        asn1::rfc5652::{
            Attribute, CertificateSet, CmsVersion, DigestAlgorithmIdentifiers,
            EncapsulatedContentInfo, EncodedCertificate, IssuerAndSerialNumber, SignatureValue,
            SignedAttributes, SignedData, SignerIdentifier, SignerInfo, SignerInfos,
            OID_CONTENT_TYPE, OID_ID_DATA, OID_MESSAGE_DIGEST, OID_SIGNING_TIME,
        },
        ProfileSigningError,
    },
    bcder::{
        encode::{PrimitiveContent, Values},
        Mode, OctetString, Oid,
    },
    bytes::Bytes,
    chrono::{DateTime, Utc},
    log::{debug, warn},
    mobileconfig_x509::{
        asn1time::{Time, UtcTime},
        CryptoProvider, DigestAlgorithm, Sign, SignatureAlgorithm, X509Certificate, X509Error,
    },
};

/// Builder type to construct an entity that will sign some data.
///
/// Instances will be attached to [SignedDataBuilder] instances where they
/// will sign data using configured settings.
pub struct SignerBuilder<'a> {
    /// The key producing signatures.
    signing_key: &'a dyn Sign,

    /// X.509 certificate for the signing key.
    signing_certificate: X509Certificate,

    /// Value for the signing-time attribute. Defaults to the current time.
    signing_time: Option<DateTime<Utc>>,
}

impl<'a> SignerBuilder<'a> {
    /// Construct a new entity that will sign content.
    pub fn new(signing_key: &'a dyn Sign, signing_certificate: X509Certificate) -> Self {
        Self {
            signing_key,
            signing_certificate,
            signing_time: None,
        }
    }

    /// Obtain the signature algorithm used by the signing key.
    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        self.signing_key.signature_algorithm()
    }

    /// Obtain the certificate of the signer.
    pub fn certificate(&self) -> &X509Certificate {
        &self.signing_certificate
    }

    /// Use a fixed signing time instead of the current time.
    pub fn signing_time(mut self, time: DateTime<Utc>) -> Self {
        self.signing_time = Some(time);
        self
    }

    fn signing_time_value(&self) -> Time {
        match self.signing_time {
            Some(time) => Time::from(time),
            None => Time::UtcTime(UtcTime::now()),
        }
    }

    /// Refuse to sign when the key doesn't belong to the certificate.
    ///
    /// Certificates with unrecognized key algorithms can't be compared and
    /// are let through.
    fn ensure_key_matches_certificate(&self) -> Result<(), X509Error> {
        let cert = &self.signing_certificate;

        if cert.signature_algorithm().is_none() {
            warn!(
                "unable to compare signing key against {} certificate public key",
                cert.public_key_algorithm()
            );
            return Ok(());
        }

        if self.signing_key.public_key_matches(&cert.public_key_data()) {
            Ok(())
        } else {
            Err(X509Error::KeyMismatch)
        }
    }
}

/// Entity for incrementally deriving a `SignedData` message.
///
/// The content is always attached. The output holds exactly one
/// `SignerInfo`.
#[derive(Default)]
pub struct SignedDataBuilder<'a> {
    /// Encapsulated content to sign.
    signed_content: Option<Vec<u8>>,

    /// Entity that will sign the content.
    signer: Option<SignerBuilder<'a>>,

    /// Extra certificates to include, in addition to the signer's.
    certificates: Vec<X509Certificate>,
}

impl<'a> SignedDataBuilder<'a> {
    /// Define the content to sign.
    ///
    /// This content will be embedded in the generated DER.
    pub fn content(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.signed_content = Some(data.into());
        self
    }

    /// Define the entity that signs the content.
    ///
    /// Replaces any previously configured signer.
    pub fn signer(mut self, signer: SignerBuilder<'a>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Add a certificate to embed after the signer certificate.
    pub fn certificate(mut self, cert: X509Certificate) -> Self {
        self.certificates.push(cert);
        self
    }

    /// Add multiple certificates, in order, after the signer certificate.
    pub fn certificates(mut self, certs: impl IntoIterator<Item = X509Certificate>) -> Self {
        self.certificates.extend(certs);
        self
    }

    /// Construct the DER encoded `ContentInfo` holding the `SignedData`.
    pub fn build_der(&self, provider: &dyn CryptoProvider) -> Result<Vec<u8>, ProfileSigningError> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| ProfileSigningError::signing_failed("no signer defined"))?;
        let content = self.signed_content.as_deref().unwrap_or_default();
        let cert = signer.certificate();

        signer.ensure_key_matches_certificate()?;

        let signature_algorithm = signer.signature_algorithm();
        let digest_algorithm = signature_algorithm.digest_algorithm();

        let mut signed_attributes = SignedAttributes::default();
        signed_attributes.push(Attribute::new_single(
            &OID_CONTENT_TYPE,
            OID_ID_DATA.encode_ref(),
        ));
        signed_attributes.push(Attribute::new_single(
            &OID_MESSAGE_DIGEST,
            OctetString::new(Bytes::from(provider.digest_sha256(content))).encode_ref(),
        ));
        signed_attributes.push(Attribute::new_single(
            &OID_SIGNING_TIME,
            signer.signing_time_value().encode_ref(),
        ));
        signed_attributes.sort_der()?;

        let mut signer_info = SignerInfo {
            version: CmsVersion::V1,
            sid: SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
                issuer: cert.issuer_name().clone(),
                serial_number: cert.serial_number_asn1().clone(),
            }),
            digest_algorithm: digest_algorithm.into(),
            signed_attributes: Some(signed_attributes),
            signature_algorithm: signature_algorithm.into(),
            signature: SignatureValue::new(Bytes::new()),
            signed_attributes_data: None,
        };

        // The signature covers the signed attributes only. The content is
        // bound through the message-digest attribute.
        let signed_content = signer_info
            .signed_attributes_digested_content()?
            .unwrap_or_default();

        debug!(
            "signing {} bytes of content with {} key for {}",
            content.len(),
            signature_algorithm,
            cert.subject_common_name()
                .unwrap_or_else(|| mobileconfig_x509::UNKNOWN_NAME.to_string())
        );

        signer_info.signature =
            SignatureValue::new(Bytes::from(signer.signing_key.try_sign(&signed_content)?));

        let mut certificates = CertificateSet::default();
        for cert in std::iter::once(cert).chain(self.certificates.iter()) {
            let encoded =
                EncodedCertificate::from_der(cert.constructed_data()).map_err(X509Error::from)?;

            if certificates.contains(&encoded) {
                debug!("certificate already embedded; skipping duplicate");
                continue;
            }

            certificates.push(encoded);
        }

        let mut digest_algorithms = DigestAlgorithmIdentifiers::default();
        digest_algorithms.push(DigestAlgorithm::Sha256.into());

        let mut signer_infos = SignerInfos::default();
        signer_infos.push(signer_info);

        let signed_data = SignedData {
            version: CmsVersion::V1,
            digest_algorithms,
            content_info: EncapsulatedContentInfo {
                content_type: Oid(Bytes::copy_from_slice(OID_ID_DATA.as_ref())),
                content: Some(OctetString::new(Bytes::copy_from_slice(content))),
            },
            certificates: Some(certificates),
            signer_infos,
        };

        let mut der = Vec::new();
        signed_data
            .encode_ref()
            .write_encoded(Mode::Der, &mut der)?;

        Ok(der)
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        bcder::decode::Constructed,
        chrono::TimeZone,
        mobileconfig_x509::{
            import_signing_key, testutil::*, PublicKeyAlgorithm, RustCryptoProvider,
        },
    };

    const CONTENT: &[u8] = b"<plist/>";

    #[test]
    fn rsa_signed_data_structure() -> Result<(), ProfileSigningError> {
        let cert = rsa_cert();
        let key = import_signing_key(&RustCryptoProvider, RSA_PRIVATE_KEY_PEM, &cert)?;
        let time = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();

        let der = SignedDataBuilder::default()
            .content(CONTENT)
            .signer(SignerBuilder::new(key.as_ref(), cert.clone()).signing_time(time))
            .build_der(&RustCryptoProvider)?;

        let signed_data = SignedData::decode_ber(&der).unwrap();
        assert_eq!(signed_data.version, CmsVersion::V1);
        assert_eq!(signed_data.digest_algorithms.len(), 1);
        assert_eq!(signed_data.content_info.content_type, OID_ID_DATA);
        assert_eq!(
            signed_data
                .content_info
                .content
                .as_ref()
                .map(|c| c.to_bytes()),
            Some(Bytes::from_static(CONTENT))
        );

        let certs = signed_data.certificates.as_ref().unwrap();
        assert_eq!(certs.len(), 1);
        assert_eq!(certs[0].as_slice(), cert.constructed_data());

        assert_eq!(signed_data.signer_infos.len(), 1);
        let signer_info = &signed_data.signer_infos[0];
        assert_eq!(signer_info.version, CmsVersion::V1);
        assert!(SignatureAlgorithm::Rsa.matches_identifier(&signer_info.signature_algorithm));
        assert!(signer_info.signature_algorithm.has_null_parameters());
        assert!(signer_info.digest_algorithm.parameters.is_none());

        let attributes = signer_info.signed_attributes.as_ref().unwrap();
        assert_eq!(attributes.len(), 3);
        let mut sorted = attributes.clone();
        sorted.sort_der().unwrap();
        assert_eq!(&sorted, attributes);

        let digest = attributes
            .find(&OID_MESSAGE_DIGEST)
            .and_then(|attr| attr.single_value())
            .unwrap()
            .decode_octet_string()
            .unwrap();
        assert_eq!(
            digest.to_bytes().as_ref(),
            DigestAlgorithm::Sha256.digest(CONTENT).as_slice()
        );

        let signing_time = attributes
            .find(&OID_SIGNING_TIME)
            .and_then(|attr| attr.single_value())
            .map(|value| {
                Constructed::decode(value.as_slice(), Mode::Der, |cons| Time::take_from(cons))
                    .unwrap()
            })
            .unwrap();
        assert!(matches!(signing_time, Time::UtcTime(_)));
        assert_eq!(DateTime::<Utc>::from(&signing_time), time);

        let message = signer_info.signed_attributes_digested_content()?.unwrap();
        assert_eq!(message[0], 0x31);
        cert.verify_signed_data(&message, signer_info.signature.to_bytes())?;

        Ok(())
    }

    #[test]
    fn ecdsa_signatures_verify() -> Result<(), ProfileSigningError> {
        for alg in [
            PublicKeyAlgorithm::EcdsaP256,
            PublicKeyAlgorithm::EcdsaP384,
            PublicKeyAlgorithm::EcdsaP521,
        ] {
            let (cert, key_pem) = self_signed_ecdsa(alg, Some("ecdsa signer"));
            let key = import_signing_key(&RustCryptoProvider, &key_pem, &cert)?;

            let der = SignedDataBuilder::default()
                .content(CONTENT)
                .signer(SignerBuilder::new(key.as_ref(), cert.clone()))
                .build_der(&RustCryptoProvider)?;

            let signed_data = SignedData::decode_ber(&der).unwrap();
            let signer_info = &signed_data.signer_infos[0];

            let expected = alg.signature_algorithm().unwrap();
            assert!(expected.matches_identifier(&signer_info.signature_algorithm));
            assert!(signer_info.signature_algorithm.parameters.is_none());

            let message = signer_info.signed_attributes_digested_content()?.unwrap();
            cert.verify_signed_data(&message, signer_info.signature.to_bytes())?;
        }

        Ok(())
    }

    #[test]
    fn certificate_order() -> Result<(), ProfileSigningError> {
        let signer_cert = rsa_cert();
        let key = import_signing_key(&RustCryptoProvider, RSA_PRIVATE_KEY_PEM, &signer_cert)?;
        let (intermediate, _) = self_signed_ecdsa(PublicKeyAlgorithm::EcdsaP384, Some("int"));
        let (root, _) = self_signed_ecdsa(PublicKeyAlgorithm::EcdsaP256, Some("root"));

        let der = SignedDataBuilder::default()
            .content(CONTENT)
            .signer(SignerBuilder::new(key.as_ref(), signer_cert.clone()))
            .certificates(vec![intermediate.clone(), signer_cert.clone(), root.clone()])
            .build_der(&RustCryptoProvider)?;

        let signed_data = SignedData::decode_ber(&der).unwrap();
        let certs = signed_data
            .certificates
            .as_ref()
            .unwrap()
            .iter()
            .map(|c| c.as_slice().to_vec())
            .collect::<Vec<_>>();

        assert_eq!(
            certs,
            vec![
                signer_cert.constructed_data().to_vec(),
                intermediate.constructed_data().to_vec(),
                root.constructed_data().to_vec(),
            ]
        );

        Ok(())
    }

    #[test]
    fn mismatched_key_rejected() -> Result<(), ProfileSigningError> {
        let (cert, _) = self_signed_ecdsa(PublicKeyAlgorithm::EcdsaP256, Some("a"));
        let (_, other_key_pem) = self_signed_ecdsa(PublicKeyAlgorithm::EcdsaP256, Some("b"));
        let key = import_signing_key(&RustCryptoProvider, &other_key_pem, &cert)?;

        let res = SignedDataBuilder::default()
            .content(CONTENT)
            .signer(SignerBuilder::new(key.as_ref(), cert))
            .build_der(&RustCryptoProvider);

        assert!(matches!(res, Err(ProfileSigningError::SigningFailed { .. })));

        Ok(())
    }

    #[test]
    fn signer_required() {
        let res = SignedDataBuilder::default()
            .content(CONTENT)
            .build_der(&RustCryptoProvider);

        assert!(matches!(res, Err(ProfileSigningError::SigningFailed { .. })));
    }

    #[test]
    fn empty_content_is_attached() -> Result<(), ProfileSigningError> {
        let cert = rsa_cert();
        let key = import_signing_key(&RustCryptoProvider, RSA_PRIVATE_KEY_PEM, &cert)?;

        let der = SignedDataBuilder::default()
            .signer(SignerBuilder::new(key.as_ref(), cert))
            .build_der(&RustCryptoProvider)?;

        let signed_data = SignedData::decode_ber(&der).unwrap();
        assert_eq!(
            signed_data
                .content_info
                .content
                .as_ref()
                .map(|c| c.to_bytes().len()),
            Some(0)
        );

        Ok(())
    }
}
