// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ASN.1 types defined in RFC 3280.
//!
//! Only the naming types are needed to describe profile signing
//! certificates.

use {
    crate::rfc4519::{OID_COMMON_NAME, OID_COUNTRY_NAME, OID_ORGANIZATION_NAME},
    bcder::{
        decode::{BytesSource, Constructed, DecodeError, Source},
        encode,
        encode::{PrimitiveContent, Values},
        string::{CharSetError, Utf8String},
        Captured, Mode, Oid, Tag,
    },
    bytes::Bytes,
    std::{
        fmt::{Debug, Formatter},
        io::Write,
        ops::{Deref, DerefMut},
        str::FromStr,
    },
};

/// A distinguished name.
///
/// ```ASN.1
/// Name ::= CHOICE { -- only one possibility for now --
///   rdnSequence  RDNSequence }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Name {
    RdnSequence(RdnSequence),
}

impl Name {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        Ok(Self::RdnSequence(RdnSequence::take_from(cons)?))
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        match self {
            Self::RdnSequence(seq) => seq.encode_ref(),
        }
    }

    /// Iterate over all attributes in this Name.
    pub fn iter_attributes(&self) -> impl Iterator<Item = &AttributeTypeAndValue> {
        self.iter().flat_map(|rdn| rdn.iter())
    }

    /// Iterate over all attributes in this Name having a given OID.
    pub fn iter_by_oid(&self, oid: Oid) -> impl Iterator<Item = &AttributeTypeAndValue> {
        self.iter_attributes().filter(move |atv| atv.typ == oid)
    }

    /// Iterate over all Common Name (CN) attributes.
    pub fn iter_common_name(&self) -> impl Iterator<Item = &AttributeTypeAndValue> {
        self.iter_by_oid(Oid(Bytes::copy_from_slice(OID_COMMON_NAME.as_ref())))
    }

    /// Attempt to obtain the string value of the first attribute having an OID.
    ///
    /// `Ok(None)` is returned if no such attribute exists.
    pub fn find_first_attribute_string(
        &self,
        oid: Oid,
    ) -> Result<Option<String>, DecodeError<<BytesSource as Source>::Error>> {
        if let Some(atv) = self.iter_by_oid(oid).next() {
            Ok(Some(atv.to_string()?))
        } else {
            Ok(None)
        }
    }

    /// The first Common Name that decodes as a string, if any.
    pub fn common_name(&self) -> Option<String> {
        self.iter_common_name()
            .find_map(|atv| atv.to_string().ok())
    }

    /// Appends a Utf8String value for the given OID.
    ///
    /// The attribute will always be written to a new RDN.
    pub fn append_utf8_string(&mut self, oid: Oid, value: &str) -> Result<(), CharSetError> {
        let mut rdn = RelativeDistinguishedName::default();
        rdn.push(AttributeTypeAndValue::new_utf8_string(oid, value)?);
        self.push(rdn);

        Ok(())
    }

    /// Append a Common Name (CN) attribute.
    pub fn append_common_name_utf8_string(&mut self, value: &str) -> Result<(), CharSetError> {
        self.append_utf8_string(Oid(Bytes::copy_from_slice(OID_COMMON_NAME.as_ref())), value)
    }

    /// Append a Country (C) attribute.
    pub fn append_country_utf8_string(&mut self, value: &str) -> Result<(), CharSetError> {
        self.append_utf8_string(Oid(Bytes::copy_from_slice(OID_COUNTRY_NAME.as_ref())), value)
    }

    /// Append an Organization Name (O) attribute.
    pub fn append_organization_utf8_string(&mut self, value: &str) -> Result<(), CharSetError> {
        self.append_utf8_string(
            Oid(Bytes::copy_from_slice(OID_ORGANIZATION_NAME.as_ref())),
            value,
        )
    }
}

impl Default for Name {
    fn default() -> Self {
        Self::RdnSequence(RdnSequence::default())
    }
}

impl Deref for Name {
    type Target = RdnSequence;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::RdnSequence(seq) => seq,
        }
    }
}

impl DerefMut for Name {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            Self::RdnSequence(seq) => seq,
        }
    }
}

/// ```ASN.1
/// RDNSequence ::= SEQUENCE OF RelativeDistinguishedName
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RdnSequence(Vec<RelativeDistinguishedName>);

impl Deref for RdnSequence {
    type Target = Vec<RelativeDistinguishedName>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for RdnSequence {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl RdnSequence {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let mut values = Vec::new();

            while let Some(value) = RelativeDistinguishedName::take_opt_from(cons)? {
                values.push(value);
            }

            Ok(Self(values))
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence(&self.0)
    }
}

/// Relative distinguished name.
///
/// ```ASN.1
/// RelativeDistinguishedName ::=
///   SET OF AttributeTypeAndValue
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RelativeDistinguishedName(Vec<AttributeTypeAndValue>);

impl Deref for RelativeDistinguishedName {
    type Target = Vec<AttributeTypeAndValue>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for RelativeDistinguishedName {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl RelativeDistinguishedName {
    pub fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_set(|cons| {
            let mut values = Vec::new();

            while let Some(value) = AttributeTypeAndValue::take_opt_from(cons)? {
                values.push(value);
            }

            Ok(Self(values))
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::set(&self.0)
    }
}

impl Values for RelativeDistinguishedName {
    fn encoded_len(&self, mode: Mode) -> usize {
        self.encode_ref().encoded_len(mode)
    }

    fn write_encoded<W: Write>(&self, mode: Mode, target: &mut W) -> Result<(), std::io::Error> {
        self.encode_ref().write_encoded(mode, target)
    }
}

/// Attribute type and its value.
///
/// ```ASN.1
/// AttributeTypeAndValue ::= SEQUENCE {
///   type     AttributeType,
///   value    AttributeValue }
/// ```
#[derive(Clone)]
pub struct AttributeTypeAndValue {
    pub typ: Oid,
    pub value: AttributeValue,
}

impl Debug for AttributeTypeAndValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("AttributeTypeAndValue");
        s.field("type", &format_args!("{}", self.typ));
        s.field("value", &self.value);
        s.finish()
    }
}

impl AttributeTypeAndValue {
    pub fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            let typ = Oid::take_from(cons)?;
            let value = cons.capture_all()?;

            Ok(Self {
                typ,
                value: AttributeValue(value),
            })
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((self.typ.encode_ref(), &self.value.0))
    }

    /// Attempt to coerce the stored value to a Rust string.
    pub fn to_string(&self) -> Result<String, DecodeError<<BytesSource as Source>::Error>> {
        self.value.to_string()
    }

    /// Construct a new instance with a Utf8String given an OID and Rust string.
    pub fn new_utf8_string(oid: Oid, s: &str) -> Result<Self, CharSetError> {
        Ok(Self {
            typ: oid,
            value: AttributeValue::new_utf8_string(s)?,
        })
    }
}

impl PartialEq for AttributeTypeAndValue {
    fn eq(&self, other: &Self) -> bool {
        self.typ == other.typ && self.value == other.value
    }
}

impl Eq for AttributeTypeAndValue {}

impl Values for AttributeTypeAndValue {
    fn encoded_len(&self, mode: Mode) -> usize {
        self.encode_ref().encoded_len(mode)
    }

    fn write_encoded<W: Write>(&self, mode: Mode, target: &mut W) -> Result<(), std::io::Error> {
        self.encode_ref().write_encoded(mode, target)
    }
}

/// The raw value of an attribute.
///
/// The ASN.1 type is defined by the attribute's OID. For naming attributes
/// this is nearly always one of the string types.
#[derive(Clone)]
pub struct AttributeValue(Captured);

impl Debug for AttributeValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}", hex::encode(self.0.as_slice())))
    }
}

impl AttributeValue {
    /// Construct a new instance containing a Utf8String given a Rust string.
    pub fn new_utf8_string(s: &str) -> Result<Self, CharSetError> {
        let value = Utf8String::from_str(s)?;

        Ok(Self(Captured::from_values(Mode::Der, value.encode_ref())))
    }

    /// Attempt to convert the inner value to a Rust string.
    ///
    /// The string types seen in certificate names are tried in turn. Anything
    /// else is a decoding error.
    pub fn to_string(&self) -> Result<String, DecodeError<<BytesSource as Source>::Error>> {
        self.0.clone().decode(|cons| {
            if let Some(s) = cons.take_opt_value_if(Tag::PRINTABLE_STRING, |content| {
                bcder::PrintableString::from_content(content)
            })? {
                Ok(s.to_string())
            } else if let Some(s) = cons.take_opt_value_if(Tag::UTF8_STRING, |content| {
                bcder::Utf8String::from_content(content)
            })? {
                Ok(s.to_string())
            } else if let Some(s) = cons.take_opt_value_if(Tag::IA5_STRING, |content| {
                bcder::Ia5String::from_content(content)
            })? {
                Ok(s.to_string())
            } else if let Some(s) = cons.take_opt_value_if(Tag::NUMERIC_STRING, |content| {
                bcder::NumericString::from_content(content)
            })? {
                Ok(s.to_string())
            } else {
                Err(cons.content_err("attribute value is not a supported string type"))
            }
        })
    }
}

impl Deref for AttributeValue {
    type Target = Captured;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_slice() == other.0.as_slice()
    }
}

impl Eq for AttributeValue {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn common_name_roundtrip() {
        let mut name = Name::default();
        name.append_country_utf8_string("US").unwrap();
        name.append_common_name_utf8_string("Profile Signer").unwrap();
        name.append_organization_utf8_string("Example Org").unwrap();

        assert_eq!(name.common_name(), Some("Profile Signer".to_string()));
        assert_eq!(name.iter_attributes().count(), 3);

        let mut der = Vec::new();
        name.encode_ref().write_encoded(Mode::Der, &mut der).unwrap();

        let decoded = Constructed::decode(der.as_slice(), Mode::Der, |cons| Name::take_from(cons))
            .unwrap();
        assert_eq!(decoded, name);
        assert_eq!(decoded.common_name(), Some("Profile Signer".to_string()));
        assert_eq!(
            decoded
                .find_first_attribute_string(Oid(Bytes::copy_from_slice(
                    OID_ORGANIZATION_NAME.as_ref()
                )))
                .unwrap(),
            Some("Example Org".to_string())
        );
    }

    #[test]
    fn missing_common_name() {
        let mut name = Name::default();
        name.append_organization_utf8_string("No CN Here").unwrap();

        assert_eq!(name.common_name(), None);
        assert_eq!(name.iter_common_name().count(), 0);
    }
}
