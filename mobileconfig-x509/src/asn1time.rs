// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ASN.1 primitives related to time types.

use {
    bcder::{
        decode::{Constructed, DecodeError, Primitive, Source},
        encode::{PrimitiveContent, Values},
        Mode, Tag,
    },
    chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Utc},
    std::{io::Write, ops::Deref},
};

/// Time value as used in certificate validity periods.
///
/// ```ASN.1
/// Time ::= CHOICE {
///   utcTime        UTCTime,
///   generalTime    GeneralizedTime }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Time {
    UtcTime(UtcTime),
    GeneralTime(GeneralizedTime),
}

impl Time {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_primitive(|tag, prim| {
            if tag == Tag::UTC_TIME {
                Ok(Self::UtcTime(UtcTime::from_primitive(prim)?))
            } else if tag == Tag::GENERALIZED_TIME {
                Ok(Self::GeneralTime(GeneralizedTime::from_primitive(prim)?))
            } else {
                Err(prim.content_err("expected UTCTime or GeneralizedTime"))
            }
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        match self {
            Self::UtcTime(utc) => (Some(utc.encode_ref()), None),
            Self::GeneralTime(gt) => (None, Some(gt.encode_ref())),
        }
    }
}

impl From<DateTime<Utc>> for Time {
    fn from(t: DateTime<Utc>) -> Self {
        // UTCTime can only express years 1950 through 2049.
        if (1950..2050).contains(&t.year()) {
            Self::UtcTime(UtcTime(t))
        } else {
            Self::GeneralTime(GeneralizedTime(t))
        }
    }
}

impl From<&Time> for DateTime<Utc> {
    fn from(t: &Time) -> Self {
        match t {
            Time::UtcTime(utc) => utc.0,
            Time::GeneralTime(gt) => gt.0,
        }
    }
}

/// Parse a fixed width run of ASCII digits.
fn digits(data: &[u8]) -> Option<u32> {
    if data.is_empty() || !data.iter().all(|c| c.is_ascii_digit()) {
        return None;
    }

    data.iter()
        .try_fold(0u32, |acc, c| acc.checked_mul(10)?.checked_add(u32::from(c - b'0')))
}

/// Resolve calendar fields into a UTC timestamp.
fn resolve(year: i32, fields: &[u8]) -> Option<DateTime<Utc>> {
    let month = digits(&fields[0..2])?;
    let day = digits(&fields[2..4])?;
    let hour = digits(&fields[4..6])?;
    let minute = digits(&fields[6..8])?;
    let second = digits(&fields[8..10])?;

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;

    Some(Utc.from_utc_datetime(&naive))
}

/// A UTCTime value.
///
/// Only the `YYMMDDHHMMSSZ` form mandated by DER is supported.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UtcTime(DateTime<Utc>);

impl UtcTime {
    /// Obtain a new instance with now as the time.
    ///
    /// Sub-second precision is discarded since it cannot be represented.
    pub fn now() -> Self {
        let now = Utc::now();

        Self(now.with_nanosecond(0).unwrap_or(now))
    }

    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_primitive_if(Tag::UTC_TIME, |prim| Self::from_primitive(prim))
    }

    pub fn from_primitive<S: Source>(
        prim: &mut Primitive<S>,
    ) -> Result<Self, DecodeError<S::Error>> {
        let data = prim.take_all()?;

        Self::parse(data.as_ref()).ok_or_else(|| prim.content_err("malformed UTCTime"))
    }

    /// Parse UTCTime string data.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() != "YYMMDDHHMMSSZ".len() || data[12] != b'Z' {
            return None;
        }

        let year = digits(&data[0..2])? as i32;
        let year = if year >= 50 { year + 1900 } else { year + 2000 };

        Some(Self(resolve(year, &data[2..12])?))
    }
}

impl From<DateTime<Utc>> for UtcTime {
    fn from(t: DateTime<Utc>) -> Self {
        Self(t)
    }
}

impl ToString for UtcTime {
    fn to_string(&self) -> String {
        format!(
            "{:02}{:02}{:02}{:02}{:02}{:02}Z",
            self.0.year() % 100,
            self.0.month(),
            self.0.day(),
            self.0.hour(),
            self.0.minute(),
            self.0.second()
        )
    }
}

impl Deref for UtcTime {
    type Target = DateTime<Utc>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PrimitiveContent for UtcTime {
    const TAG: Tag = Tag::UTC_TIME;

    fn encoded_len(&self, _: Mode) -> usize {
        self.to_string().len()
    }

    fn write_encoded<W: Write>(&self, _: Mode, target: &mut W) -> Result<(), std::io::Error> {
        target.write_all(self.to_string().as_bytes())
    }
}

/// A GeneralizedTime value.
///
/// Only the `YYYYMMDDHHMMSSZ` form mandated by RFC 5280 is supported.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GeneralizedTime(DateTime<Utc>);

impl GeneralizedTime {
    pub fn from_primitive<S: Source>(
        prim: &mut Primitive<S>,
    ) -> Result<Self, DecodeError<S::Error>> {
        let data = prim.take_all()?;

        Self::parse(data.as_ref()).ok_or_else(|| prim.content_err("malformed GeneralizedTime"))
    }

    /// Parse GeneralizedTime string data.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() != "YYYYMMDDHHMMSSZ".len() || data[14] != b'Z' {
            return None;
        }

        let year = digits(&data[0..4])? as i32;

        Some(Self(resolve(year, &data[4..14])?))
    }
}

impl ToString for GeneralizedTime {
    fn to_string(&self) -> String {
        format!(
            "{:04}{:02}{:02}{:02}{:02}{:02}Z",
            self.0.year(),
            self.0.month(),
            self.0.day(),
            self.0.hour(),
            self.0.minute(),
            self.0.second()
        )
    }
}

impl Deref for GeneralizedTime {
    type Target = DateTime<Utc>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PrimitiveContent for GeneralizedTime {
    const TAG: Tag = Tag::GENERALIZED_TIME;

    fn encoded_len(&self, _: Mode) -> usize {
        self.to_string().len()
    }

    fn write_encoded<W: Write>(&self, _: Mode, target: &mut W) -> Result<(), std::io::Error> {
        target.write_all(self.to_string().as_bytes())
    }
}
