use std::fmt;
use std::net::IpAddr;

use certext::decoder::{DecodableFrom, Decoder};
use certext::encoder::{EncodableTo, Encoder};
use certext_asn1::{Element, ObjectIdentifier, OctetString, Tag, TagClass};
use serde::{Deserialize, Serialize};

use super::{SEQUENCE, expect_tag};
use crate::error::{Error, Kind, Result};

/*
RFC 5280 Section 4.2.1.6
GeneralName ::= CHOICE {
    otherName                 [0] OtherName,
    rfc822Name                [1] IA5String,
    dNSName                   [2] IA5String,
    x400Address               [3] ORAddress,
    directoryName             [4] Name,
    ediPartyName              [5] EDIPartyName,
    uniformResourceIdentifier [6] IA5String,
    iPAddress                 [7] OCTET STRING,
    registeredID              [8] OBJECT IDENTIFIER
}

GeneralNames ::= SEQUENCE SIZE (1..MAX) OF GeneralName

The module is IMPLICIT TAGS, except that directoryName is always EXPLICIT
because Name is a CHOICE.
*/

/// One entry of a GeneralNames list.
///
/// otherName, x400Address and ediPartyName are kept as the tagged element
/// they were decoded from, and directoryName keeps the inner `Name`, so that
/// re-encoding is lossless without modelling those syntaxes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GeneralNameFields")]
pub enum GeneralName {
    /// otherName [0]
    OtherName(#[serde(with = "der_hex")] Element),
    /// rfc822Name [1] - Email address (IA5String)
    Rfc822Name(String),
    /// dNSName [2] - DNS hostname (IA5String)
    DnsName(String),
    /// x400Address [3]
    X400Address(#[serde(with = "der_hex")] Element),
    /// directoryName [4] - the X.500 Name SEQUENCE
    DirectoryName(#[serde(with = "der_hex")] Element),
    /// ediPartyName [5]
    EdiPartyName(#[serde(with = "der_hex")] Element),
    /// uniformResourceIdentifier [6] (IA5String)
    Uri(String),
    /// iPAddress [7]
    IpAddress(IpAddr),
    /// registeredID [8]
    RegisteredId(ObjectIdentifier),
}

/// Elements are serialized as the hex of their DER encoding.
mod der_hex {
    use certext_asn1::{Element, OctetString};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub(super) fn serialize<S: Serializer>(
        element: &Element,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        OctetString::from(element.to_der_bytes()).serialize(serializer)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Element, D::Error> {
        let bytes = OctetString::deserialize(deserializer)?;
        Element::from_der_bytes(bytes.as_bytes()).map_err(serde::de::Error::custom)
    }
}

/// Unchecked form used for deserialization.
#[derive(Deserialize)]
enum GeneralNameFields {
    OtherName(#[serde(with = "der_hex")] Element),
    Rfc822Name(String),
    DnsName(String),
    X400Address(#[serde(with = "der_hex")] Element),
    DirectoryName(#[serde(with = "der_hex")] Element),
    EdiPartyName(#[serde(with = "der_hex")] Element),
    Uri(String),
    IpAddress(IpAddr),
    RegisteredId(ObjectIdentifier),
}

impl TryFrom<GeneralNameFields> for GeneralName {
    type Error = Error;

    fn try_from(fields: GeneralNameFields) -> Result<Self> {
        let name = match fields {
            GeneralNameFields::OtherName(raw) => GeneralName::OtherName(raw),
            GeneralNameFields::Rfc822Name(s) => GeneralName::Rfc822Name(s),
            GeneralNameFields::DnsName(s) => GeneralName::DnsName(s),
            GeneralNameFields::X400Address(raw) => GeneralName::X400Address(raw),
            GeneralNameFields::DirectoryName(name) => GeneralName::DirectoryName(name),
            GeneralNameFields::EdiPartyName(raw) => GeneralName::EdiPartyName(raw),
            GeneralNameFields::Uri(s) => GeneralName::Uri(s),
            GeneralNameFields::IpAddress(ip) => GeneralName::IpAddress(ip),
            GeneralNameFields::RegisteredId(oid) => GeneralName::RegisteredId(oid),
        };
        name.validate()?;
        Ok(name)
    }
}

impl GeneralName {
    /// Checks the parts a decoder would have checked: the tag of raw
    /// elements and the character set of IA5 strings.
    pub fn validate(&self) -> Result<()> {
        match self {
            GeneralName::OtherName(raw) => {
                expect_tag(raw, Kind::GeneralName, "otherName", Tag::context(0, true))
            }
            GeneralName::X400Address(raw) => {
                expect_tag(raw, Kind::GeneralName, "x400Address", Tag::context(3, true))
            }
            GeneralName::EdiPartyName(raw) => {
                expect_tag(raw, Kind::GeneralName, "ediPartyName", Tag::context(5, true))
            }
            GeneralName::DirectoryName(name) => {
                expect_tag(name, Kind::GeneralName, "directoryName", SEQUENCE)
            }
            GeneralName::Rfc822Name(s) => Self::check_ia5(s, "rfc822Name"),
            GeneralName::DnsName(s) => Self::check_ia5(s, "dNSName"),
            GeneralName::Uri(s) => Self::check_ia5(s, "uniformResourceIdentifier"),
            GeneralName::IpAddress(_) | GeneralName::RegisteredId(_) => Ok(()),
        }
    }

    fn check_ia5(value: &str, field: &'static str) -> Result<()> {
        if value.is_ascii() {
            Ok(())
        } else {
            Err(Error::InvalidValue {
                kind: Kind::GeneralName,
                field,
                source: certext_asn1::error::Error::Ia5StringInvalidEncoding,
            })
        }
    }

    fn field(number: u32) -> &'static str {
        match number {
            0 => "otherName",
            1 => "rfc822Name",
            2 => "dNSName",
            3 => "x400Address",
            4 => "directoryName",
            5 => "ediPartyName",
            6 => "uniformResourceIdentifier",
            7 => "iPAddress",
            _ => "registeredID",
        }
    }

    fn ia5_string(element: &Element, field: &'static str) -> Result<String> {
        expect_tag(element, Kind::GeneralName, field, Tag::context(element.number(), false))?;
        element
            .as_ia5_string()
            .map_err(|source| Error::InvalidValue {
                kind: Kind::GeneralName,
                field,
                source,
            })
    }

}

impl DecodableFrom<Element> for GeneralName {}

impl Decoder<Element, GeneralName> for Element {
    type Error = Error;

    fn decode(&self) -> Result<GeneralName> {
        if self.class() != TagClass::ContextSpecific {
            return Err(Error::UnexpectedTagClass {
                kind: Kind::GeneralName,
                field: "GeneralName",
                expected: TagClass::ContextSpecific,
                actual: self.class(),
            });
        }
        let number = self.number();
        if number > 8 {
            return Err(Error::UnknownChoice {
                kind: Kind::GeneralName,
                number,
            });
        }
        let field = GeneralName::field(number);

        match number {
            0 | 3 | 5 => {
                expect_tag(self, Kind::GeneralName, field, Tag::context(number, true))?;
                let raw = self.clone();
                Ok(match number {
                    0 => GeneralName::OtherName(raw),
                    3 => GeneralName::X400Address(raw),
                    _ => GeneralName::EdiPartyName(raw),
                })
            }
            1 => GeneralName::ia5_string(self, field).map(GeneralName::Rfc822Name),
            2 => GeneralName::ia5_string(self, field).map(GeneralName::DnsName),
            6 => GeneralName::ia5_string(self, field).map(GeneralName::Uri),
            4 => {
                // EXPLICIT: exactly one Name inside
                expect_tag(self, Kind::GeneralName, field, Tag::context(4, true))?;
                match self.elements()? {
                    [name] => {
                        expect_tag(name, Kind::GeneralName, field, SEQUENCE)?;
                        Ok(GeneralName::DirectoryName(name.clone()))
                    }
                    elements => Err(Error::InvalidElementCount {
                        kind: Kind::GeneralName,
                        expected: "1",
                        actual: elements.len(),
                    }),
                }
            }
            7 => {
                expect_tag(self, Kind::GeneralName, field, Tag::context(7, false))?;
                let bytes = self.data()?;
                let ip = if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
                    IpAddr::from(octets)
                } else if let Ok(octets) = <[u8; 16]>::try_from(bytes) {
                    IpAddr::from(octets)
                } else {
                    return Err(Error::InvalidIpAddressLength(bytes.len()));
                };
                Ok(GeneralName::IpAddress(ip))
            }
            _ => {
                expect_tag(self, Kind::GeneralName, field, Tag::context(8, false))?;
                let oid = self.as_oid().map_err(|source| Error::InvalidValue {
                    kind: Kind::GeneralName,
                    field,
                    source,
                })?;
                Ok(GeneralName::RegisteredId(oid))
            }
        }
    }
}

impl EncodableTo<GeneralName> for Element {}

impl Encoder<GeneralName, Element> for GeneralName {
    type Error = Error;

    fn encode(&self) -> Result<Element> {
        self.validate()?;
        match self {
            GeneralName::OtherName(raw)
            | GeneralName::X400Address(raw)
            | GeneralName::EdiPartyName(raw) => Ok(raw.clone()),
            GeneralName::Rfc822Name(s) => Ok(Element::context_primitive(1, s.as_bytes())),
            GeneralName::DnsName(s) => Ok(Element::context_primitive(2, s.as_bytes())),
            GeneralName::DirectoryName(name) => Ok(Element::context_constructed(4, vec![name.clone()])),
            GeneralName::Uri(s) => Ok(Element::context_primitive(6, s.as_bytes())),
            GeneralName::IpAddress(IpAddr::V4(addr)) => {
                Ok(Element::context_primitive(7, addr.octets().to_vec()))
            }
            GeneralName::IpAddress(IpAddr::V6(addr)) => {
                Ok(Element::context_primitive(7, addr.octets().to_vec()))
            }
            GeneralName::RegisteredId(oid) => {
                Ok(Element::context_primitive(8, oid.to_der_content()?))
            }
        }
    }
}

impl fmt::Display for GeneralName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneralName::OtherName(_) => write!(f, "othername:<unsupported>"),
            GeneralName::Rfc822Name(email) => write!(f, "email:{}", email),
            GeneralName::DnsName(dns) => write!(f, "DNS:{}", dns),
            GeneralName::X400Address(_) => write!(f, "X400Name:<unsupported>"),
            GeneralName::DirectoryName(name) => {
                write!(f, "DirName:{}", OctetString::from(name.to_der_bytes()))
            }
            GeneralName::EdiPartyName(_) => write!(f, "EdiPartyName:<unsupported>"),
            GeneralName::Uri(uri) => write!(f, "URI:{}", uri),
            GeneralName::IpAddress(ip) => write!(f, "IP Address:{}", ip),
            GeneralName::RegisteredId(oid) => write!(f, "Registered ID:{}", oid),
        }
    }
}

/// A non-empty list of GeneralName.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<GeneralName>", into = "Vec<GeneralName>")]
pub struct GeneralNames {
    names: Vec<GeneralName>,
}

impl GeneralNames {
    pub fn new(names: Vec<GeneralName>) -> Result<Self> {
        if names.is_empty() {
            return Err(Error::EmptyContent(Kind::GeneralName));
        }
        Ok(Self { names })
    }

    pub fn names(&self) -> &[GeneralName] {
        &self.names
    }

    /// Decodes the members of a GeneralNames, whatever tag the SEQUENCE carries.
    pub(crate) fn from_elements(elements: &[Element]) -> Result<Self> {
        let names = elements
            .iter()
            .map(|elem| elem.decode())
            .collect::<Result<Vec<GeneralName>>>()?;
        Self::new(names)
    }

    pub(crate) fn to_elements(&self) -> Result<Vec<Element>> {
        self.names.iter().map(|name| name.encode()).collect()
    }
}

impl TryFrom<Vec<GeneralName>> for GeneralNames {
    type Error = Error;

    fn try_from(names: Vec<GeneralName>) -> Result<Self> {
        Self::new(names)
    }
}

impl From<GeneralNames> for Vec<GeneralName> {
    fn from(names: GeneralNames) -> Self {
        names.names
    }
}

impl From<GeneralName> for GeneralNames {
    fn from(name: GeneralName) -> Self {
        Self { names: vec![name] }
    }
}

impl DecodableFrom<Element> for GeneralNames {}

impl Decoder<Element, GeneralNames> for Element {
    type Error = Error;

    fn decode(&self) -> Result<GeneralNames> {
        expect_tag(self, Kind::GeneralName, "GeneralNames", SEQUENCE)?;
        GeneralNames::from_elements(self.elements()?)
    }
}

impl EncodableTo<GeneralNames> for Element {}

impl Encoder<GeneralNames, Element> for GeneralNames {
    type Error = Error;

    fn encode(&self) -> Result<Element> {
        Ok(Element::sequence(self.to_elements()?))
    }
}

impl fmt::Display for GeneralNames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self
            .names
            .iter()
            .map(|name| name.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}", names)
    }
}
