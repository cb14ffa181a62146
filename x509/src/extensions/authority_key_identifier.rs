use serde::{Deserialize, Serialize};
use std::fmt;

use certext::decoder::{DecodableFrom, Decoder};
use certext::encoder::{EncodableTo, Encoder};
use certext_asn1::{Element, Integer, OctetString, Tag};

use super::general_name::GeneralNames;
use super::{SEQUENCE, expect_tag};
use crate::error::{Error, Kind, Result};
use crate::extensions::Extension;

/*
RFC 5280 Section 4.2.1.1
AuthorityKeyIdentifier ::= SEQUENCE {
    keyIdentifier             [0] KeyIdentifier           OPTIONAL,
    authorityCertIssuer       [1] GeneralNames            OPTIONAL,
    authorityCertSerialNumber [2] CertificateSerialNumber OPTIONAL
}
-- authorityCertIssuer and authorityCertSerialNumber MUST both
-- be present or both be absent

KeyIdentifier ::= OCTET STRING
CertificateSerialNumber ::= INTEGER

This codec always requires keyIdentifier, so a valid value holds either one
element or all three.
*/

/// KeyIdentifier is an OCTET STRING used to identify a public key
/// Typically a SHA-1 hash of the SubjectPublicKeyInfo (20 bytes)
pub type KeyIdentifier = OctetString;

const KEY_IDENTIFIER: Tag = Tag::context(0, false);
const AUTHORITY_CERT_ISSUER: Tag = Tag::context(1, true);
const AUTHORITY_CERT_SERIAL_NUMBER: Tag = Tag::context(2, false);

/// Authority Key Identifier extension ([RFC 5280 Section 4.2.1.1](https://datatracker.ietf.org/doc/html/rfc5280#section-4.2.1.1)).
///
/// The issuer name and serial number are either both present or both absent.
///
/// # Example
/// ```
/// use certext_x509::extensions::{AuthorityKeyIdentifier, DerCodec};
///
/// let aki = AuthorityKeyIdentifier::from_bytes(&[0x30, 0x05, 0x80, 0x03, 0x01, 0x02, 0x03]).unwrap();
/// assert_eq!(&[0x01, 0x02, 0x03], aki.key_identifier());
/// assert!(aki.authority_cert_issuer().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AuthorityKeyIdentifierFields")]
pub enum AuthorityKeyIdentifier {
    KeyIdOnly(KeyIdentifier),
    KeyIdWithIssuer {
        key_identifier: KeyIdentifier,
        /// GeneralNames: issuer name(s) of the CA certificate
        authority_cert_issuer: GeneralNames,
        /// Contents octets of the CA certificate's serial number
        authority_cert_serial_number: OctetString,
    },
}

/// Unchecked form used for deserialization.
#[derive(Deserialize)]
enum AuthorityKeyIdentifierFields {
    KeyIdOnly(KeyIdentifier),
    KeyIdWithIssuer {
        key_identifier: KeyIdentifier,
        authority_cert_issuer: GeneralNames,
        authority_cert_serial_number: OctetString,
    },
}

impl TryFrom<AuthorityKeyIdentifierFields> for AuthorityKeyIdentifier {
    type Error = Error;

    fn try_from(fields: AuthorityKeyIdentifierFields) -> Result<Self> {
        match fields {
            AuthorityKeyIdentifierFields::KeyIdOnly(key_identifier) => {
                Ok(Self::KeyIdOnly(key_identifier))
            }
            AuthorityKeyIdentifierFields::KeyIdWithIssuer {
                key_identifier,
                authority_cert_issuer,
                authority_cert_serial_number,
            } => Self::from_parts(
                key_identifier.into_bytes(),
                Some(authority_cert_issuer),
                Some(authority_cert_serial_number.into_bytes()),
            ),
        }
    }
}

impl AuthorityKeyIdentifier {
    /// Builds the value from independent optional parts.
    ///
    /// Fails when only one of the issuer and the serial number is given.
    pub fn from_parts(
        key_identifier: impl Into<Vec<u8>>,
        authority_cert_issuer: Option<GeneralNames>,
        authority_cert_serial_number: Option<Vec<u8>>,
    ) -> Result<Self> {
        let key_identifier = OctetString::from(key_identifier.into());
        match (authority_cert_issuer, authority_cert_serial_number) {
            (None, None) => Ok(Self::KeyIdOnly(key_identifier)),
            (Some(authority_cert_issuer), Some(serial)) => {
                check_serial_number(&serial)?;
                Ok(Self::KeyIdWithIssuer {
                    key_identifier,
                    authority_cert_issuer,
                    authority_cert_serial_number: OctetString::from(serial),
                })
            }
            (Some(_), None) => Err(Error::PartialGroup {
                kind: Kind::AuthorityKeyIdentifier,
                present: "authorityCertIssuer",
                missing: "authorityCertSerialNumber",
            }),
            (None, Some(_)) => Err(Error::PartialGroup {
                kind: Kind::AuthorityKeyIdentifier,
                present: "authorityCertSerialNumber",
                missing: "authorityCertIssuer",
            }),
        }
    }

    pub fn key_identifier(&self) -> &[u8] {
        match self {
            Self::KeyIdOnly(key_identifier) | Self::KeyIdWithIssuer { key_identifier, .. } => {
                key_identifier.as_bytes()
            }
        }
    }

    pub fn authority_cert_issuer(&self) -> Option<&GeneralNames> {
        match self {
            Self::KeyIdOnly(_) => None,
            Self::KeyIdWithIssuer {
                authority_cert_issuer,
                ..
            } => Some(authority_cert_issuer),
        }
    }

    pub fn authority_cert_serial_number(&self) -> Option<&[u8]> {
        match self {
            Self::KeyIdOnly(_) => None,
            Self::KeyIdWithIssuer {
                authority_cert_serial_number,
                ..
            } => Some(authority_cert_serial_number.as_bytes()),
        }
    }
}

impl Extension for AuthorityKeyIdentifier {
    /// OID for AuthorityKeyIdentifier extension (2.5.29.35)
    const OID: &'static str = "2.5.29.35";
    const NAME: &'static str = "authorityKeyIdentifier";
}

fn decode_key_identifier(element: &Element) -> Result<KeyIdentifier> {
    expect_tag(
        element,
        Kind::AuthorityKeyIdentifier,
        "keyIdentifier",
        KEY_IDENTIFIER,
    )?;
    Ok(element.as_octet_string()?)
}

/// The serial number is kept as raw octets but must be a DER INTEGER.
fn check_serial_number(contents: &[u8]) -> Result<()> {
    Integer::try_from(contents).map_err(|source| Error::InvalidValue {
        kind: Kind::AuthorityKeyIdentifier,
        field: "authorityCertSerialNumber",
        source,
    })?;
    Ok(())
}

impl DecodableFrom<Element> for AuthorityKeyIdentifier {}

impl Decoder<Element, AuthorityKeyIdentifier> for Element {
    type Error = Error;

    fn decode(&self) -> Result<AuthorityKeyIdentifier> {
        expect_tag(
            self,
            Kind::AuthorityKeyIdentifier,
            "AuthorityKeyIdentifier",
            SEQUENCE,
        )?;
        match self.elements()? {
            [key_identifier] => Ok(AuthorityKeyIdentifier::KeyIdOnly(decode_key_identifier(
                key_identifier,
            )?)),
            [key_identifier, issuer, serial] => {
                let key_identifier = decode_key_identifier(key_identifier)?;

                expect_tag(
                    issuer,
                    Kind::AuthorityKeyIdentifier,
                    "authorityCertIssuer",
                    AUTHORITY_CERT_ISSUER,
                )?;
                // [1] IMPLICIT GeneralNames: the children are the names
                let authority_cert_issuer = GeneralNames::from_elements(issuer.elements()?)?;

                expect_tag(
                    serial,
                    Kind::AuthorityKeyIdentifier,
                    "authorityCertSerialNumber",
                    AUTHORITY_CERT_SERIAL_NUMBER,
                )?;
                check_serial_number(serial.data()?)?;
                let authority_cert_serial_number = serial.as_octet_string()?;

                Ok(AuthorityKeyIdentifier::KeyIdWithIssuer {
                    key_identifier,
                    authority_cert_issuer,
                    authority_cert_serial_number,
                })
            }
            elements => Err(Error::InvalidElementCount {
                kind: Kind::AuthorityKeyIdentifier,
                expected: "1 or 3",
                actual: elements.len(),
            }),
        }
    }
}

impl EncodableTo<AuthorityKeyIdentifier> for Element {}

impl Encoder<AuthorityKeyIdentifier, Element> for AuthorityKeyIdentifier {
    type Error = Error;

    fn encode(&self) -> Result<Element> {
        let key_identifier = Element::context_primitive(0, self.key_identifier());
        let elements = match self {
            Self::KeyIdOnly(_) => vec![key_identifier],
            Self::KeyIdWithIssuer {
                authority_cert_issuer,
                authority_cert_serial_number,
                ..
            } => {
                check_serial_number(authority_cert_serial_number.as_bytes())?;
                vec![
                    key_identifier,
                    Element::context_constructed(1, authority_cert_issuer.to_elements()?),
                    Element::context_primitive(2, authority_cert_serial_number.as_bytes()),
                ]
            }
        };
        Ok(Element::sequence(elements))
    }
}

fn hex_colon(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

impl fmt::Display for AuthorityKeyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "            X509v3 {}:", Self::NAME)?;
        writeln!(f, "                keyid:{}", hex_colon(self.key_identifier()))?;
        if let Some(issuer) = self.authority_cert_issuer() {
            writeln!(f, "                {}", issuer)?;
        }
        if let Some(serial) = self.authority_cert_serial_number() {
            writeln!(f, "                serial:{}", hex_colon(serial))?;
        }
        Ok(())
    }
}
