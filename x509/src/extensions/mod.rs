use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use certext::decoder::{DecodableFrom, Decoder};
use certext::encoder::{EncodableTo, Encoder};
use certext_asn1::{AsOid, Element, ObjectIdentifier, OctetString, Tag, universal};
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Kind, Result};

// Submodules
mod authority_key_identifier;
mod basic_constraints;
mod general_name;
mod policy_constraints;
mod policy_mappings;

// Re-export public types
pub use authority_key_identifier::{AuthorityKeyIdentifier, KeyIdentifier};
pub use basic_constraints::BasicConstraintsSyntax;
pub use general_name::{GeneralName, GeneralNames};
pub use policy_constraints::{PolicyConstraintsSyntax, SkipCerts};
pub use policy_mappings::{PolicyMapping, PolicyMappingsSyntax};

pub(crate) const SEQUENCE: Tag = Tag::universal(universal::SEQUENCE, true);
pub(crate) const BOOLEAN: Tag = Tag::universal(universal::BOOLEAN, false);
pub(crate) const INTEGER: Tag = Tag::universal(universal::INTEGER, false);
pub(crate) const OCTET_STRING: Tag = Tag::universal(universal::OCTET_STRING, false);
pub(crate) const OBJECT_IDENTIFIER: Tag = Tag::universal(universal::OBJECT_IDENTIFIER, false);

/// Checks class, then construction, then number, reporting the first mismatch.
pub(crate) fn expect_tag(
    element: &Element,
    kind: Kind,
    field: &'static str,
    expected: Tag,
) -> Result<()> {
    let actual = element.tag();
    if actual.class() != expected.class() {
        return Err(Error::UnexpectedTagClass {
            kind,
            field,
            expected: expected.class(),
            actual: actual.class(),
        });
    }
    if actual.construction() != expected.construction() {
        return Err(Error::UnexpectedConstruction {
            kind,
            field,
            expected: expected.construction(),
            actual: actual.construction(),
        });
    }
    if actual.number() != expected.number() {
        return Err(Error::UnexpectedTagNumber {
            kind,
            field,
            expected: expected.number(),
            actual: actual.number(),
        });
    }
    Ok(())
}

/// Reads an INTEGER (0..MAX) held in a primitive element, whatever its tag.
pub(crate) fn decode_u32(element: &Element, kind: Kind, field: &'static str) -> Result<u32> {
    element
        .as_integer()
        .map_err(|source| Error::InvalidValue {
            kind,
            field,
            source,
        })?
        .to_u32()
        .ok_or(Error::ValueOutOfRange { kind, field })
}

/// Decode and encode operations shared by every extension syntax.
///
/// Implemented for any type that has both an `Element` decoder and an
/// `Element` encoder.
///
/// # Example
/// ```
/// use certext_x509::extensions::{BasicConstraintsSyntax, DerCodec};
///
/// let bc = BasicConstraintsSyntax::from_bytes(&[0x30, 0x03, 0x01, 0x01, 0xff]).unwrap();
/// assert!(bc.ca);
/// assert_eq!(vec![0x30, 0x03, 0x01, 0x01, 0xff], bc.to_bytes().unwrap());
/// ```
pub trait DerCodec: Sized {
    fn from_element(element: &Element) -> Result<Self>;

    fn to_element(&self) -> Result<Element>;

    /// Decodes a buffer holding exactly one DER element.
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let element = Element::from_der_bytes(bytes)?;
        Self::from_element(&element)
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.to_element()?.to_der_bytes())
    }
}

impl<T> DerCodec for T
where
    T: DecodableFrom<Element> + Encoder<T, Element, Error = Error>,
    Element: Decoder<Element, T, Error = Error> + EncodableTo<T>,
{
    fn from_element(element: &Element) -> Result<Self> {
        <Element as Decoder<Element, T>>::decode(element)
    }

    fn to_element(&self) -> Result<Element> {
        <T as Encoder<T, Element>>::encode(self)
    }
}

/// Trait for typed X.509 extensions.
///
/// Binds an extension syntax to its `extnID` so that it can be parsed out of
/// a [`RawExtension`].
pub trait Extension: DerCodec {
    /// The OID of this extension type as a string (e.g., "2.5.29.19" for BasicConstraints)
    const OID: &'static str;

    /// Short name used in text output (e.g., "basicConstraints")
    const NAME: &'static str;

    fn oid() -> Result<ObjectIdentifier> {
        ObjectIdentifier::from_str(Self::OID).map_err(|source| Error::InvalidOidString {
            oid: Self::OID,
            source,
        })
    }

    /// Parse the extension from the contents of its `extnValue` OCTET STRING.
    fn parse(value: &OctetString) -> Result<Self> {
        Self::from_bytes(value.as_bytes())
    }
}

/*
RFC 5280 Section 4.1.2.9

Extensions  ::=  SEQUENCE SIZE (1..MAX) OF Extension

Extension  ::=  SEQUENCE  {
    extnID      OBJECT IDENTIFIER,
    critical    BOOLEAN DEFAULT FALSE,
    extnValue   OCTET STRING
                -- contains the DER encoding of an ASN.1 value
                -- corresponding to the extension type identified
                -- by extnID
}
*/

/// A single extension before type-specific parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawExtension {
    oid: ObjectIdentifier,
    critical: bool,
    value: OctetString,
}

impl RawExtension {
    pub fn new(oid: ObjectIdentifier, critical: bool, value: OctetString) -> Self {
        Self {
            oid,
            critical,
            value,
        }
    }

    /// Wraps a typed extension value in its envelope.
    pub fn from_extension<T: Extension>(extension: &T, critical: bool) -> Result<Self> {
        Ok(Self {
            oid: T::oid()?,
            critical,
            value: OctetString::from(extension.to_bytes()?),
        })
    }

    pub fn oid(&self) -> &ObjectIdentifier {
        &self.oid
    }

    pub fn is_critical(&self) -> bool {
        self.critical
    }

    pub fn value(&self) -> &OctetString {
        &self.value
    }

    /// Name of the extension when its syntax is supported.
    pub fn name(&self) -> Option<&'static str> {
        match self.oid.to_string().as_str() {
            AuthorityKeyIdentifier::OID => Some(AuthorityKeyIdentifier::NAME),
            BasicConstraintsSyntax::OID => Some(BasicConstraintsSyntax::NAME),
            PolicyConstraintsSyntax::OID => Some(PolicyConstraintsSyntax::NAME),
            PolicyMappingsSyntax::OID => Some(PolicyMappingsSyntax::NAME),
            _ => None,
        }
    }

    /// Parse the extension value as a specific extension type
    pub fn parse<T: Extension>(&self) -> Result<T> {
        let expected = T::oid()?;
        if self.oid != expected {
            return Err(Error::OidMismatch {
                expected: expected.to_string(),
                actual: self.oid.to_string(),
            });
        }
        trace!("decoding {} ({})", T::NAME, self.oid);
        T::parse(&self.value)
    }

    /// Parse the extension according to its OID.
    ///
    /// Unsupported OIDs are not an error; the raw extension is returned as is.
    pub fn parse_known(&self) -> Result<ParsedExtension> {
        let parsed = match self.oid.to_string().as_str() {
            AuthorityKeyIdentifier::OID => ParsedExtension::AuthorityKeyIdentifier(self.parse()?),
            BasicConstraintsSyntax::OID => ParsedExtension::BasicConstraints(self.parse()?),
            PolicyConstraintsSyntax::OID => ParsedExtension::PolicyConstraints(self.parse()?),
            PolicyMappingsSyntax::OID => ParsedExtension::PolicyMappings(self.parse()?),
            oid => {
                debug!("unsupported extension {}, keeping raw value", oid);
                ParsedExtension::Unsupported(self.clone())
            }
        };
        Ok(parsed)
    }
}

impl fmt::Display for RawExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name().map_or_else(|| self.oid.to_string(), String::from);
        if self.critical {
            writeln!(f, "            {}: critical", name)?;
        } else {
            writeln!(f, "            {}:", name)?;
        }
        writeln!(f, "                {}", self.value)
    }
}

impl DecodableFrom<Element> for RawExtension {}

impl Decoder<Element, RawExtension> for Element {
    type Error = Error;

    fn decode(&self) -> Result<RawExtension> {
        expect_tag(self, Kind::Extension, "Extension", SEQUENCE)?;
        let (oid, critical, value) = match self.elements()? {
            [oid, value] => (oid, None, value),
            [oid, critical, value] => (oid, Some(critical), value),
            elements => {
                return Err(Error::InvalidElementCount {
                    kind: Kind::Extension,
                    expected: "2 or 3",
                    actual: elements.len(),
                });
            }
        };

        expect_tag(oid, Kind::Extension, "extnID", OBJECT_IDENTIFIER)?;
        let oid = oid.as_oid().map_err(|source| Error::InvalidValue {
            kind: Kind::Extension,
            field: "extnID",
            source,
        })?;

        let critical = match critical {
            Some(elem) => {
                expect_tag(elem, Kind::Extension, "critical", BOOLEAN)?;
                let critical = elem.as_boolean().map_err(|source| Error::InvalidValue {
                    kind: Kind::Extension,
                    field: "critical",
                    source,
                })?;
                if !critical {
                    return Err(Error::EncodedDefault {
                        kind: Kind::Extension,
                        field: "critical",
                    });
                }
                true
            }
            None => false,
        };

        expect_tag(value, Kind::Extension, "extnValue", OCTET_STRING)?;
        let value = value.as_octet_string()?;

        Ok(RawExtension {
            oid,
            critical,
            value,
        })
    }
}

impl EncodableTo<RawExtension> for Element {}

impl Encoder<RawExtension, Element> for RawExtension {
    type Error = Error;

    fn encode(&self) -> Result<Element> {
        let oid = Element::object_identifier(&self.oid)?;
        let critical = self.critical.then(|| Element::boolean(true));
        let value = Element::octet_string(self.value.as_bytes());

        let elements = std::iter::once(oid)
            .chain(critical)
            .chain(std::iter::once(value))
            .collect();
        Ok(Element::sequence(elements))
    }
}

/// An extension decoded according to its OID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ParsedExtension {
    AuthorityKeyIdentifier(AuthorityKeyIdentifier),
    BasicConstraints(BasicConstraintsSyntax),
    PolicyConstraints(PolicyConstraintsSyntax),
    PolicyMappings(PolicyMappingsSyntax),
    Unsupported(RawExtension),
}

impl fmt::Display for ParsedExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsedExtension::AuthorityKeyIdentifier(aki) => fmt::Display::fmt(aki, f),
            ParsedExtension::BasicConstraints(bc) => fmt::Display::fmt(bc, f),
            ParsedExtension::PolicyConstraints(pc) => fmt::Display::fmt(pc, f),
            ParsedExtension::PolicyMappings(pm) => fmt::Display::fmt(pm, f),
            ParsedExtension::Unsupported(raw) => fmt::Display::fmt(raw, f),
        }
    }
}

/// Collection of X.509 v3 extensions ([RFC 5280 Section 4.1.2.9](https://datatracker.ietf.org/doc/html/rfc5280#section-4.1.2.9)).
///
/// Holds at least one extension and never two with the same `extnID`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RawExtension>", into = "Vec<RawExtension>")]
pub struct Extensions {
    extensions: Vec<RawExtension>,
}

impl Extensions {
    pub fn new(extensions: Vec<RawExtension>) -> Result<Self> {
        if extensions.is_empty() {
            return Err(Error::EmptyContent(Kind::Extension));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = extensions.iter().find(|ext| !seen.insert(ext.oid())) {
            return Err(Error::DuplicateExtension(dup.oid().to_string()));
        }
        Ok(Self { extensions })
    }

    pub fn extensions(&self) -> &[RawExtension] {
        &self.extensions
    }

    /// Get a specific extension by OID
    pub fn get<O: AsOid>(&self, oid: O) -> Result<Option<&RawExtension>> {
        let oid = oid.as_oid()?;
        Ok(self.extensions.iter().find(|ext| ext.oid() == &oid))
    }

    /// Get and parse a specific extension by type
    pub fn extension<T: Extension>(&self) -> Result<Option<T>> {
        let oid = T::oid()?;
        self.get(&oid)?.map(RawExtension::parse::<T>).transpose()
    }

    pub fn parse_known(&self) -> Result<Vec<ParsedExtension>> {
        self.extensions.iter().map(RawExtension::parse_known).collect()
    }
}

impl TryFrom<Vec<RawExtension>> for Extensions {
    type Error = Error;

    fn try_from(extensions: Vec<RawExtension>) -> Result<Self> {
        Self::new(extensions)
    }
}

impl From<Extensions> for Vec<RawExtension> {
    fn from(extensions: Extensions) -> Self {
        extensions.extensions
    }
}

impl fmt::Display for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "        X509v3 extensions:")?;
        for ext in &self.extensions {
            match ext.parse_known() {
                Ok(parsed) => write!(f, "{}", parsed)?,
                Err(_) => write!(f, "{}", ext)?,
            }
        }
        Ok(())
    }
}

impl DecodableFrom<Element> for Extensions {}

impl Decoder<Element, Extensions> for Element {
    type Error = Error;

    fn decode(&self) -> Result<Extensions> {
        expect_tag(self, Kind::Extension, "Extensions", SEQUENCE)?;
        let extensions = self
            .elements()?
            .iter()
            .map(|elem| elem.decode())
            .collect::<Result<Vec<RawExtension>>>()?;
        Extensions::new(extensions)
    }
}

impl EncodableTo<Extensions> for Element {}

impl Encoder<Extensions, Element> for Extensions {
    type Error = Error;

    fn encode(&self) -> Result<Element> {
        let elements = self
            .extensions
            .iter()
            .map(|ext| ext.encode())
            .collect::<Result<Vec<Element>>>()?;
        Ok(Element::sequence(elements))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certext_asn1::Integer;
    use rstest::rstest;

    fn bc_extension(critical: bool) -> RawExtension {
        RawExtension::new(
            ObjectIdentifier::from_str(BasicConstraintsSyntax::OID).unwrap(),
            critical,
            OctetString::from(vec![0x30, 0x03, 0x01, 0x01, 0xff]),
        )
    }

    #[rstest(
        input,
        expected,
        // non-critical: the BOOLEAN is omitted
        case(
            vec![0x30, 0x0c, 0x06, 0x03, 0x55, 0x1d, 0x13, 0x04, 0x05, 0x30, 0x03, 0x01, 0x01, 0xff],
            bc_extension(false)
        ),
        case(
            vec![0x30, 0x0f, 0x06, 0x03, 0x55, 0x1d, 0x13, 0x01, 0x01, 0xff, 0x04, 0x05, 0x30, 0x03, 0x01, 0x01, 0xff],
            bc_extension(true)
        ),
    )]
    fn test_raw_extension_decode(input: Vec<u8>, expected: RawExtension) {
        let actual = RawExtension::from_bytes(&input).unwrap();
        assert_eq!(expected, actual);
        assert_eq!(input, actual.to_bytes().unwrap());
    }

    #[rstest(
        input,
        expected_error_msg,
        // critical FALSE must be omitted
        case(
            vec![0x30, 0x0f, 0x06, 0x03, 0x55, 0x1d, 0x13, 0x01, 0x01, 0x00, 0x04, 0x05, 0x30, 0x03, 0x01, 0x01, 0xff],
            "critical must be omitted"
        ),
        case(vec![0x30, 0x05, 0x06, 0x03, 0x55, 0x1d, 0x13], "expected 2 or 3 elements, got 1"),
        case(
            vec![0x30, 0x08, 0x06, 0x03, 0x55, 0x1d, 0x13, 0x02, 0x01, 0x00],
            "extnValue: expected tag number 4, got 2"
        ),
        case(
            vec![0x31, 0x08, 0x06, 0x03, 0x55, 0x1d, 0x13, 0x04, 0x01, 0x00],
            "Extension: expected tag number 16, got 17"
        ),
    )]
    fn test_raw_extension_decode_failure(input: Vec<u8>, expected_error_msg: &str) {
        let err = RawExtension::from_bytes(&input).unwrap_err();
        let err_str = err.to_string();
        assert!(
            err_str.contains(expected_error_msg),
            "Expected error message containing '{}', but got '{}'",
            expected_error_msg,
            err_str
        );
    }

    #[test]
    fn test_raw_extension_parse_oid_mismatch() {
        let err = bc_extension(true)
            .parse::<PolicyConstraintsSyntax>()
            .unwrap_err();
        assert!(matches!(err, Error::OidMismatch { .. }), "{}", err);
    }

    #[test]
    fn test_raw_extension_from_extension() {
        let bc = BasicConstraintsSyntax {
            ca: true,
            path_len_constraint: None,
        };
        let raw = RawExtension::from_extension(&bc, true).unwrap();
        assert_eq!(bc_extension(true), raw);
        assert_eq!(Some("basicConstraints"), raw.name());
        assert_eq!(bc, raw.parse::<BasicConstraintsSyntax>().unwrap());
    }

    #[rstest(
        raw,
        expected,
        case(bc_extension(true), ParsedExtension::BasicConstraints(BasicConstraintsSyntax { ca: true, path_len_constraint: None })),
        case(
            RawExtension::new(
                ObjectIdentifier::from_str("2.5.29.36").unwrap(),
                true,
                OctetString::from(vec![0x30, 0x03, 0x80, 0x01, 0x02]),
            ),
            ParsedExtension::PolicyConstraints(PolicyConstraintsSyntax::RequireOnly(2))
        ),
        case(
            RawExtension::new(
                ObjectIdentifier::from_str("2.5.29.14").unwrap(),
                false,
                OctetString::from(vec![0x04, 0x01, 0xab]),
            ),
            ParsedExtension::Unsupported(RawExtension::new(
                ObjectIdentifier::from_str("2.5.29.14").unwrap(),
                false,
                OctetString::from(vec![0x04, 0x01, 0xab]),
            ))
        ),
    )]
    fn test_raw_extension_parse_known(raw: RawExtension, expected: ParsedExtension) {
        assert_eq!(expected, raw.parse_known().unwrap());
    }

    #[test]
    fn test_raw_extension_parse_known_propagates_errors() {
        let raw = RawExtension::new(
            ObjectIdentifier::from_str("2.5.29.19").unwrap(),
            true,
            OctetString::from(vec![0x30, 0x03, 0x01, 0x01, 0x00]),
        );
        let err = raw.parse_known().unwrap_err();
        assert!(err.to_string().contains("cA must be omitted"), "{}", err);
    }

    #[test]
    fn test_extensions_lookup() {
        let pc = RawExtension::from_extension(
            &PolicyConstraintsSyntax::new(Some(0), Some(1)).unwrap(),
            true,
        )
        .unwrap();
        let extensions = Extensions::new(vec![bc_extension(true), pc]).unwrap();

        let bc = extensions.extension::<BasicConstraintsSyntax>().unwrap();
        assert_eq!(
            Some(BasicConstraintsSyntax {
                ca: true,
                path_len_constraint: None
            }),
            bc
        );
        let pc = extensions.extension::<PolicyConstraintsSyntax>().unwrap();
        assert_eq!(Some(PolicyConstraintsSyntax::Both(0, 1)), pc);
        assert_eq!(None, extensions.extension::<PolicyMappingsSyntax>().unwrap());
        assert!(extensions.get("2.5.29.19").unwrap().is_some());
        assert!(extensions.get("2.5.29.35").unwrap().is_none());
    }

    #[test]
    fn test_extensions_rejects_empty_and_duplicates() {
        let err = Extensions::new(vec![]).unwrap_err();
        assert!(err.to_string().contains("empty content"), "{}", err);

        let err = Extensions::new(vec![bc_extension(true), bc_extension(false)]).unwrap_err();
        assert_eq!("duplicate extension 2.5.29.19", err.to_string());

        // same check applies on decode
        let ext = bc_extension(true).to_element().unwrap();
        let element = Element::sequence(vec![ext.clone(), ext]);
        let err = Extensions::from_element(&element).unwrap_err();
        assert!(matches!(err, Error::DuplicateExtension(_)), "{}", err);
    }

    #[test]
    fn test_extensions_encode_decode() {
        let original = Extensions::new(vec![
            bc_extension(true),
            RawExtension::new(
                ObjectIdentifier::from_str("2.5.29.14").unwrap(),
                false,
                OctetString::from(vec![0x04, 0x01, 0xab]),
            ),
        ])
        .unwrap();
        let bytes = original.to_bytes().unwrap();
        assert_eq!(original, Extensions::from_bytes(&bytes).unwrap());

        let parsed = original.parse_known().unwrap();
        assert!(matches!(parsed[0], ParsedExtension::BasicConstraints(_)));
        assert!(matches!(parsed[1], ParsedExtension::Unsupported(_)));
    }

    #[test]
    fn test_extensions_serde() {
        let extensions = Extensions::new(vec![bc_extension(true)]).unwrap();
        let json = serde_json::to_string(&extensions).unwrap();
        assert_eq!(
            r#"[{"oid":"2.5.29.19","critical":true,"value":"30030101ff"}]"#,
            json
        );
        let back: Extensions = serde_json::from_str(&json).unwrap();
        assert_eq!(extensions, back);
        assert!(serde_json::from_str::<Extensions>("[]").is_err());
    }

    #[test]
    fn test_extensions_display() {
        let extensions = Extensions::new(vec![bc_extension(true)]).unwrap();
        assert_eq!(
            "        X509v3 extensions:\n            X509v3 basicConstraints:\n                CA:TRUE\n",
            extensions.to_string()
        );
    }

    #[rstest(
        element,
        expected_error_msg,
        case(Element::boolean(true), "expected constructed construction"),
        case(
            Element::context_constructed(16, vec![]),
            "expected universal tag class, got context-specific"
        ),
        case(
            Element::new(certext_asn1::TagClass::Universal, 17, certext_asn1::Content::Constructed(vec![])),
            "expected tag number 16, got 17"
        ),
    )]
    fn test_expect_tag_reports_first_mismatch(element: Element, expected_error_msg: &str) {
        let err = expect_tag(&element, Kind::Extension, "Extension", SEQUENCE).unwrap_err();
        assert!(
            err.to_string().contains(expected_error_msg),
            "Expected error message containing '{}', but got '{}'",
            expected_error_msg,
            err
        );
    }

    #[rstest(
        element,
        expected,
        case(Element::integer(&Integer::from(0u32)), Some(0)),
        case(Element::context_primitive(0, vec![0x00, 0xff]), Some(255)),
        case(Element::integer(&Integer::from(u64::from(u32::MAX))), Some(u32::MAX)),
        case(Element::integer(&Integer::from(u64::from(u32::MAX) + 1)), None),
        case(Element::integer(&Integer::from(-1i64)), None),
    )]
    fn test_decode_u32(element: Element, expected: Option<u32>) {
        let result = decode_u32(&element, Kind::BasicConstraints, "pathLenConstraint");
        match expected {
            Some(value) => assert_eq!(value, result.unwrap()),
            None => assert!(matches!(
                result,
                Err(Error::ValueOutOfRange {
                    field: "pathLenConstraint",
                    ..
                })
            )),
        }
    }
}
