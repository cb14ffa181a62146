use std::collections::HashSet;
use std::{fmt::Display, str::FromStr};

use certext::decoder::{DecodableFrom, Decoder};
use certext::encoder::{EncodableTo, Encoder};
use certext_der::{Der, Tlv, Value};
use error::Error;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use certext_der::{Construction, Tag, TagClass};

pub mod error;

/// Tag numbers of the universal class used by the certext codec.
pub mod universal {
    pub const BOOLEAN: u32 = 1;
    pub const INTEGER: u32 = 2;
    pub const BIT_STRING: u32 = 3;
    pub const OCTET_STRING: u32 = 4;
    pub const NULL: u32 = 5;
    pub const OBJECT_IDENTIFIER: u32 = 6;
    pub const UTF8_STRING: u32 = 12;
    pub const SEQUENCE: u32 = 16;
    pub const SET: u32 = 17;
    pub const PRINTABLE_STRING: u32 = 19;
    pub const IA5_STRING: u32 = 22;
}

#[derive(Debug, Clone)]
pub struct ASN1Object {
    elements: Vec<Element>,
}

impl ASN1Object {
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn new(elements: Vec<Element>) -> Self {
        ASN1Object { elements }
    }
}

impl DecodableFrom<Der> for ASN1Object {}

impl Decoder<Der, ASN1Object> for Der {
    type Error = Error;

    fn decode(&self) -> Result<ASN1Object, Error> {
        let elements = self.elements().iter().map(Element::from).collect();
        Ok(ASN1Object { elements })
    }
}

impl EncodableTo<ASN1Object> for Der {}

impl Encoder<ASN1Object, Der> for ASN1Object {
    type Error = Error;

    fn encode(&self) -> Result<Der, Self::Error> {
        Ok(Der::new(self.elements.iter().map(Tlv::from).collect()))
    }
}

/// A single DER element: identifier plus contents.
///
/// The element does not interpret its contents until one of the typed
/// accessors is called, so callers can check tag class, construction and
/// number first and report exactly which of them was wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Element {
    tag: Tag,
    content: Content,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Content {
    Primitive(Vec<u8>),
    Constructed(Vec<Element>),
}

impl Element {
    /// The construction bit of the tag follows the content variant.
    pub fn new(class: TagClass, number: u32, content: Content) -> Self {
        let constructed = matches!(content, Content::Constructed(_));
        Element {
            tag: Tag::new(class, constructed, number),
            content,
        }
    }

    pub fn boolean(value: bool) -> Self {
        let octet = if value { 0xff } else { 0x00 };
        Self::new(
            TagClass::Universal,
            universal::BOOLEAN,
            Content::Primitive(vec![octet]),
        )
    }

    pub fn integer(value: &Integer) -> Self {
        Self::new(
            TagClass::Universal,
            universal::INTEGER,
            Content::Primitive(value.to_der_content()),
        )
    }

    pub fn octet_string(value: impl Into<Vec<u8>>) -> Self {
        Self::new(
            TagClass::Universal,
            universal::OCTET_STRING,
            Content::Primitive(value.into()),
        )
    }

    pub fn object_identifier(oid: &ObjectIdentifier) -> Result<Self, Error> {
        Ok(Self::new(
            TagClass::Universal,
            universal::OBJECT_IDENTIFIER,
            Content::Primitive(oid.to_der_content()?),
        ))
    }

    pub fn ia5_string(value: &str) -> Result<Self, Error> {
        if !value.is_ascii() {
            return Err(Error::Ia5StringInvalidEncoding);
        }
        Ok(Self::new(
            TagClass::Universal,
            universal::IA5_STRING,
            Content::Primitive(value.as_bytes().to_vec()),
        ))
    }

    pub fn null() -> Self {
        Self::new(TagClass::Universal, universal::NULL, Content::Primitive(vec![]))
    }

    pub fn sequence(elements: Vec<Element>) -> Self {
        Self::new(
            TagClass::Universal,
            universal::SEQUENCE,
            Content::Constructed(elements),
        )
    }

    /// IMPLICIT `[number]` over primitive contents.
    pub fn context_primitive(number: u32, data: impl Into<Vec<u8>>) -> Self {
        Self::new(
            TagClass::ContextSpecific,
            number,
            Content::Primitive(data.into()),
        )
    }

    /// `[number]` over constructed contents (EXPLICIT, or IMPLICIT over a SEQUENCE).
    pub fn context_constructed(number: u32, elements: Vec<Element>) -> Self {
        Self::new(
            TagClass::ContextSpecific,
            number,
            Content::Constructed(elements),
        )
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn class(&self) -> TagClass {
        self.tag.class()
    }

    pub fn construction(&self) -> Construction {
        self.tag.construction()
    }

    pub fn is_constructed(&self) -> bool {
        self.tag.is_constructed()
    }

    pub fn number(&self) -> u32 {
        self.tag.number()
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn is_universal(&self, number: u32) -> bool {
        self.class() == TagClass::Universal && self.number() == number
    }

    pub fn is_context(&self, number: u32) -> bool {
        self.class() == TagClass::ContextSpecific && self.number() == number
    }

    /// Raw contents of a primitive element.
    pub fn data(&self) -> Result<&[u8], Error> {
        match &self.content {
            Content::Primitive(data) => Ok(data),
            Content::Constructed(_) => Err(Error::ExpectedPrimitive(self.tag)),
        }
    }

    /// Children of a constructed element.
    pub fn elements(&self) -> Result<&[Element], Error> {
        match &self.content {
            Content::Constructed(elements) => Ok(elements),
            Content::Primitive(_) => Err(Error::ExpectedConstructed(self.tag)),
        }
    }

    pub fn as_boolean(&self) -> Result<bool, Error> {
        match self.data()? {
            [0x00] => Ok(false),
            [0xff] => Ok(true),
            _ => Err(Error::InvalidBoolean),
        }
    }

    pub fn as_integer(&self) -> Result<Integer, Error> {
        Integer::try_from(self.data()?)
    }

    pub fn as_octet_string(&self) -> Result<OctetString, Error> {
        self.data().map(OctetString::from)
    }

    pub fn as_oid(&self) -> Result<ObjectIdentifier, Error> {
        ObjectIdentifier::try_from(self.data()?)
    }

    pub fn as_ia5_string(&self) -> Result<String, Error> {
        let data = self.data()?;
        if !data.is_ascii() {
            return Err(Error::Ia5StringInvalidEncoding);
        }
        String::from_utf8(data.to_vec()).map_err(|_| Error::Ia5StringInvalidEncoding)
    }

    /// Decodes a buffer that must hold exactly one element.
    pub fn from_der_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let der: Der = bytes.decode()?;
        let obj: ASN1Object = der.decode()?;
        match obj.elements {
            mut elements if elements.len() == 1 => Ok(elements.remove(0)),
            elements => Err(Error::UnexpectedElementCount(elements.len())),
        }
    }

    pub fn to_der_bytes(&self) -> Vec<u8> {
        Tlv::from(self).to_bytes()
    }
}

impl From<&Tlv> for Element {
    fn from(tlv: &Tlv) -> Self {
        let content = match tlv.value() {
            Value::Data(data) => Content::Primitive(data.clone()),
            Value::Tlv(tlvs) => Content::Constructed(tlvs.iter().map(Element::from).collect()),
        };
        Element {
            tag: *tlv.tag(),
            content,
        }
    }
}

impl From<&Element> for Tlv {
    fn from(element: &Element) -> Self {
        match &element.content {
            Content::Primitive(data) => Tlv::new_primitive(element.tag, data.clone()),
            Content::Constructed(elements) => {
                Tlv::new_constructed(element.tag, elements.iter().map(Tlv::from).collect())
            }
        }
    }
}

impl EncodableTo<Element> for Tlv {}

impl Encoder<Element, Tlv> for Element {
    type Error = Error;

    fn encode(&self) -> Result<Tlv, Self::Error> {
        Ok(Tlv::from(self))
    }
}

/// Ordering used by DER for SET OF and extension-point tails:
/// class first (universal, application, context-specific, private), then number.
fn order_key(element: &Element) -> (TagClass, u32) {
    (element.class(), element.number())
}

/// True when the tags of `elements` never decrease.
pub fn is_canonical_order(elements: &[Element]) -> bool {
    elements
        .windows(2)
        .all(|pair| order_key(&pair[0]) <= order_key(&pair[1]))
}

/// True when no two elements share a tag class and number.
pub fn is_uniquely_tagged(elements: &[Element]) -> bool {
    let mut seen = HashSet::new();
    elements.iter().all(|element| seen.insert(order_key(element)))
}

// ASN.1 INTEGER is an arbitrary sized two's complement value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Integer {
    inner: BigInt,
}

impl Integer {
    pub fn as_bigint(&self) -> &BigInt {
        &self.inner
    }

    pub fn to_u32(&self) -> Option<u32> {
        self.inner.to_u32()
    }

    pub fn to_u64(&self) -> Option<u64> {
        self.inner.to_u64()
    }

    pub fn to_i64(&self) -> Option<i64> {
        self.inner.to_i64()
    }

    /// Minimal two's complement contents octets.
    pub fn to_der_content(&self) -> Vec<u8> {
        self.inner.to_signed_bytes_be()
    }
}

impl Serialize for Integer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.inner.to_string())
    }
}

impl<'de> Deserialize<'de> for Integer {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let inner = s.parse::<BigInt>().map_err(serde::de::Error::custom)?;
        Ok(Integer { inner })
    }
}

impl TryFrom<&[u8]> for Integer {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        match value {
            [] => Err(Error::IntegerNoData),
            // the first nine bits must not all be equal
            [0x00, next, ..] if next & 0x80 == 0 => Err(Error::IntegerNotMinimal),
            [0xff, next, ..] if next & 0x80 != 0 => Err(Error::IntegerNotMinimal),
            _ => Ok(Integer {
                inner: BigInt::from_signed_bytes_be(value),
            }),
        }
    }
}

impl From<BigInt> for Integer {
    fn from(inner: BigInt) -> Self {
        Integer { inner }
    }
}

impl From<u32> for Integer {
    fn from(value: u32) -> Self {
        Integer {
            inner: BigInt::from(value),
        }
    }
}

impl From<u64> for Integer {
    fn from(value: u64) -> Self {
        Integer {
            inner: BigInt::from(value),
        }
    }
}

impl From<i64> for Integer {
    fn from(value: i64) -> Self {
        Integer {
            inner: BigInt::from(value),
        }
    }
}

impl Display for Integer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectIdentifier {
    inner: Vec<u64>,
}

impl ObjectIdentifier {
    pub fn new(arcs: Vec<u64>) -> Result<Self, Error> {
        validate_arcs(&arcs)?;
        Ok(ObjectIdentifier { inner: arcs })
    }

    pub fn arcs(&self) -> &[u64] {
        &self.inner
    }

    /// Contents octets of the DER encoding.
    pub fn to_der_content(&self) -> Result<Vec<u8>, Error> {
        validate_arcs(&self.inner)?;
        let (first, second, rest) = match self.inner.as_slice() {
            [first, second, rest @ ..] => (*first, *second, rest),
            _ => return Err(Error::ObjectIdentifierTooFewComponents),
        };
        let head = first
            .checked_mul(40)
            .and_then(|n| n.checked_add(second))
            .ok_or(Error::ObjectIdentifierArcOverflow)?;

        let mut out = Vec::new();
        write_base128(head, &mut out);
        for arc in rest {
            write_base128(*arc, &mut out);
        }
        Ok(out)
    }
}

fn validate_arcs(arcs: &[u64]) -> Result<(), Error> {
    match arcs {
        [] | [_] => Err(Error::ObjectIdentifierTooFewComponents),
        [first, ..] if *first > 2 => Err(Error::ObjectIdentifierInvalidFirstArc(*first)),
        [first, second, ..] if *first < 2 && *second >= 40 => {
            Err(Error::ObjectIdentifierInvalidSecondArc(*second))
        }
        _ => Ok(()),
    }
}

fn write_base128(mut value: u64, out: &mut Vec<u8>) {
    let mut groups = vec![(value & 0x7f) as u8];
    value >>= 7;
    while value > 0 {
        groups.push(((value & 0x7f) as u8) | 0x80);
        value >>= 7;
    }
    out.extend(groups.iter().rev());
}

impl Serialize for ObjectIdentifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ObjectIdentifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ObjectIdentifier::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<&[u8]> for ObjectIdentifier {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(Error::ObjectIdentifierNoData);
        }

        let mut subidentifiers = Vec::new();
        let mut val = 0u64;
        let mut at_start = true;
        for b in value {
            if at_start && *b == 0x80 {
                return Err(Error::ObjectIdentifierNotMinimal);
            }
            if val > (u64::MAX >> 7) {
                return Err(Error::ObjectIdentifierArcOverflow);
            }
            val = (val << 7) | u64::from(b & 0x7f);
            at_start = b & 0x80 == 0;
            if at_start {
                subidentifiers.push(val);
                val = 0;
            }
        }
        if !at_start {
            return Err(Error::ObjectIdentifierIncompleteEncoding);
        }

        // the first sub-identifier packs the first two arcs
        let head = subidentifiers[0];
        let (first, second) = match head {
            0..=39 => (0, head),
            40..=79 => (1, head - 40),
            _ => (2, head - 80),
        };
        let mut inner = vec![first, second];
        inner.extend_from_slice(&subidentifiers[1..]);
        Ok(ObjectIdentifier { inner })
    }
}

impl Display for ObjectIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self
            .inner
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(".");
        write!(f, "{}", s)
    }
}

impl FromStr for ObjectIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split('.')
            .map(|component| {
                component
                    .parse::<u64>()
                    .map_err(|source| Error::ObjectIdentifierInvalidComponent {
                        component: component.to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<u64>, Error>>()?;
        ObjectIdentifier::new(values)
    }
}

impl PartialEq<&str> for ObjectIdentifier {
    fn eq(&self, other: &&str) -> bool {
        self.to_string() == *other
    }
}

impl PartialEq<ObjectIdentifier> for &str {
    fn eq(&self, other: &ObjectIdentifier) -> bool {
        *self == other.to_string()
    }
}

/// Trait for types that can be converted to an ObjectIdentifier
pub trait AsOid {
    fn as_oid(&self) -> Result<ObjectIdentifier, Error>;
}

impl AsOid for ObjectIdentifier {
    fn as_oid(&self) -> Result<ObjectIdentifier, Error> {
        Ok(self.clone())
    }
}

impl AsOid for &ObjectIdentifier {
    fn as_oid(&self) -> Result<ObjectIdentifier, Error> {
        Ok((*self).clone())
    }
}

impl AsOid for &str {
    fn as_oid(&self) -> Result<ObjectIdentifier, Error> {
        ObjectIdentifier::from_str(self)
    }
}

impl AsOid for String {
    fn as_oid(&self) -> Result<ObjectIdentifier, Error> {
        self.as_str().as_oid()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OctetString {
    inner: Vec<u8>,
}

impl Serialize for OctetString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            self.inner.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for OctetString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        if !deserializer.is_human_readable() {
            let inner = Vec::<u8>::deserialize(deserializer)?;
            return Ok(OctetString { inner });
        }

        let hex_string = String::deserialize(deserializer)?;
        let cleaned = hex_string.replace(|c: char| c.is_whitespace() || c == ':', "");
        if cleaned.len() % 2 != 0 {
            return Err(serde::de::Error::custom("hex string must have even length"));
        }
        let inner = (0..cleaned.len())
            .step_by(2)
            .map(|i| {
                cleaned
                    .get(i..i + 2)
                    .and_then(|byte| u8::from_str_radix(byte, 16).ok())
                    .ok_or_else(|| serde::de::Error::custom("invalid hex string"))
            })
            .collect::<Result<Vec<u8>, D::Error>>()?;
        Ok(OctetString { inner })
    }
}

impl OctetString {
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.inner
    }
}

impl AsRef<[u8]> for OctetString {
    fn as_ref(&self) -> &[u8] {
        &self.inner
    }
}

impl From<Vec<u8>> for OctetString {
    fn from(value: Vec<u8>) -> Self {
        OctetString { inner: value }
    }
}

impl From<&[u8]> for OctetString {
    fn from(value: &[u8]) -> Self {
        OctetString {
            inner: value.to_vec(),
        }
    }
}

impl Display for OctetString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in &self.inner {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}
