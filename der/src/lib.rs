//! Byte-level DER: identifier octets, definite lengths and contents.
//!
//! Only the distinguished subset of BER is accepted. Indefinite lengths,
//! non-minimal length octets and non-minimal tag numbers are rejected, since a
//! conforming DER encoder never produces them.

use std::fmt;

use certext::decoder::{DecodableFrom, Decoder};
use certext::encoder::{EncodableTo, Encoder};
use nom::{IResult, Parser};
use serde::Serialize;

use crate::error::Error;

pub mod error;

/// Bit 6 of the first identifier octet.
pub const TAG_CONSTRUCTED: u8 = 0x20;

const HIGH_TAG_NUMBER: u8 = 0x1f;
const MAX_DEPTH: usize = 64;
const MAX_LENGTH_OCTETS: usize = 4;

/// Decoded contents of a DER buffer: its top-level elements in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Der {
    elements: Vec<Tlv>,
}

impl Der {
    pub fn new(elements: Vec<Tlv>) -> Self {
        Der { elements }
    }

    pub fn elements(&self) -> &[Tlv] {
        &self.elements
    }

    pub fn into_elements(self) -> Vec<Tlv> {
        self.elements
    }
}

impl DecodableFrom<&[u8]> for Der {}

impl Decoder<&[u8], Der> for &[u8] {
    type Error = Error;

    fn decode(&self) -> Result<Der, Self::Error> {
        parse_der(self)
    }
}

impl DecodableFrom<Vec<u8>> for Der {}

impl Decoder<Vec<u8>, Der> for Vec<u8> {
    type Error = Error;

    fn decode(&self) -> Result<Der, Self::Error> {
        parse_der(self)
    }
}

impl EncodableTo<Der> for Vec<u8> {}

impl Encoder<Der, Vec<u8>> for Der {
    type Error = Error;

    fn encode(&self) -> Result<Vec<u8>, Self::Error> {
        let mut out = Vec::new();
        for tlv in &self.elements {
            tlv.write(&mut out);
        }
        Ok(out)
    }
}

fn parse_der(input: &[u8]) -> Result<Der, Error> {
    if input.is_empty() {
        return Err(Error::EmptyInput);
    }
    let mut elements = Vec::new();
    let mut rest = input;
    while !rest.is_empty() {
        let (next, tlv) = Tlv::parse(rest)?;
        rest = next;
        elements.push(tlv);
    }
    Ok(Der { elements })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TagClass {
    Universal,
    Application,
    ContextSpecific,
    Private,
}

impl TagClass {
    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => TagClass::Universal,
            1 => TagClass::Application,
            2 => TagClass::ContextSpecific,
            _ => TagClass::Private,
        }
    }

    fn bits(self) -> u8 {
        match self {
            TagClass::Universal => 0,
            TagClass::Application => 1,
            TagClass::ContextSpecific => 2,
            TagClass::Private => 3,
        }
    }
}

impl fmt::Display for TagClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagClass::Universal => write!(f, "universal"),
            TagClass::Application => write!(f, "application"),
            TagClass::ContextSpecific => write!(f, "context-specific"),
            TagClass::Private => write!(f, "private"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Construction {
    Primitive,
    Constructed,
}

impl fmt::Display for Construction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Construction::Primitive => write!(f, "primitive"),
            Construction::Constructed => write!(f, "constructed"),
        }
    }
}

/// Identifier octets of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Tag {
    class: TagClass,
    constructed: bool,
    number: u32,
}

impl Tag {
    pub const fn new(class: TagClass, constructed: bool, number: u32) -> Self {
        Tag {
            class,
            constructed,
            number,
        }
    }

    pub const fn universal(number: u32, constructed: bool) -> Self {
        Tag::new(TagClass::Universal, constructed, number)
    }

    pub const fn context(number: u32, constructed: bool) -> Self {
        Tag::new(TagClass::ContextSpecific, constructed, number)
    }

    pub fn class(&self) -> TagClass {
        self.class
    }

    pub fn is_constructed(&self) -> bool {
        self.constructed
    }

    pub fn construction(&self) -> Construction {
        if self.constructed {
            Construction::Constructed
        } else {
            Construction::Primitive
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    fn write(&self, out: &mut Vec<u8>) {
        let mut first = self.class.bits() << 6;
        if self.constructed {
            first |= TAG_CONSTRUCTED;
        }
        if self.number < u32::from(HIGH_TAG_NUMBER) {
            // number < 31 always fits in the low five bits
            out.push(first | self.number as u8);
            return;
        }
        out.push(first | HIGH_TAG_NUMBER);
        write_base128(self.number, out);
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {} {}]", self.class, self.construction(), self.number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Tlv(Vec<Tlv>),
    Data(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    tag: Tag,
    value: Value,
}

impl Tlv {
    pub fn new_primitive(tag: Tag, data: Vec<u8>) -> Self {
        Tlv {
            tag,
            value: Value::Data(data),
        }
    }

    pub fn new_constructed(tag: Tag, tlvs: Vec<Tlv>) -> Self {
        Tlv {
            tag,
            value: Value::Tlv(tlvs),
        }
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn data(&self) -> Option<&[u8]> {
        match &self.value {
            Value::Data(data) => Some(data),
            Value::Tlv(_) => None,
        }
    }

    pub fn tlvs(&self) -> Option<&[Tlv]> {
        match &self.value {
            Value::Tlv(tlvs) => Some(tlvs),
            Value::Data(_) => None,
        }
    }

    /// Parses one element from the front of `input`.
    pub fn parse(input: &[u8]) -> IResult<&[u8], Tlv, Error> {
        Self::parse_nested(input, 0)
    }

    fn parse_nested(input: &[u8], depth: usize) -> IResult<&[u8], Tlv, Error> {
        if depth > MAX_DEPTH {
            return Err(nom::Err::Failure(Error::NestingTooDeep(MAX_DEPTH)));
        }
        let (input, tag) = parse_tag(input)?;
        let (input, length) = parse_length(input)?;
        let (input, data) = nom::bytes::complete::take::<usize, &[u8], Error>(length).parse(input)?;

        if !tag.constructed {
            return Ok((input, Tlv::new_primitive(tag, data.to_vec())));
        }

        let mut tlvs = Vec::new();
        let mut data = data;
        while !data.is_empty() {
            let (rest, tlv) = Self::parse_nested(data, depth + 1)?;
            data = rest;
            tlvs.push(tlv);
        }
        Ok((input, Tlv::new_constructed(tag, tlvs)))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write(&mut out);
        out
    }

    fn write(&self, out: &mut Vec<u8>) {
        self.tag.write(out);
        match &self.value {
            Value::Data(data) => {
                write_length(data.len(), out);
                out.extend_from_slice(data);
            }
            Value::Tlv(tlvs) => {
                let mut contents = Vec::new();
                for tlv in tlvs {
                    tlv.write(&mut contents);
                }
                write_length(contents.len(), out);
                out.extend(contents);
            }
        }
    }
}

fn parse_tag(input: &[u8]) -> IResult<&[u8], Tag, Error> {
    let (mut input, first) = nom::number::complete::be_u8::<&[u8], Error>(input)?;
    let class = TagClass::from_bits(first >> 6);
    let constructed = first & TAG_CONSTRUCTED == TAG_CONSTRUCTED;

    if first & HIGH_TAG_NUMBER != HIGH_TAG_NUMBER {
        let number = u32::from(first & HIGH_TAG_NUMBER);
        return Ok((input, Tag::new(class, constructed, number)));
    }

    // high-tag-number form: base 128, most significant group first
    let mut number: u32 = 0;
    let mut first_octet = true;
    loop {
        let (rest, b) = nom::number::complete::be_u8::<&[u8], Error>(input)?;
        input = rest;
        if first_octet && b == 0x80 {
            return Err(nom::Err::Failure(Error::NonMinimalTagNumber));
        }
        first_octet = false;
        if number > (u32::MAX >> 7) {
            return Err(nom::Err::Failure(Error::TagNumberTooLarge));
        }
        number = (number << 7) | u32::from(b & 0x7f);
        if b & 0x80 == 0 {
            break;
        }
    }
    if number < u32::from(HIGH_TAG_NUMBER) {
        return Err(nom::Err::Failure(Error::NonMinimalTagNumber));
    }
    Ok((input, Tag::new(class, constructed, number)))
}

fn parse_length(input: &[u8]) -> IResult<&[u8], usize, Error> {
    let (input, n) = nom::number::complete::be_u8::<&[u8], Error>(input)?;
    if n & 0x80 == 0 {
        // short form: 0-127
        return Ok((input, usize::from(n)));
    }

    let count = usize::from(n & 0x7f);
    if count == 0 {
        return Err(nom::Err::Failure(Error::IndefiniteLength));
    }
    if count > MAX_LENGTH_OCTETS {
        return Err(nom::Err::Failure(Error::LengthTooLarge(count)));
    }
    let (input, bs) = nom::bytes::complete::take::<usize, &[u8], Error>(count).parse(input)?;
    if bs.first() == Some(&0) {
        return Err(nom::Err::Failure(Error::NonMinimalLength));
    }
    let length = bs.iter().fold(0usize, |n, &b| (n << 8) | usize::from(b));
    if length < 0x80 {
        return Err(nom::Err::Failure(Error::NonMinimalLength));
    }
    Ok((input, length))
}

fn write_length(length: usize, out: &mut Vec<u8>) {
    if length < 0x80 {
        out.push(length as u8);
        return;
    }
    let bytes = length.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
    let significant = &bytes[start..];
    out.push(0x80 | significant.len() as u8);
    out.extend_from_slice(significant);
}

fn write_base128(mut value: u32, out: &mut Vec<u8>) {
    let mut groups = vec![(value & 0x7f) as u8];
    value >>= 7;
    while value > 0 {
        groups.push(((value & 0x7f) as u8) | 0x80);
        value >>= 7;
    }
    out.extend(groups.iter().rev());
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest(input, expected,
        case(vec![0x01], Tag::universal(1, false)),
        case(vec![0x02, 0x01], Tag::universal(2, false)),
        case(vec![0x30, 0x01], Tag::universal(16, true)),
        case(vec![0x80], Tag::context(0, false)),
        case(vec![0xa1], Tag::context(1, true)),
        case(vec![0x5f, 0x1f], Tag::new(TagClass::Application, false, 31)),
        case(vec![0xdf, 0x81, 0x00], Tag::new(TagClass::Private, false, 128)),
    )]
    fn test_parse_tag(input: Vec<u8>, expected: Tag) {
        let (_, actual) = parse_tag(&input).unwrap();
        assert_eq!(expected, actual);
    }

    #[rstest(input, expected,
        // low number forced into the high form
        case(vec![0x9f, 0x05], Error::NonMinimalTagNumber),
        // leading 0x80 continuation octet
        case(vec![0x9f, 0x80, 0x20], Error::NonMinimalTagNumber),
        case(vec![0x9f, 0x90, 0x80, 0x80, 0x80, 0x00], Error::TagNumberTooLarge),
    )]
    fn test_parse_tag_rejects(input: Vec<u8>, expected: Error) {
        let err = parse_tag(&input).unwrap_err();
        assert_eq!(expected, Error::from(err));
    }

    #[rstest(input, expected,
        case(vec![0x02], 0x02),
        case(vec![0x7f], 0x7f),
        case(vec![0x81, 0x80], 0x80),
        case(vec![0x82, 0x02, 0x10], 256 * 0x02 + 0x10),
        case(vec![0x83, 0x01, 0x00, 0x00], 256 * 256),
        case(vec![0x84, 0x01, 0x00, 0x00, 0x00], 256 * 256 * 256),
        case(vec![0x82, 0xff, 0xff], 256 * 0xff + 0xff),
    )]
    fn test_parse_length(input: Vec<u8>, expected: usize) {
        let (_, actual) = parse_length(&input).unwrap();
        assert_eq!(expected, actual);
    }

    #[rstest(input, expected,
        case(vec![0x80], Error::IndefiniteLength),
        case(vec![0x81, 0x05], Error::NonMinimalLength),
        case(vec![0x82, 0x00, 0x90], Error::NonMinimalLength),
        case(vec![0x85, 1, 2, 3, 4, 5], Error::LengthTooLarge(5)),
        case(vec![0x85, 1], Error::LengthTooLarge(5)),
        case(vec![0x89, 1, 2, 3, 4, 5, 6, 7, 8, 9], Error::LengthTooLarge(9)),
    )]
    fn test_parse_length_rejects(input: Vec<u8>, expected: Error) {
        let err = parse_length(&input).unwrap_err();
        assert_eq!(expected, Error::from(err));
    }

    #[test]
    fn test_tlv_parse_primitive() {
        let input = vec![0x02, 0x01, 0x03];
        let (rest, tlv) = Tlv::parse(&input).unwrap();
        assert!(rest.is_empty());
        assert_eq!(&Tag::universal(2, false), tlv.tag());
        assert_eq!(Some([0x03].as_slice()), tlv.data());
    }

    #[test]
    fn test_tlv_parse_constructed() {
        // SEQUENCE { BOOLEAN TRUE, INTEGER 3 }
        let input = vec![0x30, 0x06, 0x01, 0x01, 0xff, 0x02, 0x01, 0x03];
        let (_, tlv) = Tlv::parse(&input).unwrap();
        let children = tlv.tlvs().unwrap();
        assert_eq!(2, children.len());
        assert_eq!(&Tag::universal(1, false), children[0].tag());
        assert_eq!(Some([0xff].as_slice()), children[0].data());
        assert_eq!(&Tag::universal(2, false), children[1].tag());
    }

    #[test]
    fn test_tlv_parse_truncated_contents() {
        let input = vec![0x04, 0x05, 0x01, 0x02];
        let err = Tlv::parse(&input).unwrap_err();
        assert!(matches!(Error::from(err), Error::Parser(_)));
    }

    #[test]
    fn test_tlv_parse_child_overruns_parent() {
        // SEQUENCE of length 3 whose child claims 2 content octets but only 1 remains
        let input = vec![0x30, 0x03, 0x04, 0x02, 0x00];
        assert!(Tlv::parse(&input).is_err());
    }

    #[test]
    fn test_tlv_parse_nesting_limit() {
        let mut nested = vec![0x05, 0x00];
        for _ in 0..=MAX_DEPTH + 1 {
            let mut outer = vec![0x30];
            write_length(nested.len(), &mut outer);
            outer.extend(nested);
            nested = outer;
        }
        let err = Tlv::parse(&nested).unwrap_err();
        assert_eq!(Error::NestingTooDeep(MAX_DEPTH), Error::from(err));
    }

    #[rstest(input,
        case(vec![0x01, 0x01, 0xff]),
        case(vec![0x30, 0x00]),
        case(vec![0x30, 0x06, 0x80, 0x01, 0x02, 0x81, 0x01, 0x03]),
        case(vec![0xa1, 0x04, 0x82, 0x02, 0x68, 0x69]),
        case(vec![0x5f, 0x81, 0x00, 0x01, 0x00]),
    )]
    fn test_tlv_encode_matches_input(input: Vec<u8>) {
        let (_, tlv) = Tlv::parse(&input).unwrap();
        assert_eq!(input, tlv.to_bytes());
    }

    #[test]
    fn test_long_form_length_encoding() {
        let tlv = Tlv::new_primitive(Tag::universal(4, false), vec![0xab; 300]);
        let bytes = tlv.to_bytes();
        assert_eq!(&[0x04, 0x82, 0x01, 0x2c], &bytes[..4]);
        let (_, parsed) = Tlv::parse(&bytes).unwrap();
        assert_eq!(tlv, parsed);
    }

    #[test]
    fn test_der_decode_multiple_elements() {
        let input: &[u8] = &[0x05, 0x00, 0x01, 0x01, 0x00];
        let der: Der = input.decode().unwrap();
        assert_eq!(2, der.elements().len());
        let out: Vec<u8> = der.encode().unwrap();
        assert_eq!(input, out.as_slice());
    }

    #[test]
    fn test_der_decode_empty() {
        let input: Vec<u8> = Vec::new();
        let result: Result<Der, Error> = input.decode();
        assert_eq!(Err(Error::EmptyInput), result);
    }

    #[rstest(tag, expected,
        case(Tag::universal(16, true), "[universal constructed 16]"),
        case(Tag::context(2, false), "[context-specific primitive 2]"),
    )]
    fn test_tag_display(tag: Tag, expected: &str) {
        assert_eq!(expected, tag.to_string());
    }
}
