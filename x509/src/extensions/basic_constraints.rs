use serde::{Deserialize, Serialize};
use std::fmt;

use certext::decoder::{DecodableFrom, Decoder};
use certext::encoder::{EncodableTo, Encoder};
use certext_asn1::{Element, Integer, TagClass, is_canonical_order, is_uniquely_tagged, universal};

use super::{BOOLEAN, INTEGER, SEQUENCE, decode_u32, expect_tag};
use crate::error::{Error, Kind, Result};
use crate::extensions::Extension;

/*
RFC 5280 Section 4.2.1.9
BasicConstraints ::= SEQUENCE {
    cA                      BOOLEAN DEFAULT FALSE,
    pathLenConstraint       INTEGER (0..MAX) OPTIONAL
}

X.509 (10/2019) leaves the SEQUENCE open for extension, so elements after
the two fixed fields are accepted as long as they are in DER order.
*/

/// Basic Constraints extension ([RFC 5280 Section 4.2.1.9](https://datatracker.ietf.org/doc/html/rfc5280#section-4.2.1.9)).
///
/// Identifies whether the subject of the certificate is a CA and the maximum
/// depth of valid certification paths that include this certificate.
///
/// # Fields
/// - `ca`: Whether the certified public key may be used to verify certificate signatures
/// - `path_len_constraint`: Maximum number of non-self-issued intermediate certificates
///   that may follow this certificate in a valid certification path
///
/// # Example
/// ```
/// use certext_x509::extensions::{BasicConstraintsSyntax, DerCodec};
///
/// let bc = BasicConstraintsSyntax { ca: true, path_len_constraint: Some(3) };
/// let bytes = bc.to_bytes().unwrap();
/// assert_eq!(vec![0x30, 0x06, 0x01, 0x01, 0xff, 0x02, 0x01, 0x03], bytes);
/// assert_eq!(bc, BasicConstraintsSyntax::from_bytes(&bytes).unwrap());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicConstraintsSyntax {
    /// Whether this certificate represents a CA
    pub ca: bool,
    /// Optional maximum path length for certificate chains
    pub path_len_constraint: Option<u32>,
}

impl Extension for BasicConstraintsSyntax {
    /// OID for BasicConstraints extension (2.5.29.19)
    const OID: &'static str = "2.5.29.19";
    const NAME: &'static str = "basicConstraints";
}

/// Position of the decoder within the fixed part of the SEQUENCE.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum State {
    #[default]
    ExpectCaOrTail,
    ExpectPathLenOrTail,
    Tail,
}

/// Fields that may only appear in the fixed part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Ca,
    PathLen,
}

impl Field {
    fn of(element: &Element) -> Option<Self> {
        if element.class() != TagClass::Universal {
            return None;
        }
        match element.number() {
            universal::BOOLEAN => Some(Field::Ca),
            universal::INTEGER => Some(Field::PathLen),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Walk {
    state: State,
    ca: bool,
    path_len_constraint: Option<u32>,
    fixed: usize,
}

impl Walk {
    fn step(&mut self, index: usize, element: &Element) -> Result<()> {
        let next = match (self.state, Field::of(element)) {
            (_, None) => State::Tail,
            (State::ExpectCaOrTail, Some(Field::Ca)) if index == 0 => {
                expect_tag(element, Kind::BasicConstraints, "cA", BOOLEAN)?;
                let ca = element.as_boolean().map_err(|source| Error::InvalidValue {
                    kind: Kind::BasicConstraints,
                    field: "cA",
                    source,
                })?;
                if !ca {
                    return Err(Error::EncodedDefault {
                        kind: Kind::BasicConstraints,
                        field: "cA",
                    });
                }
                self.ca = true;
                self.fixed = 1;
                State::ExpectPathLenOrTail
            }
            (_, Some(Field::Ca)) => {
                return Err(Error::NotInFixedPosition {
                    kind: Kind::BasicConstraints,
                    field: "cA",
                    position: "first",
                });
            }
            (State::ExpectCaOrTail, Some(Field::PathLen))
            | (State::ExpectPathLenOrTail, Some(Field::PathLen)) => {
                expect_tag(element, Kind::BasicConstraints, "pathLenConstraint", INTEGER)?;
                self.path_len_constraint = Some(decode_u32(
                    element,
                    Kind::BasicConstraints,
                    "pathLenConstraint",
                )?);
                self.fixed = index + 1;
                State::Tail
            }
            // a second-position INTEGER is only valid after cA
            (State::Tail, Some(Field::PathLen)) if index == 1 => {
                return Err(Error::MissingField {
                    kind: Kind::BasicConstraints,
                    missing: "cA",
                    field: "pathLenConstraint",
                });
            }
            (State::Tail, Some(Field::PathLen)) => {
                return Err(Error::NotInFixedPosition {
                    kind: Kind::BasicConstraints,
                    field: "pathLenConstraint",
                    position: "first or second",
                });
            }
        };
        self.state = next;
        Ok(())
    }
}

impl DecodableFrom<Element> for BasicConstraintsSyntax {}

impl Decoder<Element, BasicConstraintsSyntax> for Element {
    type Error = Error;

    fn decode(&self) -> Result<BasicConstraintsSyntax> {
        expect_tag(self, Kind::BasicConstraints, "BasicConstraintsSyntax", SEQUENCE)?;
        let elements = self.elements()?;

        let head = elements.get(..2).unwrap_or(elements);
        if !is_uniquely_tagged(head) {
            return Err(Error::DuplicateTag(Kind::BasicConstraints));
        }

        let mut walk = Walk::default();
        for (index, element) in elements.iter().enumerate() {
            walk.step(index, element)?;
        }

        let tail = elements.get(walk.fixed..).unwrap_or_default();
        if !is_canonical_order(tail) {
            return Err(Error::NonCanonicalOrder(Kind::BasicConstraints));
        }

        Ok(BasicConstraintsSyntax {
            ca: walk.ca,
            path_len_constraint: walk.path_len_constraint,
        })
    }
}

impl EncodableTo<BasicConstraintsSyntax> for Element {}

impl Encoder<BasicConstraintsSyntax, Element> for BasicConstraintsSyntax {
    type Error = Error;

    fn encode(&self) -> Result<Element> {
        // DEFAULT FALSE is never encoded
        let ca = self.ca.then_some(Element::boolean(true));
        let path_len = self
            .path_len_constraint
            .map(|len| Element::integer(&Integer::from(len)));

        let elements = ca.into_iter().chain(path_len).collect();
        Ok(Element::sequence(elements))
    }
}

impl fmt::Display for BasicConstraintsSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "            X509v3 {}:", Self::NAME)?;
        if self.ca {
            write!(f, "                CA:TRUE")?;
        } else {
            write!(f, "                CA:FALSE")?;
        }
        if let Some(pathlen) = self.path_len_constraint {
            writeln!(f, ", pathlen:{}", pathlen)
        } else {
            writeln!(f)
        }
    }
}
