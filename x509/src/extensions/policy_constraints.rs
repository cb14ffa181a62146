use serde::{Deserialize, Serialize};
use std::fmt;

use certext::decoder::{DecodableFrom, Decoder};
use certext::encoder::{EncodableTo, Encoder};
use certext_asn1::{Element, Integer, Tag, TagClass, is_canonical_order, is_uniquely_tagged};

use super::{SEQUENCE, decode_u32, expect_tag};
use crate::error::{Error, Kind, Result};
use crate::extensions::Extension;

/// The number of certificates that may appear in the path before a specific constraint
/// becomes effective.
///
/// Defined in RFC 5280 Section 4.2.1.11:
/// SkipCerts ::= INTEGER (0..MAX)
pub type SkipCerts = u32;

/*
RFC 5280 Section 4.2.1.11

PolicyConstraints ::= SEQUENCE {
    requireExplicitPolicy    [0] SkipCerts OPTIONAL,
    inhibitPolicyMapping     [1] SkipCerts OPTIONAL }

SkipCerts ::= INTEGER (0..MAX)

Conforming CAs MUST NOT issue certificates where policy constraints
is an empty sequence.  That is, either the inhibitPolicyMapping field
or the requireExplicitPolicy field MUST be present.
*/

const REQUIRE_EXPLICIT_POLICY: Tag = Tag::context(0, false);
const INHIBIT_POLICY_MAPPING: Tag = Tag::context(1, false);

/// Policy Constraints extension ([RFC 5280 Section 4.2.1.11](https://datatracker.ietf.org/doc/html/rfc5280#section-4.2.1.11)).
///
/// Constrains path validation by requiring explicit policy or inhibiting policy mapping.
/// At least one of the two constraints is always present.
/// OID: 2.5.29.36
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PolicyConstraintsFields", into = "PolicyConstraintsFields")]
pub enum PolicyConstraintsSyntax {
    RequireOnly(SkipCerts),
    InhibitOnly(SkipCerts),
    Both(SkipCerts, SkipCerts),
}

impl PolicyConstraintsSyntax {
    pub fn new(
        require_explicit_policy: Option<SkipCerts>,
        inhibit_policy_mapping: Option<SkipCerts>,
    ) -> Result<Self> {
        match (require_explicit_policy, inhibit_policy_mapping) {
            (Some(require), Some(inhibit)) => Ok(Self::Both(require, inhibit)),
            (Some(require), None) => Ok(Self::RequireOnly(require)),
            (None, Some(inhibit)) => Ok(Self::InhibitOnly(inhibit)),
            (None, None) => Err(Error::EmptyContent(Kind::PolicyConstraints)),
        }
    }

    /// Number of additional certificates that may appear in the path
    /// before an explicit policy is required for the entire path
    pub fn require_explicit_policy(&self) -> Option<SkipCerts> {
        match self {
            Self::RequireOnly(require) | Self::Both(require, _) => Some(*require),
            Self::InhibitOnly(_) => None,
        }
    }

    /// Number of additional certificates that may appear in the path
    /// before policy mapping is no longer permitted
    pub fn inhibit_policy_mapping(&self) -> Option<SkipCerts> {
        match self {
            Self::InhibitOnly(inhibit) | Self::Both(_, inhibit) => Some(*inhibit),
            Self::RequireOnly(_) => None,
        }
    }
}

/// Flat form used for serialization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct PolicyConstraintsFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    require_explicit_policy: Option<SkipCerts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inhibit_policy_mapping: Option<SkipCerts>,
}

impl TryFrom<PolicyConstraintsFields> for PolicyConstraintsSyntax {
    type Error = Error;

    fn try_from(fields: PolicyConstraintsFields) -> Result<Self> {
        Self::new(fields.require_explicit_policy, fields.inhibit_policy_mapping)
    }
}

impl From<PolicyConstraintsSyntax> for PolicyConstraintsFields {
    fn from(pc: PolicyConstraintsSyntax) -> Self {
        PolicyConstraintsFields {
            require_explicit_policy: pc.require_explicit_policy(),
            inhibit_policy_mapping: pc.inhibit_policy_mapping(),
        }
    }
}

impl Extension for PolicyConstraintsSyntax {
    /// OID for PolicyConstraints extension (2.5.29.36)
    const OID: &'static str = "2.5.29.36";
    const NAME: &'static str = "policyConstraints";
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum State {
    #[default]
    ExpectRequireOrTail,
    ExpectInhibitOrTail,
    Tail,
}

#[derive(Debug, Default)]
struct Walk {
    state: State,
    require_explicit_policy: Option<SkipCerts>,
    inhibit_policy_mapping: Option<SkipCerts>,
    fixed: usize,
}

impl Walk {
    fn step(&mut self, index: usize, element: &Element) -> Result<()> {
        let slot = (element.class() == TagClass::ContextSpecific).then(|| element.number());
        let next = match (self.state, slot) {
            (_, Some(0)) => {
                if self.require_explicit_policy.is_some() {
                    return Err(Error::DuplicateField {
                        kind: Kind::PolicyConstraints,
                        field: "requireExplicitPolicy",
                    });
                }
                if index != 0 {
                    return Err(Error::NotInFixedPosition {
                        kind: Kind::PolicyConstraints,
                        field: "requireExplicitPolicy",
                        position: "first",
                    });
                }
                self.require_explicit_policy =
                    Some(decode_field(element, "requireExplicitPolicy", REQUIRE_EXPLICIT_POLICY)?);
                self.fixed = 1;
                State::ExpectInhibitOrTail
            }
            (state, Some(1)) => {
                if self.inhibit_policy_mapping.is_some() {
                    return Err(Error::DuplicateField {
                        kind: Kind::PolicyConstraints,
                        field: "inhibitPolicyMapping",
                    });
                }
                match (state, index) {
                    // a lone [1] first is the InhibitOnly form, not a missing [0]
                    (State::ExpectRequireOrTail, 0) | (State::ExpectInhibitOrTail, 1) => {}
                    // element 0 is not a valid requireExplicitPolicy
                    (_, 1) => {
                        return Err(Error::MissingField {
                            kind: Kind::PolicyConstraints,
                            missing: "requireExplicitPolicy",
                            field: "inhibitPolicyMapping",
                        });
                    }
                    _ => {
                        return Err(Error::NotInFixedPosition {
                            kind: Kind::PolicyConstraints,
                            field: "inhibitPolicyMapping",
                            position: "first or second",
                        });
                    }
                }
                self.inhibit_policy_mapping =
                    Some(decode_field(element, "inhibitPolicyMapping", INHIBIT_POLICY_MAPPING)?);
                self.fixed = index + 1;
                State::Tail
            }
            _ => State::Tail,
        };
        self.state = next;
        Ok(())
    }
}

fn decode_field(element: &Element, field: &'static str, tag: Tag) -> Result<SkipCerts> {
    expect_tag(element, Kind::PolicyConstraints, field, tag)?;
    decode_u32(element, Kind::PolicyConstraints, field)
}

impl DecodableFrom<Element> for PolicyConstraintsSyntax {}

impl Decoder<Element, PolicyConstraintsSyntax> for Element {
    type Error = Error;

    fn decode(&self) -> Result<PolicyConstraintsSyntax> {
        expect_tag(self, Kind::PolicyConstraints, "PolicyConstraintsSyntax", SEQUENCE)?;
        let elements = self.elements()?;
        if elements.is_empty() {
            return Err(Error::EmptyContent(Kind::PolicyConstraints));
        }

        let mut walk = Walk::default();
        for (index, element) in elements.iter().enumerate() {
            walk.step(index, element)?;
        }

        let tail = elements.get(walk.fixed..).unwrap_or_default();
        if !is_uniquely_tagged(tail) {
            return Err(Error::DuplicateTag(Kind::PolicyConstraints));
        }
        if !is_canonical_order(tail) {
            return Err(Error::NonCanonicalOrder(Kind::PolicyConstraints));
        }

        PolicyConstraintsSyntax::new(walk.require_explicit_policy, walk.inhibit_policy_mapping)
    }
}

impl EncodableTo<PolicyConstraintsSyntax> for Element {}

impl Encoder<PolicyConstraintsSyntax, Element> for PolicyConstraintsSyntax {
    type Error = Error;

    fn encode(&self) -> Result<Element> {
        let require = self
            .require_explicit_policy()
            .map(|v| Element::context_primitive(0, Integer::from(v).to_der_content()));
        let inhibit = self
            .inhibit_policy_mapping()
            .map(|v| Element::context_primitive(1, Integer::from(v).to_der_content()));

        let elements = require.into_iter().chain(inhibit).collect();
        Ok(Element::sequence(elements))
    }
}

impl fmt::Display for PolicyConstraintsSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "            X509v3 {}:", Self::NAME)?;
        if let Some(require) = self.require_explicit_policy() {
            writeln!(f, "                Require Explicit Policy:{}", require)?;
        }
        if let Some(inhibit) = self.inhibit_policy_mapping() {
            writeln!(f, "                Inhibit Policy Mapping:{}", inhibit)?;
        }
        Ok(())
    }
}
