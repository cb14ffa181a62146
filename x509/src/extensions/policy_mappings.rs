use serde::{Deserialize, Serialize};
use std::fmt;

use certext::decoder::{DecodableFrom, Decoder};
use certext::encoder::{EncodableTo, Encoder};
use certext_asn1::{AsOid, Element, ObjectIdentifier};

use super::{OBJECT_IDENTIFIER, SEQUENCE, expect_tag};
use crate::error::{Error, Kind, Result};
use crate::extensions::Extension;

/*
RFC 5280 Section 4.2.1.5

id-ce-policyMappings OBJECT IDENTIFIER ::=  { id-ce 33 }

PolicyMappings ::= SEQUENCE SIZE (1..MAX) OF SEQUENCE {
     issuerDomainPolicy      CertPolicyId,
     subjectDomainPolicy     CertPolicyId }

CertPolicyId ::= OBJECT IDENTIFIER

The policy mappings extension can be used in CA certificates.  It lists
one or more pairs of OIDs; each pair includes an issuerDomainPolicy and
a subjectDomainPolicy.  The pairing indicates that the issuing CA considers
its issuerDomainPolicy equivalent to the subject CA's subjectDomainPolicy.
*/

/// A single policy mapping from issuer domain policy to subject domain policy
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyMapping {
    /// The policy OID in the issuer's domain
    pub issuer_domain_policy: ObjectIdentifier,
    /// The equivalent policy OID in the subject's domain
    pub subject_domain_policy: ObjectIdentifier,
}

impl PolicyMapping {
    /// Builds a mapping from OIDs or dotted strings.
    ///
    /// ```
    /// use certext_x509::extensions::PolicyMapping;
    ///
    /// let mapping = PolicyMapping::new("2.5.29.32.0", "1.2.3.4").unwrap();
    /// assert_eq!("2.5.29.32.0", mapping.issuer_domain_policy.to_string());
    /// ```
    pub fn new(issuer_domain_policy: impl AsOid, subject_domain_policy: impl AsOid) -> Result<Self> {
        let issuer_domain_policy =
            issuer_domain_policy
                .as_oid()
                .map_err(|source| Error::InvalidValue {
                    kind: Kind::PolicyMapping,
                    field: "issuerDomainPolicy",
                    source,
                })?;
        let subject_domain_policy =
            subject_domain_policy
                .as_oid()
                .map_err(|source| Error::InvalidValue {
                    kind: Kind::PolicyMapping,
                    field: "subjectDomainPolicy",
                    source,
                })?;
        Ok(PolicyMapping {
            issuer_domain_policy,
            subject_domain_policy,
        })
    }
}

fn decode_policy(element: &Element, field: &'static str) -> Result<ObjectIdentifier> {
    expect_tag(element, Kind::PolicyMapping, field, OBJECT_IDENTIFIER)?;
    element.as_oid().map_err(|source| Error::InvalidValue {
        kind: Kind::PolicyMapping,
        field,
        source,
    })
}

impl DecodableFrom<Element> for PolicyMapping {}

impl Decoder<Element, PolicyMapping> for Element {
    type Error = Error;

    fn decode(&self) -> Result<PolicyMapping> {
        expect_tag(self, Kind::PolicyMapping, "PolicyMapping", SEQUENCE)?;
        match self.elements()? {
            // trailing elements are an extension point
            [issuer, subject, ..] => Ok(PolicyMapping {
                issuer_domain_policy: decode_policy(issuer, "issuerDomainPolicy")?,
                subject_domain_policy: decode_policy(subject, "subjectDomainPolicy")?,
            }),
            elements => Err(Error::InvalidElementCount {
                kind: Kind::PolicyMapping,
                expected: "at least 2",
                actual: elements.len(),
            }),
        }
    }
}

impl EncodableTo<PolicyMapping> for Element {}

impl Encoder<PolicyMapping, Element> for PolicyMapping {
    type Error = Error;

    fn encode(&self) -> Result<Element> {
        Ok(Element::sequence(vec![
            Element::object_identifier(&self.issuer_domain_policy)?,
            Element::object_identifier(&self.subject_domain_policy)?,
        ]))
    }
}

impl fmt::Display for PolicyMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.issuer_domain_policy, self.subject_domain_policy
        )
    }
}

/// PolicyMappings extension defines policy equivalences between CAs.
/// Always holds at least one mapping.
/// OID: 2.5.29.33
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PolicyMapping>", into = "Vec<PolicyMapping>")]
pub struct PolicyMappingsSyntax {
    mappings: Vec<PolicyMapping>,
}

impl PolicyMappingsSyntax {
    pub fn new(mappings: Vec<PolicyMapping>) -> Result<Self> {
        if mappings.is_empty() {
            return Err(Error::EmptyContent(Kind::PolicyMappings));
        }
        Ok(Self { mappings })
    }

    pub fn mappings(&self) -> &[PolicyMapping] {
        &self.mappings
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PolicyMapping> {
        self.mappings.iter()
    }
}

impl TryFrom<Vec<PolicyMapping>> for PolicyMappingsSyntax {
    type Error = Error;

    fn try_from(mappings: Vec<PolicyMapping>) -> Result<Self> {
        Self::new(mappings)
    }
}

impl From<PolicyMappingsSyntax> for Vec<PolicyMapping> {
    fn from(syntax: PolicyMappingsSyntax) -> Self {
        syntax.mappings
    }
}

impl<'a> IntoIterator for &'a PolicyMappingsSyntax {
    type Item = &'a PolicyMapping;
    type IntoIter = std::slice::Iter<'a, PolicyMapping>;

    fn into_iter(self) -> Self::IntoIter {
        self.mappings.iter()
    }
}

impl Extension for PolicyMappingsSyntax {
    /// OID for PolicyMappings extension (2.5.29.33)
    const OID: &'static str = "2.5.29.33";
    const NAME: &'static str = "policyMappings";
}

impl DecodableFrom<Element> for PolicyMappingsSyntax {}

impl Decoder<Element, PolicyMappingsSyntax> for Element {
    type Error = Error;

    fn decode(&self) -> Result<PolicyMappingsSyntax> {
        expect_tag(self, Kind::PolicyMappings, "PolicyMappingsSyntax", SEQUENCE)?;
        let mappings = self
            .elements()?
            .iter()
            .map(|elem| elem.decode())
            .collect::<Result<Vec<PolicyMapping>>>()?;
        PolicyMappingsSyntax::new(mappings)
    }
}

impl EncodableTo<PolicyMappingsSyntax> for Element {}

impl Encoder<PolicyMappingsSyntax, Element> for PolicyMappingsSyntax {
    type Error = Error;

    fn encode(&self) -> Result<Element> {
        let mapping_elements = self
            .mappings
            .iter()
            .map(|m| m.encode())
            .collect::<Result<Vec<_>>>()?;
        Ok(Element::sequence(mapping_elements))
    }
}

impl fmt::Display for PolicyMappingsSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "            X509v3 {}:", Self::NAME)?;
        for mapping in &self.mappings {
            writeln!(f, "                {}", mapping)?;
        }
        Ok(())
    }
}
