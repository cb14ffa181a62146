//! Error types for extension syntax decoding and encoding

use certext_asn1::{Construction, TagClass};
use thiserror::Error;

/// Which syntax an error was raised for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    AuthorityKeyIdentifier,
    BasicConstraints,
    PolicyConstraints,
    PolicyMapping,
    PolicyMappings,
    GeneralName,
    Extension,
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthorityKeyIdentifier => write!(f, "AuthorityKeyIdentifier"),
            Self::BasicConstraints => write!(f, "BasicConstraints"),
            Self::PolicyConstraints => write!(f, "PolicyConstraints"),
            Self::PolicyMapping => write!(f, "PolicyMapping"),
            Self::PolicyMappings => write!(f, "PolicyMappings"),
            Self::GeneralName => write!(f, "GeneralName"),
            Self::Extension => write!(f, "Extension"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    // Tag checks
    #[error("{kind}: {field}: expected {expected} tag class, got {actual}")]
    UnexpectedTagClass {
        kind: Kind,
        field: &'static str,
        expected: TagClass,
        actual: TagClass,
    },

    #[error("{kind}: {field}: expected {expected} construction, got {actual}")]
    UnexpectedConstruction {
        kind: Kind,
        field: &'static str,
        expected: Construction,
        actual: Construction,
    },

    #[error("{kind}: {field}: expected tag number {expected}, got {actual}")]
    UnexpectedTagNumber {
        kind: Kind,
        field: &'static str,
        expected: u32,
        actual: u32,
    },

    #[error("{kind}: unknown context-specific tag [{number}]")]
    UnknownChoice { kind: Kind, number: u32 },

    // Structural errors
    #[error("{kind}: expected {expected} elements, got {actual}")]
    InvalidElementCount {
        kind: Kind,
        expected: &'static str,
        actual: usize,
    },

    #[error("{kind}: duplicate {field} element")]
    DuplicateField { kind: Kind, field: &'static str },

    #[error("{kind}: {field} is not the {position} element")]
    NotInFixedPosition {
        kind: Kind,
        field: &'static str,
        position: &'static str,
    },

    #[error("{kind}: missing {missing} element before {field}")]
    MissingField {
        kind: Kind,
        missing: &'static str,
        field: &'static str,
    },

    #[error("{kind}: {field} must be omitted instead of encoding its DEFAULT value")]
    EncodedDefault { kind: Kind, field: &'static str },

    #[error("{0}: extension elements are not in canonical order")]
    NonCanonicalOrder(Kind),

    #[error("{0}: extension elements are not uniquely tagged")]
    DuplicateTag(Kind),

    #[error("{0}: empty content")]
    EmptyContent(Kind),

    // Value errors
    #[error("{kind}: {field} out of range for u32")]
    ValueOutOfRange { kind: Kind, field: &'static str },

    #[error("{kind}: {present} is present without {missing}")]
    PartialGroup {
        kind: Kind,
        present: &'static str,
        missing: &'static str,
    },

    #[error("GeneralName: iPAddress must be 4 or 16 bytes, got {0}")]
    InvalidIpAddressLength(usize),

    #[error("{kind}: {field}: {source}")]
    InvalidValue {
        kind: Kind,
        field: &'static str,
        #[source]
        source: certext_asn1::error::Error,
    },

    // Extension envelope errors
    #[error("extension OID mismatch: expected {expected}, got {actual}")]
    OidMismatch { expected: String, actual: String },

    #[error("invalid OID string {oid}: {source}")]
    InvalidOidString {
        oid: &'static str,
        #[source]
        source: certext_asn1::error::Error,
    },

    #[error("duplicate extension {0}")]
    DuplicateExtension(String),

    /// Invalid ASN.1 structure
    #[error("invalid ASN.1: {0}")]
    InvalidASN1(#[from] certext_asn1::error::Error),
}

/// Result type for extension operations
pub type Result<T> = std::result::Result<T, Error>;
