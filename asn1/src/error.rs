//! Error types for ASN.1 element access and value encoding.

use std::num::ParseIntError;

use certext_der::Tag;
use thiserror::Error;

/// Errors raised while interpreting element contents or encoding values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    // Boolean errors
    #[error("BOOLEAN: contents must be a single 0x00 or 0xFF octet")]
    InvalidBoolean,

    // Integer errors
    #[error("INTEGER: no data")]
    IntegerNoData,
    #[error("INTEGER: not minimally encoded")]
    IntegerNotMinimal,

    // ObjectIdentifier errors
    #[error("OBJECT IDENTIFIER: no data")]
    ObjectIdentifierNoData,
    #[error("OBJECT IDENTIFIER: incomplete encoding")]
    ObjectIdentifierIncompleteEncoding,
    #[error("OBJECT IDENTIFIER: sub-identifier not minimally encoded")]
    ObjectIdentifierNotMinimal,
    #[error("OBJECT IDENTIFIER: arc does not fit in 64 bits")]
    ObjectIdentifierArcOverflow,
    #[error("OBJECT IDENTIFIER: too few components (need at least 2)")]
    ObjectIdentifierTooFewComponents,
    #[error("OBJECT IDENTIFIER: first arc {0} out of range (must be 0-2)")]
    ObjectIdentifierInvalidFirstArc(u64),
    #[error("OBJECT IDENTIFIER: second arc {0} out of range (must be 0-39 under arcs 0 and 1)")]
    ObjectIdentifierInvalidSecondArc(u64),
    #[error("OBJECT IDENTIFIER: invalid component '{component}': {source}")]
    ObjectIdentifierInvalidComponent {
        component: String,
        #[source]
        source: ParseIntError,
    },

    // String type errors
    #[error("IA5String: invalid encoding")]
    Ia5StringInvalidEncoding,

    // Element shape errors
    #[error("element {0}: expected primitive contents")]
    ExpectedPrimitive(Tag),
    #[error("element {0}: expected constructed contents")]
    ExpectedConstructed(Tag),
    #[error("expected exactly one element, found {0}")]
    UnexpectedElementCount(usize),

    // DER errors
    #[error("invalid DER encoding: {0}")]
    FailedToDecodeDer(#[from] certext_der::error::Error),
}
