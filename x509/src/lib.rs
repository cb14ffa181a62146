//! # certext-x509
//!
//! Strict DER codec for a handful of X.509 certificate extension syntaxes:
//!
//! - [`extensions::AuthorityKeyIdentifier`] (2.5.29.35)
//! - [`extensions::BasicConstraintsSyntax`] (2.5.29.19)
//! - [`extensions::PolicyConstraintsSyntax`] (2.5.29.36)
//! - [`extensions::PolicyMappingsSyntax`] (2.5.29.33)
//!
//! Each syntax decodes from an [`certext_asn1::Element`] and encodes back to
//! one, so `decode(encode(v)) == v` holds for every valid value. Decoding
//! rejects anything that is not DER: encoded DEFAULT values, duplicate or
//! misplaced fields and extension elements that are not in canonical order.
//!
//! ## Example
//!
//! ```
//! use certext_x509::extensions::{BasicConstraintsSyntax, DerCodec, Extensions};
//!
//! // Extensions ::= SEQUENCE { Extension { basicConstraints, critical, CA:TRUE } }
//! let der = [
//!     0x30, 0x11, 0x30, 0x0f, 0x06, 0x03, 0x55, 0x1d, 0x13, 0x01, 0x01, 0xff, 0x04, 0x05,
//!     0x30, 0x03, 0x01, 0x01, 0xff,
//! ];
//! let extensions = Extensions::from_bytes(&der).unwrap();
//! let bc = extensions.extension::<BasicConstraintsSyntax>().unwrap().unwrap();
//! assert!(bc.ca);
//! assert_eq!(None, bc.path_len_constraint);
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod extensions;

pub use error::{Error, Kind, Result};
