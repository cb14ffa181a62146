//! # certext
//!
//! Core conversion traits shared by the certext crates.
//!
//! Every layer of the X.509 extension codec is a conversion from one
//! representation to the next:
//!
//! ```text
//! &[u8] → Der → ASN1Object / Element → extension value
//! ```
//!
//! Decoding walks the chain left to right through [`decoder::Decoder`],
//! encoding walks it right to left through [`encoder::Encoder`]. Marker
//! traits ([`decoder::DecodableFrom`] and [`encoder::EncodableTo`]) keep the
//! set of legal conversions closed at compile time.
//!
//! ## Example
//!
//! ```ignore
//! use certext::decoder::Decoder;
//! use certext::encoder::Encoder;
//! use certext_asn1::ASN1Object;
//! use certext_der::Der;
//!
//! // BasicConstraints { cA TRUE }
//! let bytes: &[u8] = &[0x30, 0x03, 0x01, 0x01, 0xff];
//! let der: Der = bytes.decode().unwrap();
//! let obj: ASN1Object = der.decode().unwrap();
//!
//! let der: Der = obj.encode().unwrap();
//! let out: Vec<u8> = der.encode().unwrap();
//! assert_eq!(bytes, out.as_slice());
//! ```

#![forbid(unsafe_code)]

pub mod decoder;
pub mod encoder;
