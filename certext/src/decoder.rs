//! Decoder trait for type-safe conversions.
//!
//! `Decoder<T, D>` is implemented on the source type `T` and produces a `D`.
//! `D` must opt in with `DecodableFrom<T>`, so a conversion only exists when
//! both sides agree on it.
//!
//! ```no_run
//! use certext::decoder::{DecodableFrom, Decoder};
//!
//! struct Raw(Vec<u8>);
//! struct Flag(bool);
//!
//! #[derive(Debug)]
//! struct BadFlag;
//!
//! impl DecodableFrom<Raw> for Flag {}
//!
//! impl Decoder<Raw, Flag> for Raw {
//!     type Error = BadFlag;
//!
//!     fn decode(&self) -> Result<Flag, Self::Error> {
//!         match self.0.as_slice() {
//!             [0x00] => Ok(Flag(false)),
//!             [0xff] => Ok(Flag(true)),
//!             _ => Err(BadFlag),
//!         }
//!     }
//! }
//! ```

/// Converts `self` (of type `T`) into a `D`.
///
/// When a source type has several `Decoder` implementations the destination
/// is picked by type annotation:
///
/// ```ignore
/// let der: Der = bytes.decode()?;
/// let constraints: BasicConstraintsSyntax = element.decode()?;
/// ```
pub trait Decoder<T, D: DecodableFrom<T>> {
    /// The error type returned when decoding fails.
    type Error;

    /// Decodes `self` into type `D`.
    ///
    /// # Errors
    ///
    /// Returns an error if `self` is not a valid representation of `D`.
    fn decode(&self) -> Result<D, Self::Error>;
}

/// Marker trait: `Self` can be decoded from `T`.
pub trait DecodableFrom<T> {}
