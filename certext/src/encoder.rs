//! Encoder trait, the mirror image of [`crate::decoder::Decoder`].
//!
//! `Encoder<T, E>` is implemented on the value type `T` and produces its
//! representation `E`. `E` must opt in with `EncodableTo<T>`.

/// Converts `self` (of type `T`) into its representation `E`.
pub trait Encoder<T, E: EncodableTo<T>> {
    /// The error type returned when encoding fails.
    type Error;

    /// Encodes `self` into type `E`.
    ///
    /// # Errors
    ///
    /// Returns an error if `self` holds a value that has no valid encoding.
    fn encode(&self) -> Result<E, Self::Error>;
}

/// Marker trait: `Self` is a valid encoding target for `T`.
pub trait EncodableTo<T> {}
