use nom::error::{ErrorKind, ParseError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("parser error {0:?}")]
    Parser(ErrorKind),
    #[error("parser incomplete: {0:?}")]
    ParserIncomplete(nom::Needed),
    #[error("empty input")]
    EmptyInput,
    #[error("indefinite length is not allowed in DER")]
    IndefiniteLength,
    #[error("length is not minimally encoded")]
    NonMinimalLength,
    #[error("length field of {0} octets is too large")]
    LengthTooLarge(usize),
    #[error("tag number is not minimally encoded")]
    NonMinimalTagNumber,
    #[error("tag number does not fit in 32 bits")]
    TagNumberTooLarge,
    #[error("elements nested deeper than {0} levels")]
    NestingTooDeep(usize),
}

impl<'a> ParseError<&'a [u8]> for Error {
    fn from_error_kind(_input: &'a [u8], kind: ErrorKind) -> Self {
        Error::Parser(kind)
    }

    fn append(_input: &'a [u8], _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

impl From<nom::Err<Error>> for Error {
    fn from(err: nom::Err<Error>) -> Self {
        match err {
            nom::Err::Incomplete(needed) => Error::ParserIncomplete(needed),
            nom::Err::Error(e) | nom::Err::Failure(e) => e,
        }
    }
}
