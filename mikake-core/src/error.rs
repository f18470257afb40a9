use crate::decoder::DecodeState;
use crate::parsed::ParsedHeader;
use thiserror::Error;

/// Fatal outcomes of a decode attempt.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The source ended before a stage could read its record.
    #[error(
        "truncated input in state {state:?}: wanted {wanted} bytes at {offset:#x}, source holds {available}"
    )]
    Truncated {
        state: DecodeState,
        offset: u64,
        wanted: usize,
        available: u64,
    },

    /// The file header declared an optional header size matching neither layout.
    ///
    /// `partial` carries everything decoded up to that point; its optional
    /// header is [`crate::OptionalHeader::Absent`].
    #[error("unknown optional header layout: declared size {declared_size:#x}")]
    UnknownOptionalHeaderLayout {
        declared_size: u16,
        partial: Box<ParsedHeader>,
    },

    /// The byte source failed for a reason other than running out of data.
    #[error("I/O error while reading source: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    /// The partially decoded header, if the error kept one.
    pub fn partial(&self) -> Option<&ParsedHeader> {
        match self {
            DecodeError::UnknownOptionalHeaderLayout { partial, .. } => Some(partial.as_ref()),
            _ => None,
        }
    }
}

/// Raised by [`ParsedHeader::enforce`] when a strict caller rejects a result.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PolicyError {
    #[error("{count} validation warning(s) rejected under strict policy, first: {first}")]
    Rejected { count: usize, first: String },
}

pub type DecodeResult<T> = Result<T, DecodeError>;
