use crate::classification::Classification;
use crate::error::PolicyError;
use crate::header::coff::{FileHeader, PE_SIGNATURE};
use crate::header::dos::StubHeader;
use crate::header::optional::{OptionalHeader, OptionalHeaderKind};
use serde::Serialize;
use std::fmt;

/// The four bytes found at the header base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Signature {
    pub bytes: [u8; 4],
    pub valid: bool,
}

impl Signature {
    pub fn check(bytes: [u8; 4]) -> Self {
        Signature {
            bytes,
            valid: bytes == PE_SIGNATURE,
        }
    }
}

/// Non-fatal inconsistencies found while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValidationWarning {
    /// The bytes at the header base are not `PE\0\0`.
    SignatureMismatch { found: [u8; 4] },
    /// The layout chosen by size carries another layout's magic.
    OptionalMagicMismatch {
        layout: OptionalHeaderKind,
        expected: u16,
        found: u16,
    },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::SignatureMismatch { found } => {
                write!(f, "signature mismatch: found {found:02x?}, expected \"PE\\0\\0\"")
            }
            ValidationWarning::OptionalMagicMismatch {
                layout,
                expected,
                found,
            } => write!(
                f,
                "optional header magic {found:#x} does not match {layout:?} layout (expected {expected:#x})"
            ),
        }
    }
}

/// How a caller treats validation warnings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strictness {
    /// Any warning rejects the result.
    Strict,
    /// Warnings are logged and the result is kept.
    #[default]
    Warn,
    Ignore,
}

/// Everything decoded from an image's header region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedHeader {
    /// `None` for bare objects without an `MZ` prologue.
    pub stub: Option<StubHeader>,
    /// Absolute offset of the signature.
    pub base: u64,
    pub signature: Signature,
    pub file_header: FileHeader,
    pub optional_header: OptionalHeader,
    pub classification: Classification,
    pub warnings: Vec<ValidationWarning>,
}

impl ParsedHeader {
    pub fn has_stub(&self) -> bool {
        self.stub.is_some()
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn is_64(&self) -> bool {
        self.optional_header.is_64()
    }

    /// Checks the file header's machine against the optional header layout.
    ///
    /// `None` when either side has no known word size; the decoder itself
    /// never applies this check.
    pub fn machine_matches_layout(&self) -> Option<bool> {
        let machine_bits = self.file_header.machine.word_size()?;
        let layout_bits = self.optional_header.kind()?.word_size();
        Some(machine_bits == layout_bits)
    }

    /// Applies a caller's strictness policy to the warnings.
    pub fn enforce(&self, policy: Strictness) -> Result<&Self, PolicyError> {
        match policy {
            Strictness::Strict => match self.warnings.first() {
                Some(first) => Err(PolicyError::Rejected {
                    count: self.warnings.len(),
                    first: first.to_string(),
                }),
                None => Ok(self),
            },
            Strictness::Warn => {
                for warning in &self.warnings {
                    log::warn!("{warning}");
                }
                Ok(self)
            }
            Strictness::Ignore => Ok(self),
        }
    }
}
