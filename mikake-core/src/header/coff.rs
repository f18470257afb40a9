use byteorder::{ReadBytesExt, LE};
use goblin::pe::header::{
    COFF_MACHINE_ARM, COFF_MACHINE_ARM64, COFF_MACHINE_ARMNT, COFF_MACHINE_IA64,
    COFF_MACHINE_UNKNOWN, COFF_MACHINE_X86, COFF_MACHINE_X86_64,
};
use serde::Serialize;
use std::fmt;
use std::io;

/// `PE\0\0`.
pub const PE_SIGNATURE: [u8; 4] = *b"PE\0\0";

pub const SIZEOF_SIGNATURE: usize = 4;

pub const SIZEOF_FILE_HEADER: usize = 20;

/// Target machine of an image.
///
/// Codes without a named variant are kept in [`Machine::Other`] so the
/// original value always survives decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Machine {
    Unknown,
    I386,
    Amd64,
    Arm,
    ArmNt,
    Arm64,
    Ia64,
    Other(u16),
}

impl Machine {
    pub fn code(self) -> u16 {
        match self {
            Machine::Unknown => COFF_MACHINE_UNKNOWN,
            Machine::I386 => COFF_MACHINE_X86,
            Machine::Amd64 => COFF_MACHINE_X86_64,
            Machine::Arm => COFF_MACHINE_ARM,
            Machine::ArmNt => COFF_MACHINE_ARMNT,
            Machine::Arm64 => COFF_MACHINE_ARM64,
            Machine::Ia64 => COFF_MACHINE_IA64,
            Machine::Other(code) => code,
        }
    }

    /// Native pointer width in bits, for machines where it is fixed.
    pub fn word_size(self) -> Option<u8> {
        match self {
            Machine::I386 | Machine::Arm | Machine::ArmNt => Some(32),
            Machine::Amd64 | Machine::Arm64 | Machine::Ia64 => Some(64),
            Machine::Unknown | Machine::Other(_) => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Machine::Unknown => "unknown",
            Machine::I386 => "x86 (i386)",
            Machine::Amd64 => "x86_64 (AMD64)",
            Machine::Arm => "ARM",
            Machine::ArmNt => "ARMv7 (Thumb-2)",
            Machine::Arm64 => "aarch64 (ARM64)",
            Machine::Ia64 => "Itanium (IA-64)",
            Machine::Other(_) => "other",
        }
    }
}

impl From<u16> for Machine {
    fn from(code: u16) -> Self {
        match code {
            COFF_MACHINE_UNKNOWN => Machine::Unknown,
            COFF_MACHINE_X86 => Machine::I386,
            COFF_MACHINE_X86_64 => Machine::Amd64,
            COFF_MACHINE_ARM => Machine::Arm,
            COFF_MACHINE_ARMNT => Machine::ArmNt,
            COFF_MACHINE_ARM64 => Machine::Arm64,
            COFF_MACHINE_IA64 => Machine::Ia64,
            other => Machine::Other(other),
        }
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#06x})", self.name(), self.code())
    }
}

/// The COFF file header (`IMAGE_FILE_HEADER`) that follows the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileHeader {
    pub machine: Machine,
    pub number_of_sections: u16,
    /// Seconds since the Unix epoch, as written by the linker.
    pub time_date_stamp: u32,
    pub pointer_to_symbol_table: u32,
    pub number_of_symbols: u32,
    /// Byte size of the optional header; selects its layout.
    pub size_of_optional_header: u16,
    pub characteristics: u16,
}

impl FileHeader {
    pub fn from_reader<R: io::Read>(cur: &mut R) -> io::Result<FileHeader> {
        Ok(FileHeader {
            machine: Machine::from(cur.read_u16::<LE>()?),
            number_of_sections: cur.read_u16::<LE>()?,
            time_date_stamp: cur.read_u32::<LE>()?,
            pointer_to_symbol_table: cur.read_u32::<LE>()?,
            number_of_symbols: cur.read_u32::<LE>()?,
            size_of_optional_header: cur.read_u16::<LE>()?,
            characteristics: cur.read_u16::<LE>()?,
        })
    }
}
