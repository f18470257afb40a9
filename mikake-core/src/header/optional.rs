use crate::header::Header;
use byteorder::{ReadBytesExt, LE};
use serde::Serialize;
use std::io;

pub const MAGIC_PE32: u16 = 0x10B;
pub const MAGIC_PE32_PLUS: u16 = 0x20B;

pub const SIZEOF_OPTIONAL_HEADER_32: u16 = 224;
pub const SIZEOF_OPTIONAL_HEADER_64: u16 = 240;

pub const NUMBER_OF_DATA_DIRECTORIES: usize = 16;

/// Conventional names of the data-directory slots, by index.
pub const DATA_DIRECTORY_NAMES: [&str; NUMBER_OF_DATA_DIRECTORIES] = [
    "Export",
    "Import",
    "Resource",
    "Exception",
    "Certificate",
    "Base Relocation",
    "Debug",
    "Architecture",
    "Global Ptr",
    "TLS",
    "Load Config",
    "Bound Import",
    "IAT",
    "Delay Import",
    "CLR Runtime",
    "Reserved",
];

/// One RVA/size pair of the data-directory table. Not followed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DataDirectory {
    pub virtual_address: u32,
    pub size: u32,
}

impl DataDirectory {
    pub fn is_present(&self) -> bool {
        self.virtual_address != 0 || self.size != 0
    }
}

fn read_data_directories<R: io::Read>(
    cur: &mut R,
) -> io::Result<[DataDirectory; NUMBER_OF_DATA_DIRECTORIES]> {
    let mut dirs = [DataDirectory::default(); NUMBER_OF_DATA_DIRECTORIES];
    for dir in dirs.iter_mut() {
        dir.virtual_address = cur.read_u32::<LE>()?;
        dir.size = cur.read_u32::<LE>()?;
    }
    Ok(dirs)
}

pub fn subsystem_name(subsystem: u16) -> &'static str {
    match subsystem {
        1 => "Native",
        2 => "Windows GUI",
        3 => "Windows CUI",
        5 => "OS/2 CUI",
        7 => "POSIX CUI",
        9 => "Windows CE GUI",
        10 => "EFI Application",
        11 => "EFI Boot Service Driver",
        12 => "EFI Runtime Driver",
        13 => "EFI ROM",
        14 => "Xbox",
        16 => "Windows Boot Application",
        _ => "Unknown",
    }
}

/// `IMAGE_OPTIONAL_HEADER32`, the PE32 layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OptionalHeader32 {
    /// Format-magic: `0x10B` for PE32, `0x20B` for PE32+.
    ///
    /// Checked against the layout the declared size selected; a mismatch
    /// is a warning, never a layout switch.
    pub magic: u16,

    /// Major version of the linker that produced the image.
    pub major_linker_version: u8,

    /// Minor version of the linker that produced the image.
    pub minor_linker_version: u8,

    /// Combined size of all code sections.
    pub size_of_code: u32,

    /// Combined size of all initialized data sections.
    pub size_of_initialized_data: u32,

    /// Combined size of all BSS-style sections.
    pub size_of_uninitialized_data: u32,

    /// RVA of the entry point, relative to the image base.
    ///
    /// Zero for most DLLs without an initialization routine.
    pub address_of_entry_point: u32,

    /// RVA of the start of the code section.
    pub base_of_code: u32,

    /// RVA of the start of the data section. Only present in this layout.
    pub base_of_data: u32,

    /// Preferred load address.
    ///
    /// A multiple of 64 KiB; `0x400000` is the usual default for executables.
    pub image_base: u32,

    /// Alignment of sections once loaded, in bytes.
    pub section_alignment: u32,

    /// Alignment of raw section data in the file, in bytes.
    pub file_alignment: u32,

    /// Major version of the required operating system.
    pub major_operating_system_version: u16,

    /// Minor version of the required operating system.
    pub minor_operating_system_version: u16,

    /// Major version of the image itself.
    pub major_image_version: u16,

    /// Minor version of the image itself.
    pub minor_image_version: u16,

    /// Major version of the required subsystem.
    pub major_subsystem_version: u16,

    /// Minor version of the required subsystem.
    pub minor_subsystem_version: u16,

    /// Reserved, must be zero.
    pub win32_version_value: u32,

    /// Size of the loaded image, a multiple of `section_alignment`.
    pub size_of_image: u32,

    /// Combined size of stub, headers and section table, rounded to `file_alignment`.
    pub size_of_headers: u32,

    /// Image checksum; only verified for drivers and boot-time DLLs.
    pub check_sum: u32,

    /// Subsystem required to run the image.
    ///
    /// Common values:
    /// - `2`: Windows GUI
    /// - `3`: Windows console
    /// - `10`: EFI application
    ///
    /// See [`subsystem_name`].
    pub subsystem: u16,

    /// Loader flags such as ASLR (`0x0040`) and NX compatibility (`0x0100`).
    pub dll_characteristics: u16,

    /// Stack size to reserve.
    pub size_of_stack_reserve: u32,

    /// Stack size to commit up front.
    pub size_of_stack_commit: u32,

    /// Local heap size to reserve.
    pub size_of_heap_reserve: u32,

    /// Local heap size to commit up front.
    pub size_of_heap_commit: u32,

    /// Reserved, must be zero.
    pub loader_flags: u32,

    /// Number of meaningful data-directory entries.
    ///
    /// All 16 slots are decoded regardless of this value.
    pub number_of_rva_and_sizes: u32,

    /// The data-directory table, indexed as in [`DATA_DIRECTORY_NAMES`].
    pub data_directories: [DataDirectory; NUMBER_OF_DATA_DIRECTORIES],
}

impl Header for OptionalHeader32 {
    const SIZE: u16 = SIZEOF_OPTIONAL_HEADER_32;
    const MAGIC: u16 = MAGIC_PE32;

    fn from_reader<R: io::Read>(cur: &mut R) -> io::Result<OptionalHeader32> {
        Ok(OptionalHeader32 {
            magic: cur.read_u16::<LE>()?,
            major_linker_version: cur.read_u8()?,
            minor_linker_version: cur.read_u8()?,
            size_of_code: cur.read_u32::<LE>()?,
            size_of_initialized_data: cur.read_u32::<LE>()?,
            size_of_uninitialized_data: cur.read_u32::<LE>()?,
            address_of_entry_point: cur.read_u32::<LE>()?,
            base_of_code: cur.read_u32::<LE>()?,
            base_of_data: cur.read_u32::<LE>()?,
            image_base: cur.read_u32::<LE>()?,
            section_alignment: cur.read_u32::<LE>()?,
            file_alignment: cur.read_u32::<LE>()?,
            major_operating_system_version: cur.read_u16::<LE>()?,
            minor_operating_system_version: cur.read_u16::<LE>()?,
            major_image_version: cur.read_u16::<LE>()?,
            minor_image_version: cur.read_u16::<LE>()?,
            major_subsystem_version: cur.read_u16::<LE>()?,
            minor_subsystem_version: cur.read_u16::<LE>()?,
            win32_version_value: cur.read_u32::<LE>()?,
            size_of_image: cur.read_u32::<LE>()?,
            size_of_headers: cur.read_u32::<LE>()?,
            check_sum: cur.read_u32::<LE>()?,
            subsystem: cur.read_u16::<LE>()?,
            dll_characteristics: cur.read_u16::<LE>()?,
            size_of_stack_reserve: cur.read_u32::<LE>()?,
            size_of_stack_commit: cur.read_u32::<LE>()?,
            size_of_heap_reserve: cur.read_u32::<LE>()?,
            size_of_heap_commit: cur.read_u32::<LE>()?,
            loader_flags: cur.read_u32::<LE>()?,
            number_of_rva_and_sizes: cur.read_u32::<LE>()?,
            data_directories: read_data_directories(cur)?,
        })
    }

    fn magic(&self) -> u16 {
        self.magic
    }

    fn entry_point(&self) -> u64 {
        u64::from(self.address_of_entry_point)
    }

    fn image_base(&self) -> u64 {
        u64::from(self.image_base)
    }

    fn is_64(&self) -> bool {
        false
    }

    fn format_name(&self) -> &'static str {
        "PE32"
    }
}

/// `IMAGE_OPTIONAL_HEADER64`, the PE32+ layout.
///
/// Same fields as [`OptionalHeader32`] minus `base_of_data`, with the image
/// base and the stack/heap sizes widened to 64 bits.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OptionalHeader64 {
    /// Format-magic: `0x10B` for PE32, `0x20B` for PE32+.
    ///
    /// Checked against the layout the declared size selected; a mismatch
    /// is a warning, never a layout switch.
    pub magic: u16,

    /// Major version of the linker that produced the image.
    pub major_linker_version: u8,

    /// Minor version of the linker that produced the image.
    pub minor_linker_version: u8,

    /// Combined size of all code sections.
    pub size_of_code: u32,

    /// Combined size of all initialized data sections.
    pub size_of_initialized_data: u32,

    /// Combined size of all BSS-style sections.
    pub size_of_uninitialized_data: u32,

    /// RVA of the entry point, relative to the image base.
    ///
    /// Zero for most DLLs without an initialization routine.
    pub address_of_entry_point: u32,

    /// RVA of the start of the code section.
    pub base_of_code: u32,

    /// Preferred load address.
    ///
    /// A multiple of 64 KiB; `0x140000000` is the usual default for executables.
    pub image_base: u64,

    /// Alignment of sections once loaded, in bytes.
    pub section_alignment: u32,

    /// Alignment of raw section data in the file, in bytes.
    pub file_alignment: u32,

    /// Major version of the required operating system.
    pub major_operating_system_version: u16,

    /// Minor version of the required operating system.
    pub minor_operating_system_version: u16,

    /// Major version of the image itself.
    pub major_image_version: u16,

    /// Minor version of the image itself.
    pub minor_image_version: u16,

    /// Major version of the required subsystem.
    pub major_subsystem_version: u16,

    /// Minor version of the required subsystem.
    pub minor_subsystem_version: u16,

    /// Reserved, must be zero.
    pub win32_version_value: u32,

    /// Size of the loaded image, a multiple of `section_alignment`.
    pub size_of_image: u32,

    /// Combined size of stub, headers and section table, rounded to `file_alignment`.
    pub size_of_headers: u32,

    /// Image checksum; only verified for drivers and boot-time DLLs.
    pub check_sum: u32,

    /// Subsystem required to run the image.
    ///
    /// Common values:
    /// - `2`: Windows GUI
    /// - `3`: Windows console
    /// - `10`: EFI application
    ///
    /// See [`subsystem_name`].
    pub subsystem: u16,

    /// Loader flags such as ASLR (`0x0040`) and NX compatibility (`0x0100`).
    pub dll_characteristics: u16,

    /// Stack size to reserve.
    pub size_of_stack_reserve: u64,

    /// Stack size to commit up front.
    pub size_of_stack_commit: u64,

    /// Local heap size to reserve.
    pub size_of_heap_reserve: u64,

    /// Local heap size to commit up front.
    pub size_of_heap_commit: u64,

    /// Reserved, must be zero.
    pub loader_flags: u32,

    /// Number of meaningful data-directory entries.
    ///
    /// All 16 slots are decoded regardless of this value.
    pub number_of_rva_and_sizes: u32,

    /// The data-directory table, indexed as in [`DATA_DIRECTORY_NAMES`].
    pub data_directories: [DataDirectory; NUMBER_OF_DATA_DIRECTORIES],
}

impl Header for OptionalHeader64 {
    const SIZE: u16 = SIZEOF_OPTIONAL_HEADER_64;
    const MAGIC: u16 = MAGIC_PE32_PLUS;

    fn from_reader<R: io::Read>(cur: &mut R) -> io::Result<OptionalHeader64> {
        Ok(OptionalHeader64 {
            magic: cur.read_u16::<LE>()?,
            major_linker_version: cur.read_u8()?,
            minor_linker_version: cur.read_u8()?,
            size_of_code: cur.read_u32::<LE>()?,
            size_of_initialized_data: cur.read_u32::<LE>()?,
            size_of_uninitialized_data: cur.read_u32::<LE>()?,
            address_of_entry_point: cur.read_u32::<LE>()?,
            base_of_code: cur.read_u32::<LE>()?,
            image_base: cur.read_u64::<LE>()?,
            section_alignment: cur.read_u32::<LE>()?,
            file_alignment: cur.read_u32::<LE>()?,
            major_operating_system_version: cur.read_u16::<LE>()?,
            minor_operating_system_version: cur.read_u16::<LE>()?,
            major_image_version: cur.read_u16::<LE>()?,
            minor_image_version: cur.read_u16::<LE>()?,
            major_subsystem_version: cur.read_u16::<LE>()?,
            minor_subsystem_version: cur.read_u16::<LE>()?,
            win32_version_value: cur.read_u32::<LE>()?,
            size_of_image: cur.read_u32::<LE>()?,
            size_of_headers: cur.read_u32::<LE>()?,
            check_sum: cur.read_u32::<LE>()?,
            subsystem: cur.read_u16::<LE>()?,
            dll_characteristics: cur.read_u16::<LE>()?,
            size_of_stack_reserve: cur.read_u64::<LE>()?,
            size_of_stack_commit: cur.read_u64::<LE>()?,
            size_of_heap_reserve: cur.read_u64::<LE>()?,
            size_of_heap_commit: cur.read_u64::<LE>()?,
            loader_flags: cur.read_u32::<LE>()?,
            number_of_rva_and_sizes: cur.read_u32::<LE>()?,
            data_directories: read_data_directories(cur)?,
        })
    }

    fn magic(&self) -> u16 {
        self.magic
    }

    fn entry_point(&self) -> u64 {
        u64::from(self.address_of_entry_point)
    }

    fn image_base(&self) -> u64 {
        self.image_base
    }

    fn is_64(&self) -> bool {
        true
    }

    fn format_name(&self) -> &'static str {
        "PE32+"
    }
}

/// Which fixed layout the declared size selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OptionalHeaderKind {
    Pe32,
    Pe32Plus,
}

impl OptionalHeaderKind {
    pub fn from_declared_size(size: u16) -> Option<Self> {
        match size {
            SIZEOF_OPTIONAL_HEADER_32 => Some(OptionalHeaderKind::Pe32),
            SIZEOF_OPTIONAL_HEADER_64 => Some(OptionalHeaderKind::Pe32Plus),
            _ => None,
        }
    }

    pub fn word_size(self) -> u8 {
        match self {
            OptionalHeaderKind::Pe32 => 32,
            OptionalHeaderKind::Pe32Plus => 64,
        }
    }
}

/// The optional header, in whichever layout the file header selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OptionalHeader {
    Pe32(OptionalHeader32),
    Pe32Plus(OptionalHeader64),
    /// Declared size matched no known layout; nothing was read.
    Absent,
}

impl OptionalHeader {
    pub fn kind(&self) -> Option<OptionalHeaderKind> {
        match self {
            OptionalHeader::Pe32(_) => Some(OptionalHeaderKind::Pe32),
            OptionalHeader::Pe32Plus(_) => Some(OptionalHeaderKind::Pe32Plus),
            OptionalHeader::Absent => None,
        }
    }

    fn layout(&self) -> Option<&dyn LayoutView> {
        match self {
            OptionalHeader::Pe32(h) => Some(h as &dyn LayoutView),
            OptionalHeader::Pe32Plus(h) => Some(h as &dyn LayoutView),
            OptionalHeader::Absent => None,
        }
    }

    pub fn magic(&self) -> Option<u16> {
        self.layout().map(|h| h.magic())
    }

    pub fn entry_point(&self) -> Option<u64> {
        self.layout().map(|h| h.entry_point())
    }

    pub fn image_base(&self) -> Option<u64> {
        self.layout().map(|h| h.image_base())
    }

    /// True only for a decoded PE32+ layout.
    pub fn is_64(&self) -> bool {
        self.layout().is_some_and(|h| h.is_64())
    }

    pub fn format_name(&self) -> &'static str {
        self.layout().map_or("absent", |h| h.format_name())
    }

    pub fn data_directories(&self) -> Option<&[DataDirectory; NUMBER_OF_DATA_DIRECTORIES]> {
        match self {
            OptionalHeader::Pe32(h) => Some(&h.data_directories),
            OptionalHeader::Pe32Plus(h) => Some(&h.data_directories),
            OptionalHeader::Absent => None,
        }
    }
}

// Object-safe subset of `Header`, so the enum can hand out either layout.
trait LayoutView {
    fn magic(&self) -> u16;
    fn entry_point(&self) -> u64;
    fn image_base(&self) -> u64;
    fn is_64(&self) -> bool;
    fn format_name(&self) -> &'static str;
}

impl<H: Header> LayoutView for H {
    fn magic(&self) -> u16 {
        Header::magic(self)
    }

    fn entry_point(&self) -> u64 {
        Header::entry_point(self)
    }

    fn image_base(&self) -> u64 {
        Header::image_base(self)
    }

    fn is_64(&self) -> bool {
        Header::is_64(self)
    }

    fn format_name(&self) -> &'static str {
        Header::format_name(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_sizes_match_declared_sizes() {
        // 96 bytes of fields + 16 directories for PE32, 112 + 16 for PE32+.
        let raw32 = vec![0u8; SIZEOF_OPTIONAL_HEADER_32 as usize];
        let mut cur = io::Cursor::new(&raw32[..]);
        OptionalHeader32::from_reader(&mut cur).unwrap();
        assert_eq!(cur.position(), u64::from(SIZEOF_OPTIONAL_HEADER_32));

        let raw64 = vec![0u8; SIZEOF_OPTIONAL_HEADER_64 as usize];
        let mut cur = io::Cursor::new(&raw64[..]);
        OptionalHeader64::from_reader(&mut cur).unwrap();
        assert_eq!(cur.position(), u64::from(SIZEOF_OPTIONAL_HEADER_64));
    }

    #[test]
    fn one_byte_short_fails() {
        let raw = vec![0u8; SIZEOF_OPTIONAL_HEADER_64 as usize - 1];
        let err = OptionalHeader64::from_reader(&mut io::Cursor::new(&raw[..])).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn magics_agree_with_goblin() {
        assert_eq!(MAGIC_PE32, goblin::pe::optional_header::MAGIC_32);
        assert_eq!(MAGIC_PE32_PLUS, goblin::pe::optional_header::MAGIC_64);
    }

    #[test]
    fn wide_fields_are_read_at_full_width() {
        let mut raw = vec![0u8; SIZEOF_OPTIONAL_HEADER_64 as usize];
        raw[0..2].copy_from_slice(&MAGIC_PE32_PLUS.to_le_bytes());
        raw[24..32].copy_from_slice(&0x0000_0001_4000_0000u64.to_le_bytes());
        // Import directory, slot 1.
        raw[112 + 8..112 + 12].copy_from_slice(&0x3000u32.to_le_bytes());
        raw[112 + 12..112 + 16].copy_from_slice(&0x80u32.to_le_bytes());

        let hdr = OptionalHeader64::from_reader(&mut io::Cursor::new(&raw[..])).unwrap();
        assert_eq!(hdr.image_base, 0x1_4000_0000);
        assert!(Header::is_64(&hdr));
        assert_eq!(hdr.data_directories[1].virtual_address, 0x3000);
        assert_eq!(hdr.data_directories[1].size, 0x80);
        assert!(!hdr.data_directories[0].is_present());

        let wrapped = OptionalHeader::Pe32Plus(hdr);
        assert_eq!(wrapped.image_base(), Some(0x1_4000_0000));
        assert_eq!(wrapped.format_name(), "PE32+");
        assert!(wrapped.is_64());
    }

    #[test]
    fn kind_from_declared_size() {
        assert_eq!(
            OptionalHeaderKind::from_declared_size(0xE0),
            Some(OptionalHeaderKind::Pe32)
        );
        assert_eq!(
            OptionalHeaderKind::from_declared_size(0xF0),
            Some(OptionalHeaderKind::Pe32Plus)
        );
        assert_eq!(OptionalHeaderKind::from_declared_size(0), None);
        assert_eq!(OptionalHeader::Absent.kind(), None);
        assert_eq!(OptionalHeader::Absent.magic(), None);
        assert!(!OptionalHeader::Absent.is_64());
    }
}
