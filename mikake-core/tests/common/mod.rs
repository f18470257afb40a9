//! Synthetic PE header images for the integration tests.
#![allow(dead_code)]

pub const STUB_SIZE: usize = 64;
pub const FILE_HEADER_SIZE: usize = 20;

pub const MACHINE_I386: u16 = 0x014C;
pub const MACHINE_AMD64: u16 = 0x8664;

pub const TIMESTAMP: u32 = 0x5F5E_1000;
pub const SYMBOL_TABLE: u32 = 0x0000_2400;
pub const SYMBOL_COUNT: u32 = 17;
pub const SECTION_COUNT: u16 = 5;

pub const ENTRY_POINT: u32 = 0x1A30;
pub const BASE_OF_CODE: u32 = 0x1000;
pub const BASE_OF_DATA: u32 = 0x5000;
pub const IMAGE_BASE_32: u32 = 0x0040_0000;
pub const IMAGE_BASE_64: u64 = 0x0000_0001_4000_0000;
pub const SIZE_OF_IMAGE: u32 = 0x9000;
pub const SIZE_OF_HEADERS: u32 = 0x400;
pub const SUBSYSTEM_CUI: u16 = 3;
pub const DLL_CHARACTERISTICS: u16 = 0x8160;
pub const STACK_RESERVE: u64 = 0x10_0000;
pub const STACK_COMMIT: u64 = 0x1000;
pub const HEAP_RESERVE: u64 = 0x10_0000;
pub const HEAP_COMMIT: u64 = 0x1000;
pub const IMPORT_RVA: u32 = 0x7000;
pub const IMPORT_SIZE: u32 = 0x50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Pe32,
    Pe32Plus,
}

impl Layout {
    pub fn size(self) -> u16 {
        match self {
            Layout::Pe32 => 224,
            Layout::Pe32Plus => 240,
        }
    }

    pub fn magic(self) -> u16 {
        match self {
            Layout::Pe32 => 0x10B,
            Layout::Pe32Plus => 0x20B,
        }
    }
}

/// Builds a header region: optional `MZ` stub, signature, file header and
/// one optional header layout. Everything past the optional header is left
/// out so tests can reason about exact lengths.
#[derive(Debug, Clone)]
pub struct ImageBuilder {
    pub stub: bool,
    pub header_offset: u32,
    pub signature: [u8; 4],
    pub machine: u16,
    pub characteristics: u16,
    pub layout: Layout,
    pub declared_size: Option<u16>,
    pub magic: Option<u16>,
}

impl ImageBuilder {
    pub fn pe32_plus() -> Self {
        ImageBuilder {
            stub: true,
            header_offset: STUB_SIZE as u32,
            signature: *b"PE\0\0",
            machine: MACHINE_AMD64,
            characteristics: 0x0022,
            layout: Layout::Pe32Plus,
            declared_size: None,
            magic: None,
        }
    }

    pub fn pe32() -> Self {
        ImageBuilder {
            machine: MACHINE_I386,
            characteristics: 0x0102,
            layout: Layout::Pe32,
            ..Self::pe32_plus()
        }
    }

    pub fn bare(mut self) -> Self {
        self.stub = false;
        self
    }

    pub fn header_offset(mut self, offset: u32) -> Self {
        self.header_offset = offset;
        self
    }

    pub fn signature(mut self, signature: [u8; 4]) -> Self {
        self.signature = signature;
        self
    }

    pub fn machine(mut self, machine: u16) -> Self {
        self.machine = machine;
        self
    }

    pub fn characteristics(mut self, characteristics: u16) -> Self {
        self.characteristics = characteristics;
        self
    }

    pub fn declared_size(mut self, size: u16) -> Self {
        self.declared_size = Some(size);
        self
    }

    pub fn magic(mut self, magic: u16) -> Self {
        self.magic = Some(magic);
        self
    }

    /// Absolute offset of the signature in the built image.
    pub fn base(&self) -> usize {
        if self.stub {
            self.header_offset as usize
        } else {
            0
        }
    }

    pub fn file_header_end(&self) -> usize {
        self.base() + 4 + FILE_HEADER_SIZE
    }

    /// Length of the built image.
    pub fn len(&self) -> usize {
        (self.file_header_end() + self.layout.size() as usize).max(STUB_SIZE)
    }

    pub fn build(&self) -> Vec<u8> {
        let mut image = vec![0u8; self.len()];

        if self.stub {
            image[0..2].copy_from_slice(b"MZ");
            put16(&mut image, 0x02, 0x90);
            put16(&mut image, 0x04, 0x03);
            put16(&mut image, 0x08, 0x04);
            put16(&mut image, 0x0C, 0xFFFF);
            put16(&mut image, 0x10, 0xB8);
            put16(&mut image, 0x18, 0x40);
            put32(&mut image, 0x3C, self.header_offset);
        }

        let base = self.base();
        image[base..base + 4].copy_from_slice(&self.signature);

        let fh = base + 4;
        put16(&mut image, fh, self.machine);
        put16(&mut image, fh + 2, SECTION_COUNT);
        put32(&mut image, fh + 4, TIMESTAMP);
        put32(&mut image, fh + 8, SYMBOL_TABLE);
        put32(&mut image, fh + 12, SYMBOL_COUNT);
        put16(
            &mut image,
            fh + 16,
            self.declared_size.unwrap_or(self.layout.size()),
        );
        put16(&mut image, fh + 18, self.characteristics);

        let oh = self.file_header_end();
        put16(&mut image, oh, self.magic.unwrap_or(self.layout.magic()));
        image[oh + 2] = 14;
        image[oh + 3] = 29;
        put32(&mut image, oh + 4, 0x3000);
        put32(&mut image, oh + 8, 0x2000);
        put32(&mut image, oh + 12, 0);
        put32(&mut image, oh + 16, ENTRY_POINT);
        put32(&mut image, oh + 20, BASE_OF_CODE);

        // Fields from here on sit at the same offsets in both layouts up to
        // the stack/heap sizes.
        let dirs = match self.layout {
            Layout::Pe32 => {
                put32(&mut image, oh + 24, BASE_OF_DATA);
                put32(&mut image, oh + 28, IMAGE_BASE_32);
                96
            }
            Layout::Pe32Plus => {
                put64(&mut image, oh + 24, IMAGE_BASE_64);
                112
            }
        };
        put32(&mut image, oh + 32, 0x1000);
        put32(&mut image, oh + 36, 0x200);
        put16(&mut image, oh + 40, 6);
        put16(&mut image, oh + 42, 0);
        put16(&mut image, oh + 44, 1);
        put16(&mut image, oh + 46, 2);
        put16(&mut image, oh + 48, 6);
        put16(&mut image, oh + 50, 1);
        put32(&mut image, oh + 56, SIZE_OF_IMAGE);
        put32(&mut image, oh + 60, SIZE_OF_HEADERS);
        put32(&mut image, oh + 64, 0xDEAD);
        put16(&mut image, oh + 68, SUBSYSTEM_CUI);
        put16(&mut image, oh + 70, DLL_CHARACTERISTICS);
        match self.layout {
            Layout::Pe32 => {
                put32(&mut image, oh + 72, STACK_RESERVE as u32);
                put32(&mut image, oh + 76, STACK_COMMIT as u32);
                put32(&mut image, oh + 80, HEAP_RESERVE as u32);
                put32(&mut image, oh + 84, HEAP_COMMIT as u32);
                put32(&mut image, oh + 92, 16);
            }
            Layout::Pe32Plus => {
                put64(&mut image, oh + 72, STACK_RESERVE);
                put64(&mut image, oh + 80, STACK_COMMIT);
                put64(&mut image, oh + 88, HEAP_RESERVE);
                put64(&mut image, oh + 96, HEAP_COMMIT);
                put32(&mut image, oh + 108, 16);
            }
        }
        // Import directory, slot 1.
        put32(&mut image, oh + dirs + 8, IMPORT_RVA);
        put32(&mut image, oh + dirs + 12, IMPORT_SIZE);

        image
    }
}

fn put16(image: &mut [u8], at: usize, value: u16) {
    image[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

fn put32(image: &mut [u8], at: usize, value: u32) {
    image[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn put64(image: &mut [u8], at: usize, value: u64) {
    image[at..at + 8].copy_from_slice(&value.to_le_bytes());
}
