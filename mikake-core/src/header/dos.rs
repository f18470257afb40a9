use byteorder::{ReadBytesExt, LE};
use serde::Serialize;
use std::io;

/// `MZ`, read as a little-endian word.
pub const STUB_MARKER: u16 = 0x5A4D;

/// Size of the legacy header; also the minimum a source must hold.
pub const SIZEOF_STUB_HEADER: usize = 64;

/// Offset of `e_lfanew` inside the legacy header.
pub const HEADER_OFFSET_FIELD: usize = 0x3C;

/// The MS-DOS compatibility header (`IMAGE_DOS_HEADER`) found at the start of
/// every linked image.
///
/// Only `e_magic` and `e_lfanew` matter for locating the PE header; the other
/// fields describe the real-mode stub program and are kept verbatim.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StubHeader {
    /// Marker, `MZ` for a valid stub.
    pub e_magic: u16,
    /// Bytes on the last 512-byte page of the stub program.
    pub e_cblp: u16,
    /// Pages in the stub program.
    pub e_cp: u16,
    /// Real-mode relocation count.
    pub e_crlc: u16,
    /// Header size in 16-byte paragraphs.
    pub e_cparhdr: u16,
    pub e_minalloc: u16,
    pub e_maxalloc: u16,
    pub e_ss: u16,
    pub e_sp: u16,
    pub e_csum: u16,
    pub e_ip: u16,
    pub e_cs: u16,
    /// File offset of the real-mode relocation table.
    pub e_lfarlc: u16,
    pub e_ovno: u16,
    pub e_res: [u16; 4],
    pub e_oemid: u16,
    pub e_oeminfo: u16,
    pub e_res2: [u16; 10],
    /// File offset of the `PE\0\0` signature.
    pub e_lfanew: u32,
}

impl StubHeader {
    pub fn from_reader<R: io::Read>(cur: &mut R) -> io::Result<StubHeader> {
        let e_magic = cur.read_u16::<LE>()?;
        let e_cblp = cur.read_u16::<LE>()?;
        let e_cp = cur.read_u16::<LE>()?;
        let e_crlc = cur.read_u16::<LE>()?;
        let e_cparhdr = cur.read_u16::<LE>()?;
        let e_minalloc = cur.read_u16::<LE>()?;
        let e_maxalloc = cur.read_u16::<LE>()?;
        let e_ss = cur.read_u16::<LE>()?;
        let e_sp = cur.read_u16::<LE>()?;
        let e_csum = cur.read_u16::<LE>()?;
        let e_ip = cur.read_u16::<LE>()?;
        let e_cs = cur.read_u16::<LE>()?;
        let e_lfarlc = cur.read_u16::<LE>()?;
        let e_ovno = cur.read_u16::<LE>()?;
        let mut e_res = [0u16; 4];
        cur.read_u16_into::<LE>(&mut e_res)?;
        let e_oemid = cur.read_u16::<LE>()?;
        let e_oeminfo = cur.read_u16::<LE>()?;
        let mut e_res2 = [0u16; 10];
        cur.read_u16_into::<LE>(&mut e_res2)?;

        Ok(StubHeader {
            e_magic,
            e_cblp,
            e_cp,
            e_crlc,
            e_cparhdr,
            e_minalloc,
            e_maxalloc,
            e_ss,
            e_sp,
            e_csum,
            e_ip,
            e_cs,
            e_lfarlc,
            e_ovno,
            e_res,
            e_oemid,
            e_oeminfo,
            e_res2,
            e_lfanew: cur.read_u32::<LE>()?,
        })
    }

    /// Reads the 64-byte prologue; returns `None` when it does not start with
    /// the `MZ` marker.
    pub fn locate(prologue: &[u8; SIZEOF_STUB_HEADER]) -> io::Result<Option<StubHeader>> {
        if u16::from_le_bytes([prologue[0], prologue[1]]) != STUB_MARKER {
            return Ok(None);
        }
        let stub = Self::from_reader(&mut io::Cursor::new(&prologue[..]))?;
        Ok(Some(stub))
    }

    /// Absolute offset of the signature.
    pub fn header_base(&self) -> u64 {
        u64::from(self.e_lfanew)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prologue(lfanew: u32) -> [u8; SIZEOF_STUB_HEADER] {
        let mut p = [0u8; SIZEOF_STUB_HEADER];
        p[0] = b'M';
        p[1] = b'Z';
        p[2] = 0x90;
        p[HEADER_OFFSET_FIELD..HEADER_OFFSET_FIELD + 4].copy_from_slice(&lfanew.to_le_bytes());
        p
    }

    #[test]
    fn marker_is_mz() {
        assert_eq!(STUB_MARKER.to_le_bytes(), *b"MZ");
        assert_eq!(STUB_MARKER, goblin::pe::header::DOS_MAGIC);
    }

    #[test]
    fn locates_header_offset() {
        let stub = StubHeader::locate(&prologue(0xF8)).unwrap().unwrap();
        assert_eq!(stub.e_magic, STUB_MARKER);
        assert_eq!(stub.e_cblp, 0x90);
        assert_eq!(stub.e_lfanew, 0xF8);
        assert_eq!(stub.header_base(), 0xF8);
    }

    #[test]
    fn missing_marker_means_no_stub() {
        let mut p = prologue(0x80);
        p[0] = b'Z';
        p[1] = b'M';
        assert!(StubHeader::locate(&p).unwrap().is_none());
    }
}
