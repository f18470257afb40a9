use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Mutex;

/// Random-access, read-only view of the bytes being decoded.
///
/// Every read is positioned: implementations must not let one call's cursor
/// leak into another, so a single source can serve concurrent decodes.
pub trait ByteSource {
    /// Total number of bytes the source can serve.
    fn len(&self) -> u64;

    /// Fills `buf` with the bytes starting at absolute `offset`.
    ///
    /// Short data is reported as [`io::ErrorKind::UnexpectedEof`].
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ByteSource for [u8] {
    fn len(&self) -> u64 {
        <[u8]>::len(self) as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let start = usize::try_from(offset).map_err(|_| eof(offset, buf.len()))?;
        let end = start
            .checked_add(buf.len())
            .ok_or_else(|| eof(offset, buf.len()))?;
        let bytes = self.get(start..end).ok_or_else(|| eof(offset, buf.len()))?;
        buf.copy_from_slice(bytes);
        Ok(())
    }
}

impl ByteSource for Vec<u8> {
    fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.as_slice().read_at(offset, buf)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &S {
    fn len(&self) -> u64 {
        (**self).len()
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        (**self).read_at(offset, buf)
    }
}

fn eof(offset: u64, wanted: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("{wanted} bytes at {offset:#x} out of range"),
    )
}

/// Adapts any seekable reader (typically a `File`) into a [`ByteSource`].
///
/// The reader sits behind a mutex; each read seeks to its own offset while
/// holding the lock.
#[derive(Debug)]
pub struct ReaderSource<R> {
    inner: Mutex<R>,
    len: u64,
}

impl<R: Read + Seek> ReaderSource<R> {
    pub fn new(mut reader: R) -> io::Result<Self> {
        let len = reader.seek(SeekFrom::End(0))?;
        Ok(Self {
            inner: Mutex::new(reader),
            len,
        })
    }
}

impl<R: Read + Seek> ByteSource for ReaderSource<R> {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let mut reader = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "reader lock poisoned"))?;
        reader.seek(SeekFrom::Start(offset))?;
        reader.read_exact(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn slice_reads_are_positioned() {
        let data: &[u8] = &[1, 2, 3, 4, 5];
        let mut buf = [0u8; 2];
        data.read_at(3, &mut buf).unwrap();
        assert_eq!(buf, [4, 5]);
        data.read_at(0, &mut buf).unwrap();
        assert_eq!(buf, [1, 2]);
    }

    #[test]
    fn slice_reports_eof_past_end() {
        let data = vec![0u8; 4];
        let mut buf = [0u8; 2];
        let err = data.read_at(3, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        let err = data.read_at(u64::MAX, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn reader_source_matches_slice() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        let source = ReaderSource::new(Cursor::new(bytes.clone())).unwrap();
        assert_eq!(ByteSource::len(&source), 256);

        let mut a = [0u8; 8];
        let mut b = [0u8; 8];
        source.read_at(0x40, &mut a).unwrap();
        bytes.read_at(0x40, &mut b).unwrap();
        assert_eq!(a, b);

        let err = source.read_at(250, &mut a).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
