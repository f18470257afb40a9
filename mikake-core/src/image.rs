use crate::decoder::decode;
use crate::parsed::ParsedHeader;
use crate::source::ReaderSource;
use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;

/// A PE file on disk together with its decoded header region.
#[derive(Debug)]
pub struct PeImage {
    pub path: String,
    pub file_size: u64,
    pub header: ParsedHeader,
}

impl PeImage {
    /// Opens `path` and decodes its headers. Only the header region is read.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let source = ReaderSource::new(file)?;
        let file_size = crate::source::ByteSource::len(&source);
        log::debug!("{} is {} bytes", path.display(), file_size);

        let header = decode(&source)
            .with_context(|| format!("decoding headers of {}", path.display()))?;

        Ok(Self {
            path: path.display().to_string(),
            file_size,
            header,
        })
    }

    pub fn entry_point(&self) -> Option<u64> {
        self.header.optional_header.entry_point()
    }
}
