pub mod coff;
pub mod dos;
pub mod optional;

use std::io;

/// A fixed optional-header layout that the dispatcher can select by size.
pub trait Header: std::fmt::Debug + Send + Sync {
    /// Exact byte size of the layout, as declared in the file header.
    const SIZE: u16;

    /// Format-magic expected in the layout's first word.
    const MAGIC: u16;

    fn from_reader<R: io::Read>(cur: &mut R) -> io::Result<Self>
    where
        Self: Sized;

    /// The magic actually stored in the image.
    fn magic(&self) -> u16;

    /// Returns the RVA of the entry point.
    fn entry_point(&self) -> u64;

    /// Returns the preferred load address, widened to 64 bits.
    fn image_base(&self) -> u64;

    /// Returns true for the PE32+ layout.
    fn is_64(&self) -> bool;

    /// Returns a short human-readable name, e.g. "PE32" or "PE32+".
    fn format_name(&self) -> &'static str;
}
