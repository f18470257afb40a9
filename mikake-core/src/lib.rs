pub mod classification;
pub mod decoder;
pub mod error;
pub mod header;
pub mod image;
pub mod parsed;
pub mod source;

pub use classification::*;
pub use decoder::*;
pub use error::*;
pub use header::coff::{FileHeader, Machine};
pub use header::dos::StubHeader;
pub use header::optional::{
    DataDirectory, OptionalHeader, OptionalHeader32, OptionalHeader64, OptionalHeaderKind,
};
pub use header::Header;
pub use image::*;
pub use parsed::*;
pub use source::*;
