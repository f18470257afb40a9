use crate::classification::Classification;
use crate::error::{DecodeError, DecodeResult};
use crate::header::coff::{FileHeader, SIZEOF_FILE_HEADER, SIZEOF_SIGNATURE};
use crate::header::dos::{StubHeader, SIZEOF_STUB_HEADER};
use crate::header::optional::{
    OptionalHeader, OptionalHeader32, OptionalHeader64, OptionalHeaderKind,
};
use crate::header::Header;
use crate::parsed::{ParsedHeader, Signature, ValidationWarning};
use crate::source::ByteSource;
use std::io::{self, Cursor};

/// Progress of a single decode. States are only ever entered in this order;
/// `Failed` absorbs every error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeState {
    Start,
    StubChecked,
    SignatureChecked,
    FileHeaderRead,
    OptionalHeaderResolved,
    Done,
    Failed,
}

/// Decodes the header region of `source`.
pub fn decode<S: ByteSource + ?Sized>(source: &S) -> DecodeResult<ParsedHeader> {
    Decoder::new(source).run()
}

/// One-shot header decoder over a borrowed source.
#[derive(Debug)]
pub struct Decoder<'a, S: ?Sized> {
    source: &'a S,
    state: DecodeState,
    warnings: Vec<ValidationWarning>,
}

impl<'a, S: ByteSource + ?Sized> Decoder<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            state: DecodeState::Start,
            warnings: Vec::new(),
        }
    }

    /// `Start` before the first run, then `Done` or `Failed`.
    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Runs every stage once. Each call starts a fresh decode from `Start`.
    pub fn run(&mut self) -> DecodeResult<ParsedHeader> {
        self.state = DecodeState::Start;
        self.warnings.clear();
        match self.run_stages() {
            Ok(parsed) => {
                self.advance(DecodeState::Done);
                log::info!(
                    "{} {} image for {}, flags [{}]",
                    parsed.optional_header.format_name(),
                    parsed.classification.role(),
                    parsed.file_header.machine,
                    parsed.classification.flag_names().join(" | ")
                );
                Ok(parsed)
            }
            Err(err) => {
                self.advance(DecodeState::Failed);
                log::debug!("decode failed: {err}");
                Err(err)
            }
        }
    }

    fn run_stages(&mut self) -> DecodeResult<ParsedHeader> {
        let (stub, base) = self.locate_stub()?;
        self.advance(DecodeState::StubChecked);

        let signature = self.verify_signature(base)?;
        self.advance(DecodeState::SignatureChecked);

        let file_header = self.read_file_header(base + SIZEOF_SIGNATURE as u64)?;
        self.advance(DecodeState::FileHeaderRead);

        let optional_offset = base + (SIZEOF_SIGNATURE + SIZEOF_FILE_HEADER) as u64;
        let declared_size = file_header.size_of_optional_header;
        let optional_header = match OptionalHeaderKind::from_declared_size(declared_size) {
            Some(OptionalHeaderKind::Pe32) => OptionalHeader::Pe32(
                self.read_layout::<OptionalHeader32>(optional_offset, OptionalHeaderKind::Pe32)?,
            ),
            Some(OptionalHeaderKind::Pe32Plus) => OptionalHeader::Pe32Plus(
                self.read_layout::<OptionalHeader64>(
                    optional_offset,
                    OptionalHeaderKind::Pe32Plus,
                )?,
            ),
            None => {
                log::debug!("declared optional header size {declared_size:#x} matches no layout");
                let partial = self.assemble(
                    stub,
                    base,
                    signature,
                    file_header,
                    OptionalHeader::Absent,
                );
                return Err(DecodeError::UnknownOptionalHeaderLayout {
                    declared_size,
                    partial: Box::new(partial),
                });
            }
        };
        self.advance(DecodeState::OptionalHeaderResolved);

        Ok(self.assemble(stub, base, signature, file_header, optional_header))
    }

    fn advance(&mut self, next: DecodeState) {
        log::debug!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn warn(&mut self, warning: ValidationWarning) {
        log::debug!("validation warning: {warning}");
        self.warnings.push(warning);
    }

    /// Positioned read that maps short data to `Truncated` for the current state.
    fn fill(&self, offset: u64, buf: &mut [u8]) -> DecodeResult<()> {
        let available = self.source.len();
        let wanted = buf.len();
        let truncated = || DecodeError::Truncated {
            state: self.state,
            offset,
            wanted,
            available,
        };

        let fits = offset
            .checked_add(wanted as u64)
            .is_some_and(|end| end <= available);
        if !fits {
            return Err(truncated());
        }

        match self.source.read_at(offset, buf) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(truncated()),
            Err(e) => Err(e.into()),
        }
    }

    fn locate_stub(&mut self) -> DecodeResult<(Option<StubHeader>, u64)> {
        let mut prologue = [0u8; SIZEOF_STUB_HEADER];
        self.fill(0, &mut prologue)?;

        match StubHeader::locate(&prologue)? {
            Some(stub) => {
                log::debug!("stub present, header base {:#x}", stub.e_lfanew);
                let base = stub.header_base();
                Ok((Some(stub), base))
            }
            None => {
                log::debug!("no stub marker, treating as bare object at base 0");
                Ok((None, 0))
            }
        }
    }

    fn verify_signature(&mut self, base: u64) -> DecodeResult<Signature> {
        let mut bytes = [0u8; SIZEOF_SIGNATURE];
        self.fill(base, &mut bytes)?;

        let signature = Signature::check(bytes);
        if !signature.valid {
            self.warn(ValidationWarning::SignatureMismatch { found: bytes });
        }
        Ok(signature)
    }

    fn read_file_header(&mut self, offset: u64) -> DecodeResult<FileHeader> {
        let mut raw = [0u8; SIZEOF_FILE_HEADER];
        self.fill(offset, &mut raw)?;
        Ok(FileHeader::from_reader(&mut Cursor::new(&raw[..]))?)
    }

    fn read_layout<H: Header>(
        &mut self,
        offset: u64,
        layout: OptionalHeaderKind,
    ) -> DecodeResult<H> {
        let mut raw = vec![0u8; usize::from(H::SIZE)];
        self.fill(offset, &mut raw)?;

        let header = H::from_reader(&mut Cursor::new(&raw[..]))?;
        let found = header.magic();
        if found != H::MAGIC {
            self.warn(ValidationWarning::OptionalMagicMismatch {
                layout,
                expected: H::MAGIC,
                found,
            });
        }
        Ok(header)
    }

    fn assemble(
        &mut self,
        stub: Option<StubHeader>,
        base: u64,
        signature: Signature,
        file_header: FileHeader,
        optional_header: OptionalHeader,
    ) -> ParsedHeader {
        ParsedHeader {
            stub,
            base,
            signature,
            classification: Classification::from_characteristics(file_header.characteristics),
            file_header,
            optional_header,
            warnings: std::mem::take(&mut self.warnings),
        }
    }
}
