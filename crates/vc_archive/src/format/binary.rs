//! Packed binary formats.
//!
//! Values are written in call order without names or node markers. Sizes
//! and blob lengths are `u64`, `bool` is one byte, `char` is its `u32` code
//! point and strings are a length followed by UTF-8 bytes.
//!
//! The plain format uses the native byte order. The portable format writes
//! one leading byte recording the writer's order (`1` little, `0` big) and
//! readers swap to match it.

use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;
use std::io::{Read, Write};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{ArchiveKind, Decoder, Encoder, NodeKind, Scalar, ScalarKind};
use crate::error::{Error, Result};

// -----------------------------------------------------------------------------
// Configuration

/// Byte order of multi-byte values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    /// The byte order of the running machine.
    #[inline]
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            Self::Little
        } else {
            Self::Big
        }
    }

    const fn marker(self) -> u8 {
        match self {
            Self::Little => 1,
            Self::Big => 0,
        }
    }

    fn from_marker(marker: u8) -> Result<Self> {
        match marker {
            1 => Ok(Self::Little),
            0 => Ok(Self::Big),
            other => Err(Error::malformed(format_args!(
                "invalid endianness marker {other:#04x}"
            ))),
        }
    }
}

impl Default for Endian {
    fn default() -> Self {
        Self::native()
    }
}

/// Options of the portable binary format.
///
/// ```
/// use vc_archive::format::{Endian, PortableOptions};
///
/// let options = PortableOptions::default().endian(Endian::Big);
/// assert_eq!(options.byte_order, Endian::Big);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortableOptions {
    /// Order used when writing. Readers take the order from the stream.
    pub byte_order: Endian,
}

impl Default for PortableOptions {
    fn default() -> Self {
        Self {
            byte_order: Endian::Little,
        }
    }
}

impl PortableOptions {
    pub fn endian(mut self, byte_order: Endian) -> Self {
        self.byte_order = byte_order;
        self
    }
}

// Dispatches a `byteorder` call on a runtime `Endian`.
macro_rules! ordered {
    ($endian:expr, $io:ident . $method:ident ( $($arg:expr)? )) => {
        match $endian {
            Endian::Little => $io.$method::<LittleEndian>($($arg)?),
            Endian::Big => $io.$method::<BigEndian>($($arg)?),
        }
    };
}

// Upper bound for capacity reserved from an untrusted length.
const MAX_PREALLOC: usize = 4096;

// -----------------------------------------------------------------------------
// BinaryEncoder

/// Writes packed values to a [`Write`] sink as they arrive.
#[derive(Debug)]
pub struct BinaryEncoder<W: Write> {
    writer: W,
    endian: Endian,
}

impl<W: Write> BinaryEncoder<W> {
    /// Native byte order, no header.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            endian: Endian::native(),
        }
    }

    /// Writes the byte order marker immediately.
    pub fn portable(mut writer: W, options: PortableOptions) -> Result<Self> {
        writer.write_u8(options.byte_order.marker())?;
        Ok(Self {
            writer,
            endian: options.byte_order,
        })
    }

    fn write_len(&mut self, len: usize) -> Result<()> {
        let writer = &mut self.writer;
        ordered!(self.endian, writer.write_u64(len as u64))?;
        Ok(())
    }
}

impl<W: Write> Encoder for BinaryEncoder<W> {
    #[inline]
    fn kind(&self) -> ArchiveKind {
        ArchiveKind::Binary
    }

    #[inline]
    fn set_next_name(&mut self, _: Option<&str>) {}

    #[inline]
    fn start_node(&mut self, _: NodeKind) -> Result<()> {
        Ok(())
    }

    #[inline]
    fn finish_node(&mut self) -> Result<()> {
        Ok(())
    }

    fn save_size(&mut self, len: usize) -> Result<()> {
        self.write_len(len)
    }

    fn save_scalar(&mut self, value: Scalar<'_>) -> Result<()> {
        let w = &mut self.writer;
        match value {
            Scalar::Bool(v) => w.write_u8(u8::from(v))?,
            Scalar::I8(v) => w.write_i8(v)?,
            Scalar::U8(v) => w.write_u8(v)?,
            Scalar::I16(v) => ordered!(self.endian, w.write_i16(v))?,
            Scalar::I32(v) => ordered!(self.endian, w.write_i32(v))?,
            Scalar::I64(v) => ordered!(self.endian, w.write_i64(v))?,
            Scalar::U16(v) => ordered!(self.endian, w.write_u16(v))?,
            Scalar::U32(v) => ordered!(self.endian, w.write_u32(v))?,
            Scalar::U64(v) => ordered!(self.endian, w.write_u64(v))?,
            Scalar::F32(v) => ordered!(self.endian, w.write_f32(v))?,
            Scalar::F64(v) => ordered!(self.endian, w.write_f64(v))?,
            Scalar::Char(v) => ordered!(self.endian, w.write_u32(u32::from(v)))?,
            Scalar::Str(s) => return self.save_bytes(s.as_bytes()),
        }
        Ok(())
    }

    fn save_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_len(bytes.len())?;
        self.writer.write_all(bytes)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// BinaryDecoder

/// Reads packed values from a [`Read`] source.
#[derive(Debug)]
pub struct BinaryDecoder<R: Read> {
    reader: R,
    endian: Endian,
}

impl<R: Read> BinaryDecoder<R> {
    /// Native byte order, no header.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            endian: Endian::native(),
        }
    }

    /// Reads the byte order marker immediately.
    pub fn portable(mut reader: R) -> Result<Self> {
        let endian = Endian::from_marker(reader.read_u8()?)?;
        Ok(Self { reader, endian })
    }

    /// The byte order of the stream.
    pub fn endian(&self) -> Endian {
        self.endian
    }

    fn read_len(&mut self) -> Result<usize> {
        let reader = &mut self.reader;
        let len = ordered!(self.endian, reader.read_u64())?;
        usize::try_from(len).map_err(|_| Error::out_of_range("usize", len))
    }
}

impl<R: Read> Decoder for BinaryDecoder<R> {
    #[inline]
    fn kind(&self) -> ArchiveKind {
        ArchiveKind::Binary
    }

    #[inline]
    fn set_next_name(&mut self, _: Option<&str>) {}

    #[inline]
    fn start_node(&mut self) -> Result<()> {
        Ok(())
    }

    #[inline]
    fn finish_node(&mut self) -> Result<()> {
        Ok(())
    }

    fn load_size(&mut self) -> Result<usize> {
        self.read_len()
    }

    fn load_scalar(&mut self, kind: ScalarKind) -> Result<Scalar<'static>> {
        let r = &mut self.reader;
        let value = match kind {
            ScalarKind::Bool => match r.read_u8()? {
                0 => Scalar::Bool(false),
                1 => Scalar::Bool(true),
                other => return Err(Error::mismatch("bool", other)),
            },
            ScalarKind::I8 => Scalar::I8(r.read_i8()?),
            ScalarKind::U8 => Scalar::U8(r.read_u8()?),
            ScalarKind::I16 => Scalar::I16(ordered!(self.endian, r.read_i16())?),
            ScalarKind::I32 => Scalar::I32(ordered!(self.endian, r.read_i32())?),
            ScalarKind::I64 => Scalar::I64(ordered!(self.endian, r.read_i64())?),
            ScalarKind::U16 => Scalar::U16(ordered!(self.endian, r.read_u16())?),
            ScalarKind::U32 => Scalar::U32(ordered!(self.endian, r.read_u32())?),
            ScalarKind::U64 => Scalar::U64(ordered!(self.endian, r.read_u64())?),
            ScalarKind::F32 => Scalar::F32(ordered!(self.endian, r.read_f32())?),
            ScalarKind::F64 => Scalar::F64(ordered!(self.endian, r.read_f64())?),
            ScalarKind::Char => {
                let code = ordered!(self.endian, r.read_u32())?;
                Scalar::Char(char::from_u32(code).ok_or_else(|| Error::mismatch("char", code))?)
            }
            ScalarKind::Str => {
                let bytes = self.load_bytes()?;
                let text = String::from_utf8(bytes).map_err(Error::malformed)?;
                Scalar::Str(Cow::Owned(text))
            }
        };
        Ok(value)
    }

    fn load_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_len()?;
        let mut bytes = Vec::with_capacity(len.min(MAX_PREALLOC));
        let read = (&mut self.reader).take(len as u64).read_to_end(&mut bytes)?;
        if read != len {
            return Err(Error::malformed(format_args!(
                "expected {len} bytes, stream ended after {read}"
            )));
        }
        Ok(bytes)
    }
}

// -----------------------------------------------------------------------------
// Tests
