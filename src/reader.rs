use std::io::{self, Read};

use crate::error::{Error, Result, StructuralError};
use crate::marker::Marker;

/// Sequential byte source the segment parser consumes.
///
/// Running out of input surfaces as [`StructuralError::UnexpectedEof`].
pub trait JpegRead {
    /// Read the exact number of bytes required to fill buf.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Skip `length` amount of bytes
    fn skip_bytes(&mut self, length: usize) -> Result<()>;

    /// Read a single `u8` value
    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Read a single big endian encoded `u16` value
    fn read_u16_from_be(&mut self) -> Result<u16> {
        let mut buf = [0, 0];
        self.read_exact(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Read the length field of a marker segment. The returned length includes the two bytes
    /// of the field itself.
    fn read_length(&mut self, marker: Marker) -> Result<u16> {
        let length = self.read_u16_from_be()?;

        if length < 2 {
            return Err(Error::Structural(StructuralError::SegmentLength { marker, declared: length, expected: 2 }));
        }

        Ok(length)
    }
}

impl<T: Read> JpegRead for T {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        Ok(Read::read_exact(self, buf)?)
    }

    fn skip_bytes(&mut self, length: usize) -> Result<()> {
        let length = length as u64;
        let to_skip = &mut Read::by_ref(self).take(length);
        let copied = io::copy(to_skip, &mut io::sink())?;
        if copied < length {
            Err(Error::Structural(StructuralError::UnexpectedEof))
        } else {
            Ok(())
        }
    }
}
