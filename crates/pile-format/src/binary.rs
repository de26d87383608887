//! Typed binary primitives for the Pile wire format.
//!
//! All fixed-width integers and floats are big-endian. Varints are signed
//! zigzag LEB128: a 64-bit value `v` is mapped to `(v << 1) ^ (v >> 63)` and
//! the result written as unsigned LEB128, least significant group first.

use crate::error::{PileError, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Strings on the wire are capped at 1 MiB.
pub const MAX_STRING_LEN: i64 = 1 << 20;
/// Raw byte slices on the wire are capped at 16 MiB.
pub const MAX_BYTES_LEN: i64 = 1 << 24;

/// Writes Pile primitives into any byte sink.
pub struct PileWriter<W> {
    out: W,
}

impl<W: Write> PileWriter<W> {
    pub fn new(out: W) -> Self {
        PileWriter { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        Ok(self.out.write_u8(v)?)
    }

    pub fn write_i8(&mut self, v: i8) -> Result<()> {
        Ok(self.out.write_i8(v)?)
    }

    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        Ok(self.out.write_u16::<BigEndian>(v)?)
    }

    pub fn write_i16(&mut self, v: i16) -> Result<()> {
        Ok(self.out.write_i16::<BigEndian>(v)?)
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        Ok(self.out.write_u32::<BigEndian>(v)?)
    }

    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        Ok(self.out.write_i32::<BigEndian>(v)?)
    }

    pub fn write_u64(&mut self, v: u64) -> Result<()> {
        Ok(self.out.write_u64::<BigEndian>(v)?)
    }

    pub fn write_i64(&mut self, v: i64) -> Result<()> {
        Ok(self.out.write_i64::<BigEndian>(v)?)
    }

    pub fn write_f32(&mut self, v: f32) -> Result<()> {
        Ok(self.out.write_f32::<BigEndian>(v)?)
    }

    pub fn write_f64(&mut self, v: f64) -> Result<()> {
        Ok(self.out.write_f64::<BigEndian>(v)?)
    }

    pub fn write_bool(&mut self, v: bool) -> Result<()> {
        self.write_u8(v as u8)
    }

    pub fn write_varint(&mut self, v: i64) -> Result<()> {
        let mut rest = ((v << 1) ^ (v >> 63)) as u64;
        loop {
            let mut byte = (rest & 0x7F) as u8;
            rest >>= 7;
            if rest != 0 {
                byte |= 0x80;
            }
            self.out.write_u8(byte)?;
            if rest == 0 {
                return Ok(());
            }
        }
    }

    pub fn write_string(&mut self, s: &str) -> Result<()> {
        self.write_varint(s.len() as i64)?;
        Ok(self.out.write_all(s.as_bytes())?)
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.write_varint(data.len() as i64)?;
        Ok(self.out.write_all(data)?)
    }
}

/// Reads Pile primitives from any byte stream. Short reads surface as
/// [`PileError::UnexpectedEof`], never as truncated values.
pub struct PileReader<R> {
    input: R,
}

impl<R: Read> PileReader<R> {
    pub fn new(input: R) -> Self {
        PileReader { input }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.input.read_u8()?)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.input.read_i8()?)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.input.read_u16::<BigEndian>()?)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.input.read_i16::<BigEndian>()?)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.input.read_u32::<BigEndian>()?)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.input.read_i32::<BigEndian>()?)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(self.input.read_u64::<BigEndian>()?)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(self.input.read_i64::<BigEndian>()?)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(self.input.read_f32::<BigEndian>()?)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(self.input.read_f64::<BigEndian>()?)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_varint(&mut self) -> Result<i64> {
        let mut raw = 0u64;
        let mut shift = 0u32;
        for group in 0..10 {
            let byte = self.input.read_u8()?;
            // The tenth byte holds the final bit of a 64-bit value.
            if group == 9 && byte > 1 {
                return Err(PileError::InvalidLength("varint overflows 64 bits".into()));
            }
            raw |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(((raw >> 1) as i64) ^ -((raw & 1) as i64));
            }
            shift += 7;
        }
        Err(PileError::InvalidLength("varint is too long".into()))
    }

    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_varint()?;
        if !(0..=MAX_STRING_LEN).contains(&len) {
            return Err(PileError::InvalidLength(format!(
                "string length {} out of range",
                len
            )));
        }
        let mut buf = vec![0u8; len as usize];
        self.input.read_exact(&mut buf)?;
        String::from_utf8(buf)
            .map_err(|_| PileError::InvalidLength("string is not valid UTF-8".into()))
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_varint()?;
        if !(0..=MAX_BYTES_LEN).contains(&len) {
            return Err(PileError::InvalidLength(format!(
                "byte array length {} out of range",
                len
            )));
        }
        let mut buf = vec![0u8; len as usize];
        self.input.read_exact(&mut buf)?;
        Ok(buf)
    }
}
