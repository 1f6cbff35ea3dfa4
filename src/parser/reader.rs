//! Cursor over a WebAssembly binary.
//!
//! All multi-byte integers in the binary format are LEB128 encoded except the
//! header words, and floats are little-endian IEEE 754. Every read is bounds
//! checked and reports [`DecodeError::UnexpectedEof`] rather than panicking.

use byteorder::{ByteOrder, LittleEndian};

use super::DecodeError;

pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Reader<'a> {
        Reader { bytes, pos: 0 }
    }

    // Basic operations --------------------------------------------------------

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn has_at_least(&self, count: usize) -> bool {
        self.remaining() >= count
    }

    pub fn read_byte(&mut self) -> Result<u8, DecodeError> {
        let byte = *self.bytes.get(self.pos).ok_or(DecodeError::UnexpectedEof)?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn peek_byte(&self) -> Result<u8, DecodeError> {
        self.bytes.get(self.pos).copied().ok_or(DecodeError::UnexpectedEof)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if !self.has_at_least(len) {
            return Err(DecodeError::UnexpectedEof);
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Split off the next `len` bytes as an independent reader, used for
    /// sections and function bodies so that overruns are caught at the
    /// boundary instead of bleeding into the next item.
    pub fn sub_reader(&mut self, len: usize) -> Result<Reader<'a>, DecodeError> {
        Ok(Reader::new(self.read_bytes(len)?))
    }

    // Read and interpret types ------------------------------------------------

    /// Fixed-width little-endian u32, only used for the header.
    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_vu32(&mut self) -> Result<u32, DecodeError> {
        let mut result: u32 = 0;
        let mut shift = 0;
        loop {
            let byte = self.read_byte()?;
            if shift == 28 {
                if byte & 0x80 != 0 {
                    return Err(DecodeError::IntegerTooLong);
                }
                if byte & 0x70 != 0 {
                    return Err(DecodeError::IntegerTooLarge);
                }
                return Ok(result | (u32::from(byte) << 28));
            }
            result |= u32::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    pub fn read_vs32(&mut self) -> Result<i32, DecodeError> {
        let mut result: i32 = 0;
        let mut shift = 0;
        loop {
            let byte = self.read_byte()?;
            if shift == 28 {
                if byte & 0x80 != 0 {
                    return Err(DecodeError::IntegerTooLong);
                }
                // bits 3..6 are unused and must repeat the sign bit
                let unused = ((byte << 1) as i8) >> 4;
                if unused != 0 && unused != -1 {
                    return Err(DecodeError::IntegerTooLarge);
                }
                return Ok(result | (i32::from(byte & 0x0f) << 28));
            }
            result |= i32::from(byte & 0x7f) << shift;
            shift += 7;
            if byte & 0x80 == 0 {
                if byte & 0x40 != 0 {
                    result |= !0 << shift;
                }
                return Ok(result);
            }
        }
    }

    pub fn read_vs64(&mut self) -> Result<i64, DecodeError> {
        let mut result: i64 = 0;
        let mut shift = 0;
        loop {
            let byte = self.read_byte()?;
            if shift == 63 {
                if byte & 0x80 != 0 {
                    return Err(DecodeError::IntegerTooLong);
                }
                if byte != 0x00 && byte != 0x7f {
                    return Err(DecodeError::IntegerTooLarge);
                }
                return Ok(result | (i64::from(byte & 0x01) << 63));
            }
            result |= i64::from(byte & 0x7f) << shift;
            shift += 7;
            if byte & 0x80 == 0 {
                if byte & 0x40 != 0 {
                    result |= !0 << shift;
                }
                return Ok(result);
            }
        }
    }

    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        Ok(LittleEndian::read_f32(self.read_bytes(4)?))
    }

    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        Ok(LittleEndian::read_f64(self.read_bytes(8)?))
    }

    /// A length-prefixed UTF-8 name.
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let len = self.read_vu32()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8)
    }

    /// A length-prefixed byte vector.
    pub fn read_u8vec(&mut self) -> Result<Vec<u8>, DecodeError> {
        let len = self.read_vu32()? as usize;
        Ok(self.read_bytes(len)?.to_vec())
    }
}
