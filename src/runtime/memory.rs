//! WebAssembly linear memory
//!
//! All access is bounds-checked before touching the underlying bytes; an
//! access that would run past the end traps instead of panicking. Values are
//! stored little-endian.

use byteorder::{ByteOrder, LittleEndian};

use super::RuntimeError;
use crate::parser::module::Limits;

/// WebAssembly page size in bytes (64KiB)
pub const PAGE_SIZE: usize = 65536;

#[derive(Debug)]
pub struct Memory {
    data: Vec<u8>,
    current_pages: u32,
    /// Growth limit: the module's declared maximum, capped by the host
    max_pages: u32,
}

impl Memory {
    /// Allocate a zeroed memory for `limits`. `page_cap` is the host's limit
    /// on top of whatever the module declares. The initial pages are
    /// allocated up front, so `min` pages cost `min * PAGE_SIZE` bytes before
    /// any guest code runs.
    pub fn new(limits: Limits, page_cap: u32) -> Result<Self, RuntimeError> {
        let max_pages = limits.max.map_or(page_cap, |max| max.min(page_cap));
        if limits.min > max_pages {
            return Err(RuntimeError::MemoryError(format!(
                "initial size of {} pages exceeds the limit of {max_pages} pages",
                limits.min
            )));
        }

        let mut data = Vec::new();
        data.try_reserve_exact(limits.min as usize * PAGE_SIZE)
            .map_err(|_| RuntimeError::MemoryError(format!("cannot allocate {} pages", limits.min)))?;
        data.resize(limits.min as usize * PAGE_SIZE, 0);

        Ok(Memory {
            data,
            current_pages: limits.min,
            max_pages,
        })
    }

    /// Current size in pages
    pub fn size(&self) -> u32 {
        self.current_pages
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Grow by `delta_pages`, returning the previous size in pages or -1 if
    /// the memory cannot grow that far.
    pub fn grow(&mut self, delta_pages: u32) -> i32 {
        let previous = self.current_pages;
        let Some(new_pages) = previous.checked_add(delta_pages) else {
            return -1;
        };
        if new_pages > self.max_pages {
            return -1;
        }

        let new_len = new_pages as usize * PAGE_SIZE;
        if self.data.try_reserve_exact(new_len - self.data.len()).is_err() {
            return -1;
        }
        self.data.resize(new_len, 0);
        self.current_pages = new_pages;
        previous as i32
    }

    /// Byte range for an access of `len` bytes at `addr + offset`, computed
    /// without overflow so it can be compared against the memory length.
    fn range(&self, addr: u32, offset: u32, len: usize) -> Result<std::ops::Range<usize>, RuntimeError> {
        let start = u64::from(addr) + u64::from(offset);
        let end = start + len as u64;
        if end > self.data.len() as u64 {
            return Err(RuntimeError::MemoryOutOfBounds);
        }
        Ok(start as usize..end as usize)
    }

    pub fn read(&self, addr: u32, offset: u32, len: usize) -> Result<&[u8], RuntimeError> {
        let range = self.range(addr, offset, len)?;
        Ok(&self.data[range])
    }

    pub fn write(&mut self, addr: u32, offset: u32, bytes: &[u8]) -> Result<(), RuntimeError> {
        let range = self.range(addr, offset, bytes.len())?;
        self.data[range].copy_from_slice(bytes);
        Ok(())
    }

    pub fn read_u32(&self, addr: u32) -> Result<u32, RuntimeError> {
        Ok(LittleEndian::read_u32(self.read(addr, 0, 4)?))
    }

    pub fn write_u32(&mut self, addr: u32, value: u32) -> Result<(), RuntimeError> {
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, value);
        self.write(addr, 0, &buf)
    }

    /// `memory.fill`: the whole range is checked before any byte is written.
    pub fn fill(&mut self, dst: u32, value: u8, len: u32) -> Result<(), RuntimeError> {
        let range = self.range(dst, 0, len as usize)?;
        self.data[range].fill(value);
        Ok(())
    }

    /// `memory.copy`, correct for overlapping ranges.
    pub fn copy(&mut self, dst: u32, src: u32, len: u32) -> Result<(), RuntimeError> {
        let src_range = self.range(src, 0, len as usize)?;
        let dst_range = self.range(dst, 0, len as usize)?;
        self.data.copy_within(src_range, dst_range.start);
        Ok(())
    }
}
