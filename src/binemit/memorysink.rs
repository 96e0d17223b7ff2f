//! Code sink that writes binary machine code into contiguous memory.
//!
//! `TargetIsa` is a trait object, so emitting through the `CodeSink` trait costs a virtual call
//! per `put*` call. That is fine for the fixed-size words of a RISC target, and the
//! `MemoryCodeSink` keeps the buffer handling in one place.

use super::{CodeOffset, CodeSink};
use target_lexicon::{Endianness, Triple};

/// A `CodeSink` that writes binary machine code into a growable byte buffer.
///
/// Multi-byte values are written in the byte order of the target.
#[derive(Clone, Debug)]
pub struct MemoryCodeSink {
    data: Vec<u8>,
    endianness: Endianness,
}

impl MemoryCodeSink {
    /// Create a new empty sink writing in `endianness` byte order.
    pub fn new(endianness: Endianness) -> Self {
        Self {
            data: Vec::new(),
            endianness,
        }
    }

    /// Create a new empty sink writing in the byte order of `triple`.
    ///
    /// Targets without a defined byte order get little-endian.
    pub fn for_triple(triple: &Triple) -> Self {
        Self::new(triple.endianness().unwrap_or(Endianness::Little))
    }

    /// Reserve room for at least `size` more bytes.
    pub fn reserve(&mut self, size: CodeOffset) {
        self.data.reserve(size as usize);
    }

    /// The bytes written so far.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the sink, returning the bytes written.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// The byte order of this sink.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }
}

impl CodeSink for MemoryCodeSink {
    fn offset(&self) -> CodeOffset {
        self.data.len() as CodeOffset
    }

    fn put1(&mut self, x: u8) {
        self.data.push(x);
    }

    fn put2(&mut self, x: u16) {
        match self.endianness {
            Endianness::Little => self.data.extend_from_slice(&x.to_le_bytes()),
            Endianness::Big => self.data.extend_from_slice(&x.to_be_bytes()),
        }
    }

    fn put4(&mut self, x: u32) {
        match self.endianness {
            Endianness::Little => self.data.extend_from_slice(&x.to_le_bytes()),
            Endianness::Big => self.data.extend_from_slice(&x.to_be_bytes()),
        }
    }

    fn put8(&mut self, x: u64) {
        match self.endianness {
            Endianness::Little => self.data.extend_from_slice(&x.to_le_bytes()),
            Endianness::Big => self.data.extend_from_slice(&x.to_be_bytes()),
        }
    }
}
