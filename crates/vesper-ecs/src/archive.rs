//! Binary archive used by every `serialize`/`deserialize` in the workspace.
//!
//! Values go through `bincode`'s serde bridge with a fixed-width,
//! little-endian layout: a `u32` is always 4 bytes, a `u64` 8 bytes, strings
//! and vectors are a `u64` length followed by their elements. That keeps the
//! on-disk layout predictable enough to hand-check magic numbers and section
//! boundaries.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::EcsError;

/// Shared bincode configuration for reading and writing.
fn config() -> impl bincode::config::Config {
    bincode::config::standard()
        .with_little_endian()
        .with_fixed_int_encoding()
}

// ---------------------------------------------------------------------------
// ArchiveWriter
// ---------------------------------------------------------------------------

/// Append-only binary sink.
#[derive(Debug, Default)]
pub struct ArchiveWriter {
    buffer: Vec<u8>,
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one value.
    pub fn write<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EcsError> {
        let bytes = bincode::serde::encode_to_vec(value, config())?;
        self.buffer.extend_from_slice(&bytes);
        Ok(())
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

// ---------------------------------------------------------------------------
// ArchiveReader
// ---------------------------------------------------------------------------

/// Cursor over a byte slice produced by an [`ArchiveWriter`].
#[derive(Debug)]
pub struct ArchiveReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ArchiveReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Read the next value.
    ///
    /// Fails with [`EcsError::Decode`] if the remaining bytes are truncated
    /// or do not form a valid `T`.
    pub fn read<T: DeserializeOwned>(&mut self) -> Result<T, EcsError> {
        let (value, consumed) =
            bincode::serde::decode_from_slice::<T, _>(&self.data[self.position..], config())?;
        self.position += consumed;
        Ok(value)
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn is_at_end(&self) -> bool {
        self.remaining() == 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
