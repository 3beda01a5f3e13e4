//! Zero-copy typed views over guest linear memory.
//!
//! A `MemoryView` borrows the memory bytes it reads, so it cannot outlive the
//! store borrow it was built from. Anything that may grow memory needs a
//! mutable borrow of the store, which means a view can never be held across a
//! growth: callers build a fresh one for every read.
//!
//! Elements are decoded little-endian on access. Offsets are always in bytes
//! and need not be aligned to the element width.

use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Range;

use tracing::warn;

use crate::error::HostError;
use crate::numeric::{as_signed_32, as_signed_64, format_f32, format_f64};

/// A fixed-width number that can be read from linear memory.
pub trait Element: Copy + Send + Sync + 'static {
    /// Width in bytes.
    const SIZE: usize;
    /// Short type name, used for import names (`log_mem_as_{NAME}`).
    const NAME: &'static str;

    /// Decode from exactly `SIZE` little-endian bytes.
    fn read_le(bytes: &[u8]) -> Self;

    /// Encode into exactly `SIZE` little-endian bytes.
    fn write_le(self, out: &mut [u8]);

    /// Render the way the host console prints this value.
    fn render(self) -> String;
}

macro_rules! int_element {
    ($($ty:ty => $name:literal),* $(,)?) => {$(
        impl Element for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();
            const NAME: &'static str = $name;

            fn read_le(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                buf.copy_from_slice(bytes);
                <$ty>::from_le_bytes(buf)
            }

            fn write_le(self, out: &mut [u8]) {
                out.copy_from_slice(&self.to_le_bytes());
            }

            fn render(self) -> String {
                self.to_string()
            }
        }
    )*};
}

int_element!(i8 => "i8", u8 => "u8", i16 => "i16", u16 => "u16", u32 => "u32", u64 => "u64");

// Signed 32/64-bit elements decode their unsigned bit pattern and reinterpret.
impl Element for i32 {
    const SIZE: usize = 4;
    const NAME: &'static str = "i32";

    fn read_le(bytes: &[u8]) -> Self {
        as_signed_32(u32::read_le(bytes))
    }

    fn write_le(self, out: &mut [u8]) {
        out.copy_from_slice(&self.to_le_bytes());
    }

    fn render(self) -> String {
        self.to_string()
    }
}

impl Element for i64 {
    const SIZE: usize = 8;
    const NAME: &'static str = "i64";

    fn read_le(bytes: &[u8]) -> Self {
        as_signed_64(u64::read_le(bytes))
    }

    fn write_le(self, out: &mut [u8]) {
        out.copy_from_slice(&self.to_le_bytes());
    }

    fn render(self) -> String {
        self.to_string()
    }
}

impl Element for f32 {
    const SIZE: usize = 4;
    const NAME: &'static str = "f32";

    fn read_le(bytes: &[u8]) -> Self {
        f32::from_bits(u32::read_le(bytes))
    }

    fn write_le(self, out: &mut [u8]) {
        self.to_bits().write_le(out);
    }

    fn render(self) -> String {
        format_f32(self)
    }
}

impl Element for f64 {
    const SIZE: usize = 8;
    const NAME: &'static str = "f64";

    fn read_le(bytes: &[u8]) -> Self {
        f64::from_bits(u64::read_le(bytes))
    }

    fn write_le(self, out: &mut [u8]) {
        self.to_bits().write_le(out);
    }

    fn render(self) -> String {
        format_f64(self)
    }
}

/// Check that `[byte_offset, byte_offset + byte_len)` fits in memory.
///
/// Out-of-range requests emit a warning before failing.
pub fn byte_range(
    memory_size: usize,
    byte_offset: u32,
    byte_len: u64,
) -> Result<Range<usize>, HostError> {
    let start = u64::from(byte_offset);
    match start.checked_add(byte_len) {
        Some(end) if end <= memory_size as u64 => Ok(start as usize..end as usize),
        _ => {
            warn!(
                byte_offset,
                byte_len, memory_size, "memory view outside linear memory bounds"
            );
            Err(HostError::out_of_bounds(start, byte_len, memory_size))
        }
    }
}

/// A typed, non-owning window of `len` elements of `T`.
#[derive(Clone, Copy)]
pub struct MemoryView<'a, T> {
    bytes: &'a [u8],
    _element: PhantomData<T>,
}

impl<'a, T: Element> MemoryView<'a, T> {
    /// View `length` elements starting `byte_offset` bytes into `memory`.
    pub fn new(memory: &'a [u8], byte_offset: u32, length: u32) -> Result<Self, HostError> {
        let byte_len = u64::from(length) * T::SIZE as u64;
        let range = byte_range(memory.len(), byte_offset, byte_len)?;
        Ok(Self {
            bytes: &memory[range],
            _element: PhantomData,
        })
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.bytes.len() / T::SIZE
    }

    /// Returns true if the view has no elements.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Element at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<T> {
        let start = index.checked_mul(T::SIZE)?;
        let bytes = self.bytes.get(start..start.checked_add(T::SIZE)?)?;
        Some(T::read_le(bytes))
    }

    /// Iterate the elements, decoding each on demand.
    pub fn iter(&self) -> impl Iterator<Item = T> + 'a {
        self.bytes.chunks_exact(T::SIZE).map(T::read_le)
    }

    /// Copy the elements out.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}

impl<T: Element> fmt::Display for MemoryView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, value) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&value.render())?;
        }
        f.write_str("]")
    }
}

impl<T: Element> fmt::Debug for MemoryView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemoryView<{}>({}) {}", T::NAME, self.len(), self)
    }
}

/// Decode `length` bytes at `byte_offset` as UTF-8.
///
/// Invalid sequences become U+FFFD. Valid text is borrowed, not copied.
pub fn read_utf8(memory: &[u8], byte_offset: u32, length: u32) -> Result<Cow<'_, str>, HostError> {
    let range = byte_range(memory.len(), byte_offset, u64::from(length))?;
    Ok(String::from_utf8_lossy(&memory[range]))
}

/// Outcome of encoding text into a fixed-size memory buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Utf8Write {
    /// Characters (Unicode scalar values) written.
    pub chars_written: usize,
    /// Bytes written.
    pub bytes_written: usize,
    /// Characters in the input text.
    pub chars_total: usize,
}

impl Utf8Write {
    /// Returns true if the buffer could not hold the whole text.
    pub fn is_truncated(&self) -> bool {
        self.chars_written < self.chars_total
    }
}

/// Encode `text` into the `buffer_len`-byte buffer at `byte_offset`.
///
/// Writes the longest prefix of whole characters that fits; a character is
/// never split. Bytes of the buffer past the written prefix are untouched.
pub fn write_utf8(
    memory: &mut [u8],
    byte_offset: u32,
    buffer_len: u32,
    text: &str,
) -> Result<Utf8Write, HostError> {
    let range = byte_range(memory.len(), byte_offset, u64::from(buffer_len))?;
    let capacity = range.len();

    let mut bytes_written = 0;
    let mut chars_written = 0;
    for (idx, ch) in text.char_indices() {
        let next = idx + ch.len_utf8();
        if next > capacity {
            break;
        }
        bytes_written = next;
        chars_written += 1;
    }

    memory[range.start..range.start + bytes_written]
        .copy_from_slice(&text.as_bytes()[..bytes_written]);

    Ok(Utf8Write {
        chars_written,
        bytes_written,
        chars_total: text.chars().count(),
    })
}

/// Encode `values` little-endian starting at `byte_offset`.
pub fn write_elements<T: Element>(
    memory: &mut [u8],
    byte_offset: u32,
    values: &[T],
) -> Result<(), HostError> {
    let byte_len = (values.len() as u64).saturating_mul(T::SIZE as u64);
    let range = byte_range(memory.len(), byte_offset, byte_len)?;
    for (chunk, value) in memory[range].chunks_exact_mut(T::SIZE).zip(values) {
        value.write_le(chunk);
    }
    Ok(())
}
