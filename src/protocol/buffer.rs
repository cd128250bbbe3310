//! Fixed-size byte buffer used to marshal Lorax commands and handshake blocks.
//!
//! The buffer never grows. Every access is bounds-checked against its size and
//! fails with [`Error::OutOfRange`] instead of panicking or truncating silently.

use crate::error::{Error, Result};

/// A fixed-capacity byte container with little-endian integer and text codecs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ByteBuffer {
    data: Vec<u8>,
}

impl ByteBuffer {
    /// Create a zero-filled buffer of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
        }
    }

    /// Create a buffer holding a copy of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            data: bytes.to_vec(),
        }
    }

    /// Size of the buffer in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the buffer has zero size.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the buffer contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer and return its contents.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    fn check_range(&self, offset: usize, width: usize) -> Result<()> {
        match offset.checked_add(width) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(Error::OutOfRange {
                offset,
                width,
                size: self.data.len(),
            }),
        }
    }

    fn check_width(width: usize) -> Result<()> {
        if (1..=4).contains(&width) {
            Ok(())
        } else {
            Err(Error::InvalidParameter {
                name: "width".to_string(),
                value: width.to_string(),
            })
        }
    }

    /// Read an unsigned little-endian integer of `width` bytes (1 to 4).
    pub fn read_uint_le(&self, offset: usize, width: usize) -> Result<u32> {
        Self::check_width(width)?;
        self.check_range(offset, width)?;

        let value = self.data[offset..offset + width]
            .iter()
            .rev()
            .fold(0u32, |acc, &byte| (acc << 8) | byte as u32);

        Ok(value)
    }

    /// Read a single byte.
    pub fn read_u8(&self, offset: usize) -> Result<u8> {
        self.read_uint_le(offset, 1).map(|v| v as u8)
    }

    /// Read a little-endian `u16`.
    pub fn read_u16_le(&self, offset: usize) -> Result<u16> {
        self.read_uint_le(offset, 2).map(|v| v as u16)
    }

    /// Read a little-endian `u32`.
    pub fn read_u32_le(&self, offset: usize) -> Result<u32> {
        self.read_uint_le(offset, 4)
    }

    /// Write `value` as an unsigned little-endian integer of `width` bytes.
    ///
    /// Returns the offset just past the written bytes.
    pub fn write_uint_le(&mut self, value: u32, offset: usize, width: usize) -> Result<usize> {
        Self::check_width(width)?;
        self.check_range(offset, width)?;

        if width < 4 && value >> (width * 8) != 0 {
            return Err(Error::InvalidParameter {
                name: format!("u{}", width * 8),
                value: value.to_string(),
            });
        }

        let bytes = value.to_le_bytes();
        self.data[offset..offset + width].copy_from_slice(&bytes[..width]);

        Ok(offset + width)
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, value: u8, offset: usize) -> Result<usize> {
        self.write_uint_le(value as u32, offset, 1)
    }

    /// Write a little-endian `u16`.
    pub fn write_u16_le(&mut self, value: u16, offset: usize) -> Result<usize> {
        self.write_uint_le(value as u32, offset, 2)
    }

    /// Write a little-endian `u32`.
    pub fn write_u32_le(&mut self, value: u32, offset: usize) -> Result<usize> {
        self.write_uint_le(value, offset, 4)
    }

    /// Copy the `start..end` range into a new buffer.
    pub fn slice(&self, start: usize, end: usize) -> Result<ByteBuffer> {
        if start > end {
            return Err(Error::OutOfRange {
                offset: start,
                width: 0,
                size: self.data.len(),
            });
        }
        self.check_range(start, end - start)?;

        Ok(Self::from_bytes(&self.data[start..end]))
    }

    /// Set every byte in `start..end` to `value`.
    pub fn fill(&mut self, value: u8, start: usize, end: usize) -> Result<()> {
        if start > end {
            return Err(Error::OutOfRange {
                offset: start,
                width: 0,
                size: self.data.len(),
            });
        }
        self.check_range(start, end - start)?;

        self.data[start..end].fill(value);
        Ok(())
    }

    /// Find the first offset at or after `from` where `needle` occurs.
    pub fn index_of(&self, needle: &[u8], from: usize) -> Option<usize> {
        if needle.is_empty() || from >= self.data.len() {
            return None;
        }

        self.data[from..]
            .windows(needle.len())
            .position(|window| window == needle)
            .map(|pos| pos + from)
    }

    /// Decode `start..end` as UTF-8, replacing invalid sequences.
    pub fn to_string_lossy(&self, start: usize, end: usize) -> Result<String> {
        let range = self.slice(start, end)?;
        Ok(String::from_utf8_lossy(range.as_bytes()).into_owned())
    }

    /// Write single-byte text at `offset`, clipped to `max_len` and to the room left.
    ///
    /// Returns the number of bytes actually written. Text containing any character
    /// that encodes to more than one byte is rejected with
    /// [`Error::UnsupportedEncoding`] and nothing is written.
    pub fn write_str(&mut self, text: &str, offset: usize, max_len: Option<usize>) -> Result<usize> {
        if !text.is_ascii() {
            return Err(Error::UnsupportedEncoding {
                text: text.to_string(),
            });
        }
        if offset > self.data.len() {
            return Err(Error::OutOfRange {
                offset,
                width: 0,
                size: self.data.len(),
            });
        }

        let room = self.data.len() - offset;
        let count = text.len().min(room).min(max_len.unwrap_or(room));
        self.data[offset..offset + count].copy_from_slice(&text.as_bytes()[..count]);

        Ok(count)
    }

    /// Copy `bytes` into the buffer at `offset`, clipped to the room left.
    ///
    /// Returns the number of bytes copied.
    pub fn write_bytes(&mut self, bytes: &[u8], offset: usize) -> Result<usize> {
        if offset > self.data.len() {
            return Err(Error::OutOfRange {
                offset,
                width: bytes.len(),
                size: self.data.len(),
            });
        }

        let count = bytes.len().min(self.data.len() - offset);
        self.data[offset..offset + count].copy_from_slice(&bytes[..count]);

        Ok(count)
    }

    /// Copy `source_start..source_end` of this buffer into `target` at `target_start`.
    ///
    /// The copy is clipped to the room left in `target`; returns the bytes copied.
    pub fn copy_to(
        &self,
        target: &mut ByteBuffer,
        target_start: usize,
        source_start: usize,
        source_end: usize,
    ) -> Result<usize> {
        let source = self.slice(source_start, source_end)?;
        target.write_bytes(source.as_bytes(), target_start)
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl From<&[u8]> for ByteBuffer {
    fn from(data: &[u8]) -> Self {
        Self::from_bytes(data)
    }
}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_is_zero_filled() {
        let buffer = ByteBuffer::new(6);
        assert_eq!(buffer.len(), 6);
        assert!(buffer.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_from_bytes_copies() {
        let source = vec![1, 2, 3];
        let mut buffer = ByteBuffer::from_bytes(&source);
        buffer.write_u8(9, 0).unwrap();
        assert_eq!(source, vec![1, 2, 3]);
        assert_eq!(buffer.as_bytes(), &[9, 2, 3]);
    }

    #[test]
    fn test_little_endian_layout() {
        let mut buffer = ByteBuffer::new(7);
        let next = buffer.write_u16_le(0x0105, 0).unwrap();
        assert_eq!(next, 2);
        buffer.write_u8(0x10, 2).unwrap();
        buffer.write_u32_le(0xDEAD_BEEF, 3).unwrap();
        assert_eq!(
            buffer.as_bytes(),
            &[0x05, 0x01, 0x10, 0xEF, 0xBE, 0xAD, 0xDE]
        );
        assert_eq!(buffer.read_u16_le(0).unwrap(), 0x0105);
        assert_eq!(buffer.read_u32_le(3).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn test_out_of_range_access() {
        let mut buffer = ByteBuffer::new(4);
        assert!(matches!(
            buffer.read_u32_le(1),
            Err(Error::OutOfRange {
                offset: 1,
                width: 4,
                size: 4
            })
        ));
        assert!(buffer.write_u16_le(1, 3).is_err());
        assert!(buffer.read_u8(4).is_err());
        assert!(buffer.read_u8(usize::MAX).is_err());
    }

    #[test]
    fn test_value_too_wide_for_width() {
        let mut buffer = ByteBuffer::new(2);
        assert!(buffer.write_uint_le(0x1_0000, 0, 2).is_err());
        assert!(buffer.write_uint_le(256, 0, 1).is_err());
        assert_eq!(buffer.as_bytes(), &[0, 0]);
    }

    #[test]
    fn test_unsupported_width() {
        let buffer = ByteBuffer::new(8);
        assert!(buffer.read_uint_le(0, 0).is_err());
        assert!(buffer.read_uint_le(0, 5).is_err());
    }

    #[test]
    fn test_slice_and_fill() {
        let mut buffer = ByteBuffer::from_bytes(&[1, 2, 3, 4, 5]);
        let slice = buffer.slice(1, 4).unwrap();
        assert_eq!(slice.as_bytes(), &[2, 3, 4]);

        buffer.fill(0xAA, 3, 5).unwrap();
        assert_eq!(buffer.as_bytes(), &[1, 2, 3, 0xAA, 0xAA]);
        assert_eq!(slice.as_bytes(), &[2, 3, 4]);

        assert!(buffer.slice(3, 6).is_err());
        assert!(buffer.slice(4, 2).is_err());
        assert!(buffer.fill(0, 0, 6).is_err());
    }

    #[test]
    fn test_index_of() {
        let buffer = ByteBuffer::from_bytes(b"/u/app/hc/0/name\0rest");
        assert_eq!(buffer.index_of(&[0], 0), Some(16));
        assert_eq!(buffer.index_of(b"hc", 0), Some(7));
        assert_eq!(buffer.index_of(b"hc", 8), None);
        assert_eq!(buffer.index_of(b"zz", 0), None);
        assert_eq!(buffer.index_of(b"", 0), None);
    }

    #[test]
    fn test_to_string_lossy_replaces_invalid() {
        let buffer = ByteBuffer::from_bytes(&[b'O', b'K', 0xFF, b'!']);
        assert_eq!(buffer.to_string_lossy(0, 2).unwrap(), "OK");
        assert_eq!(buffer.to_string_lossy(0, 4).unwrap(), "OK\u{FFFD}!");
    }

    #[test]
    fn test_write_str_clips_to_room() {
        let mut buffer = ByteBuffer::new(6);
        let written = buffer.write_str("PEAK PRO", 2, None).unwrap();
        assert_eq!(written, 4);
        assert_eq!(buffer.as_bytes(), b"\0\0PEAK");
    }

    #[test]
    fn test_write_str_clips_to_max_len() {
        let mut buffer = ByteBuffer::new(10);
        let written = buffer.write_str("SESSION", 0, Some(3)).unwrap();
        assert_eq!(written, 3);
        assert_eq!(&buffer.as_bytes()[..4], b"SES\0");
    }

    #[test]
    fn test_write_str_rejects_multibyte() {
        let mut buffer = ByteBuffer::new(10);
        let result = buffer.write_str("caf\u{e9}", 0, None);
        assert!(matches!(result, Err(Error::UnsupportedEncoding { .. })));
        assert!(buffer.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_copy_to() {
        let source = ByteBuffer::from_bytes(&[1, 2, 3, 4]);
        let mut target = ByteBuffer::new(3);
        assert_eq!(source.copy_to(&mut target, 1, 0, 4).unwrap(), 2);
        assert_eq!(target.as_bytes(), &[0, 1, 2]);
    }

    proptest! {
        #[test]
        fn prop_uint_identity(value in any::<u32>(), width in prop::sample::select(vec![1usize, 2, 4]), offset in 0usize..4) {
            let masked = if width == 4 { value } else { value & ((1u32 << (width * 8)) - 1) };
            let mut buffer = ByteBuffer::new(8);
            buffer.write_uint_le(masked, offset, width).unwrap();
            prop_assert_eq!(buffer.read_uint_le(offset, width).unwrap(), masked);
        }

        #[test]
        fn prop_slice_matches_range(bytes in prop::collection::vec(any::<u8>(), 1..64), a in 0usize..64, b in 0usize..64) {
            let start = a % (bytes.len() + 1);
            let end = start + b % (bytes.len() - start + 1);
            let buffer = ByteBuffer::from_bytes(&bytes);
            let slice = buffer.slice(start, end).unwrap();
            prop_assert_eq!(slice.as_bytes(), &bytes[start..end]);
        }

        #[test]
        fn prop_write_str_reports_clipped_len(text in "[ -~]{0,40}", size in 0usize..24, offset in 0usize..24) {
            let offset = offset % (size + 1);
            let mut buffer = ByteBuffer::new(size);
            let written = buffer.write_str(&text, offset, None).unwrap();
            prop_assert_eq!(written, text.len().min(size - offset));
        }
    }
}
