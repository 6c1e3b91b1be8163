//! Growable byte writer and bounds-checked reader.

use tracing::trace;

use crate::error::DecodeError;
use crate::varint;

/// Byte order used for fixed-width integers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Endian {
    #[default]
    Big,
    Little,
}

/// Default capacity of a writer created with [`Writer::new`].
pub const DEFAULT_CAPACITY: usize = 64;

/// A growable byte region with a write cursor.
///
/// The logical content is `[0, offset)`. Capacity only ever doubles, and the
/// bytes below the cursor survive every growth.
#[derive(Debug, Clone)]
pub struct Writer {
    buf: Vec<u8>,
    offset: usize,
    endian: Endian,
}

impl Writer {
    /// Create a writer with [`DEFAULT_CAPACITY`] bytes of room.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a writer with room for `capacity` bytes (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Writer {
            buf: vec![0; capacity.max(1)],
            offset: 0,
            endian: Endian::Big,
        }
    }

    /// Reuse `storage` as the backing region. The whole allocation becomes
    /// capacity and the cursor starts at zero.
    pub fn from_vec(storage: Vec<u8>) -> Self {
        let mut writer = Writer {
            buf: storage,
            offset: 0,
            endian: Endian::Big,
        };
        writer.fill_capacity();
        writer
    }

    /// Set the byte order for fixed-width writes.
    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Current cursor position, equal to the logical length.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// The logical content written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.offset]
    }

    /// Copy of the logical content. Later writes never affect the returned
    /// vector.
    pub fn dump(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }

    /// Consume the writer, returning the logical content.
    pub fn into_vec(mut self) -> Vec<u8> {
        self.buf.truncate(self.offset);
        self.buf
    }

    /// Move the cursor back to zero, keeping the allocation.
    pub fn reset(&mut self) {
        self.offset = 0;
    }

    /// Move the cursor back to zero and swap in new backing storage,
    /// returning the old one.
    pub fn reset_with(&mut self, storage: Vec<u8>) -> Vec<u8> {
        let old = std::mem::replace(&mut self.buf, storage);
        self.offset = 0;
        self.fill_capacity();
        old
    }

    fn fill_capacity(&mut self) {
        let capacity = self.buf.capacity().max(1);
        self.buf.resize(capacity, 0);
    }

    /// Ensure at least `bytes` bytes of room past the cursor.
    pub fn allocate(&mut self, bytes: usize) {
        let target = self.offset + bytes;
        let mut size = self.buf.len().max(1);
        if target <= size {
            return;
        }
        while size < target {
            size *= 2;
        }
        trace!(from = self.buf.len(), to = size, "growing writer");
        self.buf.resize(size, 0);
    }

    /// Room for `bytes` bytes at the cursor, without advancing it.
    pub(crate) fn spare_mut(&mut self, bytes: usize) -> &mut [u8] {
        self.allocate(bytes);
        &mut self.buf[self.offset..self.offset + bytes]
    }

    pub(crate) fn advance(&mut self, bytes: usize) {
        self.offset += bytes;
    }

    /// Append raw bytes without a length prefix.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.spare_mut(bytes.len()).copy_from_slice(bytes);
        self.advance(bytes.len());
    }

    pub fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    pub fn write_u16(&mut self, value: u16) {
        match self.endian {
            Endian::Big => self.write_bytes(&value.to_be_bytes()),
            Endian::Little => self.write_bytes(&value.to_le_bytes()),
        }
    }

    pub fn write_u32(&mut self, value: u32) {
        match self.endian {
            Endian::Big => self.write_bytes(&value.to_be_bytes()),
            Endian::Little => self.write_bytes(&value.to_le_bytes()),
        }
    }

    pub fn write_i32(&mut self, value: i32) {
        match self.endian {
            Endian::Big => self.write_bytes(&value.to_be_bytes()),
            Endian::Little => self.write_bytes(&value.to_le_bytes()),
        }
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    /// Write an unsigned varint.
    pub fn write_uint_var(&mut self, value: u64) {
        varint::encode_into(value, self);
    }

    /// Write a signed varint (zigzag mapped).
    pub fn write_int_var(&mut self, value: i64) {
        varint::encode_into(varint::zigzag_encode(value), self);
    }

    /// Write an unsigned big-integer varint.
    pub fn write_big_uint(&mut self, value: u128) {
        varint::encode_into_big(value, self);
    }

    /// Write a signed big-integer varint (zigzag mapped).
    pub fn write_big_int(&mut self, value: i128) {
        varint::encode_into_big(varint::zigzag_encode_big(value), self);
    }

    /// Write a varint length followed by the bytes.
    pub fn write_buffer(&mut self, bytes: &[u8]) {
        self.write_uint_var(bytes.len() as u64);
        self.write_bytes(bytes);
    }

    /// Write a length-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) {
        self.write_buffer(value.as_bytes());
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

/// A cursor over a borrowed byte slice.
///
/// Every read is bounds-checked against the end of the slice.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    offset: usize,
    endian: Endian,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Reader {
            buf,
            offset: 0,
            endian: Endian::Big,
        }
    }

    /// Set the byte order for fixed-width reads.
    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left after the cursor.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Point the reader at new input and rewind.
    pub fn reset(&mut self, buf: &'a [u8]) {
        self.buf = buf;
        self.offset = 0;
    }

    /// Take the next `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::OutOfBounds {
                offset: self.offset,
                need: len,
                have: self.remaining(),
            });
        }
        let bytes = &self.buf[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let [byte] = self.read_array::<1>()?;
        Ok(byte)
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.read_array::<2>()?;
        Ok(match self.endian {
            Endian::Big => u16::from_be_bytes(bytes),
            Endian::Little => u16::from_le_bytes(bytes),
        })
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.read_array::<4>()?;
        Ok(match self.endian {
            Endian::Big => u32::from_be_bytes(bytes),
            Endian::Little => u32::from_le_bytes(bytes),
        })
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        let bytes = self.read_array::<4>()?;
        Ok(match self.endian {
            Endian::Big => i32::from_be_bytes(bytes),
            Endian::Little => i32::from_le_bytes(bytes),
        })
    }

    /// Read a boolean byte; anything but `0` or `1` is rejected.
    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        let offset = self.offset;
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            byte => Err(DecodeError::InvalidBoolean { offset, byte }),
        }
    }

    pub fn read_uint_var(&mut self) -> Result<u64, DecodeError> {
        let (value, used) = varint::decode_at(self.buf, self.offset)?;
        self.offset += used;
        Ok(value)
    }

    pub fn read_int_var(&mut self) -> Result<i64, DecodeError> {
        self.read_uint_var().map(varint::zigzag_decode)
    }

    pub fn read_big_uint(&mut self) -> Result<u128, DecodeError> {
        let (value, used) = varint::decode_big_at(self.buf, self.offset)?;
        self.offset += used;
        Ok(value)
    }

    pub fn read_big_int(&mut self) -> Result<i128, DecodeError> {
        self.read_big_uint().map(varint::zigzag_decode_big)
    }

    /// Read a varint length and that many bytes.
    pub fn read_buffer(&mut self) -> Result<&'a [u8], DecodeError> {
        let offset = self.offset;
        let len = self.read_uint_var()?;
        let len = usize::try_from(len).map_err(|_| DecodeError::OutOfBounds {
            offset,
            need: usize::MAX,
            have: self.remaining(),
        })?;
        self.read_bytes(len)
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let offset = self.offset;
        let bytes = self.read_buffer()?;
        let text = std::str::from_utf8(bytes)
            .map_err(|source| DecodeError::InvalidUtf8 { offset, source })?;
        Ok(text.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_width_big_endian() {
        let mut writer = Writer::new();
        writer.write_u8(0xAB);
        writer.write_u16(0x1234);
        writer.write_u32(0x89AB_CDEF);
        writer.write_i32(-2);
        assert_eq!(
            writer.as_slice(),
            &[0xAB, 0x12, 0x34, 0x89, 0xAB, 0xCD, 0xEF, 0xFF, 0xFF, 0xFF, 0xFE]
        );

        let mut reader = Reader::new(writer.as_slice());
        assert_eq!(reader.read_u8().unwrap(), 0xAB);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_u32().unwrap(), 0x89AB_CDEF);
        assert_eq!(reader.read_i32().unwrap(), -2);
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_fixed_width_little_endian() {
        let mut writer = Writer::new().with_endian(Endian::Little);
        writer.write_u16(0x1234);
        writer.write_u32(0x0102_0304);
        assert_eq!(writer.as_slice(), &[0x34, 0x12, 0x04, 0x03, 0x02, 0x01]);

        let mut reader = Reader::new(writer.as_slice()).with_endian(Endian::Little);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_u32().unwrap(), 0x0102_0304);
    }

    #[test]
    fn test_growth_doubles_and_preserves() {
        let mut writer = Writer::with_capacity(4);
        writer.write_bytes(&[1, 2, 3]);
        writer.allocate(2);
        assert_eq!(writer.capacity(), 8);
        writer.allocate(100);
        assert_eq!(writer.capacity(), 128);
        assert_eq!(writer.as_slice(), &[1, 2, 3]);
        assert_eq!(writer.offset(), 3);
    }

    #[test]
    fn test_dump_is_a_copy() {
        let mut writer = Writer::with_capacity(2);
        writer.write_string("first");
        let first = writer.dump();
        writer.reset();
        writer.write_string("second value");
        let mut expected = vec![5u8];
        expected.extend_from_slice(b"first");
        assert_eq!(first, expected);
        assert_ne!(writer.dump(), first);
    }

    #[test]
    fn test_reset_with_storage() {
        let mut writer = Writer::new();
        writer.write_u8(7);
        let old = writer.reset_with(Vec::with_capacity(16));
        assert_eq!(old[0], 7);
        assert_eq!(writer.offset(), 0);
        assert!(writer.capacity() >= 16);
    }

    #[test]
    fn test_read_past_end() {
        let mut reader = Reader::new(&[0x00, 0x01]);
        assert!(matches!(
            reader.read_u32(),
            Err(DecodeError::OutOfBounds { offset: 0, need: 4, have: 2 })
        ));
        assert_eq!(reader.read_u16().unwrap(), 1);
        assert!(matches!(reader.read_u8(), Err(DecodeError::OutOfBounds { .. })));
    }

    #[test]
    fn test_buffer_length_past_end() {
        let mut writer = Writer::new();
        writer.write_uint_var(10);
        writer.write_bytes(b"abc");
        let mut reader = Reader::new(writer.as_slice());
        assert!(matches!(
            reader.read_buffer(),
            Err(DecodeError::OutOfBounds { need: 10, have: 3, .. })
        ));
    }

    #[test]
    fn test_strings_and_varints() {
        let mut writer = Writer::with_capacity(1);
        writer.write_string("héllo");
        writer.write_uint_var(300);
        writer.write_int_var(-300);
        writer.write_big_uint(u128::MAX);
        writer.write_big_int(i128::MIN);
        writer.write_bool(true);

        let bytes = writer.dump();
        let mut reader = Reader::new(&bytes);
        assert_eq!(reader.read_string().unwrap(), "héllo");
        assert_eq!(reader.read_uint_var().unwrap(), 300);
        assert_eq!(reader.read_int_var().unwrap(), -300);
        assert_eq!(reader.read_big_uint().unwrap(), u128::MAX);
        assert_eq!(reader.read_big_int().unwrap(), i128::MIN);
        assert!(reader.read_bool().unwrap());
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_invalid_bool_and_utf8() {
        let mut reader = Reader::new(&[2]);
        assert!(matches!(
            reader.read_bool(),
            Err(DecodeError::InvalidBoolean { offset: 0, byte: 2 })
        ));

        let mut reader = Reader::new(&[2, 0xC3, 0x28]);
        assert!(matches!(reader.read_string(), Err(DecodeError::InvalidUtf8 { .. })));
    }
}
