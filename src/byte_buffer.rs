//! Growable, position-tracked byte buffer with configurable endianness.
//!
//! `ByteBuffer` is the I/O primitive under the cross-reference reader and the
//! TrueType parser. It keeps a logical length separate from the allocated
//! capacity, a cursor, a saved mark, and a bit cursor for MSB-first sub-byte
//! reads.
//!
//! Invariant: `0 <= position <= len <= capacity`.
//!
//! Reads come in two flavours:
//! - fixed-width reads (`read_u16`, `read_u32`, ...) fail with
//!   [`Error::UnexpectedEof`] when fewer bytes remain than the width
//! - tolerant reads (`read_byte`, `peek_byte`, `read_into`, `read_slice`)
//!   clamp at the end and report the shortfall through their return value
//!
//! Writes go to the cursor, overwrite existing bytes and extend the logical
//! length when they run past it. `append` always writes at the end.
//!
//! # Example
//!
//! ```
//! use pdf_core::byte_buffer::{ByteBuffer, ByteOrder};
//!
//! let mut buf = ByteBuffer::new();
//! buf.write_u16(0x0102);
//! buf.seek(0);
//! assert_eq!(buf.read_u16().unwrap(), 0x0102);
//!
//! buf.set_byte_order(ByteOrder::LittleEndian);
//! buf.seek(0);
//! assert_eq!(buf.read_u16().unwrap(), 0x0201);
//! ```

use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder as Endian, LittleEndian};
use std::io;

/// Capacity used by [`ByteBuffer::new`].
const DEFAULT_CAPACITY: usize = 16;

/// Byte order used by multi-byte reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    /// Most significant byte first (network order, sfnt, PDF binary fields)
    #[default]
    BigEndian,
    /// Least significant byte first
    LittleEndian,
}

/// Resizable byte buffer with a cursor, a mark and a bit cursor.
#[derive(Debug, Clone)]
pub struct ByteBuffer {
    /// Backing storage; `data.len()` is the capacity
    data: Vec<u8>,
    /// Number of bytes in use
    length: usize,
    position: usize,
    mark: usize,
    byte_order: ByteOrder,
    dirty: bool,
    /// Index of the next bit to read from `current_byte`, or -1 when aligned
    bit_shift: i8,
    current_byte: u8,
}

impl Default for ByteBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteBuffer {
    /// Create an empty buffer with a small default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty buffer that can hold `capacity` bytes without growing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            length: 0,
            position: 0,
            mark: 0,
            byte_order: ByteOrder::BigEndian,
            dirty: false,
            bit_shift: -1,
            current_byte: 0,
        }
    }

    /// Wrap existing bytes. The cursor starts at 0.
    pub fn from_vec(data: Vec<u8>) -> Self {
        let length = data.len();
        Self {
            data,
            length,
            ..Self::with_capacity(0)
        }
    }

    /// Number of bytes in use.
    pub fn len(&self) -> usize {
        self.length
    }

    /// True when no bytes are in use.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Allocated capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Current cursor position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes between the cursor and the end.
    pub fn available(&self) -> usize {
        self.length - self.position
    }

    /// True when at least one byte can be read.
    pub fn is_available(&self) -> bool {
        self.length > self.position
    }

    /// Byte order used by multi-byte operations.
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Change the byte order used by multi-byte operations.
    pub fn set_byte_order(&mut self, byte_order: ByteOrder) {
        self.byte_order = byte_order;
    }

    /// True once the content has been mutated.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Set or clear the dirty flag.
    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    // ========================================================================
    // Positioning
    // ========================================================================

    /// Move the cursor, clamping to `[0, len]`. Returns the new position.
    ///
    /// Any partially consumed bit byte is discarded.
    pub fn seek(&mut self, position: i64) -> usize {
        self.position = position.clamp(0, self.length as i64) as usize;
        self.bit_shift = -1;
        self.position
    }

    /// Move the cursor relative to its current position, clamping to `[0, len]`.
    pub fn skip(&mut self, delta: i64) -> usize {
        self.seek(self.position as i64 + delta)
    }

    /// Remember the current position.
    pub fn mark(&mut self) -> usize {
        self.mark = self.position;
        self.mark
    }

    /// Remember a position relative to the cursor.
    pub fn mark_at(&mut self, delta: i64) -> usize {
        self.mark = (self.position as i64 + delta).clamp(0, self.length as i64) as usize;
        self.mark
    }

    /// Return to the remembered position.
    pub fn reset_mark(&mut self) -> usize {
        self.seek(self.mark as i64)
    }

    // ========================================================================
    // Tolerant reads
    // ========================================================================

    /// Read one byte, or `None` at the end of the buffer.
    pub fn read_byte(&mut self) -> Option<u8> {
        if self.position >= self.length {
            return None;
        }
        let byte = self.data[self.position];
        self.position += 1;
        Some(byte)
    }

    /// Look at the next byte without consuming it.
    pub fn peek_byte(&self) -> Option<u8> {
        if self.position >= self.length {
            return None;
        }
        Some(self.data[self.position])
    }

    /// Look at the byte `offset` bytes past the cursor.
    pub fn peek_u8_at(&self, offset: usize) -> Result<u8> {
        let index = self.position + offset;
        if index >= self.length {
            return Err(Error::UnexpectedEof);
        }
        Ok(self.data[index])
    }

    /// Byte at an absolute index, if in range.
    pub fn get_byte(&self, index: usize) -> Option<u8> {
        if index < self.length {
            Some(self.data[index])
        } else {
            None
        }
    }

    /// Copy up to `out.len()` bytes into `out`. Returns the number copied.
    pub fn read_into(&mut self, out: &mut [u8]) -> usize {
        let count = out.len().min(self.available());
        out[..count].copy_from_slice(&self.data[self.position..self.position + count]);
        self.position += count;
        count
    }

    /// Borrow up to `count` bytes from the cursor and advance past them.
    pub fn read_slice(&mut self, count: usize) -> &[u8] {
        let count = count.min(self.available());
        let start = self.position;
        self.position += count;
        &self.data[start..start + count]
    }

    /// Read bytes up to a NUL byte or the end of the buffer.
    ///
    /// The terminator is consumed. A NUL and the end of data are not
    /// distinguished.
    pub fn read_null_terminated(&mut self) -> Vec<u8> {
        let start = self.position;
        let mut count = 0;
        while let Some(byte) = self.read_byte() {
            if byte == 0 {
                break;
            }
            count += 1;
        }
        self.data[start..start + count].to_vec()
    }

    /// Read one line terminated by CR, LF or CRLF. Bytes map to chars 1:1.
    pub fn read_line(&mut self) -> Result<String> {
        if self.position >= self.length {
            return Err(Error::UnexpectedEof);
        }
        let mut line = String::new();
        while let Some(byte) = self.read_byte() {
            match byte {
                b'\n' => break,
                b'\r' => {
                    if self.peek_byte() == Some(b'\n') {
                        self.position += 1;
                    }
                    break;
                },
                _ => line.push(byte as char),
            }
        }
        Ok(line)
    }

    // ========================================================================
    // Fixed-width reads
    // ========================================================================

    fn take(&mut self, width: usize) -> Result<&[u8]> {
        if width > self.available() {
            return Err(Error::UnexpectedEof);
        }
        let start = self.position;
        self.position += width;
        Ok(&self.data[start..start + width])
    }

    fn read_with<T>(
        &mut self,
        width: usize,
        big: fn(&[u8]) -> T,
        little: fn(&[u8]) -> T,
    ) -> Result<T> {
        let order = self.byte_order;
        let bytes = self.take(width)?;
        Ok(match order {
            ByteOrder::BigEndian => big(bytes),
            ByteOrder::LittleEndian => little(bytes),
        })
    }

    /// Read an unsigned byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read a signed byte.
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    /// Read an unsigned 16-bit integer.
    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_with(2, BigEndian::read_u16, LittleEndian::read_u16)
    }

    /// Read a signed 16-bit integer.
    pub fn read_i16(&mut self) -> Result<i16> {
        self.read_with(2, BigEndian::read_i16, LittleEndian::read_i16)
    }

    /// Read an unsigned 32-bit integer.
    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_with(4, BigEndian::read_u32, LittleEndian::read_u32)
    }

    /// Read a signed 32-bit integer.
    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_with(4, BigEndian::read_i32, LittleEndian::read_i32)
    }

    /// Read an unsigned 64-bit integer.
    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_with(8, BigEndian::read_u64, LittleEndian::read_u64)
    }

    /// Read a signed 64-bit integer.
    pub fn read_i64(&mut self) -> Result<i64> {
        self.read_with(8, BigEndian::read_i64, LittleEndian::read_i64)
    }

    /// Read an unsigned integer of `width` bytes (1..=8).
    pub fn read_uint(&mut self, width: usize) -> Result<u64> {
        if !(1..=8).contains(&width) {
            return Err(Error::Unsupported(format!("integer width {}", width)));
        }
        let order = self.byte_order;
        let bytes = self.take(width)?;
        Ok(match order {
            ByteOrder::BigEndian => BigEndian::read_uint(bytes, width),
            ByteOrder::LittleEndian => LittleEndian::read_uint(bytes, width),
        })
    }

    /// Read a 16.16 fixed-point number.
    pub fn read_fixed(&mut self) -> Result<f64> {
        Ok(self.read_i32()? as f64 / 65536.0)
    }

    /// Read a four-byte tag.
    pub fn read_tag(&mut self) -> Result<[u8; 4]> {
        let bytes = self.take(4)?;
        Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    // ========================================================================
    // Bit reads
    // ========================================================================

    /// Read one bit, most significant first.
    pub fn read_bit(&mut self) -> Result<u8> {
        if self.bit_shift < 0 {
            self.current_byte = self.read_u8()?;
            self.bit_shift = 7;
        }
        let bit = (self.current_byte >> self.bit_shift) & 1;
        self.bit_shift -= 1;
        Ok(bit)
    }

    /// Read `count` bits (1..=32) as an unsigned integer, most significant first.
    pub fn read_bits(&mut self, count: u32) -> Result<u32> {
        if !(1..=32).contains(&count) {
            return Err(Error::Unsupported(format!("bit count {}", count)));
        }
        let mut result = 0u32;
        for shift in (0..count).rev() {
            result |= (self.read_bit()? as u32) << shift;
        }
        Ok(result)
    }

    /// Drop the rest of a partially read byte.
    pub fn byte_align(&mut self) {
        self.bit_shift = -1;
    }

    // ========================================================================
    // Writes
    // ========================================================================

    fn ensure_capacity(&mut self, additional: usize) {
        let required = self.length + additional;
        if required <= self.data.len() {
            return;
        }
        let new_capacity = (self.data.len() * 2).max(required);
        self.data.resize(new_capacity, 0);
    }

    /// Write bytes at the cursor, extending the buffer as needed.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        let end = self.position + bytes.len();
        if end > self.length {
            self.ensure_capacity(end - self.length);
            self.length = end;
        }
        self.data[self.position..end].copy_from_slice(bytes);
        self.position = end;
        self.dirty = true;
    }

    fn write_with<T>(
        &mut self,
        value: T,
        width: usize,
        big: fn(&mut [u8], T),
        little: fn(&mut [u8], T),
    ) {
        let mut scratch = [0u8; 8];
        match self.byte_order {
            ByteOrder::BigEndian => big(&mut scratch[..width], value),
            ByteOrder::LittleEndian => little(&mut scratch[..width], value),
        }
        self.write_bytes(&scratch[..width]);
    }

    /// Write an unsigned byte.
    pub fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    /// Write a signed byte.
    pub fn write_i8(&mut self, value: i8) {
        self.write_bytes(&[value as u8]);
    }

    /// Write an unsigned 16-bit integer.
    pub fn write_u16(&mut self, value: u16) {
        self.write_with(value, 2, BigEndian::write_u16, LittleEndian::write_u16);
    }

    /// Write a signed 16-bit integer.
    pub fn write_i16(&mut self, value: i16) {
        self.write_with(value, 2, BigEndian::write_i16, LittleEndian::write_i16);
    }

    /// Write an unsigned 32-bit integer.
    pub fn write_u32(&mut self, value: u32) {
        self.write_with(value, 4, BigEndian::write_u32, LittleEndian::write_u32);
    }

    /// Write a signed 32-bit integer.
    pub fn write_i32(&mut self, value: i32) {
        self.write_with(value, 4, BigEndian::write_i32, LittleEndian::write_i32);
    }

    /// Write an unsigned 64-bit integer.
    pub fn write_u64(&mut self, value: u64) {
        self.write_with(value, 8, BigEndian::write_u64, LittleEndian::write_u64);
    }

    /// Write a signed 64-bit integer.
    pub fn write_i64(&mut self, value: i64) {
        self.write_with(value, 8, BigEndian::write_i64, LittleEndian::write_i64);
    }

    /// Write the low `width` bytes (1..=8) of `value`.
    pub fn write_uint(&mut self, value: u64, width: usize) -> Result<()> {
        if !(1..=8).contains(&width) {
            return Err(Error::Unsupported(format!("integer width {}", width)));
        }
        let mut scratch = [0u8; 8];
        match self.byte_order {
            ByteOrder::BigEndian => BigEndian::write_uint(&mut scratch[..width], value, width),
            ByteOrder::LittleEndian => {
                LittleEndian::write_uint(&mut scratch[..width], value, width)
            },
        }
        self.write_bytes(&scratch[..width]);
        Ok(())
    }

    /// Write a 16.16 fixed-point number.
    pub fn write_fixed(&mut self, value: f64) {
        self.write_i32((value * 65536.0).round() as i32);
    }

    /// Append bytes at the end without moving the cursor.
    pub fn append(&mut self, bytes: &[u8]) {
        self.ensure_capacity(bytes.len());
        self.data[self.length..self.length + bytes.len()].copy_from_slice(bytes);
        self.length += bytes.len();
        self.dirty = true;
    }

    /// Append one byte at the end without moving the cursor.
    pub fn append_byte(&mut self, byte: u8) {
        self.append(&[byte]);
    }

    // ========================================================================
    // In-place editing
    // ========================================================================

    /// Insert bytes at `index`, shifting the tail right.
    pub fn insert(&mut self, index: usize, bytes: &[u8]) {
        let index = index.min(self.length);
        let count = bytes.len();
        self.ensure_capacity(count);
        self.data.copy_within(index..self.length, index + count);
        self.data[index..index + count].copy_from_slice(bytes);
        self.length += count;
        self.dirty = true;
    }

    /// Remove `count` bytes at `index`, shifting the tail left.
    pub fn delete(&mut self, index: usize, count: usize) {
        let index = index.min(self.length);
        let count = count.min(self.length - index);
        self.data.copy_within(index + count..self.length, index);
        self.length -= count;
        self.position = self.position.min(self.length);
        self.mark = self.mark.min(self.length);
        self.dirty = true;
    }

    /// Overwrite bytes starting at `index`, growing the buffer if they run past the end.
    pub fn replace(&mut self, index: usize, bytes: &[u8]) {
        let index = index.min(self.length);
        let end = index + bytes.len();
        if end > self.length {
            self.ensure_capacity(end - self.length);
            self.length = end;
        }
        self.data[index..end].copy_from_slice(bytes);
        self.dirty = true;
    }

    /// Change the logical length. New bytes are zero.
    pub fn set_len(&mut self, length: usize) {
        if length == self.length {
            return;
        }
        if length > self.length {
            self.ensure_capacity(length - self.length);
            self.data[self.length..length].fill(0);
        }
        self.length = length;
        self.position = self.position.min(length);
        self.mark = self.mark.min(length);
        self.dirty = true;
    }

    /// Drop all content.
    pub fn clear(&mut self) {
        self.set_len(0);
    }

    // ========================================================================
    // Extraction
    // ========================================================================

    /// The bytes in use.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.length]
    }

    /// The bytes in use, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data[..self.length]
    }

    /// Borrow up to `count` bytes starting at `index`.
    pub fn slice(&self, index: usize, count: usize) -> &[u8] {
        let index = index.min(self.length);
        let count = count.min(self.length - index);
        &self.data[index..index + count]
    }

    /// Copy up to `count` bytes starting at `index`.
    pub fn get_byte_array(&self, index: usize, count: usize) -> Vec<u8> {
        self.slice(index, count).to_vec()
    }

    /// Copy the bytes in use.
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }

    /// Consume the buffer, returning the bytes in use.
    pub fn into_vec(mut self) -> Vec<u8> {
        self.data.truncate(self.length);
        self.data
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self::from_vec(data)
    }
}

impl From<&[u8]> for ByteBuffer {
    fn from(data: &[u8]) -> Self {
        Self::from_vec(data.to_vec())
    }
}

impl io::Read for ByteBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_into(buf))
    }
}

impl io::Write for ByteBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Seeking clamps to `[0, len]` instead of failing.
impl io::Seek for ByteBuffer {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let target = match pos {
            io::SeekFrom::Start(offset) => offset.min(i64::MAX as u64) as i64,
            io::SeekFrom::Current(delta) => self.position as i64 + delta,
            io::SeekFrom::End(delta) => self.length as i64 + delta,
        };
        Ok(ByteBuffer::seek(self, target) as u64)
    }
}
