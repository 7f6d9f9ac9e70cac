//! Growable byte stream with a write cursor
//!
//! Storage is a `Vec<u32>`, so every typed view over it (`f32`, `u32`, `u16`)
//! is aligned and comes straight out of `bytemuck` without copying.
//! The cursor is a byte offset; writes grow the storage when they run past
//! the end, at least doubling it.

use crate::buffer::BufferError;
use std::fmt;

const WORD_BYTES: usize = 4;

/// Called with the new capacity in bytes after the storage reallocates
pub type ResizeCallback = Box<dyn FnMut(usize)>;

/// Growable, 4-byte aligned byte buffer
pub struct IoBuffer {
    words: Vec<u32>,
    cur_pos: usize,
    resize_callback: Option<ResizeCallback>,
}

fn words_for(bytes: usize) -> usize {
    bytes.div_ceil(WORD_BYTES)
}

impl IoBuffer {
    /// Create a buffer with at least `capacity` bytes reserved
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; words_for(capacity)],
            cur_pos: 0,
            resize_callback: None,
        }
    }

    /// Register a callback fired whenever the storage reallocates
    pub fn set_resize_callback(&mut self, callback: ResizeCallback) {
        self.resize_callback = Some(callback);
    }

    /// Capacity in bytes
    pub fn capacity(&self) -> usize {
        self.words.len() * WORD_BYTES
    }

    /// Write cursor in bytes
    pub fn cur_pos(&self) -> usize {
        self.cur_pos
    }

    /// Whether nothing has been written since the last reset
    pub fn is_empty(&self) -> bool {
        self.cur_pos == 0
    }

    /// Rewind the cursor. Storage is kept for reuse.
    pub fn reset(&mut self) {
        self.cur_pos = 0;
    }

    /// Make room for `size` more bytes after the cursor.
    ///
    /// Returns `true` if the storage had to grow.
    pub fn check_space(&mut self, size: usize) -> bool {
        let needed = self.cur_pos + size;
        if needed <= self.capacity() {
            return false;
        }

        let new_capacity = needed.max(self.capacity() * 2);
        log::trace!("IoBuffer growing from {} to {} bytes", self.capacity(), new_capacity);
        self.words.resize(words_for(new_capacity), 0);

        let capacity = self.capacity();
        if let Some(callback) = self.resize_callback.as_mut() {
            callback(capacity);
        }
        true
    }

    /// Append raw bytes
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.check_space(data.len());
        let start = self.cur_pos;
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut self.words);
        bytes[start..start + data.len()].copy_from_slice(data);
        self.cur_pos += data.len();
    }

    /// Append a `u32`
    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_ne_bytes());
    }

    /// Append an `f32`
    pub fn write_f32(&mut self, value: f32) {
        self.write_bytes(&value.to_ne_bytes());
    }

    /// Append a `u16`
    pub fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_ne_bytes());
    }

    /// Append a run of floats
    pub fn write_f32_slice(&mut self, values: &[f32]) {
        self.write_bytes(bytemuck::cast_slice(values));
    }

    /// Append a run of `u16`s
    pub fn write_u16_slice(&mut self, values: &[u16]) {
        self.write_bytes(bytemuck::cast_slice(values));
    }

    /// Overwrite a `u32` inside the already written region
    pub fn write_u32_at(&mut self, offset: usize, value: u32) -> Result<(), BufferError> {
        self.check_written(offset, WORD_BYTES)?;
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut self.words);
        bytes[offset..offset + WORD_BYTES].copy_from_slice(&value.to_ne_bytes());
        Ok(())
    }

    /// Read a `u32` from the already written region
    pub fn read_u32_at(&self, offset: usize) -> Result<u32, BufferError> {
        self.check_written(offset, WORD_BYTES)?;
        let mut raw = [0u8; WORD_BYTES];
        raw.copy_from_slice(&self.as_bytes()[offset..offset + WORD_BYTES]);
        Ok(u32::from_ne_bytes(raw))
    }

    fn check_written(&self, offset: usize, len: usize) -> Result<(), BufferError> {
        if offset.checked_add(len).map_or(true, |end| end > self.cur_pos) {
            return Err(BufferError::OutOfRange {
                offset,
                len,
                written: self.cur_pos,
            });
        }
        Ok(())
    }

    /// Whole storage as bytes, including the unwritten tail
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }

    /// Bytes written since the last reset
    pub fn written_bytes(&self) -> &[u8] {
        &self.as_bytes()[..self.cur_pos]
    }

    /// Written region as whole 32-bit words (a trailing partial word is included)
    pub fn as_u32(&self) -> &[u32] {
        &self.words[..words_for(self.cur_pos)]
    }

    /// Mutable view of the written words
    pub fn as_u32_mut(&mut self) -> &mut [u32] {
        let len = words_for(self.cur_pos);
        &mut self.words[..len]
    }

    /// Written region as floats
    pub fn as_f32(&self) -> &[f32] {
        bytemuck::cast_slice(self.as_u32())
    }

    /// Mutable view of the written floats
    pub fn as_f32_mut(&mut self) -> &mut [f32] {
        bytemuck::cast_slice_mut(self.as_u32_mut())
    }

    /// Written region as `u16`s
    pub fn as_u16(&self) -> &[u16] {
        let halves: &[u16] = bytemuck::cast_slice(&self.words);
        &halves[..self.cur_pos / 2]
    }

    /// Mutable view of the written `u16`s
    pub fn as_u16_mut(&mut self) -> &mut [u16] {
        let len = self.cur_pos / 2;
        let halves: &mut [u16] = bytemuck::cast_slice_mut(&mut self.words);
        &mut halves[..len]
    }
}

impl fmt::Debug for IoBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoBuffer")
            .field("capacity", &self.capacity())
            .field("cur_pos", &self.cur_pos)
            .field("resize_callback", &self.resize_callback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_write_and_views() {
        let mut buffer = IoBuffer::new(16);
        buffer.write_f32(1.25);
        buffer.write_u32(7);
        assert_eq!(buffer.cur_pos(), 8);
        assert_relative_eq!(buffer.as_f32()[0], 1.25);
        assert_eq!(buffer.as_u32()[1], 7);
        assert_eq!(buffer.written_bytes().len(), 8);
    }

    #[test]
    fn test_u16_writes_pack_two_per_word() {
        let mut buffer = IoBuffer::new(4);
        buffer.write_u16_slice(&[3, 4, 5]);
        assert_eq!(buffer.as_u16(), &[3, 4, 5]);
        assert_eq!(buffer.as_u32().len(), 2);
    }

    #[test]
    fn test_grows_past_capacity() {
        let mut buffer = IoBuffer::new(8);
        assert!(!buffer.check_space(8));
        assert!(buffer.check_space(9));
        assert!(buffer.capacity() >= 16);

        buffer.write_f32_slice(&[0.5; 10]);
        assert_eq!(buffer.as_f32().len(), 10);
        assert!(buffer.capacity() >= 40);
    }

    #[test]
    fn test_resize_callback_fires_on_growth() {
        let resized = Rc::new(Cell::new(0usize));
        let seen = Rc::clone(&resized);

        let mut buffer = IoBuffer::new(4);
        buffer.set_resize_callback(Box::new(move |capacity| seen.set(capacity)));
        buffer.write_u32(1);
        assert_eq!(resized.get(), 0);

        buffer.write_u32(2);
        assert_eq!(resized.get(), buffer.capacity());
    }

    #[test]
    fn test_reset_keeps_storage() {
        let mut buffer = IoBuffer::new(4);
        buffer.write_f32_slice(&[1.0; 8]);
        let capacity = buffer.capacity();

        buffer.reset();
        assert!(buffer.is_empty());
        assert!(buffer.as_f32().is_empty());
        assert_eq!(buffer.capacity(), capacity);
    }

    #[test]
    fn test_patch_header() {
        let mut buffer = IoBuffer::new(16);
        buffer.write_u32(0);
        buffer.write_f32(2.0);
        buffer.write_u32_at(0, 3).unwrap();
        assert_eq!(buffer.read_u32_at(0).unwrap(), 3);
        assert!(matches!(
            buffer.read_u32_at(8),
            Err(BufferError::OutOfRange { offset: 8, .. })
        ));
    }

    #[test]
    fn test_offset_near_usize_max_is_out_of_range() {
        let mut buffer = IoBuffer::new(16);
        buffer.write_u32(0);
        assert!(matches!(
            buffer.read_u32_at(usize::MAX - 1),
            Err(BufferError::OutOfRange { written: 4, .. })
        ));
        assert!(buffer.write_u32_at(usize::MAX, 1).is_err());
    }
}
