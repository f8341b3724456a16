#![cfg(test)]

//! Synthetic TA images for tests.
//!
//! A fresh image is all zeroes apart from the TA magic, so every text
//! field decodes as valid (NUL-padded) UTF-8 until a test garbles it on
//! purpose.

use crate::layout::{TaLayout, BOOTLOG_COUNT, TA_MAGIC};

#[derive(Clone)]
pub struct TestImage {
    data: Vec<u8>,
    layout: TaLayout,
}

impl TestImage {
    pub fn new() -> Self {
        let layout = TaLayout::tama();
        let mut data = vec![0u8; layout.image_size];
        data[..2].copy_from_slice(&TA_MAGIC);
        TestImage { data, layout }
    }

    /// Writes `text` at the start of the given boot-log slot.
    pub fn bootlog(mut self, slot: usize, text: &str) -> Self {
        assert!((1..=BOOTLOG_COUNT).contains(&slot));
        assert!(text.len() <= self.layout.bootlog_len);
        let offset = self.layout.bootlog_offsets[slot - 1];
        self.data[offset..offset + text.len()].copy_from_slice(text.as_bytes());
        self
    }

    pub fn build_id(mut self, text: &str) -> Self {
        assert!(text.len() <= self.layout.build_id_len);
        let offset = self.layout.build_id_offset;
        self.data[offset..offset + text.len()].copy_from_slice(text.as_bytes());
        self
    }

    pub fn serial(mut self, text: &str) -> Self {
        assert_eq!(text.len(), self.layout.serial_len);
        let offset = self.layout.serial_offset;
        self.data[offset..offset + text.len()].copy_from_slice(text.as_bytes());
        self
    }

    /// Plants a SQLite header with the given size exponent, then `fill`
    /// as the first payload bytes after the size field.
    pub fn sqlitedb(mut self, exponent: u16, fill: &[u8]) -> Self {
        let offset = self.layout.sqlitedb_offset;
        self.data[offset..offset + 16].copy_from_slice(b"SQLite format 3\0");
        self.data[offset + 16..offset + 18].copy_from_slice(&exponent.to_le_bytes());
        self.data[offset + 18..offset + 18 + fill.len()].copy_from_slice(fill);
        self
    }

    /// Overwrites raw bytes at an arbitrary offset.
    pub fn poke(mut self, offset: usize, bytes: &[u8]) -> Self {
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}
